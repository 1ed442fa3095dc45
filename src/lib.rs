//! Client for the MANGA Plus web API.
//!
//! Every request goes through the same middleware stack: tracing, the shared
//! [`RateLimiter`](rate_limiter::RateLimiter), then the
//! [`Interceptor`](interceptor::Interceptor) which sets headers and decrypts
//! page images. Responses are normalized into [`CatalogEntry`](requests::feed::CatalogEntry)
//! lists, [`MangaDetail`](requests::manga::MangaDetail) with its chapters, and
//! [`PageRef`](viewer::PageRef) lists.

pub mod cipher;
pub mod config;
pub mod interceptor;
pub mod rate_limiter;
pub mod requests;
pub mod viewer;

use config::{ClientConfig, Preferences, SettingsStore};
use interceptor::Interceptor;
use rate_limiter::{RateLimitMiddleware, RateLimiter};
use requests::Result;

use reqwest_middleware::ClientWithMiddleware;
use reqwest_tracing::TracingMiddleware;

use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct MangaPlusClient {
    pub(crate) client: ClientWithMiddleware,
    pub(crate) config: Arc<ClientConfig>,
    pub(crate) settings: Arc<dyn SettingsStore>,
    pub(crate) limiter: Arc<RateLimiter>,
}

impl MangaPlusClient {
    /// Client with the default configuration and in-memory preferences
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default(), Arc::new(Preferences::default()))
    }

    pub fn with_config(config: ClientConfig, settings: Arc<dyn SettingsStore>) -> Result<Self> {
        let limiter = Arc::new(RateLimiter::new(config.max_requests, config.rate_interval));

        Self::with_limiter(config, settings, limiter)
    }

    /// Builds a client that shares `limiter` with other clients of the same host
    pub fn with_limiter(
        config: ClientConfig,
        settings: Arc<dyn SettingsStore>,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self> {
        let interceptor = Interceptor::new(&config)?;

        let client = reqwest_middleware::ClientBuilder::new(reqwest::Client::builder().build()?)
            .with(TracingMiddleware::default())
            .with(RateLimitMiddleware::new(Arc::clone(&limiter)))
            .with(interceptor)
            .build();

        Ok(Self {
            client,
            config: Arc::new(config),
            settings,
            limiter,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn settings(&self) -> &Arc<dyn SettingsStore> {
        &self.settings
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }
}
