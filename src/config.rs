//! Client configuration and the user settings collaborator.

use bon::Builder;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

use crate::requests::query_utils::{Language, LanguageFilter};

use std::collections::HashSet;

pub const API_URL: &str = "https://jumpg-webapi.tokyo-cdn.com/api";
pub const BASE_URL: &str = "https://mangaplus.shueisha.co.jp";

/// Static configuration of a [`MangaPlusClient`](crate::MangaPlusClient).
///
/// ```ignore
/// let config = ClientConfig::builder()
///     .user_agent("my-reader/1.0")
///     .max_requests(5)
///     .build();
/// ```
#[derive(Debug, Clone, Builder)]
pub struct ClientConfig {
    /// Root of the JSON API, without a trailing slash
    #[builder(into, default = API_URL.to_owned())]
    pub api_url: String,
    /// Origin sent as `Referer` on every request
    #[builder(into, default = BASE_URL.to_owned())]
    pub base_url: String,
    #[builder(into, default = ClientConfig::DEFAULT_USER_AGENT.to_owned())]
    pub user_agent: String,
    #[builder(default = crate::rate_limiter::RateLimiter::DEFAULT_MAX_REQUESTS)]
    pub max_requests: usize,
    #[builder(default = crate::rate_limiter::RateLimiter::DEFAULT_INTERVAL)]
    pub rate_interval: Duration,
}

impl ClientConfig {
    pub const DEFAULT_USER_AGENT: &str =
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    pub fn referer(&self) -> String {
        format!("{}/", self.base_url.trim_end_matches('/'))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Resolution requested from the chapter viewer
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImageQuality {
    Low,
    High,
    #[default]
    SuperHigh,
}

/// User preferences that parameterize requests and filtering.
/// Persistence is up to the implementor.
pub trait SettingsStore: Send + Sync + std::fmt::Debug {
    fn enabled_languages(&self) -> HashSet<Language>;

    fn image_quality(&self) -> ImageQuality;

    fn split_images(&self) -> bool;

    fn language_filter(&self) -> LanguageFilter {
        LanguageFilter::new(self.enabled_languages())
    }
}

#[derive(Debug, Clone)]
struct PreferenceValues {
    languages: HashSet<Language>,
    quality: ImageQuality,
    split_images: bool,
}

/// In-memory [`SettingsStore`] that can be changed while the client is in use
#[derive(Debug)]
pub struct Preferences {
    values: RwLock<PreferenceValues>,
}

impl Preferences {
    pub fn new() -> Self {
        Self {
            values: RwLock::new(PreferenceValues {
                languages: HashSet::from([Language::FALLBACK]),
                quality: ImageQuality::default(),
                split_images: true,
            }),
        }
    }

    pub fn set_languages(&self, languages: impl IntoIterator<Item = Language>) {
        self.values.write().languages = languages.into_iter().collect();
    }

    pub fn set_image_quality(&self, quality: ImageQuality) {
        self.values.write().quality = quality;
    }

    pub fn set_split_images(&self, split: bool) {
        self.values.write().split_images = split;
    }
}

impl Default for Preferences {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for Preferences {
    fn enabled_languages(&self) -> HashSet<Language> {
        self.values.read().languages.clone()
    }

    fn image_quality(&self) -> ImageQuality {
        self.values.read().quality
    }

    fn split_images(&self) -> bool {
        self.values.read().split_images
    }
}
