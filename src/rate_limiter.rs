//! Fixed-window request limiter shared by every call to the API host.
//!
//! Image downloads are exempt: they neither consume nor wait on a slot.

use async_trait::async_trait;
use http::Extensions;
use parking_lot::Mutex;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};
use tokio::time::{Duration, Instant};

use std::sync::Arc;

/// Tag attached to outgoing requests as a request extension.
/// Requests without a tag count as [`RequestClass::Metadata`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestClass {
    #[default]
    Metadata,
    Image,
}

#[derive(Debug)]
struct Window {
    started: Instant,
    used: usize,
}

#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    interval: Duration,
    window: Mutex<Window>,
}

impl RateLimiter {
    pub const DEFAULT_MAX_REQUESTS: usize = 10;
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

    pub fn new(max_requests: usize, interval: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            interval,
            window: Mutex::new(Window {
                started: Instant::now(),
                used: 0,
            }),
        }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Takes a slot from the current window, or returns how long until the
    /// window rolls over.
    pub fn try_acquire(&self) -> std::result::Result<(), Duration> {
        let now = Instant::now();
        let mut window = self.window.lock();

        if now.duration_since(window.started) >= self.interval {
            window.started = now;
            window.used = 0;
        }

        if window.used < self.max_requests {
            window.used += 1;
            Ok(())
        } else {
            Err((window.started + self.interval).saturating_duration_since(now))
        }
    }

    /// Suspends until a slot is free. Never fails and never drops the caller.
    pub async fn acquire(&self, class: RequestClass) {
        if class == RequestClass::Image {
            return;
        }

        loop {
            match self.try_acquire() {
                Ok(()) => return,
                Err(wait) => {
                    tracing::trace!("rate limit reached, waiting {wait:?}");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_REQUESTS, Self::DEFAULT_INTERVAL)
    }
}

/// Adapter that makes every request through the client wait on the limiter.
#[derive(Debug, Clone)]
pub struct RateLimitMiddleware {
    limiter: Arc<RateLimiter>,
}

impl RateLimitMiddleware {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

#[async_trait]
impl Middleware for RateLimitMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let class = extensions.get::<RequestClass>().copied().unwrap_or_default();

        self.limiter.acquire(class).await;

        next.run(req, extensions).await
    }
}
