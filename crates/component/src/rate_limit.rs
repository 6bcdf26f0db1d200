//! Rate limit resource contract and the in-process implementation.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use sluice_message::Error;

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;

/// A token-style rate limit registered as a labelled resource.
#[async_trait]
pub trait RateLimit: Send + Sync {
    /// Attempt to acquire a slot. Returns `Duration::ZERO` on success, or
    /// the duration the caller should wait before retrying.
    async fn access(&self) -> Result<Duration, Error>;
}

/// Fixed-window in-process rate limit: at most `count` acquisitions per
/// `interval`.
#[derive(Debug)]
pub struct LocalRateLimit {
    count: usize,
    interval: Duration,
    window: Mutex<Window>,
}

#[derive(Debug)]
struct Window {
    remaining: usize,
    reset_at: Instant,
}

impl LocalRateLimit {
    /// A limit of `count` acquisitions per `interval`.
    pub fn new(count: usize, interval: Duration) -> Self {
        Self {
            count,
            interval,
            window: Mutex::new(Window {
                remaining: count,
                reset_at: Instant::now() + interval,
            }),
        }
    }
}

#[async_trait]
impl RateLimit for LocalRateLimit {
    async fn access(&self) -> Result<Duration, Error> {
        let mut window = self.window.lock().expect("rate limit lock");
        let now = Instant::now();
        if now >= window.reset_at {
            window.remaining = self.count;
            window.reset_at = now + self.interval;
        }
        if window.remaining > 0 {
            window.remaining -= 1;
            Ok(Duration::ZERO)
        } else {
            Ok(window.reset_at.saturating_duration_since(now))
        }
    }
}
