// src/pipeline/rate_limit.rs

//! Per-host request spacing.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spaces requests to the same host at least `interval` apart.
///
/// Each caller reserves the next free slot for its host under the lock and
/// sleeps outside it, so concurrent callers queue up instead of bunching.
#[derive(Debug)]
pub struct DomainRateLimiter {
    interval: Duration,
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl DomainRateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    /// Wait until a request to `host` is allowed.
    pub async fn acquire(&self, host: &str) {
        let wait = self.reserve(host).await;
        if !wait.is_zero() {
            log::debug!("Rate limiting {}: waiting {:?}", host, wait);
            tokio::time::sleep(wait).await;
        }
    }

    async fn reserve(&self, host: &str) -> Duration {
        let mut slots = self.next_slot.lock().await;
        let now = Instant::now();
        let slot = slots
            .get(host)
            .copied()
            .filter(|t| *t > now)
            .unwrap_or(now);
        slots.insert(host.to_string(), slot + self.interval);
        slot.saturating_duration_since(now)
    }
}
