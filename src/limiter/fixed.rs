use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

use dashmap::DashMap;
use tracing::debug;

use crate::cache::epoch_secs;
use crate::error::{Result, RouterError};

use super::{LimiterStats, RateLimitKey, RateLimitQuota, RateLimiter};

/// One counter per key, reset at the end of each window.
#[derive(Debug)]
struct FixedWindow {
    hits: u64,
    remaining: u32,
    reset_at: SystemTime,
}

impl FixedWindow {
    fn fresh(limit: u32, reset_at: SystemTime) -> Self {
        Self {
            hits: 0,
            remaining: limit,
            reset_at,
        }
    }
}

/// Fixed-window admission: every key gets `limit` hits per `window`, and the
/// counter snaps back to zero when the window rolls over.
///
/// A burst straddling the window boundary can see up to `2 * limit` hits in
/// `window` wall time; use [`SlidingWindowLimiter`](super::SlidingWindowLimiter)
/// where that matters.
pub struct FixedWindowLimiter {
    limit: u32,
    window: Duration,
    windows: DashMap<String, FixedWindow>,
    route_limits: RwLock<HashMap<String, (u32, Duration)>>,
}

impl FixedWindowLimiter {
    #[must_use]
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit: limit.max(1),
            window,
            windows: DashMap::new(),
            route_limits: RwLock::new(HashMap::new()),
        }
    }

    fn limits_for(&self, scope: &str) -> (u32, Duration) {
        let overrides = self
            .route_limits
            .read()
            .expect("route limit lock poisoned");
        overrides
            .get(scope)
            .copied()
            .unwrap_or((self.limit, self.window))
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn check(&self, key: &RateLimitKey) -> Result<RateLimitQuota> {
        let (limit, window) = self.limits_for(key.scope());
        let now = SystemTime::now();

        // The entry guard holds the shard lock, so two racing checks on the
        // same key serialize here and cannot both take the last slot.
        let mut entry = self
            .windows
            .entry(key.storage_key())
            .or_insert_with(|| FixedWindow::fresh(limit, now + window));

        if now >= entry.reset_at {
            *entry = FixedWindow::fresh(limit, now + window);
        }

        if entry.remaining == 0 {
            let retry_after = entry
                .reset_at
                .duration_since(now)
                .unwrap_or(Duration::ZERO);
            debug!(
                key = %key.storage_key(),
                limit,
                retry_after_ms = retry_after.as_millis() as u64,
                "rate limit window exhausted"
            );
            return Err(RouterError::RateLimitExceeded { retry_after });
        }

        entry.hits += 1;
        entry.remaining -= 1;

        Ok(RateLimitQuota {
            limit,
            remaining: entry.remaining,
            reset_at: epoch_secs(entry.reset_at),
        })
    }

    fn set_route_limit(&self, scope: &str, limit: u32, window: Duration) {
        self.route_limits
            .write()
            .expect("route limit lock poisoned")
            .insert(scope.to_string(), (limit.max(1), window));
    }

    fn clear(&self) {
        self.windows.clear();
    }

    fn stats(&self) -> LimiterStats {
        let total_hits = self.windows.iter().map(|w| w.hits).sum();
        LimiterStats {
            entries: self.windows.len(),
            total_hits,
        }
    }
}
