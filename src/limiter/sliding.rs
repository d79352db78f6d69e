use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

use dashmap::DashMap;
use tracing::debug;

use crate::cache::epoch_secs;
use crate::error::{Result, RouterError};

use super::{LimiterStats, RateLimitKey, RateLimitQuota, RateLimiter};

/// Every 64th check also sweeps fully-expired keys out of the map.
const SWEEP_INTERVAL: u64 = 64;

/// Sliding-window admission: each key keeps the timestamps of its hits inside
/// the window and a request is denied while `limit` of them are still live.
///
/// Unlike the fixed window there is no boundary burst: budget frees up one
/// hit at a time as old timestamps age out.
pub struct SlidingWindowLimiter {
    limit: u32,
    window: Duration,
    hits: DashMap<String, Vec<SystemTime>>,
    route_limits: RwLock<HashMap<String, (u32, Duration)>>,
    checks: AtomicU64,
}

impl SlidingWindowLimiter {
    #[must_use]
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit: limit.max(1),
            window,
            hits: DashMap::new(),
            route_limits: RwLock::new(HashMap::new()),
            checks: AtomicU64::new(0),
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

    /// Drop keys whose every hit has aged out. Retains entries the clock
    /// cannot order (skewed timestamps in the future) rather than guessing.
    ///
    /// Stored keys cannot be resolved back to a scope, so the sweep prunes
    /// with the longest configured window (route overrides included); the
    /// per-key retain in [`check`](RateLimiter::check) enforces each key's
    /// exact window.
    fn sweep(&self, now: SystemTime) {
        let window = {
            let overrides = self
                .route_limits
                .read()
                .expect("route limit lock poisoned");
            overrides
                .values()
                .map(|(_, w)| *w)
                .fold(self.window, Duration::max)
        };
        let before = self.hits.len();
        self.hits.retain(|_, stamps| {
            stamps.retain(|t| within_window(now, *t, window));
            !stamps.is_empty()
        });
        let swept = before.saturating_sub(self.hits.len());
        if swept > 0 {
            debug!(swept, remaining = self.hits.len(), "swept idle rate limit keys");
        }
    }
}

fn within_window(now: SystemTime, stamp: SystemTime, window: Duration) -> bool {
    match now.duration_since(stamp) {
        Ok(age) => age < window,
        Err(_) => true,
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn check(&self, key: &RateLimitKey) -> Result<RateLimitQuota> {
        let (limit, window) = self.limits_for(key.scope());
        let now = SystemTime::now();

        if self.checks.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            self.sweep(now);
        }

        let mut entry = self.hits.entry(key.storage_key()).or_default();
        entry.retain(|t| within_window(now, *t, window));

        if entry.len() as u32 >= limit {
            let oldest = entry.iter().min().copied().unwrap_or(now);
            let retry_after = (oldest + window)
                .duration_since(now)
                .unwrap_or(Duration::ZERO);
            debug!(
                key = %key.storage_key(),
                limit,
                live_hits = entry.len(),
                retry_after_ms = retry_after.as_millis() as u64,
                "rate limit window full"
            );
            return Err(RouterError::RateLimitExceeded { retry_after });
        }

        entry.push(now);
        let oldest = entry.iter().min().copied().unwrap_or(now);

        Ok(RateLimitQuota {
            limit,
            remaining: limit - entry.len() as u32,
            reset_at: epoch_secs(oldest + window),
        })
    }

    fn set_route_limit(&self, scope: &str, limit: u32, window: Duration) {
        self.route_limits
            .write()
            .expect("route limit lock poisoned")
            .insert(scope.to_string(), (limit.max(1), window));
    }

    fn clear(&self) {
        self.hits.clear();
    }

    fn stats(&self) -> LimiterStats {
        let total_hits = self.hits.iter().map(|e| e.len() as u64).sum();
        LimiterStats {
            entries: self.hits.len(),
            total_hits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> RateLimitKey {
        RateLimitKey::for_path("10.0.0.1", "/api/orders")
    }

    #[test]
    fn denies_when_window_is_full() {
        let limiter = SlidingWindowLimiter::new(2, Duration::from_secs(60));

        assert_eq!(limiter.check(&key()).unwrap().remaining, 1);
        assert_eq!(limiter.check(&key()).unwrap().remaining, 0);

        match limiter.check(&key()) {
            Err(RouterError::RateLimitExceeded { retry_after }) => {
                assert!(retry_after > Duration::ZERO);
            }
            other => panic!("expected rate limit error, got {other:?}"),
        }
    }

    #[test]
    fn budget_frees_as_hits_age_out() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_millis(60));

        limiter.check(&key()).unwrap();
        assert!(limiter.check(&key()).is_err());

        std::thread::sleep(Duration::from_millis(90));
        assert!(limiter.check(&key()).is_ok());
    }

    #[test]
    fn path_keys_hash_consistently() {
        let a = RateLimitKey::for_path("10.0.0.1", "/api/orders");
        let b = RateLimitKey::for_path("10.0.0.1", "/api/orders");
        let c = RateLimitKey::for_path("10.0.0.1", "/api/users");
        assert_eq!(a.storage_key(), b.storage_key());
        assert_ne!(a.storage_key(), c.storage_key());
    }

    #[test]
    fn signature_keys_fold_route_client_and_agent() {
        let a = RateLimitKey::for_signature("throttle", "users_show", "10.0.0.1", "curl/8.0");
        let b = RateLimitKey::for_signature("throttle", "users_show", "10.0.0.1", "curl/8.0");
        let c = RateLimitKey::for_signature("throttle", "users_show", "10.0.0.1", "wget/1.21");
        assert_eq!(a.storage_key(), b.storage_key());
        assert_ne!(a.storage_key(), c.storage_key());
        assert!(a.scope().starts_with("throttle:"));
    }

    #[test]
    fn retry_after_derives_from_oldest_surviving_hit() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_secs(2));
        limiter.check(&key()).unwrap();
        std::thread::sleep(Duration::from_millis(500));

        match limiter.check(&key()) {
            Err(RouterError::RateLimitExceeded { retry_after }) => {
                // oldest + window - now: the window minus the time already waited
                assert!(retry_after >= Duration::from_millis(900), "{retry_after:?}");
                assert!(retry_after <= Duration::from_millis(1600), "{retry_after:?}");
            }
            other => panic!("expected rate limit error, got {other:?}"),
        }
    }

    #[test]
    fn route_override_beats_default() {
        let limiter = SlidingWindowLimiter::new(100, Duration::from_secs(60));
        limiter.set_route_limit("login", 1, Duration::from_secs(60));

        let k = RateLimitKey::for_route("10.0.0.1", "login");
        assert_eq!(limiter.check(&k).unwrap().limit, 1);
        assert!(limiter.check(&k).is_err());
    }

    #[test]
    fn sweep_keeps_charges_inside_an_override_window() {
        let limiter = SlidingWindowLimiter::new(100, Duration::from_millis(50));
        limiter.set_route_limit("login", 2, Duration::from_secs(10));

        let login = RateLimitKey::for_route("10.0.0.1", "login");
        limiter.check(&login).unwrap();
        limiter.check(&login).unwrap();
        assert!(limiter.check(&login).is_err());

        // age past the global window, then force a sweep with unrelated keys
        std::thread::sleep(Duration::from_millis(80));
        for i in 0..SWEEP_INTERVAL {
            let _ = limiter.check(&RateLimitKey::for_route("10.0.0.2", format!("other_{i}")));
        }

        // the login charges live in a 10s window and must survive the sweep
        assert!(limiter.check(&login).is_err());
    }

    #[test]
    fn sweep_drops_idle_keys() {
        let limiter = SlidingWindowLimiter::new(10, Duration::from_millis(20));
        limiter
            .check(&RateLimitKey::for_route("10.0.0.1", "a"))
            .unwrap();
        std::thread::sleep(Duration::from_millis(40));

        limiter.sweep(SystemTime::now());
        assert_eq!(limiter.stats().entries, 0);
    }

    #[test]
    fn stats_count_live_hits() {
        let limiter = SlidingWindowLimiter::new(5, Duration::from_secs(60));
        limiter.check(&key()).unwrap();
        limiter.check(&key()).unwrap();
        limiter
            .check(&RateLimitKey::for_route("10.0.0.2", "other"))
            .unwrap();

        let stats = limiter.stats();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.total_hits, 3);
    }
}
