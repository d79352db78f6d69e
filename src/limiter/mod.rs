//! # Rate Limiting
//!
//! Window-based admission control shared across concurrent requests.
//!
//! Two interchangeable policies implement the [`RateLimiter`] trait:
//!
//! - [`FixedWindowLimiter`]: one counter per key, reset at a fixed interval.
//! - [`SlidingWindowLimiter`]: per-key hit timestamps aged out continuously.
//!
//! Both are keyed by a composite [`RateLimitKey`] (client address plus route
//! name or path hash), support per-route limit overrides layered over a
//! global default, and keep their counters in a concurrent map so racing
//! increments to the same key cannot both slip past the limit.
//!
//! Admission charges the counter before the terminal handler runs and is
//! never rolled back; a cancelled dispatch still pays for the attempt.

mod fixed;
mod sliding;

use sha2::{Digest, Sha256};

use crate::error::Result;

pub use fixed::FixedWindowLimiter;
pub use sliding::SlidingWindowLimiter;

/// Composite identity a limit is tracked under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    client: String,
    scope: String,
}

impl RateLimitKey {
    /// Key on the client address and a route name.
    pub fn for_route(client: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            client: client.into(),
            scope: route.into(),
        }
    }

    /// Key on the client address and a hash of the request path.
    pub fn for_path(client: impl Into<String>, path: &str) -> Self {
        let digest = Sha256::digest(path.as_bytes());
        let hash: String = format!("{digest:x}").chars().take(16).collect();
        Self {
            client: client.into(),
            scope: hash,
        }
    }

    /// Key on a hashed request signature (`route|client|user_agent`) under a
    /// configurable prefix.
    pub fn for_signature(
        prefix: &str,
        route: &str,
        client: impl Into<String>,
        user_agent: &str,
    ) -> Self {
        let client = client.into();
        let digest = Sha256::digest(format!("{route}|{client}|{user_agent}").as_bytes());
        Self {
            client,
            scope: format!("{prefix}:{digest:x}"),
        }
    }

    /// The scope component (route name, path hash, or signature) used for
    /// per-route overrides.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// The flat key counters are stored under.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!("{}:{}", self.client, self.scope)
    }
}

/// What a successful admission leaves the caller with.
///
/// `reset_at` is epoch seconds; callers surface these as the
/// `X-RateLimit-*` response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitQuota {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: u64,
}

/// Counter statistics snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct LimiterStats {
    /// Live keys with at least one tracked hit
    pub entries: usize,
    /// Hits currently counted across all keys
    pub total_hits: u64,
}

/// A window-based admission policy.
pub trait RateLimiter: Send + Sync {
    /// Admit or deny one request for the given key.
    ///
    /// Admission commits the charge immediately.
    ///
    /// # Errors
    ///
    /// [`RouterError::RateLimitExceeded`](crate::RouterError::RateLimitExceeded)
    /// with the time until the key has budget again.
    fn check(&self, key: &RateLimitKey) -> Result<RateLimitQuota>;

    /// Layer a per-route (scope) limit over the global default.
    fn set_route_limit(&self, scope: &str, limit: u32, window: std::time::Duration);

    /// Drop all counters.
    fn clear(&self);

    fn stats(&self) -> LimiterStats;
}
