//! # Router Configuration
//!
//! Environment variable-based configuration for the routing engine.
//!
//! ## Environment Variables
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `ROUTIER_CACHE_DIR` | Directory for the disk cache tier; unset means memory-only | unset |
//! | `ROUTIER_MAX_MEMORY_ITEMS` | Memory cache tier capacity | `1000` |
//! | `ROUTIER_MATCH_TTL_SECS` | TTL for memoized match results | `300` |
//! | `ROUTIER_COMPRESSION` | gzip disk cache records (`true`/`false`/`1`/`0`) | `true` |
//! | `ROUTIER_RATE_LIMIT` | Default rate limit per key per window | `60` |
//! | `ROUTIER_RATE_WINDOW_SECS` | Rate limit window length | `60` |
//!
//! ## Usage
//!
//! ```rust
//! use routier::config::RouterConfig;
//!
//! let config = RouterConfig::from_env();
//! println!("memory capacity: {}", config.max_memory_items);
//! ```
//!
//! The config is a plain value; nothing reads the environment after
//! [`RouterConfig::from_env()`] returns, so tests can build one by hand.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::ResultCache;
use crate::error::Result;
use crate::limiter::FixedWindowLimiter;

/// Tunables for caches, match memoization, and rate limiting, loaded once
/// at startup.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Disk cache directory; `None` disables the disk tier
    pub cache_dir: Option<PathBuf>,
    /// Memory cache tier capacity in entries (default 1000)
    pub max_memory_items: usize,
    /// How long memoized match results stay fresh (default 300 s)
    pub match_ttl: Duration,
    /// Whether disk cache records are gzip-compressed (default true)
    pub compression: bool,
    /// Default rate limit per key per window (default 60)
    pub rate_limit: u32,
    /// Rate limit window length (default 60 s)
    pub rate_window: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            max_memory_items: 1000,
            match_ttl: Duration::from_secs(300),
            compression: true,
            rate_limit: 60,
            rate_window: Duration::from_secs(60),
        }
    }
}

impl RouterConfig {
    /// Load configuration from `ROUTIER_*` environment variables, falling
    /// back to the defaults for anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cache_dir = env::var("ROUTIER_CACHE_DIR")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let max_memory_items = env::var("ROUTIER_MAX_MEMORY_ITEMS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_memory_items);

        let match_ttl = env::var("ROUTIER_MATCH_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.match_ttl);

        let compression = env::var("ROUTIER_COMPRESSION")
            .ok()
            .and_then(|v| parse_bool(&v))
            .unwrap_or(defaults.compression);

        let rate_limit = env::var("ROUTIER_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.rate_limit);

        let rate_window = env::var("ROUTIER_RATE_WINDOW_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.rate_window);

        Self {
            cache_dir,
            max_memory_items,
            match_ttl,
            compression,
            rate_limit,
            rate_window,
        }
    }

    /// Build the result cache this configuration describes: disk-backed when
    /// `cache_dir` is set, memory-only otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::CacheUnavailable`](crate::RouterError::CacheUnavailable)
    /// if the cache directory cannot be created.
    pub fn build_cache(&self) -> Result<ResultCache> {
        match &self.cache_dir {
            Some(dir) => ResultCache::with_disk(self.max_memory_items, dir, self.compression),
            None => Ok(ResultCache::memory_only(self.max_memory_items)),
        }
    }

    /// Build a fixed-window limiter with the configured default limit and
    /// window.
    #[must_use]
    pub fn build_limiter(&self) -> FixedWindowLimiter {
        FixedWindowLimiter::new(self.rate_limit, self.rate_window)
    }
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
