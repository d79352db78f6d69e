//! Error types for routier.
//!
//! Per-request conditions (no match, wrong method, rate limited) are ordinary
//! variants that callers inspect and map to transport status codes. Setup-time
//! conditions (duplicate names, malformed patterns) are returned from the
//! registry and compiler and are never silently swallowed.

use std::time::Duration;

use thiserror::Error;

/// Main error type for routier
#[derive(Debug, Error)]
pub enum RouterError {
    /// A route with the same name is already registered.
    #[error("route \"{0}\" already exists")]
    DuplicateRoute(String),

    /// The path template or one of its requirements cannot be compiled.
    #[error("invalid route pattern: {0}")]
    InvalidRoutePattern(String),

    /// No registered pattern matched the request path.
    #[error("no route found for path \"{path}\"")]
    NotFound { path: String },

    /// A pattern matched the path but no route accepted the request method.
    #[error("method not allowed; allowed methods: {}", allowed.join(", "))]
    MethodNotAllowed { allowed: Vec<String> },

    /// The rate limit window for this key is exhausted.
    #[error("rate limit exceeded, retry after {} seconds", retry_after.as_secs())]
    RateLimitExceeded { retry_after: Duration },

    /// A route's defaults name a handler that was never registered.
    #[error("unknown handler \"{0}\"")]
    UnknownHandler(String),

    /// A route names a middleware that was never registered.
    #[error("unknown middleware \"{0}\"")]
    UnknownMiddleware(String),

    /// The persistent cache tier cannot be used at all (e.g. the cache
    /// directory is unreadable). Per-record I/O errors never surface here;
    /// they degrade to memory-only operation.
    #[error("persistent cache unavailable: {0}")]
    CacheUnavailable(String),

    /// A terminal handler or middleware failed.
    #[error("handler error: {0}")]
    Handler(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl RouterError {
    /// Wrap an arbitrary handler failure.
    pub fn handler<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RouterError::Handler(Box::new(err))
    }

    /// The conventional HTTP status code for this error.
    ///
    /// Setup-time errors map to 500 since they should never reach a client.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            RouterError::NotFound { .. } | RouterError::UnknownHandler(_) => 404,
            RouterError::MethodNotAllowed { .. } => 405,
            RouterError::RateLimitExceeded { .. } => 429,
            _ => 500,
        }
    }
}

/// Result type alias for routier
pub type Result<T> = std::result::Result<T, RouterError>;
