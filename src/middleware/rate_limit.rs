use std::sync::Arc;

use tracing::debug;

use crate::dispatcher::{Request, Response};
use crate::error::Result;
use crate::limiter::{RateLimitKey, RateLimiter};

use super::core::{Handler, Middleware};

/// How requests are grouped into rate limit keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum KeyStrategy {
    /// Client address plus the matched route name. Requests that reached the
    /// pipeline without a route name fall back to the path hash.
    #[default]
    RouteName,
    /// Client address plus a hash of the request path.
    PathHash,
    /// Hash of `route|client|user_agent` under a fixed prefix, so one client
    /// presenting different user agents gets separate budgets. Requests
    /// without a route name use the path as the route component.
    Signature { prefix: String },
}

/// Applies a [`RateLimiter`] to requests flowing through the pipeline.
///
/// Excluded paths (prefix match) and excluded clients bypass the limiter
/// without touching any counter. Admitted responses carry the
/// `X-RateLimit-Limit`, `X-RateLimit-Remaining` and `X-RateLimit-Reset`
/// headers; denials surface as
/// [`RouterError::RateLimitExceeded`](crate::RouterError::RateLimitExceeded)
/// and the charge for the attempt stands.
pub struct RateLimitMiddleware {
    limiter: Arc<dyn RateLimiter>,
    strategy: KeyStrategy,
    excluded_paths: Vec<String>,
    excluded_clients: Vec<String>,
}

impl RateLimitMiddleware {
    pub fn new(limiter: Arc<dyn RateLimiter>) -> Self {
        Self {
            limiter,
            strategy: KeyStrategy::default(),
            excluded_paths: Vec::new(),
            excluded_clients: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: KeyStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Requests whose path starts with `prefix` are never counted.
    #[must_use]
    pub fn exclude_path(mut self, prefix: impl Into<String>) -> Self {
        self.excluded_paths.push(prefix.into());
        self
    }

    /// Requests from this client address are never counted.
    #[must_use]
    pub fn exclude_client(mut self, client: impl Into<String>) -> Self {
        self.excluded_clients.push(client.into());
        self
    }

    fn is_excluded(&self, req: &Request) -> bool {
        if self
            .excluded_paths
            .iter()
            .any(|p| req.path.starts_with(p.as_str()))
        {
            return true;
        }
        self.excluded_clients.iter().any(|c| c == &req.client_ip)
    }

    fn key_for(&self, req: &Request) -> RateLimitKey {
        match (&self.strategy, req.route_name.as_deref()) {
            (KeyStrategy::RouteName, Some(route)) => {
                RateLimitKey::for_route(req.client_ip.clone(), route)
            }
            (KeyStrategy::Signature { prefix }, route) => RateLimitKey::for_signature(
                prefix,
                route.unwrap_or(&req.path),
                req.client_ip.clone(),
                req.header("user-agent").unwrap_or(""),
            ),
            _ => RateLimitKey::for_path(req.client_ip.clone(), &req.path),
        }
    }
}

impl Middleware for RateLimitMiddleware {
    fn handle(&self, req: Request, next: &dyn Handler) -> Result<Response> {
        if self.is_excluded(&req) {
            debug!(path = %req.path, client = %req.client_ip, "rate limit bypassed");
            return next.call(req);
        }

        let key = self.key_for(&req);
        // Charge before the handler runs; a handler error does not refund.
        let quota = self.limiter.check(&key)?;

        let response = next.call(req)?;
        Ok(response
            .with_header("X-RateLimit-Limit", quota.limit.to_string())
            .with_header("X-RateLimit-Remaining", quota.remaining.to_string())
            .with_header("X-RateLimit-Reset", quota.reset_at.to_string()))
    }
}
