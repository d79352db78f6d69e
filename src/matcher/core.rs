//! Match engine core - hot path for request matching.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::cache::ResultCache;
use crate::error::{Result, RouterError};
use crate::pattern::PatternCompiler;
use crate::registry::RouteRegistry;
use crate::route::Route;

/// Synthetic parameter key carrying the matched route's name.
pub const ROUTE_PARAM: &str = "_route";

/// Default TTL for memoized match results.
const DEFAULT_MATCH_TTL: Duration = Duration::from_secs(300);

/// Result of successfully matching a request against the registry.
///
/// `params` merges, lowest to highest precedence: the route's defaults, the
/// non-empty named captures from the pattern, and the synthetic
/// [`ROUTE_PARAM`] key. An empty captured segment never overrides a default.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// Name the route was registered under
    pub route_name: String,
    /// The matched route definition
    pub route: Arc<Route>,
    /// Merged parameters (defaults, captures, `_route`)
    pub params: HashMap<String, Value>,
}

impl RouteMatch {
    /// Get a parameter as a string, if it is one.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(Value::as_str)
    }
}

/// Matches requests against a read-only route registry.
///
/// The registry is immutable after construction; the engine's only mutable
/// state lives in the pattern compiler's cache and the shared result cache,
/// both safe for concurrent use.
pub struct MatchEngine {
    registry: Arc<RouteRegistry>,
    compiler: PatternCompiler,
    cache: Arc<ResultCache>,
    match_ttl: Duration,
}

impl MatchEngine {
    /// Create an engine over a finalized registry and an explicit cache.
    #[must_use]
    pub fn new(registry: Arc<RouteRegistry>, cache: Arc<ResultCache>) -> Self {
        Self {
            registry,
            compiler: PatternCompiler::new(),
            cache,
            match_ttl: DEFAULT_MATCH_TTL,
        }
    }

    /// Override the TTL used for memoized match results.
    #[must_use]
    pub fn with_match_ttl(mut self, ttl: Duration) -> Self {
        self.match_ttl = ttl;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &RouteRegistry {
        &self.registry
    }

    /// Match a request against the registry.
    ///
    /// # Errors
    ///
    /// * [`RouterError::NotFound`] if no route's pattern matched the path at
    ///   all, or every pattern hit was skipped on scheme/host grounds.
    /// * [`RouterError::MethodNotAllowed`] if at least one pattern matched
    ///   but no route accepted the method; `allowed` is the de-duplicated
    ///   union of the methods of every pattern-matching route.
    /// * [`RouterError::InvalidRoutePattern`] if a registered route's
    ///   template fails to compile (a setup defect surfacing late).
    pub fn match_request(
        &self,
        path: &str,
        method: &Method,
        scheme: &str,
        host: &str,
    ) -> Result<RouteMatch> {
        debug!(method = %method, path = %path, scheme = %scheme, host = %host, "Route match attempt");
        let match_start = Instant::now();

        let cache_key = format!("match:{method}:{scheme}:{host}:{path}");
        if let Some(found) = self.lookup_memoized(&cache_key) {
            debug!(method = %method, path = %path, route = %found.route_name, "Match served from result cache");
            return Ok(found);
        }

        let scheme = scheme.to_ascii_lowercase();
        let mut allowed: Vec<String> = Vec::new();

        for (name, route) in self.registry.all() {
            let compiled = self.compiler.compile(route)?;
            let Some(captures) = compiled.match_path(path) else {
                continue;
            };

            if !route.allows_method(method.as_str()) {
                // keep scanning: a later route with the same path but a
                // matching method must still win over a 405
                for m in route.methods() {
                    if !allowed.contains(m) {
                        allowed.push(m.clone());
                    }
                }
                continue;
            }

            if !route.allows_scheme(&scheme) || !route.matches_host(host) {
                continue;
            }

            let mut params = route.defaults().clone();
            for (key, value) in captures {
                if !value.is_empty() {
                    params.insert(key, Value::String(value));
                }
            }
            params.insert(ROUTE_PARAM.to_string(), Value::String(name.to_string()));

            info!(
                method = %method,
                path = %path,
                route = %name,
                pattern = %compiled.pattern_text(),
                duration_us = match_start.elapsed().as_micros(),
                "Route matched"
            );

            self.memoize(&cache_key, name, &params);
            return Ok(RouteMatch {
                route_name: name.to_string(),
                route: Arc::clone(route),
                params,
            });
        }

        if !allowed.is_empty() {
            warn!(
                method = %method,
                path = %path,
                allowed = ?allowed,
                "Path matched but method not allowed"
            );
            return Err(RouterError::MethodNotAllowed { allowed });
        }

        warn!(
            method = %method,
            path = %path,
            duration_us = match_start.elapsed().as_micros(),
            "No route matched"
        );
        Err(RouterError::NotFound {
            path: path.to_string(),
        })
    }

    fn lookup_memoized(&self, cache_key: &str) -> Option<RouteMatch> {
        let value = self.cache.get(cache_key)?;
        let route_name = value.get("route")?.as_str()?.to_string();
        // a persisted record may predate this registry (same cache dir,
        // different route table); unknown names fall through to a full scan
        let route = self.registry.get(&route_name)?;
        let params: HashMap<String, Value> =
            serde_json::from_value(value.get("params")?.clone()).ok()?;
        Some(RouteMatch {
            route_name,
            route: Arc::clone(route),
            params,
        })
    }

    fn memoize(&self, cache_key: &str, route_name: &str, params: &HashMap<String, Value>) {
        self.cache.set(
            cache_key,
            json!({ "route": route_name, "params": params }),
            self.match_ttl,
        );
    }
}
