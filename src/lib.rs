//! # Routier
//!
//! **Routier** is a route matching and dispatch engine for Rust: named route
//! definitions with typed placeholders are compiled to anchored regexes,
//! matched against inbound requests, and dispatched through a composable
//! middleware pipeline with built-in result caching and rate limiting.
//!
//! ## Overview
//!
//! Routes are declared as path templates (`/articles/{id}/comments/{page}`)
//! with optional per-placeholder requirements, default parameter values,
//! method, scheme, and host constraints, and a list of middleware names.
//! The engine resolves a request to the first registered route that accepts
//! it, merges defaults with captured parameters, and runs the request through
//! the route's middleware chain to its terminal handler.
//!
//! ## Architecture
//!
//! - **[`route`]** - Route definitions: path templates, requirements,
//!   defaults, method/scheme/host constraints
//! - **[`pattern`]** - Placeholder-to-regex compilation with a shared
//!   compiled-pattern cache
//! - **[`registry`]** - Named, insertion-ordered route collection
//! - **[`matcher`]** - The ordered-scan match engine with memoized results
//!   and `405 Method Not Allowed` accumulation
//! - **[`cache`]** - Two-tier (memory + disk) result cache with TTL
//!   expiration, gzip disk records, and chunked route table persistence
//! - **[`middleware`]** - Handler/middleware traits, the fold-based
//!   pipeline, logging and rate-limit middleware
//! - **[`limiter`]** - Fixed- and sliding-window rate limiters keyed by
//!   client and route
//! - **[`dispatcher`]** - Request/response types and end-to-end dispatch
//! - **[`config`]** - Environment variable configuration (`ROUTIER_*`)
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use http::Method;
//! use serde_json::json;
//! use routier::{
//!     Dispatcher, MatchEngine, Request, Response, ResultCache, Route, RouteRegistry,
//! };
//!
//! # fn main() -> routier::Result<()> {
//! let mut registry = RouteRegistry::new();
//! registry.add(
//!     "article_show",
//!     Route::new("/articles/{id}")
//!         .with_requirement("id", r"\d+")
//!         .with_default("_handler", json!("show_article"))
//!         .with_methods(["GET"]),
//! )?;
//!
//! let cache = Arc::new(ResultCache::memory_only(1000));
//! let engine = MatchEngine::new(Arc::new(registry), cache);
//!
//! let mut dispatcher = Dispatcher::new(engine);
//! dispatcher.register_handler("show_article", Arc::new(|req: Request| {
//!     Ok(Response::ok(json!({ "article": req.param("id") })))
//! }));
//!
//! let response = dispatcher.dispatch(Request::new(Method::GET, "/articles/42"))?;
//! assert_eq!(response.status, 200);
//! # Ok(())
//! # }
//! ```
//!
//! ## Match Semantics
//!
//! - Routes are tried in registration order; the first full acceptance wins,
//!   even if a later route is more specific.
//! - A pattern that matches but fails the method check contributes its
//!   methods to a `MethodNotAllowed` error; scheme and host mismatches do
//!   not, and fall through to `NotFound`.
//! - Defaults apply when a placeholder captures nothing; captured values
//!   always win otherwise. Every successful match also carries the route
//!   name under the `_route` parameter.
//!
//! ## Caching and Rate Limiting
//!
//! Match results, compiled patterns, and route tables are cached in explicit
//! owned [`ResultCache`] / [`PatternCompiler`](pattern::PatternCompiler)
//! values handed to the engine; there is no process-global state, so two
//! engines in one process never share or clobber each other's entries.
//! Rate limiting charges on attempt: a denied or abandoned dispatch keeps
//! its counter increment.

pub mod cache;
pub mod config;
pub mod dispatcher;
mod error;
pub mod limiter;
pub mod matcher;
pub mod middleware;
pub mod pattern;
pub mod registry;
pub mod route;

pub use cache::{CacheStats, ResultCache};
pub use config::RouterConfig;
pub use dispatcher::{Dispatcher, Request, Response, HANDLER_PARAM};
pub use error::{Result, RouterError};
pub use limiter::{
    FixedWindowLimiter, LimiterStats, RateLimitKey, RateLimitQuota, RateLimiter,
    SlidingWindowLimiter,
};
pub use matcher::{MatchEngine, RouteMatch};
pub use middleware::{
    Handler, KeyStrategy, LoggingMiddleware, Middleware, MiddlewarePipeline, RateLimitMiddleware,
};
pub use pattern::{CompiledPattern, ParamVec, PatternCompiler};
pub use registry::RouteRegistry;
pub use route::Route;
