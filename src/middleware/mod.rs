//! # Middleware
//!
//! The [`Handler`] and [`Middleware`] traits, the [`MiddlewarePipeline`]
//! that composes an ordered chain of interceptors around a terminal handler,
//! and the built-in logging and rate-limit middleware.

mod core;
mod logging;
mod pipeline;
mod rate_limit;

pub use core::{Handler, Middleware};
pub use logging::LoggingMiddleware;
pub use pipeline::MiddlewarePipeline;
pub use rate_limit::{KeyStrategy, RateLimitMiddleware};
