//! # Match Engine
//!
//! Evaluates a request (path, method, scheme, host) against the route
//! registry and returns the matched route's parameters, or a typed miss.
//!
//! ## Algorithm
//!
//! Routes are scanned in registration order; the first route whose compiled
//! pattern matches the path *and* whose method/scheme/host constraints all
//! pass wins. That makes matching order-sensitive by contract: callers who
//! rely on specificity must register the more specific route first.
//!
//! A pattern hit with a method mismatch does not end the scan; the route's
//! methods are collected so that an exhausted scan can report
//! `MethodNotAllowed` with the full `Allow` list. Scheme and host mismatches
//! are hard skips and never contribute to that list.
//!
//! Compiled patterns are cached inside the [`PatternCompiler`](crate::pattern::PatternCompiler)
//! and successful match results are memoized through the engine's
//! [`ResultCache`](crate::cache::ResultCache) handle; both caches are
//! explicitly owned, never process-wide statics.

mod core;

pub use core::{MatchEngine, RouteMatch};
