//! # Dispatcher Module
//!
//! One end-to-end dispatch: match the request, inject the matched parameters,
//! resolve the route's opaque handler key to a registered callable, and run
//! the global plus route-declared middleware around it.
//!
//! Handlers are registered by name in a typed registry: route defaults carry
//! the `_handler` key and the dispatcher maps it to an
//! [`Handler`](crate::middleware::Handler); the core never learns how
//! handlers are constructed.

mod core;

pub use core::{Dispatcher, Request, Response, HANDLER_PARAM};
