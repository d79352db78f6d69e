use crate::dispatcher::{Request, Response};
use crate::error::Result;

/// A terminal request handler.
///
/// Implemented for any `Fn(Request) -> Result<Response>` closure, so tests
/// and simple endpoints need no dedicated type.
pub trait Handler: Send + Sync {
    fn call(&self, req: Request) -> Result<Response>;
}

impl<F> Handler for F
where
    F: Fn(Request) -> Result<Response> + Send + Sync,
{
    fn call(&self, req: Request) -> Result<Response> {
        self(req)
    }
}

/// An interceptor wrapped around a handler.
///
/// An implementation may call `next` once and pass the result through
/// (possibly transformed), call `next` and augment what comes back, or not
/// call `next` at all and short-circuit with its own result or error. The
/// terminal handler runs at most once per dispatch, and only if every
/// middleware before it calls `next`.
pub trait Middleware: Send + Sync {
    fn handle(&self, req: Request, next: &dyn Handler) -> Result<Response>;
}
