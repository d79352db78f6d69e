//! Middleware chain composition.

use std::sync::Arc;

use crate::dispatcher::{Request, Response};
use crate::error::Result;

use super::{Handler, Middleware};

/// An ordered middleware chain around a terminal handler.
///
/// `handle` folds right over the registered list, wrapping the terminal in
/// nested continuation objects so that the first-added middleware is
/// outermost. The nesting direction is a contract: middleware run in declared
/// order on the way in and reverse order for post-processing on the way out.
/// The chain is built once per dispatch and immutable while it runs.
#[derive(Default)]
pub struct MiddlewarePipeline {
    middlewares: Vec<Arc<dyn Middleware>>,
}

/// One link of the composed chain: a middleware plus its continuation.
struct Link {
    middleware: Arc<dyn Middleware>,
    next: Arc<dyn Handler>,
}

impl Handler for Link {
    fn call(&self, req: Request) -> Result<Response> {
        self.middleware.handle(req, self.next.as_ref())
    }
}

impl MiddlewarePipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware to the end of the chain.
    pub fn add(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Run a request through the chain into the terminal handler.
    ///
    /// Errors from any middleware or from the terminal propagate to the
    /// caller unless an earlier middleware catches them.
    pub fn handle(&self, req: Request, core: Arc<dyn Handler>) -> Result<Response> {
        let chain = self
            .middlewares
            .iter()
            .rev()
            .fold(core, |next, middleware| {
                Arc::new(Link {
                    middleware: Arc::clone(middleware),
                    next,
                }) as Arc<dyn Handler>
            });
        chain.call(req)
    }
}
