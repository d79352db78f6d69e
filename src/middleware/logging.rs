use std::time::Instant;

use tracing::{info, warn};

use crate::dispatcher::{Request, Response};
use crate::error::Result;

use super::{Handler, Middleware};

/// Structured request/response logging.
///
/// Passive: never blocks or rewrites a request. Logs one line on the way in
/// and one with the status and latency on the way out; errors are logged and
/// re-propagated untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingMiddleware;

impl Middleware for LoggingMiddleware {
    fn handle(&self, req: Request, next: &dyn Handler) -> Result<Response> {
        let method = req.method.clone();
        let path = req.path.clone();
        info!(method = %method, path = %path, "Request received");

        let start = Instant::now();
        match next.call(req) {
            Ok(res) => {
                info!(
                    method = %method,
                    path = %path,
                    status = res.status,
                    duration_us = start.elapsed().as_micros(),
                    "Request completed"
                );
                Ok(res)
            }
            Err(e) => {
                warn!(
                    method = %method,
                    path = %path,
                    error = %e,
                    duration_us = start.elapsed().as_micros(),
                    "Request failed"
                );
                Err(e)
            }
        }
    }
}
