//! Dispatcher core - request/response types and the dispatch loop.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, RouterError};
use crate::matcher::{MatchEngine, RouteMatch};
use crate::middleware::{Handler, Middleware, MiddlewarePipeline};

/// Defaults key naming the handler a route dispatches to.
pub const HANDLER_PARAM: &str = "_handler";

/// One inbound request as the engine sees it.
///
/// Transport concerns (body parsing, content negotiation, TLS) are the
/// caller's responsibility; the engine only needs the routing tuple, the
/// client identity for rate limiting, and a place to carry matched params.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method (GET, POST, ...)
    pub method: Method,
    /// Request path, e.g. `/articles/42`
    pub path: String,
    /// Request scheme, lowercase (`http`, `https`)
    pub scheme: String,
    /// Request host, empty when unknown
    pub host: String,
    /// Client address, used for rate-limit keys
    pub client_ip: String,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Parameters injected after a successful match (defaults, captures, `_route`)
    pub params: HashMap<String, Value>,
    /// Name of the matched route, populated by the dispatcher
    pub route_name: Option<String>,
    /// Request body parsed by the caller, if any
    pub body: Option<Value>,
}

impl Request {
    /// Create a request with the given method and path; scheme defaults to
    /// `http`, everything else empty.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            scheme: "http".to_string(),
            host: String::new(),
            client_ip: String::new(),
            headers: HashMap::new(),
            params: HashMap::new(),
            route_name: None,
            body: None,
        }
    }

    #[must_use]
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = ip.into();
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Get a header by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get a matched parameter as a string, if it is one.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(Value::as_str)
    }
}

/// Response produced by a handler or middleware.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Value,
}

impl Response {
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Value::Null,
        }
    }

    /// A 200 response with a JSON body.
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self::json(200, body)
    }

    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            status,
            headers,
            body,
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Runs matched requests through their middleware chain and handler.
///
/// Owns an explicit [`MatchEngine`], a typed handler registry, and a named
/// middleware registry; a route's `middleware` list is resolved against the
/// latter at dispatch time. Global middleware wraps every route's chain,
/// outermost first.
pub struct Dispatcher {
    engine: MatchEngine,
    handlers: HashMap<String, Arc<dyn Handler>>,
    named_middleware: HashMap<String, Arc<dyn Middleware>>,
    global_middleware: Vec<Arc<dyn Middleware>>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(engine: MatchEngine) -> Self {
        Self {
            engine,
            handlers: HashMap::new(),
            named_middleware: HashMap::new(),
            global_middleware: Vec::new(),
        }
    }

    #[must_use]
    pub fn engine(&self) -> &MatchEngine {
        &self.engine
    }

    /// Register a terminal handler under the key routes reference via the
    /// `_handler` default.
    pub fn register_handler(&mut self, name: impl Into<String>, handler: Arc<dyn Handler>) {
        let name = name.into();
        debug!(handler = %name, "Handler registered");
        self.handlers.insert(name, handler);
    }

    /// Register a middleware under the name routes reference in their
    /// `middleware` list.
    pub fn register_middleware(&mut self, name: impl Into<String>, mw: Arc<dyn Middleware>) {
        let name = name.into();
        debug!(middleware = %name, "Middleware registered");
        self.named_middleware.insert(name, mw);
    }

    /// Add a middleware that wraps every dispatch, before any route-declared
    /// middleware.
    pub fn add_global_middleware(&mut self, mw: Arc<dyn Middleware>) {
        self.global_middleware.push(mw);
    }

    /// Dispatch one request end to end.
    ///
    /// Until the terminal handler is reached the only committed side effects
    /// are rate-limiter charges made by middleware; an abandoned dispatch
    /// rolls back nothing else because nothing else was done.
    ///
    /// # Errors
    ///
    /// Match misses surface as [`RouterError::NotFound`] /
    /// [`RouterError::MethodNotAllowed`]; an unregistered handler or
    /// middleware name is [`RouterError::UnknownHandler`] /
    /// [`RouterError::UnknownMiddleware`]; anything raised inside the chain
    /// propagates unless a middleware catches it.
    pub fn dispatch(&self, mut req: Request) -> Result<Response> {
        let matched = self.engine.match_request(
            &req.path,
            &req.method,
            &req.scheme,
            &req.host,
        )?;

        let handler = self.resolve_handler(&matched)?;
        let pipeline = self.build_pipeline(&matched)?;

        req.params = matched.params;
        req.route_name = Some(matched.route_name);

        pipeline.handle(req, handler)
    }

    fn resolve_handler(&self, matched: &RouteMatch) -> Result<Arc<dyn Handler>> {
        let key = matched
            .params
            .get(HANDLER_PARAM)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                warn!(route = %matched.route_name, "Route has no handler default");
                RouterError::UnknownHandler(matched.route_name.clone())
            })?;
        self.handlers
            .get(key)
            .map(Arc::clone)
            .ok_or_else(|| RouterError::UnknownHandler(key.to_string()))
    }

    fn build_pipeline(&self, matched: &RouteMatch) -> Result<MiddlewarePipeline> {
        let mut pipeline = MiddlewarePipeline::new();
        for mw in &self.global_middleware {
            pipeline.add(Arc::clone(mw));
        }
        for name in matched.route.middleware() {
            let mw = self
                .named_middleware
                .get(name)
                .ok_or_else(|| RouterError::UnknownMiddleware(name.clone()))?;
            pipeline.add(Arc::clone(mw));
        }
        Ok(pipeline)
    }
}
