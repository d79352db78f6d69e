//! Route definitions.
//!
//! A [`Route`] describes one routable endpoint: a path template with `{name}`
//! placeholders, per-placeholder regex requirements, default parameters, and
//! the method/scheme/host constraints checked during matching. Routes are
//! built at startup and treated as read-only once registered.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Description of one routable endpoint.
///
/// The path is normalized to start with `/` on construction and on every
/// mutation. Methods are stored uppercase, schemes lowercase; empty sets mean
/// "no constraint". `defaults` are merged into every successful match at the
/// lowest precedence and conventionally carry the opaque `_handler` key the
/// dispatcher resolves to a callable.
///
/// # Example
///
/// ```
/// use routier::Route;
/// use serde_json::json;
///
/// let route = Route::new("/articles/{id}")
///     .with_requirement("id", r"\d+")
///     .with_default("_handler", json!("show_article"))
///     .with_methods(["GET", "HEAD"]);
/// assert_eq!(route.path(), "/articles/{id}");
/// assert!(route.allows_method("GET"));
/// assert!(!route.allows_method("POST"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    path: String,
    #[serde(default)]
    defaults: HashMap<String, Value>,
    #[serde(default)]
    requirements: BTreeMap<String, String>,
    #[serde(default)]
    methods: Vec<String>,
    #[serde(default)]
    schemes: Vec<String>,
    #[serde(default)]
    host: String,
    #[serde(default)]
    middleware: Vec<String>,
}

fn normalize_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

impl Route {
    /// Create a route for the given path template.
    pub fn new(path: impl AsRef<str>) -> Self {
        Self {
            path: normalize_path(path.as_ref()),
            defaults: HashMap::new(),
            requirements: BTreeMap::new(),
            methods: Vec::new(),
            schemes: Vec::new(),
            host: String::new(),
            middleware: Vec::new(),
        }
    }

    /// The normalized path template.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Replace the path template (re-normalized).
    pub fn set_path(&mut self, path: impl AsRef<str>) -> &mut Self {
        self.path = normalize_path(path.as_ref());
        self
    }

    /// Default parameters merged into every successful match.
    #[must_use]
    pub fn defaults(&self) -> &HashMap<String, Value> {
        &self.defaults
    }

    pub fn set_defaults(&mut self, defaults: HashMap<String, Value>) -> &mut Self {
        self.defaults = defaults;
        self
    }

    pub fn add_default(&mut self, name: impl Into<String>, value: Value) -> &mut Self {
        self.defaults.insert(name.into(), value);
        self
    }

    /// Builder-style variant of [`add_default`](Self::add_default).
    #[must_use]
    pub fn with_default(mut self, name: impl Into<String>, value: Value) -> Self {
        self.defaults.insert(name.into(), value);
        self
    }

    /// Per-placeholder regex fragments constraining what a segment may match.
    #[must_use]
    pub fn requirements(&self) -> &BTreeMap<String, String> {
        &self.requirements
    }

    pub fn set_requirements(&mut self, requirements: BTreeMap<String, String>) -> &mut Self {
        self.requirements = requirements;
        self
    }

    pub fn add_requirement(
        &mut self,
        name: impl Into<String>,
        requirement: impl Into<String>,
    ) -> &mut Self {
        self.requirements.insert(name.into(), requirement.into());
        self
    }

    /// Builder-style variant of [`add_requirement`](Self::add_requirement).
    #[must_use]
    pub fn with_requirement(
        mut self,
        name: impl Into<String>,
        requirement: impl Into<String>,
    ) -> Self {
        self.requirements.insert(name.into(), requirement.into());
        self
    }

    /// Allowed methods, uppercase. Empty means any method.
    #[must_use]
    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    pub fn set_methods<I, S>(&mut self, methods: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.methods = methods
            .into_iter()
            .map(|m| m.as_ref().to_ascii_uppercase())
            .collect();
        self
    }

    /// Builder-style variant of [`set_methods`](Self::set_methods).
    #[must_use]
    pub fn with_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set_methods(methods);
        self
    }

    /// Whether this route accepts the given request method.
    #[must_use]
    pub fn allows_method(&self, method: &str) -> bool {
        self.methods.is_empty()
            || self
                .methods
                .iter()
                .any(|m| m.eq_ignore_ascii_case(method))
    }

    /// Allowed schemes, lowercase. Empty means any scheme.
    #[must_use]
    pub fn schemes(&self) -> &[String] {
        &self.schemes
    }

    pub fn set_schemes<I, S>(&mut self, schemes: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.schemes = schemes
            .into_iter()
            .map(|s| s.as_ref().to_ascii_lowercase())
            .collect();
        self
    }

    /// Builder-style variant of [`set_schemes`](Self::set_schemes).
    #[must_use]
    pub fn with_schemes<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set_schemes(schemes);
        self
    }

    /// Whether this route accepts the given request scheme.
    #[must_use]
    pub fn allows_scheme(&self, scheme: &str) -> bool {
        self.schemes.is_empty()
            || self
                .schemes
                .iter()
                .any(|s| s.eq_ignore_ascii_case(scheme))
    }

    /// Host constraint; empty means any host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn set_host(&mut self, host: impl Into<String>) -> &mut Self {
        self.host = host.into();
        self
    }

    /// Builder-style variant of [`set_host`](Self::set_host).
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Whether this route accepts the given request host (exact match).
    #[must_use]
    pub fn matches_host(&self, host: &str) -> bool {
        self.host.is_empty() || self.host == host
    }

    /// Ordered middleware names applied around this route's handler.
    #[must_use]
    pub fn middleware(&self) -> &[String] {
        &self.middleware
    }

    pub fn set_middleware<I, S>(&mut self, middleware: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.middleware = middleware.into_iter().map(Into::into).collect();
        self
    }

    /// Append a middleware name, ignoring duplicates.
    pub fn add_middleware(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        if !self.middleware.contains(&name) {
            self.middleware.push(name);
        }
        self
    }

    /// Builder-style variant of [`add_middleware`](Self::add_middleware).
    #[must_use]
    pub fn with_middleware(mut self, name: impl Into<String>) -> Self {
        self.add_middleware(name);
        self
    }
}
