//! Path template compilation.
//!
//! Turns a route's path template plus its per-placeholder requirements into
//! an anchored regex matcher. Compilation is pure and deterministic: the same
//! `(path, requirements)` pair always produces the same pattern text, which is
//! what makes pattern text usable as a cache key.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;
use tracing::debug;

use crate::error::{Result, RouterError};
use crate::route::Route;

/// Maximum number of path parameters before captures spill to the heap.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated capture storage for the matching hot path.
pub type ParamVec = SmallVec<[(String, String); MAX_INLINE_PARAMS]>;

/// Segment body used for placeholders without an explicit requirement.
const DEFAULT_REQUIREMENT: &str = "[^/]+";

static GROUP_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"));

/// A compiled, anchored route matcher.
///
/// Owned by the [`PatternCompiler`]; callers obtain instances through
/// [`PatternCompiler::compile`] and never construct them directly.
#[derive(Debug)]
pub struct CompiledPattern {
    regex: Regex,
    pattern_text: String,
    param_names: Vec<String>,
}

impl CompiledPattern {
    /// The anchored pattern text this matcher was compiled from.
    ///
    /// Stable across compilations of the same `(path, requirements)` pair.
    #[must_use]
    pub fn pattern_text(&self) -> &str {
        &self.pattern_text
    }

    /// Ordered names of the capture groups in the pattern.
    #[must_use]
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Test a request path against this pattern.
    ///
    /// Returns the named captures in template order on a hit, `None` on a
    /// miss. Empty captures are included here; the match engine decides
    /// whether they may override defaults.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<ParamVec> {
        let caps = self.regex.captures(path)?;
        let mut params = ParamVec::new();
        for name in &self.param_names {
            if let Some(m) = caps.name(name) {
                params.push((name.clone(), m.as_str().to_string()));
            }
        }
        Some(params)
    }
}

enum Token<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

/// Split a path template into literal and placeholder tokens.
///
/// Fails on unbalanced or nested braces and on placeholder names that are not
/// valid capture group names.
fn tokenize(path: &str) -> Result<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut rest = path;
    while !rest.is_empty() {
        match rest.find('{') {
            Some(open) => {
                if open > 0 {
                    let literal = &rest[..open];
                    if literal.contains('}') {
                        return Err(RouterError::InvalidRoutePattern(format!(
                            "unbalanced braces in path \"{path}\""
                        )));
                    }
                    tokens.push(Token::Literal(literal));
                }
                let after = &rest[open + 1..];
                let close = after.find('}').ok_or_else(|| {
                    RouterError::InvalidRoutePattern(format!(
                        "unbalanced braces in path \"{path}\""
                    ))
                })?;
                let name = &after[..close];
                if name.contains('{') {
                    return Err(RouterError::InvalidRoutePattern(format!(
                        "unbalanced braces in path \"{path}\""
                    )));
                }
                if !GROUP_NAME_RE.is_match(name) {
                    return Err(RouterError::InvalidRoutePattern(format!(
                        "invalid placeholder name \"{{{name}}}\" in path \"{path}\""
                    )));
                }
                tokens.push(Token::Placeholder(name));
                rest = &after[close + 1..];
            }
            None => {
                if rest.contains('}') {
                    return Err(RouterError::InvalidRoutePattern(format!(
                        "unbalanced braces in path \"{path}\""
                    )));
                }
                tokens.push(Token::Literal(rest));
                rest = "";
            }
        }
    }
    Ok(tokens)
}

/// Build the deterministic anchored pattern text for a route.
///
/// Placeholders with an explicit requirement use the requirement's regex
/// fragment as the capture body; everything else defaults to "one or more
/// non-slash characters". Literal segments are escaped.
pub fn pattern_source(route: &Route) -> Result<(String, Vec<String>)> {
    let tokens = tokenize(route.path())?;
    let mut param_names: Vec<String> = Vec::new();
    let mut pattern = String::with_capacity(route.path().len() + 16);
    pattern.push('^');
    for token in &tokens {
        match token {
            Token::Literal(text) => pattern.push_str(&regex::escape(text)),
            Token::Placeholder(name) => {
                let body = route
                    .requirements()
                    .get(*name)
                    .map(String::as_str)
                    .unwrap_or(DEFAULT_REQUIREMENT);
                pattern.push_str("(?P<");
                pattern.push_str(name);
                pattern.push('>');
                pattern.push_str(body);
                pattern.push(')');
                param_names.push((*name).to_string());
            }
        }
    }
    pattern.push('$');

    // requirements must only reference placeholders present in the path
    for key in route.requirements().keys() {
        if !param_names.iter().any(|n| n == key) {
            return Err(RouterError::InvalidRoutePattern(format!(
                "requirement \"{key}\" has no matching placeholder in path \"{}\"",
                route.path()
            )));
        }
    }

    Ok((pattern, param_names))
}

/// Thread-safe compiler for route patterns.
///
/// Compiled patterns are cached by their deterministic pattern text, so
/// repeated registry scans never recompile a regex. Multiple threads can
/// compile concurrently; a double-check on the write path keeps racing
/// compilations from clobbering each other.
pub struct PatternCompiler {
    cache: RwLock<HashMap<String, Arc<CompiledPattern>>>,
}

impl Default for PatternCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternCompiler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Compile a route's template into an anchored matcher.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidRoutePattern`] if the path contains
    /// unbalanced placeholder braces, a requirement references a name absent
    /// from the path, or a requirement fragment fails to compile.
    pub fn compile(&self, route: &Route) -> Result<Arc<CompiledPattern>> {
        let (pattern_text, param_names) = pattern_source(route)?;

        {
            let cache = self.cache.read().expect("pattern cache lock poisoned");
            if let Some(compiled) = cache.get(&pattern_text) {
                return Ok(Arc::clone(compiled));
            }
        }

        let regex = Regex::new(&pattern_text).map_err(|e| {
            RouterError::InvalidRoutePattern(format!(
                "pattern \"{pattern_text}\" for path \"{}\" failed to compile: {e}",
                route.path()
            ))
        })?;
        let compiled = Arc::new(CompiledPattern {
            regex,
            pattern_text: pattern_text.clone(),
            param_names,
        });

        let mut cache = self.cache.write().expect("pattern cache lock poisoned");
        if let Some(existing) = cache.get(&pattern_text) {
            return Ok(Arc::clone(existing));
        }
        cache.insert(pattern_text.clone(), Arc::clone(&compiled));
        debug!(
            pattern = %pattern_text,
            path = %route.path(),
            cache_size = cache.len(),
            "Route pattern compiled and cached"
        );
        Ok(compiled)
    }

    /// Number of distinct patterns currently cached.
    #[must_use]
    pub fn cached_patterns(&self) -> usize {
        self.cache.read().expect("pattern cache lock poisoned").len()
    }

    /// Drop all cached patterns.
    pub fn clear(&self) {
        self.cache.write().expect("pattern cache lock poisoned").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_path() {
        let compiler = PatternCompiler::new();
        let compiled = compiler.compile(&Route::new("/articles")).unwrap();
        assert_eq!(compiled.pattern_text(), "^/articles$");
        assert!(compiled.match_path("/articles").is_some());
        assert!(compiled.match_path("/articles/1").is_none());
    }

    #[test]
    fn test_placeholder_defaults_to_non_slash() {
        let compiler = PatternCompiler::new();
        let compiled = compiler.compile(&Route::new("/articles/{id}")).unwrap();
        assert_eq!(compiled.pattern_text(), "^/articles/(?P<id>[^/]+)$");

        let params = compiled.match_path("/articles/42").unwrap();
        assert_eq!(params.as_slice(), [("id".to_string(), "42".to_string())]);
        assert!(compiled.match_path("/articles/a/b").is_none());
    }

    #[test]
    fn test_requirement_substituted_as_group_body() {
        let compiler = PatternCompiler::new();
        let route = Route::new("/articles/{id}").with_requirement("id", r"\d+");
        let compiled = compiler.compile(&route).unwrap();
        assert_eq!(compiled.pattern_text(), r"^/articles/(?P<id>\d+)$");
        assert!(compiled.match_path("/articles/42").is_some());
        assert!(compiled.match_path("/articles/abc").is_none());
    }

    #[test]
    fn test_anchored_no_partial_match() {
        let compiler = PatternCompiler::new();
        let compiled = compiler.compile(&Route::new("/a/{b}")).unwrap();
        assert!(compiled.match_path("/a/1/extra").is_none());
        assert!(compiled.match_path("/prefix/a/1").is_none());
    }

    #[test]
    fn test_requirement_without_placeholder_fails() {
        let compiler = PatternCompiler::new();
        let route = Route::new("/articles").with_requirement("id", r"\d+");
        let err = compiler.compile(&route).unwrap_err();
        assert!(matches!(err, RouterError::InvalidRoutePattern(_)));
    }

    #[test]
    fn test_unbalanced_braces_fail() {
        let compiler = PatternCompiler::new();
        for path in ["/a/{id", "/a/id}", "/a/{x{y}}"] {
            let err = compiler.compile(&Route::new(path)).unwrap_err();
            assert!(matches!(err, RouterError::InvalidRoutePattern(_)), "{path}");
        }
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let compiler = PatternCompiler::new();
        let route = Route::new("/a/{x}/{y}").with_requirement("x", "[a-z]+");
        let first = compiler.compile(&route).unwrap();
        let second = compiler.compile(&route).unwrap();
        assert_eq!(first.pattern_text(), second.pattern_text());
        // second compile is served from cache
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(compiler.cached_patterns(), 1);
    }

    #[test]
    fn test_multiple_placeholders_capture_in_order() {
        let compiler = PatternCompiler::new();
        let compiled = compiler
            .compile(&Route::new("/u/{user}/p/{post}"))
            .unwrap();
        assert_eq!(compiled.param_names(), ["user", "post"]);
        let params = compiled.match_path("/u/alice/p/7").unwrap();
        assert_eq!(params[0], ("user".to_string(), "alice".to_string()));
        assert_eq!(params[1], ("post".to_string(), "7".to_string()));
    }

    #[test]
    fn test_literal_segments_are_escaped() {
        let compiler = PatternCompiler::new();
        let compiled = compiler.compile(&Route::new("/v1.0/{id}")).unwrap();
        assert!(compiled.match_path("/v1.0/5").is_some());
        assert!(compiled.match_path("/v1x0/5").is_none());
    }
}
