//! Name-keyed route registry.
//!
//! Insertion order is match-priority order: the match engine scans routes in
//! the order they were added, and the first route passing every check wins.
//! The registry is built once at startup and treated as read-only while
//! serving, so reads after construction need no synchronization.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::error::{Result, RouterError};
use crate::route::Route;

/// Ordered collection of named routes.
///
/// Names are unique: adding a duplicate fails with
/// [`RouterError::DuplicateRoute`] and never silently overwrites.
#[derive(Debug, Default, Clone)]
pub struct RouteRegistry {
    // insertion-ordered storage plus a name index for O(1) lookups
    routes: Vec<(String, Arc<Route>)>,
    index: HashMap<String, usize>,
}

impl RouteRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route under a unique name.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::DuplicateRoute`] if the name is already taken;
    /// the registry is left unchanged.
    pub fn add(&mut self, name: impl Into<String>, route: Route) -> Result<()> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(RouterError::DuplicateRoute(name));
        }
        self.index.insert(name.clone(), self.routes.len());
        info!(route = %name, path = %route.path(), "Route registered");
        self.routes.push((name, Arc::new(route)));
        Ok(())
    }

    /// Look up a route by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<Route>> {
        self.index.get(name).map(|&i| &self.routes[i].1)
    }

    /// Whether a route with the given name exists.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Remove a route by name, returning it if present.
    ///
    /// Later routes keep their relative priority order.
    pub fn remove(&mut self, name: &str) -> Option<Arc<Route>> {
        let i = self.index.remove(name)?;
        let (_, route) = self.routes.remove(i);
        for idx in self.index.values_mut() {
            if *idx > i {
                *idx -= 1;
            }
        }
        Some(route)
    }

    /// All routes in insertion (priority) order.
    pub fn all(&self) -> impl Iterator<Item = (&str, &Arc<Route>)> {
        self.routes.iter().map(|(n, r)| (n.as_str(), r))
    }

    /// Route names in insertion order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.routes.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Merge another registry into this one.
    ///
    /// All-or-nothing: every incoming name is checked first, and a single
    /// conflict fails the whole merge with the receiver unmodified.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::DuplicateRoute`] naming the first conflicting
    /// route (in the other registry's insertion order).
    pub fn merge(&mut self, other: RouteRegistry) -> Result<()> {
        for (name, _) in &other.routes {
            if self.index.contains_key(name) {
                return Err(RouterError::DuplicateRoute(name.clone()));
            }
        }
        for (name, route) in other.routes {
            self.index.insert(name.clone(), self.routes.len());
            self.routes.push((name, route));
        }
        Ok(())
    }

    /// Find the first route with exactly this path template.
    ///
    /// Linear scan; intended for diagnostics, not the matching hot path.
    #[must_use]
    pub fn find_by_path(&self, path: &str) -> Option<(&str, &Arc<Route>)> {
        self.routes
            .iter()
            .find(|(_, r)| r.path() == path)
            .map(|(n, r)| (n.as_str(), r))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Drop all routes.
    pub fn clear(&mut self) {
        self.routes.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_get() {
        let mut registry = RouteRegistry::new();
        registry.add("home", Route::new("/")).unwrap();
        assert!(registry.has("home"));
        assert_eq!(registry.get("home").unwrap().path(), "/");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_name_rejected_registry_unchanged() {
        let mut registry = RouteRegistry::new();
        registry.add("home", Route::new("/")).unwrap();
        let err = registry.add("home", Route::new("/other")).unwrap_err();
        assert!(matches!(err, RouterError::DuplicateRoute(name) if name == "home"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("home").unwrap().path(), "/");
    }

    #[test]
    fn test_iteration_preserves_insertion_order() {
        let mut registry = RouteRegistry::new();
        registry.add("c", Route::new("/c")).unwrap();
        registry.add("a", Route::new("/a")).unwrap();
        registry.add("b", Route::new("/b")).unwrap();
        assert_eq!(registry.names(), ["c", "a", "b"]);
    }

    #[test]
    fn test_remove_keeps_order_and_index() {
        let mut registry = RouteRegistry::new();
        registry.add("a", Route::new("/a")).unwrap();
        registry.add("b", Route::new("/b")).unwrap();
        registry.add("c", Route::new("/c")).unwrap();

        let removed = registry.remove("b").unwrap();
        assert_eq!(removed.path(), "/b");
        assert_eq!(registry.names(), ["a", "c"]);
        assert_eq!(registry.get("c").unwrap().path(), "/c");
        assert!(registry.remove("b").is_none());
    }

    #[test]
    fn test_merge_all_or_nothing() {
        let mut left = RouteRegistry::new();
        left.add("a", Route::new("/a")).unwrap();

        let mut right = RouteRegistry::new();
        right.add("b", Route::new("/b")).unwrap();
        right.add("a", Route::new("/conflict")).unwrap();

        let err = left.merge(right).unwrap_err();
        assert!(matches!(err, RouterError::DuplicateRoute(name) if name == "a"));
        // receiver untouched, even though "b" itself had no conflict
        assert_eq!(left.names(), ["a"]);
    }

    #[test]
    fn test_merge_appends_in_order() {
        let mut left = RouteRegistry::new();
        left.add("a", Route::new("/a")).unwrap();

        let mut right = RouteRegistry::new();
        right.add("b", Route::new("/b")).unwrap();
        right.add("c", Route::new("/c")).unwrap();

        left.merge(right).unwrap();
        assert_eq!(left.names(), ["a", "b", "c"]);
    }

    #[test]
    fn test_find_by_path() {
        let mut registry = RouteRegistry::new();
        registry.add("a", Route::new("/a/{id}")).unwrap();
        registry.add("b", Route::new("/b")).unwrap();

        let (name, _) = registry.find_by_path("/a/{id}").unwrap();
        assert_eq!(name, "a");
        assert!(registry.find_by_path("/nope").is_none());
    }
}
