use std::sync::Arc;

use http::Method;
use serde_json::json;

use routier::{MatchEngine, ResultCache, Route, RouteRegistry, RouterError};

fn engine_from(routes: Vec<(&str, Route)>) -> MatchEngine {
    let mut registry = RouteRegistry::new();
    for (name, route) in routes {
        registry.add(name, route).expect("route names are unique");
    }
    MatchEngine::new(
        Arc::new(registry),
        Arc::new(ResultCache::memory_only(100)),
    )
}

#[test]
fn matches_static_and_placeholder_routes() {
    let engine = engine_from(vec![
        ("home", Route::new("/")),
        ("article", Route::new("/articles/{id}")),
    ]);

    let hit = engine
        .match_request("/articles/42", &Method::GET, "http", "")
        .expect("route should match");
    assert_eq!(hit.route_name, "article");
    assert_eq!(hit.param("id"), Some("42"));
    assert_eq!(hit.param("_route"), Some("article"));

    let root = engine
        .match_request("/", &Method::GET, "http", "")
        .expect("root should match");
    assert_eq!(root.route_name, "home");
}

#[test]
fn requirement_rejects_non_matching_segment() {
    let engine = engine_from(vec![(
        "article",
        Route::new("/articles/{id}").with_requirement("id", r"\d+"),
    )]);

    assert!(engine
        .match_request("/articles/42", &Method::GET, "http", "")
        .is_ok());
    assert!(matches!(
        engine.match_request("/articles/latest", &Method::GET, "http", ""),
        Err(RouterError::NotFound { .. })
    ));
}

#[test]
fn registration_order_wins_over_specificity() {
    let engine = engine_from(vec![
        ("generic", Route::new("/items/{slug}")),
        ("special", Route::new("/items/featured")),
    ]);

    let hit = engine
        .match_request("/items/featured", &Method::GET, "http", "")
        .expect("generic route should match first");
    assert_eq!(hit.route_name, "generic");
    assert_eq!(hit.param("slug"), Some("featured"));
}

#[test]
fn method_mismatch_accumulates_allowed_methods() {
    let engine = engine_from(vec![
        ("create", Route::new("/items").with_methods(["POST"])),
        ("replace", Route::new("/items").with_methods(["PUT", "POST"])),
    ]);

    match engine.match_request("/items", &Method::GET, "http", "") {
        Err(RouterError::MethodNotAllowed { allowed }) => {
            assert_eq!(allowed, vec!["POST".to_string(), "PUT".to_string()]);
        }
        other => panic!("expected MethodNotAllowed, got {other:?}"),
    }
}

#[test]
fn scan_continues_past_method_mismatch() {
    let engine = engine_from(vec![
        ("create", Route::new("/items").with_methods(["POST"])),
        ("list", Route::new("/items").with_methods(["GET"])),
    ]);

    let hit = engine
        .match_request("/items", &Method::GET, "http", "")
        .expect("later route should take the request");
    assert_eq!(hit.route_name, "list");
}

#[test]
fn scheme_mismatch_is_not_found_not_405() {
    let engine = engine_from(vec![(
        "secure",
        Route::new("/account").with_schemes(["https"]).with_methods(["GET"]),
    )]);

    assert!(matches!(
        engine.match_request("/account", &Method::GET, "http", ""),
        Err(RouterError::NotFound { .. })
    ));
}

#[test]
fn host_constraint_is_exact() {
    let engine = engine_from(vec![(
        "api",
        Route::new("/status").with_host("api.example.com"),
    )]);

    assert!(engine
        .match_request("/status", &Method::GET, "http", "api.example.com")
        .is_ok());
    assert!(engine
        .match_request("/status", &Method::GET, "http", "www.example.com")
        .is_err());
}

#[test]
fn defaults_fill_unmatched_placeholders() {
    let engine = engine_from(vec![(
        "listing",
        Route::new("/articles/{page}")
            .with_requirement("page", r"\d*")
            .with_default("page", json!("1"))
            .with_default("per_page", json!(25)),
    )]);

    let hit = engine
        .match_request("/articles/7", &Method::GET, "http", "")
        .expect("explicit page should match");
    assert_eq!(hit.param("page"), Some("7"));
    assert_eq!(hit.params.get("per_page"), Some(&json!(25)));

    let defaulted = engine
        .match_request("/articles/", &Method::GET, "http", "")
        .expect("empty capture should fall back to the default");
    assert_eq!(defaulted.param("page"), Some("1"));
}

#[test]
fn repeated_match_serves_the_memoized_result() {
    let registry = {
        let mut r = RouteRegistry::new();
        r.add("article", Route::new("/articles/{id}"))
            .expect("unique name");
        Arc::new(r)
    };
    let cache = Arc::new(ResultCache::memory_only(100));
    let engine = MatchEngine::new(Arc::clone(&registry), Arc::clone(&cache));

    let first = engine
        .match_request("/articles/9", &Method::GET, "http", "")
        .expect("match");
    assert!(cache.get("match:GET:http::/articles/9").is_some());

    let second = engine
        .match_request("/articles/9", &Method::GET, "http", "")
        .expect("memoized match");
    assert_eq!(first.route_name, second.route_name);
    assert_eq!(first.params, second.params);
}

#[test]
fn misses_are_not_memoized() {
    let cache = Arc::new(ResultCache::memory_only(100));
    let mut registry = RouteRegistry::new();
    registry
        .add("article", Route::new("/articles/{id}"))
        .expect("unique name");
    let engine = MatchEngine::new(Arc::new(registry), Arc::clone(&cache));

    assert!(engine
        .match_request("/nope", &Method::GET, "http", "")
        .is_err());
    assert!(cache.get("match:GET:http::/nope").is_none());
    assert_eq!(cache.stats().memory_items, 0);
}
