//! Method and path routing.
//!
//! Patterns use `{name}` segments for path parameters. Routes are checked
//! in registration order; the first match wins.
//!
//! # Example
//!
//! ```
//! use http::Method;
//! use warden_server::router::{Resolution, Router};
//!
//! let mut router = Router::new();
//! router.add_route(Method::GET, "/users/{id}", "getUser");
//! router.add_route(Method::DELETE, "/users/{id}", "deleteUser");
//!
//! match router.resolve(&Method::GET, "/users/42") {
//!     Resolution::Matched { route, params } => {
//!         assert_eq!(*route.target(), "getUser");
//!         assert_eq!(params.get("id").map(String::as_str), Some("42"));
//!     }
//!     other => panic!("unexpected {other:?}"),
//! }
//!
//! assert!(matches!(router.resolve(&Method::POST, "/users/42"), Resolution::MethodNotAllowed));
//! assert!(matches!(router.resolve(&Method::GET, "/products"), Resolution::NotFound));
//! ```

use std::collections::HashMap;

use http::Method;

/// A segment of a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    /// A literal segment (e.g., "users")
    Literal(String),

    /// A parameter segment (e.g., "{id}")
    Param(String),
}

/// A registered route.
#[derive(Debug, Clone)]
pub struct Route<T> {
    method: Method,
    pattern: String,
    segments: Vec<PathSegment>,
    target: T,
}

impl<T> Route<T> {
    fn new(method: Method, pattern: &str, target: T) -> Self {
        Self {
            method,
            pattern: pattern.to_string(),
            segments: parse_segments(pattern),
            target,
        }
    }

    /// Returns the route method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the pattern as registered, used as the metrics route label.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns what this route dispatches to.
    #[must_use]
    pub const fn target(&self) -> &T {
        &self.target
    }

    /// Matches `path`, returning its parameters.
    fn match_path(&self, path_segments: &[&str]) -> Option<HashMap<String, String>> {
        if path_segments.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (pattern, actual) in self.segments.iter().zip(path_segments) {
            match pattern {
                PathSegment::Literal(expected) => {
                    if expected != actual {
                        return None;
                    }
                }
                PathSegment::Param(name) => {
                    params.insert(name.clone(), (*actual).to_string());
                }
            }
        }
        Some(params)
    }
}

fn parse_segments(pattern: &str) -> Vec<PathSegment> {
    split_path(pattern)
        .into_iter()
        .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => PathSegment::Param(name.to_string()),
            None => PathSegment::Literal(s.to_string()),
        })
        .collect()
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Outcome of routing one request.
#[derive(Debug)]
pub enum Resolution<'r, T> {
    /// A route matched method and path.
    Matched {
        /// The matched route.
        route: &'r Route<T>,
        /// Extracted path parameters.
        params: HashMap<String, String>,
    },
    /// The path is known but not for this method.
    MethodNotAllowed,
    /// No route has this path.
    NotFound,
}

/// Routes requests to targets by method and path.
#[derive(Debug, Clone)]
pub struct Router<T> {
    routes: Vec<Route<T>>,
}

impl<T> Router<T> {
    /// Creates an empty router.
    #[must_use]
    pub const fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Adds a route.
    pub fn add_route(&mut self, method: Method, pattern: impl AsRef<str>, target: T) {
        self.routes.push(Route::new(method, pattern.as_ref(), target));
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Returns the registered routes in order.
    pub fn routes(&self) -> impl Iterator<Item = &Route<T>> {
        self.routes.iter()
    }

    /// Resolves a request's method and path.
    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution<'_, T> {
        let segments = split_path(path);
        let mut path_known = false;

        for route in &self.routes {
            if let Some(params) = route.match_path(&segments) {
                if route.method == *method {
                    return Resolution::Matched { route, params };
                }
                path_known = true;
            }
        }

        if path_known {
            Resolution::MethodNotAllowed
        } else {
            Resolution::NotFound
        }
    }
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales_router() -> Router<&'static str> {
        let mut router = Router::new();
        router.add_route(Method::GET, "/test", "test");
        router.add_route(Method::GET, "/users/token", "token");
        router.add_route(Method::GET, "/users/{page}/{rows}", "list");
        router.add_route(Method::GET, "/users/{id}", "get");
        router.add_route(Method::POST, "/users", "create");
        router.add_route(Method::DELETE, "/users/{id}", "delete");
        router
    }

    fn target(resolution: &Resolution<'_, &'static str>) -> Option<&'static str> {
        match resolution {
            Resolution::Matched { route, .. } => Some(*route.target()),
            _ => None,
        }
    }

    #[test]
    fn test_literal_match() {
        let router = sales_router();
        assert_eq!(target(&router.resolve(&Method::GET, "/test")), Some("test"));
        assert_eq!(target(&router.resolve(&Method::GET, "/test/")), Some("test"));
    }

    #[test]
    fn test_literal_wins_by_order() {
        let router = sales_router();
        assert_eq!(target(&router.resolve(&Method::GET, "/users/token")), Some("token"));
        assert_eq!(target(&router.resolve(&Method::GET, "/users/abc")), Some("get"));
    }

    #[test]
    fn test_params_extracted() {
        let router = sales_router();
        match router.resolve(&Method::GET, "/users/2/10") {
            Resolution::Matched { route, params } => {
                assert_eq!(route.pattern(), "/users/{page}/{rows}");
                assert_eq!(params["page"], "2");
                assert_eq!(params["rows"], "10");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_method_not_allowed() {
        let router = sales_router();
        assert!(matches!(
            router.resolve(&Method::PUT, "/users"),
            Resolution::MethodNotAllowed
        ));
        assert!(matches!(
            router.resolve(&Method::POST, "/test"),
            Resolution::MethodNotAllowed
        ));
    }

    #[test]
    fn test_not_found() {
        let router = sales_router();
        assert!(matches!(router.resolve(&Method::GET, "/products"), Resolution::NotFound));
        assert!(matches!(router.resolve(&Method::GET, "/users/1/2/3"), Resolution::NotFound));
        assert!(matches!(router.resolve(&Method::GET, "/"), Resolution::NotFound));
    }

    #[test]
    fn test_route_count() {
        assert_eq!(sales_router().route_count(), 6);
        assert_eq!(Router::<()>::new().route_count(), 0);
    }
}
