//! Route registration and lookup.
//!
//! # Responsibilities
//! - Store compiled routes in registration order
//! - Find the first route matching a method and path
//!
//! # Design Decisions
//! - Linear scan; registration order is the only conflict resolution rule
//! - No duplicate detection: registering twice yields two routes
//! - Immutable after startup, shared behind `Arc` without locks

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::http::middleware::Middleware;
use crate::routing::matcher::CompiledPattern;

/// HTTP methods that can carry a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Methods whose body is decoded as JSON before the chain runs.
    pub fn has_body(self) -> bool {
        !matches!(self, Method::Get)
    }

    /// Map a wire method; `None` for methods no route can carry.
    pub fn from_http(method: &axum::http::Method) -> Option<Self> {
        method.as_str().parse().ok()
    }
}

impl FromStr for Method {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered route.
pub struct Route {
    method: Method,
    pattern: String,
    matcher: CompiledPattern,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl Route {
    pub fn new(method: Method, pattern: impl Into<String>, middlewares: Vec<Arc<dyn Middleware>>) -> Self {
        let pattern = pattern.into();
        let matcher = CompiledPattern::compile(&pattern);
        Self {
            method,
            pattern,
            matcher,
            middlewares,
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Pattern text as declared.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matcher(&self) -> &CompiledPattern {
        &self.matcher
    }

    pub fn param_keys(&self) -> &[String] {
        self.matcher.param_keys()
    }

    pub fn middlewares(&self) -> &[Arc<dyn Middleware>] {
        &self.middlewares
    }

    /// Returns true if both method and full path match.
    pub fn matches(&self, method: Method, path: &str) -> bool {
        self.method == method && self.matcher.is_match(path)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("param_keys", &self.param_keys())
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

/// Ordered collection of routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route. Earlier registrations take precedence on lookup.
    pub fn register(
        &mut self,
        method: Method,
        pattern: impl Into<String>,
        middlewares: Vec<Arc<dyn Middleware>>,
    ) -> &Route {
        let route = Route::new(method, pattern, middlewares);
        tracing::debug!(
            method = %route.method,
            pattern = %route.pattern,
            params = ?route.param_keys(),
            "Route registered"
        );
        self.routes.push(route);
        &self.routes[self.routes.len() - 1]
    }

    /// First route, in registration order, matching method and path.
    pub fn find(&self, method: Method, path: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.matches(method, path))
    }

    /// First route registered with exactly this pattern text.
    pub fn by_pattern(&self, pattern: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.pattern == pattern)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
