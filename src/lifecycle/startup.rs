//! Startup orchestration.
//!
//! # Responsibilities
//! - Register the built-in routes with their middleware chains
//! - Start background tasks (rate limiter sweep, metrics)
//!
//! # Design Decisions
//! - Routes are registered once, before the listener is bound
//! - The limiter is returned to the caller, which owns its shutdown

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::http::app::App;
use crate::http::middleware::{controller, Middleware};
use crate::ping::ping;
use crate::security::rate_limit::{LimitConfig, RateLimiter};

/// Build the application routes.
pub fn build_app(config: &ServerConfig, limiter: &RateLimiter) -> App {
    let mut ping_chain: Vec<Arc<dyn Middleware>> = Vec::new();
    if config.rate_limit.enabled {
        ping_chain.push(limiter.limit(LimitConfig::from(&config.rate_limit)));
    }
    ping_chain.push(controller(ping));

    let mut app = App::new();
    app.get("/ping", ping_chain);

    tracing::info!(routes = app.routes().len(), "Routes registered");
    app
}

/// Create the limiter and start its sweep. Must run inside a Tokio runtime.
pub fn start_rate_limiter(config: &ServerConfig) -> RateLimiter {
    let limiter = RateLimiter::from_config(&config.rate_limit);
    limiter.start();
    limiter
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::IncomingRequest;
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn test_ping_route_is_rate_limited() {
        let mut config = ServerConfig::default();
        config.rate_limit.max_requests = 1;

        let limiter = RateLimiter::from_config(&config.rate_limit);
        let app = build_app(&config, &limiter);

        let request = IncomingRequest::new(Method::GET, "/ping").with_client_key("10.0.0.1");
        let res = app.handle(request.clone()).await;
        assert_eq!(res.status_code(), StatusCode::OK);

        let res = app.handle(request).await;
        assert_eq!(res.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_rate_limit_can_be_disabled() {
        let mut config = ServerConfig::default();
        config.rate_limit.enabled = false;
        config.rate_limit.max_requests = 1;

        let limiter = RateLimiter::from_config(&config.rate_limit);
        let app = build_app(&config, &limiter);

        for _ in 0..3 {
            let res = app.handle(IncomingRequest::new(Method::GET, "/ping")).await;
            assert_eq!(res.status_code(), StatusCode::OK);
        }
        assert!(limiter.is_empty());
    }
}
