//! End-to-end dispatch through the Axum router, in process.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use finance_server::config::ServerConfig;
use finance_server::error::{AppError, GENERIC_ERROR_MESSAGE};
use finance_server::http::{controller, from_fn, App, Envelope, HttpRequest, HttpServer, Middleware};
use finance_server::lifecycle::startup;
use finance_server::security::{LimitConfig, RateLimiter};

mod common;

fn users_app() -> App {
    let mut app = App::new();
    app.get(
        "/users/:id",
        vec![controller(|req: HttpRequest| async move {
            Ok(Envelope::success(200, json!({ "id": req.params["id"] })))
        })],
    );
    app.post(
        "/users",
        vec![controller(|req: HttpRequest| async move {
            Ok(Envelope::success(201, req.body))
        })],
    );
    app.delete(
        "/users/:id",
        vec![from_fn(|_req, _res, _next| {
            Box::pin(async move { Err(AppError::internal("disk on fire")) })
        })],
    );
    app
}

#[tokio::test]
async fn test_get_with_params() {
    let router = HttpServer::new(ServerConfig::default(), users_app()).router();

    let response = router
        .oneshot(common::request("GET", "/users/42", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/json");
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(
        common::body_json(response).await,
        json!({"success": true, "code": 200, "error": "", "result": {"id": "42"}})
    );
}

#[tokio::test]
async fn test_post_json_body() {
    let router = HttpServer::new(ServerConfig::default(), users_app()).router();

    let response = router
        .oneshot(common::request("POST", "/users", Some(r#"{"name":"ana"}"#)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(common::body_json(response).await["result"], json!({"name": "ana"}));
}

#[tokio::test]
async fn test_malformed_body_is_400() {
    let router = HttpServer::new(ServerConfig::default(), users_app()).router();

    let response = router
        .oneshot(common::request("POST", "/users", Some("{not json")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], 400);
    assert_eq!(body["result"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_oversized_body_is_400() {
    let mut config = ServerConfig::default();
    config.security.max_body_size = 8;
    let router = HttpServer::new(config, users_app()).router();

    let response = router
        .oneshot(common::request("POST", "/users", Some(r#"{"name":"a much longer name"}"#)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(common::body_json(response).await["code"], 400);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let router = HttpServer::new(ServerConfig::default(), users_app()).router();

    let response = router
        .oneshot(common::request("GET", "/missing", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        common::body_json(response).await,
        json!({"success": false, "code": 404, "error": "Route not found", "result": null})
    );
}

#[tokio::test]
async fn test_internal_error_is_generic_500() {
    let router = HttpServer::new(ServerConfig::default(), users_app()).router();

    let response = router
        .oneshot(common::request("DELETE", "/users/1", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = common::body_json(response).await;
    assert_eq!(body["error"], GENERIC_ERROR_MESSAGE);
    assert!(!body.to_string().contains("disk on fire"));
}

#[tokio::test]
async fn test_options_preflight() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counted = hits.clone();
    let counter: Arc<dyn Middleware> = from_fn(move |req, res, next| {
        let counted = counted.clone();
        Box::pin(async move {
            counted.fetch_add(1, Ordering::SeqCst);
            next.run(req, res).await
        })
    });

    let mut app = App::new();
    app.get("/users", vec![counter]);

    let mut config = ServerConfig::default();
    config.cors.client_base_url = "https://app.example.com".into();
    let router = HttpServer::new(config, app).router();

    let response = router
        .oneshot(common::request("OPTIONS", "/users", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "https://app.example.com"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(bytes.is_empty());
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_options_with_oversized_body_is_still_200() {
    let mut config = ServerConfig::default();
    config.security.max_body_size = 8;
    let router = HttpServer::new(config, users_app()).router();

    let response = router
        .oneshot(common::request(
            "OPTIONS",
            "/users",
            Some(r#"{"name":"a much longer name"}"#),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("access-control-allow-origin"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn test_security_headers_on_errors() {
    let router = HttpServer::new(ServerConfig::default(), App::new()).router();

    let response = router
        .oneshot(common::request("GET", "/anything", None))
        .await
        .unwrap();

    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["x-frame-options"], "SAMEORIGIN");
}

#[tokio::test]
async fn test_security_headers_can_be_disabled() {
    let mut config = ServerConfig::default();
    config.security.enable_headers = false;
    let router = HttpServer::new(config, App::new()).router();

    let response = router
        .oneshot(common::request("GET", "/anything", None))
        .await
        .unwrap();

    assert!(response.headers().get("x-frame-options").is_none());
    assert!(response.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn test_rate_limited_route_returns_429_envelope() {
    let limiter = RateLimiter::new(10, std::time::Duration::from_secs(3600));
    let mut app = App::new();
    app.get(
        "/quota",
        vec![
            limiter.limit(LimitConfig::from_millis(1, 60_000)),
            controller(|_req: HttpRequest| async move { Ok(Envelope::success(200, "ok")) }),
        ],
    );
    let router = HttpServer::new(ServerConfig::default(), app).router();

    let first = router
        .clone()
        .oneshot(common::request("GET", "/quota", None))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = router
        .oneshot(common::request("GET", "/quota", None))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        common::body_json(second).await,
        json!({
            "success": false,
            "code": 429,
            "error": "Too many requests, please try again later.",
            "result": null
        })
    );
}

#[tokio::test]
async fn test_built_in_ping() {
    let config = ServerConfig::default();
    let limiter = RateLimiter::from_config(&config.rate_limit);
    let app = startup::build_app(&config, &limiter);
    let router = HttpServer::new(config, app).router();

    let response = router
        .oneshot(common::request("GET", "/ping", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        common::body_json(response).await,
        json!({"success": true, "code": 200, "error": "", "result": "pong"})
    );
    assert_eq!(limiter.len(), 1);
}
