//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with a single dispatching handler
//! - Wire up layers (tracing, request ID, response headers)
//! - Enforce the body size limit with an envelope error
//! - Convert Axum requests into dispatcher input and back
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, State},
    http::{Method, Request},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::http::app::App;
use crate::http::request::{IncomingRequest, UuidRequestId, X_REQUEST_ID};
use crate::http::response::error_response;
use crate::security::headers;

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    pub app: Arc<App>,
    pub max_body_size: usize,
}

/// HTTP server for the dispatch layer.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a new HTTP server serving `app`.
    pub fn new(config: ServerConfig, app: App) -> Self {
        let state = AppState {
            app: Arc::new(app),
            max_body_size: config.security.max_body_size,
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(config: &ServerConfig, state: AppState) -> Router {
        let request_id = axum::http::HeaderName::from_static(X_REQUEST_ID);

        let mut router = Router::new()
            .fallback(dispatch_handler)
            .with_state(state);

        let mut response_headers = headers::cors_headers(&config.cors);
        if config.security.enable_headers {
            response_headers.extend(headers::security_headers());
        }
        for (name, value) in response_headers {
            router = router.layer(SetResponseHeaderLayer::overriding(name, value));
        }

        router.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), UuidRequestId))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id)),
        )
    }

    /// The configured Axum router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let service = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, service)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Single entry point: every request goes through the dispatcher.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let client_key = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let (parts, body) = request.into_parts();

    // Preflight is answered without reading the body.
    let body = if parts.method == Method::OPTIONS {
        Bytes::new()
    } else {
        match axum::body::to_bytes(body, state.max_body_size).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(error = %e, "Failed to read request body");
                return error_response(&AppError::invalid_request("Invalid request body"))
                    .into_response();
            }
        }
    };

    let incoming = IncomingRequest {
        method: parts.method,
        path: parts.uri.path().to_string(),
        headers: parts.headers,
        body,
        client_key,
    };

    state.app.handle(incoming).await.into_response()
}
