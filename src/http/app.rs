//! Request dispatcher.
//!
//! # Responsibilities
//! - Register routes with their middleware chains
//! - Answer CORS preflight (`OPTIONS`) without touching routes
//! - Resolve route, path parameters and body for each request
//! - Run the chain and convert any error into an envelope response
//!
//! # Design Decisions
//! - `process_request` surfaces errors; `handle` is the single place that
//!   turns them into responses
//! - A failing chain discards whatever it already wrote
//! - Panics inside middleware are classified as internal errors

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use axum::http::{self, StatusCode};
use futures_util::FutureExt;

use crate::error::{AppError, Result, ROUTE_NOT_FOUND_MESSAGE};
use crate::http::middleware::{Middleware, Next};
use crate::http::request::{decode_body, IncomingRequest, RequestContext};
use crate::http::response::{error_response, ResponseWriter};
use crate::observability::metrics;
use crate::routing::{self, Method, Route, RouteTable};

/// The dispatch layer: a route table plus the pipeline that runs it.
#[derive(Debug, Default)]
pub struct App {
    routes: RouteTable,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route for `method`.
    pub fn route(
        &mut self,
        method: Method,
        pattern: &str,
        middlewares: Vec<Arc<dyn Middleware>>,
    ) -> &mut Self {
        self.routes.register(method, pattern, middlewares);
        self
    }

    pub fn get(&mut self, pattern: &str, middlewares: Vec<Arc<dyn Middleware>>) -> &mut Self {
        self.route(Method::Get, pattern, middlewares)
    }

    pub fn post(&mut self, pattern: &str, middlewares: Vec<Arc<dyn Middleware>>) -> &mut Self {
        self.route(Method::Post, pattern, middlewares)
    }

    pub fn put(&mut self, pattern: &str, middlewares: Vec<Arc<dyn Middleware>>) -> &mut Self {
        self.route(Method::Put, pattern, middlewares)
    }

    pub fn patch(&mut self, pattern: &str, middlewares: Vec<Arc<dyn Middleware>>) -> &mut Self {
        self.route(Method::Patch, pattern, middlewares)
    }

    pub fn delete(&mut self, pattern: &str, middlewares: Vec<Arc<dyn Middleware>>) -> &mut Self {
        self.route(Method::Delete, pattern, middlewares)
    }

    /// First route registered with exactly this pattern.
    pub fn get_route(&self, pattern: &str) -> Option<&Route> {
        self.routes.by_pattern(pattern)
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Run the pipeline for one request, writing into `res`.
    ///
    /// Errors are returned untouched; see [`App::handle`].
    pub async fn process_request(
        &self,
        request: IncomingRequest,
        res: &mut ResponseWriter,
    ) -> Result<()> {
        if request.path.is_empty() {
            return Err(AppError::invalid_request("Invalid request"));
        }

        if request.method == http::Method::OPTIONS {
            res.set_status(StatusCode::OK);
            return Ok(());
        }

        let route = Method::from_http(&request.method)
            .and_then(|method| self.routes.find(method, &request.path))
            .ok_or_else(|| AppError::not_found(ROUTE_NOT_FOUND_MESSAGE))?;

        let params = routing::extract(route.pattern(), &request.path);
        let body = decode_body(route.method(), &request.body)?;

        tracing::debug!(
            method = %route.method(),
            path = %request.path,
            route = %route.pattern(),
            stages = route.middlewares().len(),
            "Dispatching request"
        );

        let mut ctx = RequestContext {
            method: route.method(),
            path: request.path,
            headers: request.headers,
            params,
            body,
            client_key: request.client_key,
        };

        Next::new(route.middlewares()).run(&mut ctx, res).await
    }

    /// Run the pipeline and render the final response.
    ///
    /// This is the only place where errors become responses.
    pub async fn handle(&self, request: IncomingRequest) -> ResponseWriter {
        let start = Instant::now();
        let method = request.method.clone();
        let path = request.path.clone();

        let mut res = ResponseWriter::new();
        let outcome = AssertUnwindSafe(self.process_request(request, &mut res))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(AppError::internal(panic_message(panic.as_ref()))));

        let res = match outcome {
            Ok(()) => {
                if !res.is_written() && method != http::Method::OPTIONS {
                    tracing::warn!(method = %method, path = %path, "Chain finished without writing a response");
                }
                res
            }
            Err(err) => {
                match &err {
                    AppError::Internal(source) => {
                        tracing::error!(method = %method, path = %path, error = %source, "Request failed");
                    }
                    other => {
                        tracing::debug!(method = %method, path = %path, status = %other.status(), error = %other, "Request rejected");
                    }
                }
                error_response(&err)
            }
        };

        metrics::record_request(method.as_str(), res.status_code().as_u16(), start);
        res
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("middleware panicked: {msg}")
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("middleware panicked: {msg}")
    } else {
        "middleware panicked".to_string()
    }
}
