//! Request handling.
//!
//! # Responsibilities
//! - Carry per-request state through the middleware chain
//! - Decode the JSON body of mutating methods
//! - Generate unique request IDs (UUID v4)
//!
//! # Design Decisions
//! - The context is owned by the dispatcher for the request's lifetime
//! - Middleware receives `&mut RequestContext`, never a shared handle
//! - Request ID added as early as possible for tracing

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderValue, Request};
use serde_json::{Map, Value};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::routing::{Method, Params};

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Raw request as handed over by the transport.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub method: axum::http::Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Stable identity of the caller, usually the remote IP.
    pub client_key: String,
}

impl IncomingRequest {
    pub fn new(method: axum::http::Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            client_key: String::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_client_key(mut self, client_key: impl Into<String>) -> Self {
        self.client_key = client_key.into();
        self
    }

    pub fn with_header(mut self, name: &'static str, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Per-request state visible to middleware.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub params: Params,
    pub body: Value,
    pub client_key: String,
}

impl RequestContext {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn request_id(&self) -> Option<&str> {
        self.headers.get(X_REQUEST_ID).and_then(|v| v.to_str().ok())
    }
}

/// Decode a request body for `method`.
///
/// Methods without a body get an empty object and nothing is parsed. An empty
/// body on a mutating method also decodes to an empty object.
pub fn decode_body(method: Method, raw: &[u8]) -> Result<Value> {
    if !method.has_body() || raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }

    serde_json::from_slice(raw).map_err(|e| {
        tracing::debug!(error = %e, "Rejecting malformed JSON body");
        AppError::invalid_request("Invalid JSON body")
    })
}

/// Generates `x-request-id` values for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}
