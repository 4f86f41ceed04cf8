//! Response handling.
//!
//! # Responsibilities
//! - Collect the status and body written by middleware
//! - Build the uniform `{success, code, error, result}` envelope
//! - Render errors into envelopes
//!
//! # Design Decisions
//! - Every body sent by the server is an envelope
//! - Nothing reaches the client until the chain has finished

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;

/// Uniform response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope<T = Value> {
    pub success: bool,
    pub code: u16,
    pub error: String,
    pub result: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(code: u16, payload: T) -> Self {
        Self {
            success: true,
            code,
            error: String::new(),
            result: Some(payload),
        }
    }
}

impl Envelope {
    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self {
            success: false,
            code,
            error: message.into(),
            result: None,
        }
    }

    /// Envelope for a classified error.
    pub fn from_error(err: &AppError) -> Self {
        let (status, message) = err.classify();
        Self::error(status.as_u16(), message)
    }
}

/// Response under construction for one request.
#[derive(Debug, Clone, Default)]
pub struct ResponseWriter {
    status: StatusCode,
    body: Option<Bytes>,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    /// Write a raw JSON body.
    pub fn write(&mut self, body: impl Into<Bytes>) {
        self.body = Some(body.into());
    }

    /// Serialize `envelope` as the body, using its code as the status.
    pub fn send<T: Serialize>(&mut self, envelope: &Envelope<T>) -> crate::error::Result<()> {
        let bytes = serde_json::to_vec(envelope)?;
        self.status = StatusCode::from_u16(envelope.code).map_err(AppError::internal)?;
        self.write(bytes);
        Ok(())
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Returns true once a middleware has written a body.
    pub fn is_written(&self) -> bool {
        self.body.is_some()
    }
}

impl IntoResponse for ResponseWriter {
    fn into_response(self) -> Response {
        match self.body {
            Some(body) => {
                let mut response = Response::new(Body::from(body));
                *response.status_mut() = self.status;
                response.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
                response
            }
            None => {
                let mut response = Response::new(Body::empty());
                *response.status_mut() = self.status;
                response
            }
        }
    }
}

/// Render an error as a complete envelope response.
pub fn error_response(err: &AppError) -> ResponseWriter {
    let envelope = Envelope::from_error(err);
    let mut writer = ResponseWriter::new();
    writer.set_status(err.status());
    // Envelope<Value> with a plain string never fails to serialize.
    if let Ok(bytes) = serde_json::to_vec(&envelope) {
        writer.write(bytes);
    }
    writer
}
