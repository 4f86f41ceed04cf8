//! Domain error type shared by every component of the dispatch pipeline.
//!
//! # Design Decisions
//! - One closed enum; the status code is a function of the variant
//! - `Internal` keeps its source for logs but never exposes it to clients
//! - Only the dispatcher turns an `AppError` into a response

use axum::http::StatusCode;
use thiserror::Error;

/// Message returned to clients for every unclassified failure.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong, please try again later.";

/// Default message for rejected (rate limited) requests.
pub const TOO_MANY_REQUESTS_MESSAGE: &str = "Too many requests, please try again later.";

/// Message used when no registered route matches.
pub const ROUTE_NOT_FOUND_MESSAGE: &str = "Route not found";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Kind of a domain error, independent of its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidRequest,
    NotFound,
    TooManyRequests,
    Internal,
}

impl ErrorKind {
    /// HTTP status code carried by this kind.
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error raised anywhere inside request dispatch.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed method, URL or body (400).
    #[error("{0}")]
    InvalidRequest(String),

    /// No route, or no resource (404).
    #[error("{0}")]
    NotFound(String),

    /// Rate limit exceeded (429).
    #[error("{0}")]
    TooManyRequests(String),

    /// Anything else (500). The source is for operators only.
    #[error("internal error: {0}")]
    Internal(#[source] BoxError),
}

impl AppError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        AppError::InvalidRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    /// Rejection raised by the rate limiter.
    pub fn too_many_requests() -> Self {
        AppError::TooManyRequests(TOO_MANY_REQUESTS_MESSAGE.to_string())
    }

    /// Wrap any error as an unclassified failure.
    pub fn internal<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        AppError::Internal(err.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::TooManyRequests(_) => ErrorKind::TooManyRequests,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.kind().status()
    }

    /// Client-facing message. Internal errors are replaced by a fixed string.
    pub fn message(&self) -> &str {
        match self {
            AppError::InvalidRequest(msg)
            | AppError::NotFound(msg)
            | AppError::TooManyRequests(msg) => msg,
            AppError::Internal(_) => GENERIC_ERROR_MESSAGE,
        }
    }

    /// Map this error to the status code and message sent to the client.
    pub fn classify(&self) -> (StatusCode, String) {
        (self.status(), self.message().to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::internal(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::internal(err)
    }
}

/// Result alias used across the dispatch pipeline.
pub type Result<T> = std::result::Result<T, AppError>;
