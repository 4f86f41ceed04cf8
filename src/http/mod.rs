//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, body read)
//!     → app.rs (OPTIONS short-circuit, route lookup, params, body decode)
//!     → middleware/ (ordered chain: rate limit → controller)
//!     → response.rs (envelope, error classification)
//!     → Send to client (+ CORS/security headers)
//! ```

pub mod app;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use app::App;
pub use middleware::{controller, from_fn, HttpRequest, Middleware, Next};
pub use request::{IncomingRequest, RequestContext, X_REQUEST_ID};
pub use response::{Envelope, ResponseWriter};
pub use server::HttpServer;
