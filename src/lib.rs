//! Minimal HTTP request-dispatch layer.
//!
//! Routes are matched first-registered-wins, path parameters are bound from
//! `:name` segments, and each route runs an ordered middleware chain. A
//! bounded, self-expiring rate limiter plugs into any chain as middleware.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod ping;
pub mod routing;
pub mod security;

pub use config::ServerConfig;
pub use error::{AppError, ErrorKind};
pub use http::{App, HttpServer};
pub use lifecycle::Shutdown;
pub use security::RateLimiter;
