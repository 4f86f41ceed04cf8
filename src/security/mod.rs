//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (route matched):
//!     → rate_limit.rs (per client/method/path window, as route middleware)
//!     → Pass to next stage
//!
//! Outgoing response:
//!     → headers.rs (CORS + security headers on every response)
//! ```
//!
//! # Design Decisions
//! - Fail closed: a rejected request never reaches later stages
//! - Limiter state is process-local and bounded

pub mod headers;
pub mod rate_limit;

pub use rate_limit::{LimitConfig, RateLimiter};
