//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Registration (at startup):
//!     (method, "/users/:id", middlewares)
//!     → matcher.rs (compile anchored pattern + param keys)
//!     → router.rs (append to ordered table)
//!
//! Incoming Request (method, path)
//!     → router.rs (linear scan, first match wins)
//!     → params.rs (bind :name segments to values)
//!     → Return: matched Route + Params, or no match
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route
//! - First registered match wins; no specificity ranking

pub mod matcher;
pub mod params;
pub mod router;

pub use matcher::CompiledPattern;
pub use params::{extract, Params};
pub use router::{Method, Route, RouteTable};
