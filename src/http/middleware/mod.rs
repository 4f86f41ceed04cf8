//! Middleware chain execution.
//!
//! # Data Flow
//! ```text
//! Dispatcher
//!     → Next { index: 0 }.run(req, res)
//!     → middlewares[0].handle(req, res, Next { index: 1 })
//!         → next.run(req, res)          (continue)
//!         → res.send(..); Ok(())        (terminate)
//!         → Err(AppError)               (abort, propagate to dispatcher)
//!     → index == len: chain ends
//! ```
//!
//! # Design Decisions
//! - `Next` is an explicit cursor over the route's middleware slice
//! - `Next::run` consumes the cursor, so a stage cannot continue twice
//! - Stages of one request run strictly one after another
//! - Errors are not caught here; the dispatcher is the only handler

pub mod controller;

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::error::Result;
use crate::http::request::RequestContext;
use crate::http::response::ResponseWriter;

pub use controller::{controller, Controller, HttpRequest};

/// A unit of request handling logic.
///
/// Implementations either call `next.run(req, res)` to continue the chain,
/// or write to `res` and return without calling it.
pub trait Middleware: Send + Sync {
    fn handle<'a>(
        &'a self,
        req: &'a mut RequestContext,
        res: &'a mut ResponseWriter,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<()>>;
}

/// Continuation over the remaining stages of a chain.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    index: usize,
}

impl<'a> Next<'a> {
    /// Cursor positioned at the first stage of `chain`.
    pub fn new(chain: &'a [Arc<dyn Middleware>]) -> Self {
        Self { chain, index: 0 }
    }

    /// Position of the stage this cursor will run.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of stages not yet started.
    pub fn remaining(&self) -> usize {
        self.chain.len().saturating_sub(self.index)
    }

    /// Run the next stage. A no-op once the chain is exhausted.
    pub async fn run(self, req: &mut RequestContext, res: &mut ResponseWriter) -> Result<()> {
        let Some(middleware) = self.chain.get(self.index) else {
            return Ok(());
        };
        let next = Next {
            chain: self.chain,
            index: self.index + 1,
        };
        middleware.handle(req, res, next).await
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("index", &self.index)
            .field("len", &self.chain.len())
            .finish()
    }
}

/// Middleware built from a function.
pub struct FnMiddleware<F> {
    f: F,
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut RequestContext, &'a mut ResponseWriter, Next<'a>) -> BoxFuture<'a, Result<()>>
        + Send
        + Sync,
{
    fn handle<'a>(
        &'a self,
        req: &'a mut RequestContext,
        res: &'a mut ResponseWriter,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<()>> {
        (self.f)(req, res, next)
    }
}

/// Wrap a function returning a boxed future as middleware.
///
/// ```ignore
/// let auth = from_fn(|req, res, next| Box::pin(async move {
///     if req.headers.contains_key("authorization") {
///         next.run(req, res).await
///     } else {
///         Err(AppError::invalid_request("Missing Authorization header"))
///     }
/// }));
/// ```
pub fn from_fn<F>(f: F) -> Arc<dyn Middleware>
where
    F: for<'a> Fn(&'a mut RequestContext, &'a mut ResponseWriter, Next<'a>) -> BoxFuture<'a, Result<()>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnMiddleware { f })
}
