//! Core middleware and handler traits.
//!
//! A stage implements [`Middleware`]: it receives the request context, the
//! request and a [`Next`] continuation. It either calls `next.run()` once,
//! writes a response itself, or returns an [`ApiError`](warden_core::ApiError).
//! The innermost element of every chain is a [`Handler`].
//!
//! # Example
//!
//! ```
//! use warden_middleware::{BoxFuture, Middleware, Next, Request, RequestContext, StageResult};
//!
//! struct Audit;
//!
//! impl Middleware for Audit {
//!     fn name(&self) -> &'static str {
//!         "audit"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut RequestContext,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, StageResult> {
//!         Box::pin(async move {
//!             let result = next.run(ctx, request).await;
//!             tracing::info!(trace_id = %ctx.trace_id(), ok = result.is_ok(), "audited");
//!             result
//!         })
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;

use crate::context::RequestContext;
use crate::types::{Request, StageResult};

/// A boxed future, as returned by stages and handlers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A request-wrapping stage.
///
/// # Invariants
///
/// - A stage calls `next.run()` at most once.
/// - A stage that does not call `next.run()` writes a response or returns
///   an error.
/// - Errors from downstream are returned unmodified unless the stage
///   classifies them into a response.
pub trait Middleware: Send + Sync + 'static {
    /// Returns the stage name used in logs and chain introspection.
    fn name(&self) -> &'static str;

    /// Processes the request, usually by delegating to `next`.
    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult>;
}

/// The business logic at the center of a chain.
pub trait Handler: Send + Sync + 'static {
    /// Handles the request, writing the response through `ctx`.
    fn call<'a>(&'a self, ctx: &'a mut RequestContext, request: Request) -> BoxFuture<'a, StageResult>;
}

/// Continuation that invokes the rest of the chain.
///
/// `run` consumes `self`, so a stage cannot call downstream twice.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    Handler(&'a dyn Handler),
}

impl<'a> Next<'a> {
    /// Creates a `Next` that invokes `middleware` and then `next`.
    pub(crate) fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal `Next` that invokes the handler.
    pub(crate) fn handler(handler: &'a dyn Handler) -> Self {
        Self {
            inner: NextInner::Handler(handler),
        }
    }

    /// Invokes the next stage or the handler.
    pub async fn run(self, ctx: &mut RequestContext, request: Request) -> StageResult {
        match self.inner {
            NextInner::Chain { middleware, next } => middleware.process(ctx, request, *next).await,
            NextInner::Handler(handler) => handler.call(ctx, request).await,
        }
    }
}

/// A handler built from a closure.
///
/// # Example
///
/// ```
/// use http::StatusCode;
/// use warden_middleware::FnHandler;
///
/// let handler = FnHandler::new(|ctx, _req| {
///     Box::pin(async move { ctx.respond_json(StatusCode::OK, &serde_json::json!({"status": "OK"})) })
/// });
/// # let _ = handler;
/// ```
pub struct FnHandler<F> {
    func: F,
}

impl<F> FnHandler<F>
where
    F: for<'a> Fn(&'a mut RequestContext, Request) -> BoxFuture<'a, StageResult> + Send + Sync + 'static,
{
    /// Wraps `func` as a handler.
    pub const fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Handler for FnHandler<F>
where
    F: for<'a> Fn(&'a mut RequestContext, Request) -> BoxFuture<'a, StageResult> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut RequestContext, request: Request) -> BoxFuture<'a, StageResult> {
        (self.func)(ctx, request)
    }
}
