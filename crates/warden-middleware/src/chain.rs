//! Ordered middleware chains.
//!
//! A [`Chain`] is an immutable list of stages wrapped around one handler.
//! The first stage added is the outermost: it sees the request first and
//! the result last.
//!
//! ## Canonical wiring
//!
//! ```text
//! Logger → Metrics → PanicGuard → ErrorClassifier → Authenticate → Authorize → Handler
//! ```
//!
//! The first four are global and run for every request, including
//! unmatched routes. The auth stages are attached per route.

use std::sync::Arc;

use crate::context::RequestContext;
use crate::middleware::{Handler, Middleware, Next};
use crate::stages::{ErrorClassifierMiddleware, LoggerMiddleware, MetricsMiddleware, PanicGuardMiddleware};
use crate::types::{Request, StageResult};

/// A type-erased middleware that can be shared between chains.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// A type-erased handler.
pub type BoxedHandler = Arc<dyn Handler>;

/// Stages around one handler.
///
/// # Example
///
/// ```
/// use http::StatusCode;
/// use warden_middleware::{global_stages, Chain, FnHandler};
///
/// let chain = Chain::builder()
///     .stages(global_stages())
///     .build(FnHandler::new(|ctx, _req| {
///         Box::pin(async move { ctx.respond_status(StatusCode::OK) })
///     }));
///
/// assert_eq!(
///     chain.stage_names(),
///     vec!["logger", "metrics", "panic_guard", "error_classifier"]
/// );
/// ```
#[derive(Clone)]
pub struct Chain {
    stages: Vec<BoxedMiddleware>,
    handler: BoxedHandler,
}

impl Chain {
    /// Creates a new chain builder.
    #[must_use]
    pub fn builder() -> ChainBuilder {
        ChainBuilder::new()
    }

    /// Runs the request through every stage and the handler.
    pub async fn run(&self, ctx: &mut RequestContext, request: Request) -> StageResult {
        self.build_next().run(ctx, request).await
    }

    fn build_next(&self) -> Next<'_> {
        let mut next = Next::handler(self.handler.as_ref());
        for middleware in self.stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next
    }

    /// Returns the stage names, outermost first.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|mw| mw.name()).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("stages", &self.stage_names())
            .finish_non_exhaustive()
    }
}

/// Builder for a [`Chain`].
#[derive(Default)]
pub struct ChainBuilder {
    stages: Vec<BoxedMiddleware>,
}

impl ChainBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage inside the ones already added.
    #[must_use]
    pub fn stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Appends already-shared stages, in order.
    #[must_use]
    pub fn stages<I>(mut self, stages: I) -> Self
    where
        I: IntoIterator<Item = BoxedMiddleware>,
    {
        self.stages.extend(stages);
        self
    }

    /// Finishes the chain around `handler`.
    #[must_use]
    pub fn build<H: Handler>(self, handler: H) -> Chain {
        self.build_shared(Arc::new(handler))
    }

    /// Finishes the chain around an already-shared handler.
    #[must_use]
    pub fn build_shared(self, handler: BoxedHandler) -> Chain {
        Chain {
            stages: self.stages,
            handler,
        }
    }
}

/// The stages every request runs through, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
    /// Request/response logging.
    Logger = 1,
    /// Request counters, latency and in-flight gauge.
    Metrics = 2,
    /// Converts panics into 500 responses.
    PanicGuard = 3,
    /// Maps errors onto status codes and bodies.
    ErrorClassifier = 4,
    /// Validates the bearer token.
    Authenticate = 5,
    /// Checks roles on the authenticated claims.
    Authorize = 6,
}

impl Stage {
    /// Returns true for stages that wrap every request.
    #[must_use]
    pub const fn is_global(self) -> bool {
        (self as u8) <= 4
    }

    /// Returns the stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Logger => "logger",
            Self::Metrics => "metrics",
            Self::PanicGuard => "panic_guard",
            Self::ErrorClassifier => "error_classifier",
            Self::Authenticate => "authenticate",
            Self::Authorize => "authorize",
        }
    }

    /// Returns all stages in order.
    #[must_use]
    pub const fn all() -> [Self; 6] {
        [
            Self::Logger,
            Self::Metrics,
            Self::PanicGuard,
            Self::ErrorClassifier,
            Self::Authenticate,
            Self::Authorize,
        ]
    }
}

/// Builds the global stages in canonical order.
#[must_use]
pub fn global_stages() -> Vec<BoxedMiddleware> {
    vec![
        Arc::new(LoggerMiddleware::new()),
        Arc::new(MetricsMiddleware::new()),
        Arc::new(PanicGuardMiddleware::new()),
        Arc::new(ErrorClassifierMiddleware::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{BoxFuture, FnHandler};
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: Arc<AtomicUsize>,
    }

    impl Middleware for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut RequestContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, StageResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(next.run(ctx, request))
        }
    }

    fn request() -> Request {
        http::Request::builder()
            .uri("/test")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[test]
    fn test_stage_order() {
        let stages = Stage::all();
        let names: Vec<_> = stages.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "logger",
                "metrics",
                "panic_guard",
                "error_classifier",
                "authenticate",
                "authorize"
            ]
        );
        assert!(stages.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_global_stages() {
        let names: Vec<_> = global_stages().iter().map(|mw| mw.name()).collect();
        let expected: Vec<_> = Stage::all()
            .into_iter()
            .filter(|s| s.is_global())
            .map(Stage::name)
            .collect();
        assert_eq!(names, expected);
    }

    #[tokio::test]
    async fn test_chain_runs_every_stage_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = Chain::builder()
            .stage(Counting { calls: calls.clone() })
            .stage(Counting { calls: calls.clone() })
            .build(FnHandler::new(|ctx, _req| {
                Box::pin(async move { ctx.respond_status(StatusCode::OK) })
            }));

        assert_eq!(chain.stage_count(), 2);

        let mut ctx = RequestContext::new();
        chain.run(&mut ctx, request()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(ctx.response_status(), Some(StatusCode::OK));

        // The chain is reusable.
        let mut ctx = RequestContext::new();
        chain.run(&mut ctx, request()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_debug_lists_stages() {
        let chain = Chain::builder()
            .stages(global_stages())
            .build(FnHandler::new(|ctx, _req| {
                Box::pin(async move { ctx.respond_status(StatusCode::OK) })
            }));
        let debug = format!("{chain:?}");
        assert!(debug.contains("panic_guard"));
    }
}
