//! Route registration and per-request dispatch.
//!
//! [`App`] owns the routing table. Each route holds a prebuilt
//! [`Chain`] of the global stages, the route's own stages, and its
//! handler. [`App::dispatch`] turns one request into exactly one response.
//!
//! # Example
//!
//! ```
//! use http::{Method, StatusCode};
//! use warden_middleware::FnHandler;
//! use warden_server::{App, ShutdownCoordinator};
//!
//! let mut app = App::new(ShutdownCoordinator::new());
//! app.register(
//!     Method::GET,
//!     "/test",
//!     FnHandler::new(|ctx, _req| {
//!         Box::pin(async move { ctx.respond_json(StatusCode::OK, &serde_json::json!({"status": "OK"})) })
//!     }),
//!     Vec::new(),
//! );
//! assert_eq!(app.route_count(), 1);
//! ```

use http::{HeaderName, HeaderValue, Method, StatusCode};
use tracing::error;
use warden_core::ApiError;
use warden_middleware::{
    error_response, global_stages, BoxFuture, BoxedMiddleware, Chain, Handler, Request, RequestContext,
    Response, StageResult,
};

use crate::router::{Resolution, Router};
use crate::shutdown::{ShutdownCoordinator, ShutdownReason};

/// Response header carrying the request's trace id.
pub const TRACE_ID_HEADER: HeaderName = HeaderName::from_static("x-trace-id");

/// Fails every request with a fixed request error.
struct StatusHandler {
    status: StatusCode,
    message: &'static str,
}

impl Handler for StatusHandler {
    fn call<'a>(&'a self, _ctx: &'a mut RequestContext, _request: Request) -> BoxFuture<'a, StageResult> {
        Box::pin(async move { StageResult::Err(ApiError::request(self.status, self.message)) })
    }
}

/// The routing table plus the stages every request runs through.
pub struct App {
    router: Router<Chain>,
    global: Vec<BoxedMiddleware>,
    not_found: Chain,
    method_not_allowed: Chain,
    shutdown: ShutdownCoordinator,
}

impl App {
    /// Creates an app with the standard global stages.
    #[must_use]
    pub fn new(shutdown: ShutdownCoordinator) -> Self {
        Self::with_global_stages(shutdown, global_stages())
    }

    /// Creates an app with custom global stages, outermost first.
    #[must_use]
    pub fn with_global_stages(shutdown: ShutdownCoordinator, global: Vec<BoxedMiddleware>) -> Self {
        let fallback = |status: StatusCode, message: &'static str| {
            Chain::builder()
                .stages(global.iter().cloned())
                .build(StatusHandler { status, message })
        };

        Self {
            router: Router::new(),
            not_found: fallback(StatusCode::NOT_FOUND, "route not found"),
            method_not_allowed: fallback(StatusCode::METHOD_NOT_ALLOWED, "method not allowed"),
            global,
            shutdown,
        }
    }

    /// Registers `handler` at `method` and `pattern` behind the global
    /// stages followed by `stages`.
    pub fn register<H: Handler>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: H,
        stages: Vec<BoxedMiddleware>,
    ) -> &mut Self {
        let chain = Chain::builder()
            .stages(self.global.iter().cloned())
            .stages(stages)
            .build(handler);

        tracing::debug!(http.method = %method, route = pattern, stages = ?chain.stage_names(), "route registered");
        self.router.add_route(method, pattern, chain);
        self
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.router.route_count()
    }

    /// Returns the shutdown coordinator escaped shutdown errors trigger.
    #[must_use]
    pub const fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// Runs one request through its chain and returns its response.
    ///
    /// Never fails: a chain that ends without a response, or with an error
    /// no stage handled, produces a generic 500.
    pub async fn dispatch(&self, request: Request) -> Response {
        let mut ctx = RequestContext::new();

        let chain = match self.router.resolve(request.method(), request.uri().path()) {
            Resolution::Matched { route, params } => {
                ctx.set_route(route.pattern(), params);
                route.target()
            }
            Resolution::MethodNotAllowed => &self.method_not_allowed,
            Resolution::NotFound => &self.not_found,
        };

        self.finish(chain, ctx, request).await
    }

    /// Answers `request` with a request error instead of its route.
    ///
    /// Used when the request fails before dispatch, such as an oversized or
    /// slow body. The global stages still run, so the rejection is logged,
    /// counted, and carries a trace id like any other response.
    pub async fn reject(&self, request: Request, status: StatusCode, message: &'static str) -> Response {
        let mut ctx = RequestContext::new();
        if let Resolution::Matched { route, params } = self.router.resolve(request.method(), request.uri().path()) {
            ctx.set_route(route.pattern(), params);
        }

        let chain = Chain::builder()
            .stages(self.global.iter().cloned())
            .build(StatusHandler { status, message });
        self.finish(&chain, ctx, request).await
    }

    async fn finish(&self, chain: &Chain, mut ctx: RequestContext, request: Request) -> Response {
        let result = chain.run(&mut ctx, request).await;

        let response = match (result, ctx.take_response()) {
            (Ok(()), Some(response)) => response,
            (Ok(()), None) => {
                error!(
                    trace_id = %ctx.trace_id(),
                    route = ctx.route(),
                    "request chain completed without writing a response"
                );
                error_response(&ApiError::internal("no response written"))
            }
            (Err(err), written) => {
                self.escaped(&ctx, &err);
                written.unwrap_or_else(|| error_response(&ApiError::internal("unhandled error")))
            }
        };

        with_trace_id(response, &ctx)
    }

    fn escaped(&self, ctx: &RequestContext, err: &ApiError) {
        error!(
            trace_id = %ctx.trace_id(),
            route = ctx.route(),
            category = err.category().as_str(),
            error = %err,
            "error escaped the request chain"
        );

        if let ApiError::Shutdown { message } = err {
            self.shutdown.trigger(ShutdownReason::InBand(message.clone()));
        }
    }
}

fn with_trace_id(mut response: Response, ctx: &RequestContext) -> Response {
    if let Ok(value) = HeaderValue::from_str(&ctx.trace_id().to_string()) {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }
    response
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("routes", &self.router.route_count())
            .field("global_stages", &self.global.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::{BodyExt, Full};
    use warden_middleware::FnHandler;

    fn request(method: Method, path: &str) -> Request {
        http::Request::builder()
            .method(method)
            .uri(path)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn ok_handler() -> impl Handler {
        FnHandler::new(|ctx, _req| {
            Box::pin(async move { ctx.respond_json(StatusCode::OK, &serde_json::json!({"status": "OK"})) })
        })
    }

    fn app() -> App {
        let mut app = App::new(ShutdownCoordinator::new());
        app.register(Method::GET, "/test", ok_handler(), Vec::new());
        app.register(
            Method::GET,
            "/users/{id}",
            FnHandler::new(|ctx, _req| {
                Box::pin(async move {
                    let id = ctx.param("id").unwrap_or_default().to_string();
                    ctx.respond_json(StatusCode::OK, &serde_json::json!({ "id": id }))
                })
            }),
            Vec::new(),
        );
        app.register(
            Method::GET,
            "/silent",
            FnHandler::new(|_ctx, _req| Box::pin(async { StageResult::Ok(()) })),
            Vec::new(),
        );
        app
    }

    #[tokio::test]
    async fn test_dispatch_matched() {
        let response = app().dispatch(request(Method::GET, "/test")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(TRACE_ID_HEADER));
        assert_eq!(body_json(response).await, serde_json::json!({"status": "OK"}));
    }

    #[tokio::test]
    async fn test_dispatch_params() {
        let response = app().dispatch(request(Method::GET, "/users/abc")).await;
        assert_eq!(body_json(response).await, serde_json::json!({"id": "abc"}));
    }

    #[tokio::test]
    async fn test_dispatch_not_found() {
        let response = app().dispatch(request(Method::GET, "/products")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key(TRACE_ID_HEADER));
        assert_eq!(body_json(response).await, serde_json::json!({"error": "route not found"}));
    }

    #[tokio::test]
    async fn test_dispatch_method_not_allowed() {
        let response = app().dispatch(request(Method::DELETE, "/test")).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_reject_skips_route_handler() {
        let response = app()
            .reject(request(Method::GET, "/test"), StatusCode::PAYLOAD_TOO_LARGE, "request body too large")
            .await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(response.headers().contains_key(TRACE_ID_HEADER));
        assert_eq!(body_json(response).await, serde_json::json!({"error": "request body too large"}));
    }

    #[tokio::test]
    async fn test_dispatch_missing_response_is_500() {
        let response = app().dispatch(request(Method::GET, "/silent")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Internal Server Error"})
        );
    }

    #[tokio::test]
    async fn test_escaped_shutdown_triggers_coordinator() {
        let shutdown = ShutdownCoordinator::new();
        let mut app = App::new(shutdown.clone());
        app.register(
            Method::GET,
            "/integrity",
            FnHandler::new(|_ctx, _req| {
                Box::pin(async { StageResult::Err(ApiError::shutdown("ledger integrity check failed")) })
            }),
            Vec::new(),
        );

        let response = app.dispatch(request(Method::GET, "/integrity")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            shutdown.reason(),
            Some(ShutdownReason::InBand("ledger integrity check failed".to_string()))
        );
    }

    #[tokio::test]
    async fn test_escaped_error_without_global_stages() {
        let shutdown = ShutdownCoordinator::new();
        let mut app = App::with_global_stages(shutdown.clone(), Vec::new());
        app.register(
            Method::GET,
            "/bare",
            FnHandler::new(|_ctx, _req| Box::pin(async { StageResult::Err(ApiError::bad_request("bad")) })),
            Vec::new(),
        );

        let response = app.dispatch(request(Method::GET, "/bare")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!shutdown.is_triggered());
    }
}
