//! Request logging stage.
//!
//! Emits one `info` event per completed request with the trace id, method,
//! path, matched route, status and duration. Errors are logged by the
//! error classifier, not here.

use http::StatusCode;

use crate::{
    context::RequestContext,
    middleware::{BoxFuture, Middleware, Next},
    types::{Request, StageResult},
};

/// Outermost stage: logs request start and completion.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggerMiddleware;

impl LoggerMiddleware {
    /// Creates a new logger stage.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for LoggerMiddleware {
    fn name(&self) -> &'static str {
        "logger"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            let method = request.method().clone();
            let path = request.uri().path().to_string();

            tracing::debug!(
                trace_id = %ctx.trace_id(),
                http.method = %method,
                http.path = %path,
                "request started"
            );

            let result = next.run(ctx, request).await;

            let status = ctx
                .response_status()
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            tracing::info!(
                trace_id = %ctx.trace_id(),
                http.method = %method,
                http.path = %path,
                route = ctx.route(),
                http.status_code = status.as_u16(),
                duration_ms = ctx.elapsed().as_secs_f64() * 1000.0,
                "request completed"
            );

            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::FnHandler;
    use crate::Chain;
    use bytes::Bytes;
    use http_body_util::Full;
    use warden_core::ApiError;

    fn request() -> Request {
        http::Request::builder()
            .uri("/test")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_passes_result_through() {
        let chain = Chain::builder()
            .stage(LoggerMiddleware::new())
            .build(FnHandler::new(|_ctx, _req| {
                Box::pin(async { StageResult::Err(ApiError::not_found("nothing here")) })
            }));

        let mut ctx = RequestContext::new();
        let err = chain.run(&mut ctx, request()).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_keeps_response() {
        let chain = Chain::builder()
            .stage(LoggerMiddleware::new())
            .build(FnHandler::new(|ctx, _req| {
                Box::pin(async move { ctx.respond_status(StatusCode::OK) })
            }));

        let mut ctx = RequestContext::new();
        chain.run(&mut ctx, request()).await.unwrap();
        assert_eq!(ctx.response_status(), Some(StatusCode::OK));
    }
}
