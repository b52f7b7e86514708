//! Error classification stage.
//!
//! Turns an [`ApiError`] returned by an inner stage or the handler into the
//! client response for its category:
//!
//! | Error | Status | Body |
//! |---|---|---|
//! | Validation | 400 | `{"error": msg, "fields": [...]}` |
//! | Request | chosen status | `{"error": msg}` |
//! | Authentication | 401 | `{"error": "Unauthorized"}` |
//! | Authorization | 403 | `{"error": "Forbidden"}` |
//! | Internal, Shutdown | 500 | `{"error": "Internal Server Error"}` |
//!
//! The full error, including causes that never reach the client, is logged
//! with the trace id. A shutdown error is returned again after the response
//! is written so dispatch can hand it to the shutdown coordinator.

use warden_core::ApiError;

use crate::{
    context::RequestContext,
    middleware::{BoxFuture, Middleware, Next},
    types::{error_response, Request, StageResult},
};

/// Maps errors onto HTTP responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorClassifierMiddleware;

impl ErrorClassifierMiddleware {
    /// Creates a new error classifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for ErrorClassifierMiddleware {
    fn name(&self) -> &'static str {
        "error_classifier"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            let Err(err) = next.run(ctx, request).await else {
                return Ok(());
            };

            log_error(ctx, &err);

            if !ctx.response_written() {
                ctx.respond(error_response(&err))?;
            }

            if err.is_shutdown() {
                return Err(err);
            }
            Ok(())
        })
    }
}

fn log_error(ctx: &RequestContext, err: &ApiError) {
    let status = err.status_code();
    let category = err.category().as_str();

    if status.is_server_error() {
        match err {
            ApiError::Internal {
                source: Some(source),
                ..
            } => tracing::error!(
                trace_id = %ctx.trace_id(),
                http.status_code = status.as_u16(),
                category,
                error = %err,
                source = %source,
                "request failed"
            ),
            _ => tracing::error!(
                trace_id = %ctx.trace_id(),
                http.status_code = status.as_u16(),
                category,
                error = %err,
                "request failed"
            ),
        }
    } else {
        tracing::warn!(
            trace_id = %ctx.trace_id(),
            http.status_code = status.as_u16(),
            category,
            error = %err,
            "request rejected"
        );
    }
}
