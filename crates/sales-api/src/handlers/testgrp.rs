//! Liveness-style test route, public and admin-gated.

use http::StatusCode;
use serde::Serialize;
use warden_middleware::{BoxFuture, Handler, Request, RequestContext, StageResult};

#[derive(Serialize)]
struct Status {
    status: &'static str,
}

/// Responds `{"status":"OK"}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusHandler;

impl Handler for StatusHandler {
    fn call<'a>(&'a self, ctx: &'a mut RequestContext, _request: Request) -> BoxFuture<'a, StageResult> {
        Box::pin(async move { ctx.respond_json(StatusCode::OK, &Status { status: "OK" }) })
    }
}
