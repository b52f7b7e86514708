//! Request metrics stage.
//!
//! Records `warden_requests_total{route,status}`,
//! `warden_request_duration_seconds{route}` and the in-flight gauge through
//! `warden_telemetry::metrics`.

use http::StatusCode;
use warden_telemetry::metrics::{record_request, InFlightGuard};

use crate::{
    context::RequestContext,
    middleware::{BoxFuture, Middleware, Next},
    types::{Request, StageResult},
};

/// Records request count, latency and concurrency.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsMiddleware;

impl MetricsMiddleware {
    /// Creates a new metrics stage.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for MetricsMiddleware {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            let _in_flight = InFlightGuard::new();

            let result = next.run(ctx, request).await;

            let status = ctx
                .response_status()
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            record_request(ctx.route(), status.as_u16(), ctx.elapsed());

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
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::collections::HashMap;

    #[test]
    fn test_records_route_and_status() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        let chain = Chain::builder()
            .stage(MetricsMiddleware::new())
            .build(FnHandler::new(|ctx, _req| {
                Box::pin(async move { ctx.respond_status(StatusCode::NO_CONTENT) })
            }));

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        metrics::with_local_recorder(&recorder, || {
            runtime.block_on(async {
                let mut ctx = RequestContext::new();
                ctx.set_route("/users/{id}", HashMap::new());
                let request = http::Request::builder()
                    .uri("/users/1")
                    .body(Full::new(Bytes::new()))
                    .unwrap();
                chain.run(&mut ctx, request).await.unwrap();
            });
        });

        let output = handle.render();
        assert!(output.contains("warden_requests_total"));
        assert!(output.contains(r#"route="/users/{id}""#));
        assert!(output.contains(r#"status="204""#));
    }
}
