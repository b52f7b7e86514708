//! Panic containment stage.
//!
//! Runs the inner chain under `catch_unwind`. A panic is logged with its
//! payload, source location, backtrace and trace id, then turned into a 500
//! response. Nothing unwinds past this stage.
//!
//! `catch_unwind` only sees the payload, so a process-wide panic hook
//! records where the panic happened into a thread-local. The unwind stays on
//! the panicking thread until it is caught, so the guard reads the record
//! back on the same thread.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use futures_util::FutureExt;
use warden_core::ApiError;
use warden_telemetry::metrics::record_panic;

use crate::{
    context::RequestContext,
    middleware::{BoxFuture, Middleware, Next},
    types::{error_response, Request, StageResult},
};

/// Where a panic happened, as recorded by the hook.
#[derive(Debug)]
pub struct PanicReport {
    /// `file:line:column` of the panic, when the runtime reports one.
    pub location: Option<String>,
    /// Captured per `RUST_BACKTRACE`; disabled otherwise.
    pub backtrace: Backtrace,
}

thread_local! {
    static LAST_PANIC: RefCell<Option<PanicReport>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Installs the recording hook in front of the current one. Idempotent.
pub fn install_panic_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let report = PanicReport {
                location: info.location().map(ToString::to_string),
                backtrace: Backtrace::capture(),
            };
            LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(report));
            previous(info);
        }));
    });
}

/// Takes the report of the latest panic on this thread.
#[must_use]
pub fn take_panic_report() -> Option<PanicReport> {
    LAST_PANIC.with(|slot| slot.borrow_mut().take())
}

/// Converts panics in downstream stages and handlers into 500 responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanicGuardMiddleware;

impl PanicGuardMiddleware {
    /// Creates a new panic guard.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for PanicGuardMiddleware {
    fn name(&self) -> &'static str {
        "panic_guard"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult> {
        install_panic_hook();
        Box::pin(async move {
            let outcome = AssertUnwindSafe(next.run(ctx, request)).catch_unwind().await;

            match outcome {
                Ok(result) => result,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    let report = take_panic_report();
                    let location = report
                        .as_ref()
                        .and_then(|r| r.location.as_deref())
                        .unwrap_or("unknown");
                    let backtrace = report
                        .as_ref()
                        .map_or_else(String::new, |r| r.backtrace.to_string());
                    record_panic();
                    tracing::error!(
                        trace_id = %ctx.trace_id(),
                        panic = %message,
                        location = %location,
                        backtrace = %backtrace,
                        "handler panicked"
                    );

                    if !ctx.response_written() {
                        let err = ApiError::internal(format!("panic: {message}"));
                        ctx.respond(error_response(&err))?;
                    }
                    Ok(())
                }
            }
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::FnHandler;
    use crate::Chain;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::{BodyExt, Full};
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn explode(message: &str) -> StageResult {
        panic!("{message}")
    }

    fn request() -> Request {
        http::Request::builder()
            .uri("/boom")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_panic_becomes_500() {
        let chain = Chain::builder()
            .stage(PanicGuardMiddleware::new())
            .build(FnHandler::new(|_ctx, _req| {
                Box::pin(async { explode("index out of bounds") })
            }));

        let mut ctx = RequestContext::new();
        chain.run(&mut ctx, request()).await.unwrap();

        let response = ctx.take_response().unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, serde_json::json!({"error": "Internal Server Error"}));
    }

    #[tokio::test]
    async fn test_panic_after_response_keeps_it() {
        let chain = Chain::builder()
            .stage(PanicGuardMiddleware::new())
            .build(FnHandler::new(|ctx, _req| {
                Box::pin(async move {
                    ctx.respond_status(StatusCode::ACCEPTED)?;
                    explode("late failure")
                })
            }));

        let mut ctx = RequestContext::new();
        chain.run(&mut ctx, request()).await.unwrap();
        assert_eq!(ctx.response_status(), Some(StatusCode::ACCEPTED));
    }

    #[tokio::test]
    async fn test_errors_pass_through() {
        let chain = Chain::builder()
            .stage(PanicGuardMiddleware::new())
            .build(FnHandler::new(|_ctx, _req| {
                Box::pin(async { StageResult::Err(ApiError::bad_request("bad page")) })
            }));

        let mut ctx = RequestContext::new();
        let err = chain.run(&mut ctx, request()).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!ctx.response_written());
    }

    #[test]
    fn test_hook_records_location() {
        install_panic_hook();
        let line = line!() + 1;
        let caught = panic::catch_unwind(|| panic!("direct"));
        assert!(caught.is_err());

        let report = take_panic_report().unwrap();
        let location = report.location.unwrap();
        assert!(location.starts_with(&format!("{}:{line}:", file!())), "{location}");
        assert!(take_panic_report().is_none());
    }

    #[tokio::test]
    async fn test_panic_log_carries_location() {
        let logs = Captured::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _default = tracing::subscriber::set_default(subscriber);

        let chain = Chain::builder()
            .stage(PanicGuardMiddleware::new())
            .build(FnHandler::new(|_ctx, _req| {
                Box::pin(async { explode("slot poisoned") })
            }));
        let mut ctx = RequestContext::new();
        chain.run(&mut ctx, request()).await.unwrap();

        let text = logs.text();
        assert!(text.contains("handler panicked"), "{text}");
        assert!(text.contains("panic=slot poisoned"), "{text}");
        assert!(text.contains(&format!("location={}:", file!())), "{text}");
        assert!(text.contains("backtrace="), "{text}");
        assert!(take_panic_report().is_none());
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(payload.as_ref()), "static str");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
