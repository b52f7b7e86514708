//! Per-request context.
//!
//! A [`RequestContext`] is created by dispatch for exactly one request and
//! threaded through every stage and the handler as `&mut`. It is never
//! shared between requests.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use http::StatusCode;
use serde::Serialize;
use warden_core::{ApiError, Claims, TraceId};

use crate::types::{empty_response, json_response, Response, StageResult};

/// Route label used before a route has been matched.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// State that flows through the middleware chain for one request.
///
/// # Example
///
/// ```
/// use http::StatusCode;
/// use warden_middleware::RequestContext;
///
/// let mut ctx = RequestContext::new();
/// assert!(!ctx.response_written());
///
/// ctx.respond_json(StatusCode::OK, &serde_json::json!({"status": "OK"})).unwrap();
/// assert!(ctx.response_written());
///
/// // A second response is a handler defect.
/// assert!(ctx.respond_json(StatusCode::OK, &()).is_err());
/// ```
#[derive(Debug)]
pub struct RequestContext {
    trace_id: TraceId,
    started_at: Instant,
    received_at: DateTime<Utc>,
    route: String,
    params: HashMap<String, String>,
    claims: Option<Claims>,
    response: Option<Response>,
}

impl RequestContext {
    /// Creates a context with a fresh trace id.
    #[must_use]
    pub fn new() -> Self {
        Self::with_trace_id(TraceId::new())
    }

    /// Creates a context with a specific trace id.
    #[must_use]
    pub fn with_trace_id(trace_id: TraceId) -> Self {
        Self {
            trace_id,
            started_at: Instant::now(),
            received_at: Utc::now(),
            route: UNMATCHED_ROUTE.to_string(),
            params: HashMap::new(),
            claims: None,
            response: None,
        }
    }

    /// Returns the trace id.
    #[must_use]
    pub const fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// Returns when processing started.
    #[must_use]
    pub const fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the wall-clock time the request was received.
    #[must_use]
    pub const fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Returns the time since processing started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Returns the matched route pattern, or [`UNMATCHED_ROUTE`].
    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Records the matched route pattern and its path parameters.
    pub fn set_route(&mut self, route: impl Into<String>, params: HashMap<String, String>) {
        self.route = route.into();
        self.params = params;
    }

    /// Returns a path parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Returns all path parameters.
    #[must_use]
    pub const fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// Returns the authenticated claims, if any.
    #[must_use]
    pub const fn claims(&self) -> Option<&Claims> {
        self.claims.as_ref()
    }

    /// Attaches the authenticated claims.
    ///
    /// Only the authenticate stage calls this.
    pub fn set_claims(&mut self, claims: Claims) {
        self.claims = Some(claims);
    }

    /// Returns true once a response has been written.
    #[must_use]
    pub const fn response_written(&self) -> bool {
        self.response.is_some()
    }

    /// Returns the status of the written response, if any.
    #[must_use]
    pub fn response_status(&self) -> Option<StatusCode> {
        self.response.as_ref().map(Response::status)
    }

    /// Writes the response for this request.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Internal` if a response was already written; the
    /// first response is kept.
    pub fn respond(&mut self, response: Response) -> StageResult {
        if self.response.is_some() {
            return Err(ApiError::internal(format!(
                "response already written for trace {}",
                self.trace_id
            )));
        }
        self.response = Some(response);
        Ok(())
    }

    /// Serializes `value` and writes it as a JSON response.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Internal` if serialization fails or a response was
    /// already written.
    pub fn respond_json<T: Serialize + ?Sized>(&mut self, status: StatusCode, value: &T) -> StageResult {
        let response = json_response(status, value)?;
        self.respond(response)
    }

    /// Writes a response with no body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Internal` if a response was already written.
    pub fn respond_status(&mut self, status: StatusCode) -> StageResult {
        self.respond(empty_response(status))
    }

    /// Removes and returns the written response.
    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
