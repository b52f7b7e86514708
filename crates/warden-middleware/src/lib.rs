//! # Warden Middleware
//!
//! The ordered request middleware chain of the warden service.
//!
//! Every request runs through a [`Chain`]: a list of stages wrapped around
//! a handler, outermost first. Stages and handlers share one
//! [`RequestContext`] per request and return a [`StageResult`]; errors
//! travel outward as [`ApiError`](warden_core::ApiError) until the error
//! classifier turns them into a response.
//!
//! ## Canonical Wiring
//!
//! ```text
//! Request → Logger → Metrics → PanicGuard → ErrorClassifier → Authenticate → Authorize → Handler
//!                                                                                          ↓
//! Response ←──────────────────── errors and the written response flow back ←──────────────┘
//! ```
//!
//! | Stage | Middleware | Purpose |
//! |-------|------------|---------|
//! | 1 | Logger | One log line per completed request |
//! | 2 | Metrics | Request counter, latency histogram, in-flight gauge |
//! | 3 | PanicGuard | Panics become 500 responses |
//! | 4 | ErrorClassifier | `ApiError` becomes status and JSON body |
//! | 5 | Authenticate | Bearer token validation (401) |
//! | 6 | Authorize | Role check (403) |
//!
//! Stages 1-4 are global; 5-6 are attached per route.
//!
//! ## Example
//!
//! ```
//! use warden_middleware::chain::Stage;
//!
//! let stages = Stage::all();
//! assert_eq!(stages[0].name(), "logger");
//! assert_eq!(stages[5].name(), "authorize");
//! ```

#![doc(html_root_url = "https://docs.rs/warden-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chain;
pub mod context;
pub mod middleware;
pub mod stages;
pub mod types;

pub use chain::{global_stages, BoxedHandler, BoxedMiddleware, Chain, ChainBuilder, Stage};
pub use context::RequestContext;
pub use middleware::{BoxFuture, FnHandler, Handler, Middleware, Next};
pub use types::{empty_response, error_response, json_response, Request, Response, StageResult};
