//! Middleware stages.
//!
//! Global stages, outermost first:
//!
//! 1. [`logger`] - request completion log line
//! 2. [`metrics`] - request counters and latency
//! 3. [`panic_guard`] - panics become 500 responses
//! 4. [`error_classifier`] - errors become status codes and bodies
//!
//! Per-route stages:
//!
//! 5. [`authenticate`] - bearer token validation
//! 6. [`authorize`] - role checks

pub mod authenticate;
pub mod authorize;
pub mod error_classifier;
pub mod logger;
pub mod metrics;
pub mod panic_guard;

pub use authenticate::AuthenticateMiddleware;
pub use authorize::AuthorizeMiddleware;
pub use error_classifier::ErrorClassifierMiddleware;
pub use logger::LoggerMiddleware;
pub use metrics::MetricsMiddleware;
pub use panic_guard::PanicGuardMiddleware;
