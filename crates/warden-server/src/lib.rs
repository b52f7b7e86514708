//! HTTP serving for the warden service.
//!
//! - [`App`]: route registration and per-request dispatch over
//!   `warden-middleware` chains, one response per request
//! - [`Server`]: Hyper HTTP/1.1 listeners for the API and the debug probes
//! - [`ShutdownCoordinator`]: merges OS signals and in-band shutdown errors
//!   into a single drain
//!
//! # Example
//!
//! ```rust,no_run
//! use http::{Method, StatusCode};
//! use warden_middleware::FnHandler;
//! use warden_server::{App, Server, ServerConfig, ShutdownCoordinator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), warden_server::ServerError> {
//!     let shutdown = ShutdownCoordinator::new();
//!     shutdown.listen_for_os_signals();
//!
//!     let mut app = App::new(shutdown);
//!     app.register(
//!         Method::GET,
//!         "/test",
//!         FnHandler::new(|ctx, _req| {
//!             Box::pin(async move { ctx.respond_json(StatusCode::OK, &serde_json::json!({"status": "OK"})) })
//!         }),
//!         Vec::new(),
//!     );
//!
//!     let config = ServerConfig::builder().http_addr("127.0.0.1:3000").build();
//!     Server::new(app, config).run().await
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/warden-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
mod config;
mod error;
mod health;
pub mod router;
mod server;
pub mod shutdown;

pub use app::{App, TRACE_ID_HEADER};
pub use config::{ServerConfig, ServerConfigBuilder};
pub use error::ServerError;
pub use health::{
    HealthCheck, LivenessStatus, ReadinessCheck, ReadinessStatus, LIVENESS_PATH, READINESS_PATH,
};
pub use server::{BoundServer, Server};
pub use shutdown::{ShutdownCoordinator, ShutdownReason};
