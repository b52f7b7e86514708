//! Typed configuration for the warden service.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict parsing (unknown fields are errors)
//! - Layered loading (defaults → file → env)
//!
//! # Example
//!
//! ```no_run
//! use warden_config::ConfigLoader;
//!
//! # fn main() -> Result<(), warden_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_file("zarf/sales-api.toml")?
//!     .with_env_prefix("WARDEN")
//!     .load()?;
//!
//! println!("listening on {}", config.server.http_addr);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:3000"
//! debug_addr = "0.0.0.0:4000"
//! shutdown_timeout_secs = 20
//! request_timeout_ms = 5000
//! max_body_bytes = 1048576
//!
//! [auth]
//! keys_dir = "zarf/keys"
//! active_kid = "54bb2165-71e1-41a6-af3e-7da4a0e1e2c1"
//! algorithm = "RS256"
//! issuer = "service project"
//! token_ttl_secs = 3600
//! clock_skew_secs = 60
//! pin_issuer = false
//!
//! [telemetry]
//! service_name = "sales-api"
//! environment = "production"
//!
//! [telemetry.metrics]
//! enabled = true
//! addr = "0.0.0.0:9090"
//!
//! [telemetry.logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Keys use the form `PREFIX__SECTION__KEY`:
//!
//! - `WARDEN__SERVER__HTTP_ADDR=0.0.0.0:9000`
//! - `WARDEN__AUTH__ACTIVE_KID=rotated-2025`
//! - `WARDEN__TELEMETRY__LOGGING__FORMAT=pretty`

#![doc(html_root_url = "https://docs.rs/warden-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::*;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
