//! Logging and metrics for the warden service.
//!
//! [`init_telemetry`] installs a `tracing-subscriber` registry (JSON or
//! pretty) and, when enabled, a Prometheus recorder with its scrape
//! listener. Both are process-wide, so call it once from `main`.
//!
//! ```rust,ignore
//! let config = warden_telemetry::TelemetryConfig::builder()
//!     .environment("production")
//!     .metrics_addr("0.0.0.0:9090")
//!     .build();
//! warden_telemetry::init_telemetry(&config)?;
//! ```

#![doc(html_root_url = "https://docs.rs/warden-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use config::{TelemetryConfig, TelemetryConfigBuilder};
pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat};
pub use metrics::{init_metrics, InFlightGuard, MetricsConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Installs logging first, then metrics.
///
/// Call once, inside the Tokio runtime.
///
/// # Errors
///
/// Returns `TelemetryError` if either subsystem fails to initialize.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;

    tracing::info!(
        service = %config.service_name,
        environment = %config.environment,
        log_format = %config.logging.format,
        metrics_enabled = config.metrics.enabled,
        "telemetry initialized"
    );
    Ok(())
}
