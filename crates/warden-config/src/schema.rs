//! Section types of `sales-api.toml`.
//!
//! Each section is filled from its `Default` impl first, so a file only
//! names the keys it changes. Unknown keys are rejected.

use serde::{Deserialize, Serialize};

/// Values used for keys a file leaves out.
pub mod defaults {
    /// API listener.
    pub const HTTP_ADDR: &str = "0.0.0.0:3000";
    /// Probe listener.
    pub const DEBUG_ADDR: &str = "0.0.0.0:4000";
    /// Drain budget, seconds.
    pub const SHUTDOWN_TIMEOUT_SECS: u64 = 20;
    /// Body read budget, milliseconds.
    pub const REQUEST_TIMEOUT_MS: u64 = 5000;
    /// 1 MiB.
    pub const MAX_BODY_BYTES: usize = 1 << 20;

    /// Relative to the working directory.
    pub const KEYS_DIR: &str = "zarf/keys";
    /// The development key shipped in `zarf/keys`.
    pub const ACTIVE_KID: &str = "54bb2165-71e1-41a6-af3e-7da4a0e1e2c1";
    /// Signing algorithm.
    pub const ALGORITHM: &str = "RS256";
    /// `iss` of minted tokens.
    pub const ISSUER: &str = "service project";
    /// One hour.
    pub const TOKEN_TTL_SECS: u64 = 3600;

    /// Service name.
    pub const SERVICE_NAME: &str = "sales-api";
    /// Environment label.
    pub const ENVIRONMENT: &str = "development";
    /// Prometheus listener.
    pub const METRICS_ADDR: &str = "0.0.0.0:9090";
    /// Filter directive.
    pub const LOG_LEVEL: &str = "info";
}

/// `[server]`: listeners and per-request limits.
///
/// ```
/// use warden_config::ServerConfig;
///
/// let server: ServerConfig = toml::from_str("http_addr = \"127.0.0.1:8080\"").unwrap();
/// assert_eq!(server.http_addr, "127.0.0.1:8080");
/// assert_eq!(server.shutdown_timeout_secs, 20);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// API listen address.
    pub http_addr: String,
    /// Liveness/readiness listen address.
    pub debug_addr: String,
    /// Drain budget for in-flight requests.
    pub shutdown_timeout_secs: u64,
    /// Budget for reading one request body.
    pub request_timeout_ms: u64,
    /// Larger bodies get 413.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: defaults::HTTP_ADDR.into(),
            debug_addr: defaults::DEBUG_ADDR.into(),
            shutdown_timeout_secs: defaults::SHUTDOWN_TIMEOUT_SECS,
            request_timeout_ms: defaults::REQUEST_TIMEOUT_MS,
            max_body_bytes: defaults::MAX_BODY_BYTES,
        }
    }
}

/// `[auth]`: where keys live and how tokens are minted and checked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// One `<kid>.pem` per key.
    pub keys_dir: String,
    /// Signs new tokens; must have a private key.
    pub active_kid: String,
    /// Must be on the RSA allow-list.
    pub algorithm: String,
    /// `iss` of new tokens.
    pub issuer: String,
    /// Lifetime of new tokens.
    pub token_ttl_secs: u64,
    /// Tolerance for `iat` in the future.
    pub clock_skew_secs: u64,
    /// Reject tokens from any other issuer.
    pub pin_issuer: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            keys_dir: defaults::KEYS_DIR.into(),
            active_kid: defaults::ACTIVE_KID.into(),
            algorithm: defaults::ALGORITHM.into(),
            issuer: defaults::ISSUER.into(),
            token_ttl_secs: defaults::TOKEN_TTL_SECS,
            clock_skew_secs: warden_auth::DEFAULT_CLOCK_SKEW_SECS.unsigned_abs(),
            pin_issuer: false,
        }
    }
}

/// `[telemetry.metrics]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    /// Bind the Prometheus listener.
    pub enabled: bool,
    /// Scrape address.
    pub addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            addr: defaults::METRICS_ADDR.into(),
        }
    }
}

/// Written as `"json"` or `"pretty"`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line, colored.
    Pretty,
}

/// `[telemetry.logging]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Install a subscriber at all.
    pub enabled: bool,
    /// `EnvFilter` directive, e.g. `info` or `warden_auth=debug,info`.
    pub level: String,
    /// Output shape.
    pub format: LogFormat,
    /// Add file and line to each event.
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: defaults::LOG_LEVEL.into(),
            format: LogFormat::Json,
            include_location: false,
        }
    }
}

/// `[telemetry]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfigSection {
    /// Logged once at startup.
    pub service_name: String,
    /// Free-form, e.g. `staging`.
    pub environment: String,
    /// `[telemetry.metrics]`
    pub metrics: MetricsConfig,
    /// `[telemetry.logging]`
    pub logging: LoggingConfig,
}

impl Default for TelemetryConfigSection {
    fn default() -> Self {
        Self {
            service_name: defaults::SERVICE_NAME.into(),
            environment: defaults::ENVIRONMENT.into(),
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TelemetryConfigSection {
    /// The settings `warden_telemetry::init_telemetry` takes.
    #[must_use]
    pub fn to_telemetry_config(&self) -> warden_telemetry::TelemetryConfig {
        let logging = &self.logging;
        let log = warden_telemetry::LogConfig {
            enabled: logging.enabled,
            level: logging.level.clone(),
            format: match logging.format {
                LogFormat::Json => warden_telemetry::LogFormat::Json,
                LogFormat::Pretty => warden_telemetry::LogFormat::Pretty,
            },
            file_line_info: logging.include_location,
            include_target: true,
        };
        let metrics = warden_telemetry::MetricsConfig {
            enabled: self.metrics.enabled,
            addr: self.metrics.addr.clone(),
        };

        warden_telemetry::TelemetryConfig {
            service_name: self.service_name.clone(),
            environment: self.environment.clone(),
            metrics,
            logging: log,
        }
    }
}
