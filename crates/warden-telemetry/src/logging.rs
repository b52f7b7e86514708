//! Structured logging through `tracing-subscriber`.
//!
//! Request logs use a fixed vocabulary: `trace_id`, `http.method`,
//! `http.path`, `route`, `http.status_code`, `duration_ms`, plus `error`,
//! `cause` and `subject` where they apply.

use std::fmt;
use std::str::FromStr;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// How each event is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON lines, for collectors.
    #[default]
    Json,
    /// Indented, colored text, for a terminal.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("json") {
            Ok(Self::Json)
        } else if s.eq_ignore_ascii_case("pretty") || s.eq_ignore_ascii_case("text") {
            Ok(Self::Pretty)
        } else {
            Err(TelemetryError::InvalidConfig(format!("log format must be json or pretty, got {s:?}")))
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
        })
    }
}

/// Subscriber settings.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// When false, no subscriber is installed.
    pub enabled: bool,
    /// `EnvFilter` directive.
    pub level: String,
    /// Rendering.
    pub format: LogFormat,
    /// Source file and line on every event.
    pub file_line_info: bool,
    /// Module path on every event.
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".into(),
            format: LogFormat::Json,
            file_line_info: false,
            include_target: true,
        }
    }
}

/// Installs the process-wide subscriber described by `config`.
///
/// # Errors
///
/// `TelemetryError::LoggingInit` for a bad filter directive or when a
/// subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| TelemetryError::LoggingInit(format!("bad filter {:?}: {e}", config.level)))?;

    let base = tracing_subscriber::fmt::layer()
        .with_file(config.file_line_info)
        .with_line_number(config.file_line_info)
        .with_target(config.include_target);
    let rendered: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Json => Box::new(base.json()),
        LogFormat::Pretty => Box::new(base.pretty()),
    };

    tracing_subscriber::registry()
        .with(rendered.with_filter(filter))
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names() {
        for (raw, want) in [("json", LogFormat::Json), ("JSON", LogFormat::Json), ("Pretty", LogFormat::Pretty), ("text", LogFormat::Pretty)] {
            assert_eq!(raw.parse::<LogFormat>().unwrap(), want, "{raw}");
        }
        assert!("logfmt".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_disabled_installs_nothing() {
        let config = LogConfig {
            enabled: false,
            level: "this is not a directive=".into(),
            ..LogConfig::default()
        };
        assert!(init_logging(&config).is_ok());
    }

    #[test]
    fn test_bad_directive_rejected() {
        let config = LogConfig {
            level: "warden_auth=loud".into(),
            ..LogConfig::default()
        };
        assert!(matches!(init_logging(&config), Err(TelemetryError::LoggingInit(_))));
    }
}
