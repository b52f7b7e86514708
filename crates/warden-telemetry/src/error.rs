//! Telemetry error types.

use thiserror::Error;

/// Logging or metrics could not be installed.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Recorder or Prometheus listener setup failed.
    #[error("metrics setup failed: {0}")]
    MetricsInit(String),

    /// Subscriber setup failed.
    #[error("logging setup failed: {0}")]
    LoggingInit(String),

    /// A setting has an unrecognised value.
    #[error("invalid telemetry setting: {0}")]
    InvalidConfig(String),

    /// The metrics listen address does not parse.
    #[error("invalid metrics address {0:?}")]
    InvalidAddress(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_detail() {
        let err = TelemetryError::MetricsInit("recorder already set".into());
        assert_eq!(err.to_string(), "metrics setup failed: recorder already set");

        let err = TelemetryError::InvalidAddress("nowhere".into());
        assert_eq!(err.to_string(), "invalid metrics address \"nowhere\"");
    }
}
