//! Telemetry configuration.

use crate::logging::LogConfig;
use crate::metrics::MetricsConfig;

/// What `init_telemetry` installs.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Logged once at startup.
    pub service_name: String,
    /// `production`, `staging` or `development`.
    pub environment: String,
    /// Prometheus exporter.
    pub metrics: MetricsConfig,
    /// Subscriber settings.
    pub logging: LogConfig,
}

impl TelemetryConfig {
    /// Starts from the defaults.
    #[must_use]
    pub fn builder() -> TelemetryConfigBuilder {
        TelemetryConfigBuilder::default()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "sales-api".into(),
            environment: "development".into(),
            metrics: MetricsConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

/// Fluent edits over a default [`TelemetryConfig`].
#[derive(Debug, Default)]
pub struct TelemetryConfigBuilder {
    config: TelemetryConfig,
}

impl TelemetryConfigBuilder {
    /// Sets the service name.
    #[must_use]
    pub fn service_name(mut self, name: &str) -> Self {
        self.config.service_name = name.into();
        self
    }

    /// Sets the environment.
    #[must_use]
    pub fn environment(mut self, env: &str) -> Self {
        self.config.environment = env.into();
        self
    }

    /// Replaces the metrics settings.
    #[must_use]
    pub fn metrics(mut self, metrics: MetricsConfig) -> Self {
        self.config.metrics = metrics;
        self
    }

    /// Replaces the logging settings.
    #[must_use]
    pub fn logging(mut self, logging: LogConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Turns the exporter on and points it at `addr`.
    #[must_use]
    pub fn metrics_addr(mut self, addr: &str) -> Self {
        self.config.metrics.enabled = true;
        self.config.metrics.addr = addr.into();
        self
    }

    /// Keeps the exporter address but never binds it.
    #[must_use]
    pub fn without_metrics(mut self) -> Self {
        self.config.metrics.enabled = false;
        self
    }

    /// Finishes the configuration.
    #[must_use]
    pub fn build(self) -> TelemetryConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untouched_builder_matches_default() {
        let built = TelemetryConfig::builder().build();
        let default = TelemetryConfig::default();
        assert_eq!(built.service_name, default.service_name);
        assert_eq!(built.environment, "development");
        assert!(built.metrics.enabled);
    }

    #[test]
    fn test_overrides_apply_in_order() {
        let config = TelemetryConfig::builder()
            .service_name("sales-api-canary")
            .environment("staging")
            .metrics_addr("127.0.0.1:9999")
            .without_metrics()
            .build();

        assert_eq!(config.service_name, "sales-api-canary");
        assert_eq!(config.environment, "staging");
        assert!(!config.metrics.enabled);
        assert_eq!(config.metrics.addr, "127.0.0.1:9999");
    }
}
