//! The whole service configuration and its cross-field checks.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::{AuthConfig, ConfigError, ServerConfig, TelemetryConfigSection};

/// Longest token lifetime accepted: one year.
pub const MAX_TOKEN_TTL_SECS: u64 = 366 * 24 * 60 * 60;

/// Largest tolerated clock skew: one day.
pub const MAX_CLOCK_SKEW_SECS: u64 = 24 * 60 * 60;

/// Everything `sales-api` reads at startup.
///
/// Build one with [`ConfigLoader`](crate::ConfigLoader); the defaults alone
/// are a valid development setup.
///
/// ```
/// use warden_config::WardenConfig;
///
/// let config = WardenConfig::default();
/// assert_eq!(config.auth.algorithm, "RS256");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct WardenConfig {
    /// `[server]`
    pub server: ServerConfig,
    /// `[auth]`
    pub auth: AuthConfig,
    /// `[telemetry]`
    pub telemetry: TelemetryConfigSection,
}

impl WardenConfig {
    /// Checks what serde cannot: addresses parse, limits are non-zero and
    /// bounded, and the signing algorithm is on the allow-list.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidValue` for the first field that fails, named by
    /// its dotted path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let server = &self.server;
        let auth = &self.auth;
        let metrics = &self.telemetry.metrics;

        socket_addr("server.http_addr", &server.http_addr)?;
        socket_addr("server.debug_addr", &server.debug_addr)?;
        if metrics.enabled {
            socket_addr("telemetry.metrics.addr", &metrics.addr)?;
        }

        for (field, value) in [
            ("server.request_timeout_ms", server.request_timeout_ms),
            ("server.max_body_bytes", server.max_body_bytes as u64),
            ("auth.token_ttl_secs", auth.token_ttl_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::invalid_value(field, "must be greater than zero"));
            }
        }

        for (field, value, max) in [
            ("auth.token_ttl_secs", auth.token_ttl_secs, MAX_TOKEN_TTL_SECS),
            ("auth.clock_skew_secs", auth.clock_skew_secs, MAX_CLOCK_SKEW_SECS),
        ] {
            if value > max {
                return Err(ConfigError::invalid_value(field, format!("must be at most {max}")));
            }
        }

        for (field, value) in [("auth.keys_dir", &auth.keys_dir), ("auth.active_kid", &auth.active_kid)] {
            if value.trim().is_empty() {
                return Err(ConfigError::invalid_value(field, "must not be empty"));
            }
        }

        warden_auth::validation::accepted_algorithm(&auth.algorithm)
            .map(drop)
            .map_err(|e| ConfigError::invalid_value("auth.algorithm", e.to_string()))
    }
}

fn socket_addr(field: &str, value: &str) -> Result<SocketAddr, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::invalid_value(field, format!("{value:?} is not a socket address")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid_field(config: &WardenConfig) -> String {
        match config.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => field,
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_validate() {
        assert!(WardenConfig::default().validate().is_ok());
    }

    #[test]
    fn test_bad_addresses() {
        let mut config = WardenConfig::default();
        config.server.debug_addr = "localhost".to_string();
        assert_eq!(invalid_field(&config), "server.debug_addr");

        let mut config = WardenConfig::default();
        config.telemetry.metrics.addr = "nowhere".to_string();
        assert_eq!(invalid_field(&config), "telemetry.metrics.addr");

        config.telemetry.metrics.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_limits() {
        let mut config = WardenConfig::default();
        config.server.max_body_bytes = 0;
        assert_eq!(invalid_field(&config), "server.max_body_bytes");

        let mut config = WardenConfig::default();
        config.auth.token_ttl_secs = 0;
        assert_eq!(invalid_field(&config), "auth.token_ttl_secs");
    }

    #[test]
    fn test_time_limits_are_bounded() {
        let mut config = WardenConfig::default();
        config.auth.token_ttl_secs = MAX_TOKEN_TTL_SECS;
        config.auth.clock_skew_secs = MAX_CLOCK_SKEW_SECS;
        assert!(config.validate().is_ok());

        config.auth.token_ttl_secs = u64::MAX;
        assert_eq!(invalid_field(&config), "auth.token_ttl_secs");

        let mut config = WardenConfig::default();
        config.auth.clock_skew_secs = 100_000_000_000_000;
        assert_eq!(invalid_field(&config), "auth.clock_skew_secs");
    }

    #[test]
    fn test_blank_active_kid() {
        let mut config = WardenConfig::default();
        config.auth.active_kid = "  ".to_string();
        assert_eq!(invalid_field(&config), "auth.active_kid");
    }

    #[test]
    fn test_algorithm_allow_list() {
        for alg in ["HS256", "none", "ES256"] {
            let mut config = WardenConfig::default();
            config.auth.algorithm = alg.to_string();
            assert_eq!(invalid_field(&config), "auth.algorithm", "{alg}");
        }
        for alg in ["RS512", "PS256"] {
            let mut config = WardenConfig::default();
            config.auth.algorithm = alg.to_string();
            assert!(config.validate().is_ok(), "{alg}");
        }
    }

    #[test]
    fn test_serializes_back_to_toml() {
        let mut config = WardenConfig::default();
        config.auth.pin_issuer = true;
        config.telemetry.environment = "production".to_string();

        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("[auth]"));
        assert_eq!(toml::from_str::<WardenConfig>(&text).unwrap(), config);
    }

    #[test]
    fn test_unknown_section_rejected() {
        assert!(toml::from_str::<WardenConfig>("[authorization]\nenabled = true\n").is_err());
    }
}
