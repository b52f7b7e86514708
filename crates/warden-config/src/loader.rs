//! Layered configuration loading.

use std::env;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::{ConfigError, LogFormat, WardenConfig};

/// Source formats, picked by file extension or named explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
}

impl Format {
    fn named(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("toml") {
            Some(Self::Toml)
        } else if name.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }

    fn parse<T: DeserializeOwned>(self, text: &str) -> Result<T, ConfigError> {
        Ok(match self {
            Self::Toml => toml::from_str(text)?,
            Self::Json => serde_json::from_str(text)?,
        })
    }
}

/// Builds a [`WardenConfig`] from defaults, then a file, then the
/// environment. Validation runs once, in [`load`](Self::load).
///
/// ```no_run
/// use warden_config::ConfigLoader;
///
/// # fn main() -> Result<(), warden_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_dotenv()?
///     .with_optional_file("zarf/sales-api.toml")?
///     .with_env_prefix("WARDEN")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: WardenConfig,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Starts from [`WardenConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the configuration with the contents of a `.toml` or
    /// `.json` file. Keys the file omits keep their defaults.
    ///
    /// # Errors
    ///
    /// Missing file, unreadable file, unknown extension, or a parse error
    /// (unknown keys included).
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::file_not_found(path));
        }

        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::named)
            .ok_or_else(|| ConfigError::unsupported_format(path.display().to_string()))?;
        let text = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        self.config = format.parse(&text)?;
        Ok(self)
    }

    /// [`with_file`](Self::with_file), skipped when nothing is at `path`.
    ///
    /// # Errors
    ///
    /// As `with_file`, for a file that exists.
    pub fn with_optional_file(self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Replaces the configuration with `text` in the named `format`.
    ///
    /// ```
    /// use warden_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[auth]\nactive_kid = \"rotated-2025\"", "toml")
    ///     .and_then(ConfigLoader::load)
    ///     .unwrap();
    /// assert_eq!(config.auth.active_kid, "rotated-2025");
    /// ```
    ///
    /// # Errors
    ///
    /// Unknown format name or a parse error.
    pub fn with_string(mut self, text: &str, format: &str) -> Result<Self, ConfigError> {
        let format = Format::named(format).ok_or_else(|| ConfigError::unsupported_format(format))?;
        self.config = format.parse(text)?;
        Ok(self)
    }

    /// Reads `PREFIX__SECTION__KEY` variables during [`load`](Self::load).
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_ascii_uppercase());
        self
    }

    /// Exports a `.env` file from the working directory, if there is one,
    /// so its variables count as environment overrides.
    ///
    /// # Errors
    ///
    /// `ConfigError::Dotenv` when the file exists but does not parse.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Err(err) if !err.not_found() => Err(err.into()),
            _ => Ok(self),
        }
    }

    /// Applies environment overrides, validates, and returns the result.
    ///
    /// Variables are applied in name order.
    ///
    /// # Errors
    ///
    /// A malformed or unknown override, or a failed [`WardenConfig::validate`].
    pub fn load(mut self) -> Result<WardenConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let marker = format!("{prefix}__");
            let mut vars: Vec<(String, String)> = env::vars().filter(|(name, _)| name.starts_with(&marker)).collect();
            vars.sort();

            for (name, value) in vars {
                let path = &name[marker.len()..];
                apply_override(&mut self.config, path, &value)
                    .map_err(|reason| ConfigError::env_parse_error(&name, reason))?;
            }
        }

        self.config.validate()?;
        Ok(self.config)
    }
}

/// Sets the field named by `path` (`SECTION__KEY`, upper case) from `value`.
fn apply_override(config: &mut WardenConfig, path: &str, value: &str) -> Result<(), &'static str> {
    let server = &mut config.server;
    let auth = &mut config.auth;
    let telemetry = &mut config.telemetry;
    let text = || value.to_string();

    match path {
        "SERVER__HTTP_ADDR" => server.http_addr = text(),
        "SERVER__DEBUG_ADDR" => server.debug_addr = text(),
        "SERVER__SHUTDOWN_TIMEOUT_SECS" => server.shutdown_timeout_secs = number(value)?,
        "SERVER__REQUEST_TIMEOUT_MS" => server.request_timeout_ms = number(value)?,
        "SERVER__MAX_BODY_BYTES" => server.max_body_bytes = number(value)?,

        "AUTH__KEYS_DIR" => auth.keys_dir = text(),
        "AUTH__ACTIVE_KID" => auth.active_kid = text(),
        "AUTH__ALGORITHM" => auth.algorithm = text(),
        "AUTH__ISSUER" => auth.issuer = text(),
        "AUTH__TOKEN_TTL_SECS" => auth.token_ttl_secs = number(value)?,
        "AUTH__CLOCK_SKEW_SECS" => auth.clock_skew_secs = number(value)?,
        "AUTH__PIN_ISSUER" => auth.pin_issuer = flag(value)?,

        "TELEMETRY__SERVICE_NAME" => telemetry.service_name = text(),
        "TELEMETRY__ENVIRONMENT" => telemetry.environment = text(),
        "TELEMETRY__METRICS__ENABLED" => telemetry.metrics.enabled = flag(value)?,
        "TELEMETRY__METRICS__ADDR" => telemetry.metrics.addr = text(),
        "TELEMETRY__LOGGING__ENABLED" => telemetry.logging.enabled = flag(value)?,
        "TELEMETRY__LOGGING__LEVEL" => telemetry.logging.level = text(),
        "TELEMETRY__LOGGING__INCLUDE_LOCATION" => telemetry.logging.include_location = flag(value)?,
        "TELEMETRY__LOGGING__FORMAT" => {
            telemetry.logging.format = match value.trim() {
                v if v.eq_ignore_ascii_case("json") => LogFormat::Json,
                v if v.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
                _ => return Err("expected json or pretty"),
            };
        }

        _ => return Err("unknown configuration key"),
    }
    Ok(())
}

fn number<T: std::str::FromStr>(value: &str) -> Result<T, &'static str> {
    value.trim().parse().map_err(|_| "expected a non-negative integer")
}

fn flag(value: &str) -> Result<bool, &'static str> {
    const TRUE: [&str; 4] = ["true", "1", "yes", "on"];
    const FALSE: [&str; 4] = ["false", "0", "no", "off"];

    let value = value.trim();
    if TRUE.iter().any(|t| t.eq_ignore_ascii_case(value)) {
        Ok(true)
    } else if FALSE.iter().any(|f| f.eq_ignore_ascii_case(value)) {
        Ok(false)
    } else {
        Err("expected a boolean")
    }
}
