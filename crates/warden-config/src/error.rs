//! Errors raised while loading configuration.

use std::path::PathBuf;

use thiserror::Error;

/// A configuration layer could not be applied, or the result is invalid.
///
/// Every variant is fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// The requested path.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("cannot read {path}")]
    Read {
        /// The file.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Neither TOML nor JSON.
    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    /// Malformed TOML, or a field the schema does not know.
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// Malformed JSON, or a field the schema does not know.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A `.env` file is present but unparseable.
    #[error("invalid .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),

    /// An environment override names an unknown key or has the wrong type.
    #[error("bad environment override {var}: {reason}")]
    EnvParseError {
        /// Variable name.
        var: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A value parsed but breaks a constraint.
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// Dotted field path, such as `auth.algorithm`.
        field: String,
        /// The broken constraint.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub(crate) fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat(format.into())
    }

    pub(crate) fn env_parse_error(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            reason: reason.into(),
        }
    }

    /// Builds an [`InvalidValue`](Self::InvalidValue) error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_culprit() {
        let cases = [
            (ConfigError::file_not_found("/etc/warden/sales-api.toml"), "/etc/warden/sales-api.toml"),
            (ConfigError::unsupported_format("yaml"), "yaml"),
            (
                ConfigError::invalid_value("auth.algorithm", "HS256 is not allowed"),
                "auth.algorithm",
            ),
            (
                ConfigError::env_parse_error("WARDEN__AUTH__TOKEN_TTL_SECS", "expected integer"),
                "WARDEN__AUTH__TOKEN_TTL_SECS",
            ),
        ];

        for (err, needle) in cases {
            assert!(err.to_string().contains(needle), "{err}");
        }
    }

    #[test]
    fn test_read_error_keeps_source() {
        let err = ConfigError::read_error(
            "zarf/sales-api.toml",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
