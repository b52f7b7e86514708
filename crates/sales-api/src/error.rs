//! Startup errors.

use thiserror::Error;

/// Anything that stops the service from starting or serving.
#[derive(Error, Debug)]
pub enum SalesError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] warden_config::ConfigError),

    /// Logging or metrics could not be installed.
    #[error(transparent)]
    Telemetry(#[from] warden_telemetry::TelemetryError),

    /// The key directory could not be loaded.
    #[error(transparent)]
    Keys(#[from] warden_auth::KeyLoadError),

    /// The configured signing algorithm is not allowed.
    #[error(transparent)]
    Algorithm(#[from] warden_auth::AlgorithmNotAllowed),

    /// The active key id cannot sign.
    #[error("active key id '{0}' has no private key in the key store")]
    ActiveKeyMissing(String),

    /// The HTTP server failed.
    #[error(transparent)]
    Server(#[from] warden_server::ServerError),
}
