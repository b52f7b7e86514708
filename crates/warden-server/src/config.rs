//! Server runtime settings.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use warden_server::ServerConfig;
//!
//! let config = ServerConfig::builder()
//!     .http_addr("127.0.0.1:3000")
//!     .shutdown_timeout(Duration::from_secs(5))
//!     .build();
//!
//! assert_eq!(config.http_addr(), "127.0.0.1:3000");
//! assert_eq!(config.debug_addr(), "0.0.0.0:4000");
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::ServerError;

/// Default API bind address.
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:3000";

/// Default debug (probe) bind address.
pub const DEFAULT_DEBUG_ADDR: &str = "0.0.0.0:4000";

/// Default drain bound in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 20;

/// Default bound on reading a request body, in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;

/// Default largest accepted request body.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Settings for [`Server`](crate::Server).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    http_addr: String,
    debug_addr: String,
    shutdown_timeout: Duration,
    request_timeout: Duration,
    max_body_bytes: usize,
}

impl ServerConfig {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Returns the API bind address.
    #[must_use]
    pub fn http_addr(&self) -> &str {
        &self.http_addr
    }

    /// Returns the debug bind address.
    #[must_use]
    pub fn debug_addr(&self) -> &str {
        &self.debug_addr
    }

    /// Returns how long the drain waits for open connections.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Returns the bound on reading a request body.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the largest accepted request body.
    #[must_use]
    pub const fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    pub(crate) fn parse_http_addr(&self) -> Result<SocketAddr, ServerError> {
        parse_addr(&self.http_addr)
    }

    pub(crate) fn parse_debug_addr(&self) -> Result<SocketAddr, ServerError> {
        parse_addr(&self.debug_addr)
    }
}

fn parse_addr(addr: &str) -> Result<SocketAddr, ServerError> {
    addr.parse().map_err(|e| ServerError::InvalidAddress {
        addr: addr.to_string(),
        reason: format!("{e}"),
    })
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    http_addr: String,
    debug_addr: String,
    shutdown_timeout: Duration,
    request_timeout: Duration,
    max_body_bytes: usize,
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            debug_addr: DEFAULT_DEBUG_ADDR.to_string(),
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ServerConfigBuilder {
    /// Sets the API bind address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = addr.into();
        self
    }

    /// Sets the debug bind address.
    #[must_use]
    pub fn debug_addr(mut self, addr: impl Into<String>) -> Self {
        self.debug_addr = addr.into();
        self
    }

    /// Sets the drain bound.
    #[must_use]
    pub const fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Sets the request body read bound.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the largest accepted request body.
    #[must_use]
    pub const fn max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            http_addr: self.http_addr,
            debug_addr: self.debug_addr,
            shutdown_timeout: self.shutdown_timeout,
            request_timeout: self.request_timeout,
            max_body_bytes: self.max_body_bytes,
        }
    }
}
