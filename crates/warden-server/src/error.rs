//! Server errors.

use std::net::SocketAddr;

use thiserror::Error;

/// Errors that stop the server from starting or serving.
#[derive(Error, Debug)]
pub enum ServerError {
    /// A configured address is not a socket address.
    #[error("invalid address '{addr}': {reason}")]
    InvalidAddress {
        /// The address as configured.
        addr: String,
        /// Parse failure.
        reason: String,
    },

    /// Binding a listener failed.
    #[error("failed to bind {addr}")]
    Bind {
        /// The address.
        addr: SocketAddr,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Other I/O failure.
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}
