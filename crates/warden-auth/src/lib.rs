//! # Warden Auth
//!
//! Key storage and the bearer token authority.
//!
//! - [`KeyStore`]: RSA keys indexed by key id, loaded once at startup
//! - [`TokenAuthority`]: issues and validates signed tokens, checks roles
//! - [`validation`]: the fixed signing algorithm allow-list
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use warden_auth::{KeyStore, TokenAuthority};
//!
//! let keys = Arc::new(KeyStore::load("/etc/warden/keys")?);
//! let authority = TokenAuthority::new(keys);
//! match authority.validate_token("eyJ...") {
//!     Ok(claims) => println!("hello {}", claims.subject),
//!     Err(err) => eprintln!("rejected: {}", err.cause()),
//! }
//! # Ok::<(), warden_auth::KeyLoadError>(())
//! ```

#![doc(html_root_url = "https://docs.rs/warden-auth/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod authority;
mod error;
mod keystore;
pub mod validation;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use authority::{TokenAuthority, TokenAuthorityBuilder, DEFAULT_CLOCK_SKEW_SECS};
pub use error::{
    AlgorithmNotAllowed, AuthFailure, AuthenticationError, KeyKind, KeyLoadError, KeyNotFound,
    SigningError,
};
pub use keystore::KeyStore;

/// Re-exported so callers can name algorithms without a direct dependency.
pub use jsonwebtoken::Algorithm;
