//! # Warden Core
//!
//! Shared types for the warden service crates.
//!
//! - [`Claims`] - The identity and permission facts carried by a bearer token
//! - [`TraceId`] - UUID v7 identifier attached to every request
//! - [`ApiError`] - The error taxonomy every middleware stage and handler speaks
//! - [`FieldErrors`] - Field-level validation detail returned to clients

#![doc(html_root_url = "https://docs.rs/warden-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod claims;
mod error;
mod trace;

pub use claims::{roles, Claims};
pub use error::{ApiError, ApiResult, ErrorBody, ErrorCategory, FieldError, FieldErrors};
pub use trace::TraceId;
