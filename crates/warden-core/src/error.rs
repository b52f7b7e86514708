//! API error taxonomy.
//!
//! [`ApiError`] is what handlers and middleware stages return when a request
//! cannot be completed normally. The error classifier maps each variant onto
//! exactly one HTTP status and one JSON body shape:
//!
//! | Variant | Status | Body |
//! |---|---|---|
//! | `Validation` | 400 | `{"error": message, "fields": [{"field", "error"}]}` |
//! | `Request` | chosen by the handler | `{"error": message}` |
//! | `Authentication` | 401 | `{"error": "Unauthorized"}` |
//! | `Authorization` | 403 | `{"error": "Forbidden"}` |
//! | `Internal` | 500 | `{"error": "Internal Server Error"}` |
//! | `Shutdown` | 500 | `{"error": "Internal Server Error"}` |
//!
//! Authentication causes, internal messages and error sources are only ever
//! logged; they never reach the response body.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`ApiError`].
pub type ApiResult<T> = Result<T, ApiError>;

/// Coarse classification of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Input failed field-level validation.
    Validation,
    /// The handler rejected the request with an explicit status.
    Request,
    /// No valid identity was presented.
    Authentication,
    /// A valid identity lacks the required privilege.
    Authorization,
    /// Unexpected server-side failure.
    Internal,
    /// Integrity failure that requires the process to stop.
    Shutdown,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::Validation | Self::Request => StatusCode::BAD_REQUEST,
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::Authorization => StatusCode::FORBIDDEN,
            Self::Internal | Self::Shutdown => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the label used for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Request => "request",
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::Internal => "internal",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Error returned by handlers and middleware stages.
///
/// # Example
///
/// ```
/// use http::StatusCode;
/// use warden_core::{ApiError, FieldErrors};
///
/// let mut fields = FieldErrors::new();
/// fields.add("email", "must be a valid email address");
/// let err = ApiError::validation("data validation error", fields);
/// assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
///
/// let err = ApiError::request(StatusCode::NOT_FOUND, "user not found");
/// assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
/// ```
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request data failed validation.
    #[error("validation error: {message}")]
    Validation {
        /// Human-readable summary.
        message: String,
        /// Per-field failures.
        fields: FieldErrors,
    },

    /// A trusted, client-visible error with an explicit status.
    #[error("request error ({status}): {message}")]
    Request {
        /// Status to respond with.
        status: StatusCode,
        /// Message shown to the client.
        message: String,
    },

    /// Missing or invalid credentials.
    #[error("authentication failed: {cause}")]
    Authentication {
        /// Specific cause, logged only.
        cause: String,
    },

    /// Authenticated caller lacks permission.
    #[error("authorization denied: {reason}")]
    Authorization {
        /// Reason, logged only.
        reason: String,
    },

    /// Unexpected failure.
    #[error("internal error: {message}")]
    Internal {
        /// Description, logged only.
        message: String,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The service must stop once the current response is written.
    #[error("shutdown requested: {message}")]
    Shutdown {
        /// Why the service is shutting down.
        message: String,
    },
}

impl ApiError {
    /// Creates a validation error with field detail.
    #[must_use]
    pub fn validation(message: impl Into<String>, fields: FieldErrors) -> Self {
        Self::Validation {
            message: message.into(),
            fields,
        }
    }

    /// Creates a request error with an explicit status.
    #[must_use]
    pub fn request(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Request {
            status,
            message: message.into(),
        }
    }

    /// Creates a 400 request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::request(StatusCode::BAD_REQUEST, message)
    }

    /// Creates a 404 request error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::request(StatusCode::NOT_FOUND, message)
    }

    /// Creates an authentication error.
    #[must_use]
    pub fn authentication(cause: impl Into<String>) -> Self {
        Self::Authentication {
            cause: cause.into(),
        }
    }

    /// Creates an authorization error.
    #[must_use]
    pub fn authorization(reason: impl Into<String>) -> Self {
        Self::Authorization {
            reason: reason.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a shutdown error.
    #[must_use]
    pub fn shutdown(message: impl Into<String>) -> Self {
        Self::Shutdown {
            message: message.into(),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::Request { .. } => ErrorCategory::Request,
            Self::Authentication { .. } => ErrorCategory::Authentication,
            Self::Authorization { .. } => ErrorCategory::Authorization,
            Self::Internal { .. } => ErrorCategory::Internal,
            Self::Shutdown { .. } => ErrorCategory::Shutdown,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Request { status, .. } => *status,
            other => other.category().default_status_code(),
        }
    }

    /// Returns `true` if this error must stop the service.
    #[must_use]
    pub const fn is_shutdown(&self) -> bool {
        matches!(self, Self::Shutdown { .. })
    }

    /// Builds the client-facing body.
    ///
    /// Only validation and request errors carry their own message; every
    /// other variant uses the canonical reason phrase of its status.
    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        match self {
            Self::Validation { message, fields } => ErrorBody {
                error: message.clone(),
                fields: fields.entries().to_vec(),
            },
            Self::Request { message, .. } => ErrorBody::new(message.clone()),
            other => ErrorBody::new(
                other
                    .status_code()
                    .canonical_reason()
                    .unwrap_or("Internal Server Error"),
            ),
        }
    }
}

impl From<FieldErrors> for ApiError {
    fn from(fields: FieldErrors) -> Self {
        Self::validation("data validation error", fields)
    }
}

/// A single field failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field name as it appears in the request payload.
    pub field: String,
    /// What is wrong with it.
    pub error: String,
}

/// Ordered field-level validation failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    /// Creates a new empty `FieldErrors`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an error for a field.
    pub fn add(&mut self, field: impl Into<String>, error: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            error: error.into(),
        });
    }

    /// Returns `true` if there are no field errors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of recorded failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the recorded failures in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[FieldError] {
        &self.0
    }

    /// Returns `Ok(())` when empty, otherwise a validation error.
    pub fn into_result(self) -> ApiResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.into())
        }
    }
}

/// Serializable error body for HTTP responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Client-visible message.
    pub error: String,
    /// Field detail for validation failures.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

impl ErrorBody {
    /// Creates a body without field detail.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            fields: Vec::new(),
        }
    }
}
