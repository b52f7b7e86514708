//! Error types for key loading, signing and token validation.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to build a [`KeyStore`](crate::KeyStore). Fatal at startup.
#[derive(Debug, Error)]
pub enum KeyLoadError {
    /// The key source could not be read.
    #[error("failed to read key source {path}")]
    Read {
        /// File or directory that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The key directory holds no key files.
    #[error("key source {path} contains no key files")]
    Empty {
        /// The directory that was scanned.
        path: PathBuf,
    },

    /// A file name does not yield a usable key id.
    #[error("cannot derive a key id from {path}")]
    InvalidKeyId {
        /// The offending file.
        path: PathBuf,
    },

    /// Two sources map to the same key id.
    #[error("duplicate key id '{kid}'")]
    DuplicateKeyId {
        /// The repeated key id.
        kid: String,
    },

    /// The PEM envelope could not be parsed.
    #[error("malformed PEM for key '{kid}': {reason}")]
    MalformedPem {
        /// Key id being loaded.
        kid: String,
        /// What was wrong.
        reason: String,
    },

    /// The PEM block type is not a supported RSA key type.
    #[error("unsupported PEM block '{label}' for key '{kid}'")]
    UnsupportedBlock {
        /// Key id being loaded.
        kid: String,
        /// The PEM label found.
        label: String,
    },

    /// The PEM body is not valid key material.
    #[error("invalid key material for key '{kid}': {reason}")]
    InvalidKey {
        /// Key id being loaded.
        kid: String,
        /// Decoder message.
        reason: String,
    },
}

/// Which half of a key pair a lookup asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Signing key.
    Private,
    /// Verification key.
    Public,
}

impl std::fmt::Display for KeyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Private => f.write_str("private"),
            Self::Public => f.write_str("public"),
        }
    }
}

/// A key lookup found nothing for the requested id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} key '{kid}' not found")]
pub struct KeyNotFound {
    /// The key id that was requested.
    pub kid: String,
    /// Which half was requested.
    pub kind: KeyKind,
}

/// Failure to issue a token.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The signing key is absent or verification-only.
    #[error(transparent)]
    KeyNotFound(#[from] KeyNotFound),

    /// The claims expire at or before their issue time.
    #[error("claims must expire after they are issued")]
    InvalidLifetime,

    /// The signer rejected the input.
    #[error("failed to sign token")]
    Encode(#[source] jsonwebtoken::errors::Error),
}

/// The authority was configured with an algorithm outside the allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("signing algorithm '{0}' is not allowed")]
pub struct AlgorithmNotAllowed(pub String);

/// The specific reason a token was rejected.
///
/// Causes are for server-side logs only; callers outside the service see a
/// single generic [`AuthenticationError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthFailure {
    /// The token is not three dot-separated segments or a segment is garbage.
    #[error("malformed token")]
    MalformedToken,

    /// The header segment could not be decoded.
    #[error("malformed token header")]
    MalformedHeader,

    /// The header names an algorithm outside the allow-list.
    #[error("algorithm '{0}' is not allowed")]
    DisallowedAlgorithm(String),

    /// The header carries no key id.
    #[error("token header has no kid")]
    MissingKid,

    /// The header's key id is not in the key store.
    #[error("unknown kid '{0}'")]
    UnknownKid(String),

    /// The signature does not verify.
    #[error("invalid signature")]
    InvalidSignature,

    /// The claims segment is missing a field or has the wrong shape.
    #[error("malformed claims")]
    MalformedClaims,

    /// `exp` is in the past.
    #[error("token expired")]
    Expired,

    /// `iat` is further in the future than the allowed clock skew.
    #[error("token issued in the future")]
    IssuedInFuture,

    /// `iss` does not match the pinned issuer.
    #[error("unexpected issuer")]
    IssuerMismatch,
}

impl From<jsonwebtoken::errors::Error> for AuthFailure {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidRsaKey(_)
            | ErrorKind::InvalidKeyFormat => Self::InvalidSignature,
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidIssuer => Self::IssuerMismatch,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                Self::DisallowedAlgorithm("unknown".to_string())
            }
            ErrorKind::MissingRequiredClaim(_) | ErrorKind::Json(_) => Self::MalformedClaims,
            _ => Self::MalformedToken,
        }
    }
}

/// A token was rejected.
///
/// Displays the same message for every cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("authentication failed")]
pub struct AuthenticationError {
    cause: AuthFailure,
}

impl AuthenticationError {
    pub(crate) const fn new(cause: AuthFailure) -> Self {
        Self { cause }
    }

    /// Returns the specific cause, for server-side logging.
    #[must_use]
    pub const fn cause(&self) -> &AuthFailure {
        &self.cause
    }
}
