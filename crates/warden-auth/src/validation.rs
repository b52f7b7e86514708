//! Signing algorithm allow-list.
//!
//! Only asymmetric RSA algorithms are accepted. The list is fixed by the
//! server; the `alg` a token claims is checked against it before any key is
//! touched, so `none` and the HMAC family can never reach signature
//! verification.

use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::Algorithm;
use serde::Deserialize;

use crate::error::{AlgorithmNotAllowed, AuthFailure};

/// Algorithms that are always refused.
pub const FORBIDDEN_ALGORITHMS: &[&str] = &["none", "HS256", "HS384", "HS512"];

/// Algorithms a token may be signed with.
pub const ACCEPTED_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
];

/// Returns `true` if `alg` is on the allow-list.
#[must_use]
pub fn is_accepted(alg: Algorithm) -> bool {
    ACCEPTED_ALGORITHMS.contains(&alg)
}

/// Resolves an algorithm name against the allow-list.
///
/// # Errors
///
/// Fails for forbidden, unknown, or non-RSA names.
///
/// # Examples
///
/// ```
/// use warden_auth::validation::accepted_algorithm;
///
/// assert!(accepted_algorithm("RS256").is_ok());
/// assert!(accepted_algorithm("none").is_err());
/// assert!(accepted_algorithm("HS256").is_err());
/// assert!(accepted_algorithm("ES256").is_err());
/// ```
pub fn accepted_algorithm(name: &str) -> Result<Algorithm, AlgorithmNotAllowed> {
    if FORBIDDEN_ALGORITHMS
        .iter()
        .any(|forbidden| forbidden.eq_ignore_ascii_case(name))
    {
        return Err(AlgorithmNotAllowed(name.to_string()));
    }

    match Algorithm::from_str(name) {
        Ok(alg) if is_accepted(alg) => Ok(alg),
        _ => Err(AlgorithmNotAllowed(name.to_string())),
    }
}

/// The header fields read before verification.
#[derive(Debug, Deserialize)]
pub(crate) struct UnverifiedHeader {
    pub alg: String,
    #[serde(default)]
    pub kid: Option<String>,
}

/// Decodes a token's header segment without checking anything else.
///
/// The raw `alg` string is kept so that names the signer library does not
/// model (such as `none`) are reported precisely.
pub(crate) fn peek_header(token: &str) -> Result<UnverifiedHeader, AuthFailure> {
    let mut segments = token.split('.');
    let (Some(header), Some(_), Some(_), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(AuthFailure::MalformedToken);
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| AuthFailure::MalformedHeader)?;
    serde_json::from_slice(&bytes).map_err(|_| AuthFailure::MalformedHeader)
}
