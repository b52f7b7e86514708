//! Token claims.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Well-known role names.
pub mod roles {
    /// Full administrative access.
    pub const ADMIN: &str = "ADMIN";
    /// Regular authenticated user.
    pub const USER: &str = "USER";

    /// All roles the service knows how to grant.
    pub const ALL: [&str; 2] = [ADMIN, USER];
}

/// The identity and permission facts protected by a signed token.
///
/// Timestamps are stored at one-second precision, the resolution of the
/// NumericDate wire encoding, so a value survives a sign/verify round trip
/// unchanged.
///
/// # Example
///
/// ```
/// use chrono::{Duration, Utc};
/// use warden_core::{roles, Claims};
///
/// let claims = Claims::new("user-1", "service project", Utc::now(), Duration::hours(1), [roles::ADMIN]);
/// assert!(claims.has_role(roles::ADMIN));
/// assert!(claims.expires_at > claims.issued_at);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Principal the token was issued to.
    #[serde(rename = "sub")]
    pub subject: String,

    /// Party that issued the token.
    #[serde(rename = "iss")]
    pub issuer: String,

    /// Issue time.
    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    /// Expiry time.
    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,

    /// Granted roles, serialized as an ordered list.
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl Claims {
    /// Creates claims valid for `lifetime` starting at `issued_at`.
    #[must_use]
    pub fn new<I, R>(
        subject: impl Into<String>,
        issuer: impl Into<String>,
        issued_at: DateTime<Utc>,
        lifetime: Duration,
        roles: I,
    ) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        let issued_at = issued_at.trunc_subsecs(0);
        // Saturates at the ends of the representable range.
        let saturated = if lifetime < Duration::zero() {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        };
        let expires_at = issued_at.checked_add_signed(lifetime).unwrap_or(saturated);
        Self {
            subject: subject.into(),
            issuer: issuer.into(),
            issued_at,
            expires_at,
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `true` if the claims grant `role`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Returns `true` if `expires_at` is strictly after `issued_at`.
    #[must_use]
    pub fn has_valid_lifetime(&self) -> bool {
        self.expires_at > self.issued_at
    }

    /// Returns `true` if the claims have expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
