//! Token issuing, validation and role checks.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, Header, Validation};
use warden_core::Claims;

use crate::error::{AlgorithmNotAllowed, AuthFailure, AuthenticationError, SigningError};
use crate::keystore::KeyStore;
use crate::validation;

/// Default tolerance, in seconds, for an `iat` slightly ahead of the local
/// clock.
pub const DEFAULT_CLOCK_SKEW_SECS: i64 = 60;

/// Issues and validates signed bearer tokens.
///
/// Cheap to clone; the key store is shared.
#[derive(Debug, Clone)]
pub struct TokenAuthority {
    keys: Arc<KeyStore>,
    algorithm: Algorithm,
    clock_skew: Duration,
    issuer: Option<String>,
}

/// Builder for [`TokenAuthority`].
#[derive(Debug)]
pub struct TokenAuthorityBuilder {
    keys: Arc<KeyStore>,
    algorithm: Algorithm,
    clock_skew: Duration,
    issuer: Option<String>,
}

impl TokenAuthorityBuilder {
    /// Sets the signing algorithm. Defaults to RS256.
    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Sets how far in the future `iat` may be.
    pub fn clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = skew;
        self
    }

    /// Rejects tokens whose `iss` differs from `issuer`.
    pub fn pin_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Finishes the authority.
    ///
    /// # Errors
    ///
    /// Fails if the signing algorithm is not on the allow-list.
    pub fn build(self) -> Result<TokenAuthority, AlgorithmNotAllowed> {
        if !validation::is_accepted(self.algorithm) {
            return Err(AlgorithmNotAllowed(format!("{:?}", self.algorithm)));
        }
        Ok(TokenAuthority {
            keys: self.keys,
            algorithm: self.algorithm,
            clock_skew: self.clock_skew,
            issuer: self.issuer,
        })
    }
}

impl TokenAuthority {
    /// Starts a builder over `keys`.
    pub fn builder(keys: Arc<KeyStore>) -> TokenAuthorityBuilder {
        TokenAuthorityBuilder {
            keys,
            algorithm: Algorithm::RS256,
            clock_skew: Duration::seconds(DEFAULT_CLOCK_SKEW_SECS),
            issuer: None,
        }
    }

    /// Creates an RS256 authority with default skew and no issuer pin.
    pub fn new(keys: Arc<KeyStore>) -> Self {
        Self {
            keys,
            algorithm: Algorithm::RS256,
            clock_skew: Duration::seconds(DEFAULT_CLOCK_SKEW_SECS),
            issuer: None,
        }
    }

    /// The algorithm tokens are signed with.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// The key store.
    pub fn keys(&self) -> &KeyStore {
        &self.keys
    }

    /// Signs `claims` with the private key bound to `kid`.
    ///
    /// The header carries `kid` so validators can select the matching
    /// public key.
    ///
    /// # Errors
    ///
    /// Fails if the claims have a non-positive lifetime, `kid` has no private
    /// key, or signing fails.
    pub fn generate_token(&self, claims: &Claims, kid: &str) -> Result<String, SigningError> {
        if !claims.has_valid_lifetime() {
            return Err(SigningError::InvalidLifetime);
        }

        let key = self.keys.private_key(kid)?;

        let mut header = Header::new(self.algorithm);
        header.kid = Some(kid.to_string());

        jsonwebtoken::encode(&header, claims, key).map_err(SigningError::Encode)
    }

    /// Validates `token` against the current time.
    ///
    /// # Errors
    ///
    /// Returns a generic [`AuthenticationError`] for every failure. The
    /// specific cause is logged and available through
    /// [`AuthenticationError::cause`].
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthenticationError> {
        self.validate_token_at(token, Utc::now())
    }

    /// Validates `token` as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// See [`validate_token`](Self::validate_token).
    pub fn validate_token_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Claims, AuthenticationError> {
        self.verify(token, now).map_err(|cause| {
            tracing::warn!(cause = %cause, "token rejected");
            AuthenticationError::new(cause)
        })
    }

    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthFailure> {
        let header = validation::peek_header(token)?;

        let algorithm = validation::accepted_algorithm(&header.alg)
            .map_err(|_| AuthFailure::DisallowedAlgorithm(header.alg.clone()))?;

        let kid = header.kid.ok_or(AuthFailure::MissingKid)?;
        let key = self
            .keys
            .public_key(&kid)
            .map_err(|_| AuthFailure::UnknownKid(kid.clone()))?;

        let mut rules = Validation::new(algorithm);
        rules.leeway = 0;
        // Time checks run below against `now` so they are testable.
        rules.validate_exp = false;
        rules.validate_nbf = false;
        rules.validate_aud = false;
        rules.set_required_spec_claims(&["sub", "iss", "iat", "exp"]);

        let claims = jsonwebtoken::decode::<Claims>(token, key, &rules)
            .map_err(AuthFailure::from)?
            .claims;

        if claims.is_expired_at(now) {
            return Err(AuthFailure::Expired);
        }
        // A skew past the end of time accepts any issue time.
        let latest_issue = now.checked_add_signed(self.clock_skew);
        if latest_issue.is_some_and(|latest| claims.issued_at > latest) {
            return Err(AuthFailure::IssuedInFuture);
        }
        if let Some(expected) = &self.issuer {
            if &claims.issuer != expected {
                return Err(AuthFailure::IssuerMismatch);
            }
        }

        Ok(claims)
    }

    /// Returns `true` when `required` is empty or shares at least one role
    /// with `claims`.
    pub fn authorize<I, R>(&self, claims: &Claims, required: I) -> bool
    where
        I: IntoIterator<Item = R>,
        R: AsRef<str>,
    {
        let mut required = required.into_iter().peekable();
        if required.peek().is_none() {
            return true;
        }
        required.any(|role| claims.has_role(role.as_ref()))
    }
}
