//! Fixture keys and token helpers for tests.
//!
//! Enabled by the `testutil` feature:
//!
//! ```toml
//! [dev-dependencies]
//! warden-auth = { workspace = true, features = ["testutil"] }
//! ```
//!
//! The fixture directory holds a PKCS#1 signing key, a PKCS#8 signing key
//! and a verification-only public key. A second directory holds a key the
//! fixture store has never seen, for forged-token tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use serde::Serialize;
use warden_core::{roles, Claims};

use crate::{KeyStore, TokenAuthority};

/// Issuer used by fixture claims.
pub const ISSUER: &str = "service project";

/// PKCS#1 signing key in the fixture store.
pub const ACTIVE_KID: &str = "54bb2165-71e1-41a6-af3e-7da4a0e1e2c1";

/// PKCS#8 signing key in the fixture store.
pub const PKCS8_KID: &str = "rotated-2025";

/// Public-only key in the fixture store.
pub const VERIFY_ONLY_KID: &str = "verify-only";

/// Key id of the key outside the fixture store.
pub const FOREIGN_KID: &str = "stranger";

/// Directory of fixture keys.
pub fn keys_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata/keys")
}

/// Directory holding the key unknown to the fixture store.
pub fn foreign_keys_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata/foreign")
}

/// Loads the fixture store.
pub fn fixture_store() -> Arc<KeyStore> {
    Arc::new(KeyStore::load(keys_dir()).expect("fixture keys should load"))
}

/// An RS256 authority over the fixture store.
pub fn fixture_authority() -> TokenAuthority {
    TokenAuthority::new(fixture_store())
}

/// An authority holding only the foreign key under [`FOREIGN_KID`].
pub fn foreign_authority() -> TokenAuthority {
    TokenAuthority::new(Arc::new(
        KeyStore::load(foreign_keys_dir()).expect("foreign key should load"),
    ))
}

/// An authority holding the foreign key under an arbitrary `kid`.
///
/// Tokens it signs name a kid the fixture store knows but carry a signature
/// from a different key.
pub fn foreign_authority_as(kid: &str) -> TokenAuthority {
    let pem = std::fs::read_to_string(foreign_keys_dir().join(format!("{FOREIGN_KID}.pem")))
        .expect("foreign key should be readable");
    let store = KeyStore::from_pem_entries([(kid, pem)]).expect("foreign key should parse");
    TokenAuthority::new(Arc::new(store))
}

/// One-hour claims carrying the ADMIN role.
pub fn admin_claims() -> Claims {
    Claims::new(
        "5cf37266-3473-4006-984f-9325122678b7",
        ISSUER,
        Utc::now(),
        Duration::hours(1),
        [roles::ADMIN],
    )
}

/// One-hour claims carrying only the USER role.
pub fn user_claims(subject: &str) -> Claims {
    Claims::new(subject, ISSUER, Utc::now(), Duration::hours(1), [roles::USER])
}

/// A signed fixture token for `claims`.
pub fn token_for(claims: &Claims) -> String {
    fixture_authority()
        .generate_token(claims, ACTIVE_KID)
        .expect("fixture signing should succeed")
}

/// `Bearer <token>` for an Authorization header.
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Base64url-encodes the JSON form of `value`.
pub fn encode_segment<T: Serialize>(value: &T) -> String {
    URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).expect("segment should serialize"))
}

/// Assembles a token from arbitrary parts without signing it.
pub fn forge_token<H: Serialize, C: Serialize>(header: &H, claims: &C, signature: &str) -> String {
    format!(
        "{}.{}.{}",
        encode_segment(header),
        encode_segment(claims),
        signature
    )
}
