//! Property tests for token issuing and validation.

use std::path::Path;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use warden_auth::{AuthFailure, KeyStore, TokenAuthority};
use warden_core::{roles, Claims};

const ACTIVE_KID: &str = "54bb2165-71e1-41a6-af3e-7da4a0e1e2c1";

fn authority() -> TokenAuthority {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata/keys");
    TokenAuthority::new(Arc::new(KeyStore::load(dir).unwrap()))
}

fn segment(value: &serde_json::Value) -> String {
    URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).unwrap())
}

fn arb_roles() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop_oneof![
            Just(roles::ADMIN.to_string()),
            Just(roles::USER.to_string()),
            "[A-Z]{3,8}",
        ],
        0..4,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_round_trip(
        subject in "[a-zA-Z0-9-]{1,40}",
        issuer in "[a-z ]{1,20}",
        lifetime_secs in 60i64..86_400,
        role_set in arb_roles(),
    ) {
        let authority = authority();
        let claims = Claims::new(subject, issuer, Utc::now(), Duration::seconds(lifetime_secs), role_set);

        let token = authority.generate_token(&claims, ACTIVE_KID).unwrap();
        let back = authority.validate_token(&token).unwrap();
        prop_assert_eq!(back, claims);
    }

    #[test]
    fn prop_unknown_kid_always_fails(kid in "[a-z0-9-]{1,24}", sig in "[A-Za-z0-9_-]{0,64}") {
        prop_assume!(kid != ACTIVE_KID && kid != "rotated-2025" && kid != "verify-only");

        let claims = serde_json::json!({
            "sub": "x", "iss": "y", "iat": Utc::now().timestamp(),
            "exp": Utc::now().timestamp() + 3600, "roles": ["ADMIN"],
        });
        let header = serde_json::json!({"alg": "RS256", "kid": kid});
        let token = format!("{}.{}.{}", segment(&header), segment(&claims), sig);

        let err = authority().validate_token(&token).unwrap_err();
        prop_assert_eq!(err.cause(), &AuthFailure::UnknownKid(kid));
    }

    #[test]
    fn prop_disallowed_alg_always_fails(
        alg in prop_oneof![
            Just("none".to_string()),
            Just("HS256".to_string()),
            Just("HS384".to_string()),
            Just("HS512".to_string()),
            Just("ES256".to_string()),
            "[a-z]{1,6}",
        ],
        sig in "[A-Za-z0-9_-]{0,64}",
    ) {
        let claims = serde_json::json!({
            "sub": "x", "iss": "y", "iat": Utc::now().timestamp(),
            "exp": Utc::now().timestamp() + 3600, "roles": ["ADMIN"],
        });
        let header = serde_json::json!({"alg": alg, "kid": ACTIVE_KID});
        let token = format!("{}.{}.{}", segment(&header), segment(&claims), sig);

        let err = authority().validate_token(&token).unwrap_err();
        prop_assert_eq!(err.cause(), &AuthFailure::DisallowedAlgorithm(alg));
    }

    #[test]
    fn prop_authorize_matches_set_intersection(
        held in arb_roles(),
        required in arb_roles(),
    ) {
        let authority = authority();
        let claims = Claims::new("s", "i", Utc::now(), Duration::hours(1), held.clone());

        let expected = required.is_empty() || required.iter().any(|r| held.contains(r));
        prop_assert_eq!(authority.authorize(&claims, &required), expected);
    }
}

#[test]
fn admin_holder_against_admin_or_user() {
    let authority = authority();
    let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let claims = Claims::new("s", "i", at, Duration::hours(1), [roles::ADMIN]);

    assert!(authority.authorize(&claims, [roles::ADMIN, roles::USER]));
    assert!(!authority.authorize(&claims, [roles::USER]));
}

#[test]
fn old_token_expires_with_wall_clock() {
    let authority = authority();
    let at = Utc.with_ymd_and_hms(2020, 6, 1, 12, 0, 0).unwrap();
    let claims = Claims::new("s", "i", at, Duration::hours(1), [roles::USER]);
    let token = authority.generate_token(&claims, ACTIVE_KID).unwrap();

    assert!(authority.validate_token_at(&token, at + Duration::minutes(30)).is_ok());
    let err = authority.validate_token(&token).unwrap_err();
    assert_eq!(err.cause(), &AuthFailure::Expired);
}
