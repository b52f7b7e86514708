//! End-to-end chain tests.
//!
//! These run the canonical wiring against the fixture key store:
//!
//! 1. Logger
//! 2. Metrics
//! 3. PanicGuard
//! 4. ErrorClassifier
//! 5. Authenticate
//! 6. Authorize
//! 7. Handler

use std::sync::Arc;

use bytes::Bytes;
use chrono::{Duration, Utc};
use http::header::AUTHORIZATION;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use warden_auth::{testutil, TokenAuthority};
use warden_core::{roles, ApiError, Claims, FieldErrors};
use warden_middleware::{
    global_stages,
    stages::{AuthenticateMiddleware, AuthorizeMiddleware},
    BoxFuture, Chain, FnHandler, Handler, Request, RequestContext, StageResult,
};

/// Echoes the authenticated subject.
struct WhoAmI;

impl Handler for WhoAmI {
    fn call<'a>(&'a self, ctx: &'a mut RequestContext, _request: Request) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            let subject = ctx
                .claims()
                .map(|c| c.subject.clone())
                .ok_or_else(|| ApiError::internal("no claims"))?;
            ctx.respond_json(StatusCode::OK, &serde_json::json!({ "subject": subject }))
        })
    }
}

fn authority() -> Arc<TokenAuthority> {
    Arc::new(testutil::fixture_authority())
}

/// Global stages plus Authenticate and, when `roles` is given, Authorize.
fn protected<H: Handler>(authority: &Arc<TokenAuthority>, roles: Option<&[&str]>, handler: H) -> Chain {
    let mut builder = Chain::builder()
        .stages(global_stages())
        .stage(AuthenticateMiddleware::new(authority.clone()));
    if let Some(required) = roles {
        builder = builder.stage(AuthorizeMiddleware::new(authority.clone(), required.iter().copied()));
    }
    builder.build(handler)
}

fn make_request(authorization: Option<&str>) -> Request {
    let mut builder = http::Request::builder().method("GET").uri("/testauth");
    if let Some(value) = authorization {
        builder = builder.header(AUTHORIZATION, value);
    }
    builder.body(Full::new(Bytes::new())).unwrap()
}

async fn run(chain: &Chain, request: Request) -> (RequestContext, StageResult) {
    let mut ctx = RequestContext::new();
    let result = chain.run(&mut ctx, request).await;
    (ctx, result)
}

async fn body_json(ctx: &mut RequestContext) -> (StatusCode, serde_json::Value) {
    let response = ctx.take_response().expect("a response should be written");
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[test]
fn test_canonical_stage_order() {
    let chain = protected(&authority(), Some(&[roles::ADMIN][..]), WhoAmI);
    assert_eq!(
        chain.stage_names(),
        vec![
            "logger",
            "metrics",
            "panic_guard",
            "error_classifier",
            "authenticate",
            "authorize"
        ]
    );
}

#[tokio::test]
async fn test_admin_token_reaches_handler() {
    let authority = authority();
    let chain = protected(&authority, Some(&[roles::ADMIN][..]), WhoAmI);
    let claims = testutil::admin_claims();
    let header = testutil::bearer(&testutil::token_for(&claims));

    let (mut ctx, result) = run(&chain, make_request(Some(&header))).await;
    assert!(result.is_ok());
    assert_eq!(ctx.claims(), Some(&claims));

    let (status, body) = body_json(&mut ctx).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subject"], claims.subject);
}

#[tokio::test]
async fn test_missing_token_is_401() {
    let chain = protected(&authority(), Some(&[roles::ADMIN][..]), WhoAmI);

    let (mut ctx, result) = run(&chain, make_request(None)).await;
    assert!(result.is_ok());
    assert!(ctx.claims().is_none());

    let (status, body) = body_json(&mut ctx).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, serde_json::json!({"error": "Unauthorized"}));
}

#[tokio::test]
async fn test_user_without_role_is_403() {
    let chain = protected(&authority(), Some(&[roles::ADMIN][..]), WhoAmI);
    let token = testutil::token_for(&testutil::user_claims("user-7"));

    let (mut ctx, _) = run(&chain, make_request(Some(&testutil::bearer(&token)))).await;
    let (status, body) = body_json(&mut ctx).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, serde_json::json!({"error": "Forbidden"}));
}

#[tokio::test]
async fn test_wrong_scheme_is_401_with_cause() {
    let authority = authority();
    let chain = Chain::builder()
        .stage(AuthenticateMiddleware::new(authority))
        .build(WhoAmI);

    let (ctx, result) = run(&chain, make_request(Some("Token xyz"))).await;
    assert!(!ctx.response_written());

    match result {
        Err(ApiError::Authentication { cause }) => assert_eq!(cause, "missing bearer prefix"),
        other => panic!("expected authentication error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_expired_token_is_401_with_cause() {
    let authority = authority();
    let claims = Claims::new(
        "user-7",
        testutil::ISSUER,
        Utc::now() - Duration::hours(2),
        Duration::hours(1),
        [roles::USER],
    );
    let token = authority.generate_token(&claims, testutil::ACTIVE_KID).unwrap();

    let bare = Chain::builder()
        .stage(AuthenticateMiddleware::new(authority.clone()))
        .build(WhoAmI);
    let (_, result) = run(&bare, make_request(Some(&testutil::bearer(&token)))).await;
    match result {
        Err(ApiError::Authentication { cause }) => assert_eq!(cause, "token expired"),
        other => panic!("expected authentication error, got {other:?}"),
    }

    let full = protected(&authority, None, WhoAmI);
    let (mut ctx, _) = run(&full, make_request(Some(&testutil::bearer(&token)))).await;
    let (status, _) = body_json(&mut ctx).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_foreign_key_token_is_401() {
    let chain = protected(&authority(), None, WhoAmI);
    let token = testutil::foreign_authority()
        .generate_token(&testutil::admin_claims(), testutil::FOREIGN_KID)
        .unwrap();

    let (mut ctx, _) = run(&chain, make_request(Some(&testutil::bearer(&token)))).await;
    let (status, _) = body_json(&mut ctx).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_authorize_without_authenticate_is_shutdown() {
    let authority = authority();
    let chain = Chain::builder()
        .stages(global_stages())
        .stage(AuthorizeMiddleware::new(authority, [roles::ADMIN]))
        .build(WhoAmI);

    let (mut ctx, result) = run(&chain, make_request(None)).await;
    assert!(result.unwrap_err().is_shutdown());

    let (status, body) = body_json(&mut ctx).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, serde_json::json!({"error": "Internal Server Error"}));
}

#[tokio::test]
async fn test_validation_error_body() {
    let chain = Chain::builder()
        .stages(global_stages())
        .build(FnHandler::new(|_ctx, _req| {
            Box::pin(async {
                let mut fields = FieldErrors::new();
                fields.add("email", "must be a valid email address");
                fields.add("roles", "must not be empty");
                fields.into_result()
            })
        }));

    let (mut ctx, result) = run(&chain, make_request(None)).await;
    assert!(result.is_ok());

    let (status, body) = body_json(&mut ctx).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"].as_array().unwrap().len(), 2);
    assert_eq!(body["fields"][1]["field"], "roles");
}

#[tokio::test]
async fn test_panic_contained() {
    fn explode() -> StageResult {
        panic!("handler bug")
    }

    let chain = Chain::builder()
        .stages(global_stages())
        .build(FnHandler::new(|_ctx, _req| Box::pin(async { explode() })));

    let (mut ctx, result) = run(&chain, make_request(None)).await;
    assert!(result.is_ok());

    let (status, body) = body_json(&mut ctx).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, serde_json::json!({"error": "Internal Server Error"}));
}

#[tokio::test]
async fn test_concurrent_requests_isolated() {
    let authority = authority();
    let chain = Arc::new(protected(&authority, None, WhoAmI));

    let mut tasks = Vec::new();
    for i in 0..32 {
        let chain = chain.clone();
        tasks.push(tokio::spawn(async move {
            let subject = format!("user-{i}");
            let token = testutil::token_for(&testutil::user_claims(&subject));
            let (mut ctx, result) = run(&chain, make_request(Some(&testutil::bearer(&token)))).await;
            result.unwrap();

            let trace_id = ctx.trace_id();
            let (_, body) = body_json(&mut ctx).await;
            (subject, body["subject"].as_str().unwrap().to_string(), trace_id)
        }));
    }

    let mut trace_ids = std::collections::HashSet::new();
    for task in tasks {
        let (expected, seen, trace_id) = task.await.unwrap();
        assert_eq!(expected, seen);
        assert!(trace_ids.insert(trace_id));
    }
}
