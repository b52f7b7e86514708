//! Bearer token authentication stage.
//!
//! ```text
//! NoToken ──header──▶ TokenExtracted ──validate──▶ Valid    (claims attached)
//!    │                      │
//!    └──────────────────────┴──────────────────▶ Rejected (401)
//! ```
//!
//! Every rejection is the same generic 401 to the client. The specific
//! cause travels inside [`ApiError::Authentication`] and is only logged.

use std::sync::Arc;

use http::header::AUTHORIZATION;
use warden_auth::TokenAuthority;
use warden_core::ApiError;
use warden_telemetry::metrics::record_auth_failure;

use crate::{
    context::RequestContext,
    middleware::{BoxFuture, Middleware, Next},
    types::{Request, StageResult},
};

/// Cause when the request has no `Authorization` header.
pub const MISSING_HEADER: &str = "missing authorization header";

/// Cause when the header does not use the `Bearer` scheme.
pub const MISSING_BEARER_PREFIX: &str = "missing bearer prefix";

/// Cause when the `Bearer` credential is empty or malformed.
pub const MALFORMED_CREDENTIAL: &str = "malformed bearer credential";

/// Validates `Authorization: Bearer <token>` and attaches the claims.
#[derive(Debug, Clone)]
pub struct AuthenticateMiddleware {
    authority: Arc<TokenAuthority>,
}

impl AuthenticateMiddleware {
    /// Creates the stage around a shared token authority.
    #[must_use]
    pub const fn new(authority: Arc<TokenAuthority>) -> Self {
        Self { authority }
    }
}

/// Pulls the bearer credential out of the request headers.
fn extract_bearer(request: &Request) -> Result<&str, &'static str> {
    let value = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or(MISSING_HEADER)?
        .to_str()
        .map_err(|_| MALFORMED_CREDENTIAL)?
        .trim();

    let Some((scheme, credential)) = value.split_once(' ') else {
        return Err(if value.eq_ignore_ascii_case("bearer") {
            MALFORMED_CREDENTIAL
        } else {
            MISSING_BEARER_PREFIX
        });
    };

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(MISSING_BEARER_PREFIX);
    }

    let credential = credential.trim();
    if credential.is_empty() || credential.contains(char::is_whitespace) {
        return Err(MALFORMED_CREDENTIAL);
    }
    Ok(credential)
}

impl Middleware for AuthenticateMiddleware {
    fn name(&self) -> &'static str {
        "authenticate"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            let claims = extract_bearer(&request)
                .map_err(ToString::to_string)
                .and_then(|token| {
                    self.authority
                        .validate_token(token)
                        .map_err(|e| e.cause().to_string())
                });

            match claims {
                Ok(claims) => {
                    tracing::debug!(
                        trace_id = %ctx.trace_id(),
                        subject = %claims.subject,
                        "request authenticated"
                    );
                    ctx.set_claims(claims);
                    next.run(ctx, request).await
                }
                Err(cause) => {
                    record_auth_failure("authenticate");
                    Err(ApiError::authentication(cause))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::Full;

    fn request_with(header: Option<&str>) -> Request {
        let mut builder = http::Request::builder().uri("/testauth");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Full::new(Bytes::new())).unwrap()
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer(&request_with(Some("Bearer abc.def.ghi"))), Ok("abc.def.ghi"));
        assert_eq!(extract_bearer(&request_with(Some("bearer abc"))), Ok("abc"));
        assert_eq!(extract_bearer(&request_with(Some("Bearer   abc  "))), Ok("abc"));
    }

    #[test]
    fn test_extract_bearer_causes() {
        let cases = [
            (None, MISSING_HEADER),
            (Some("Token xyz"), MISSING_BEARER_PREFIX),
            (Some("abc.def.ghi"), MISSING_BEARER_PREFIX),
            (Some("Basic dXNlcjpwYXNz"), MISSING_BEARER_PREFIX),
            (Some("Bearer"), MALFORMED_CREDENTIAL),
            (Some("Bearer "), MALFORMED_CREDENTIAL),
            (Some("Bearer a b"), MALFORMED_CREDENTIAL),
        ];

        for (header, expected) in cases {
            assert_eq!(extract_bearer(&request_with(header)), Err(expected), "{header:?}");
        }
    }
}
