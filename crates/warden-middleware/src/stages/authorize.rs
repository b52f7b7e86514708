//! Role authorization stage.

use std::sync::Arc;

use warden_auth::TokenAuthority;
use warden_core::ApiError;
use warden_telemetry::metrics::record_auth_failure;

use crate::{
    context::RequestContext,
    middleware::{BoxFuture, Middleware, Next},
    types::{Request, StageResult},
};

/// Requires the authenticated claims to carry at least one of a set of roles.
///
/// Must run inside [`AuthenticateMiddleware`](super::AuthenticateMiddleware).
/// Reaching this stage without claims means the chain is wired wrong; that
/// is reported as [`ApiError::Shutdown`] so the process stops instead of
/// serving a misconfigured route.
#[derive(Debug, Clone)]
pub struct AuthorizeMiddleware {
    authority: Arc<TokenAuthority>,
    required: Vec<String>,
}

impl AuthorizeMiddleware {
    /// Creates the stage; an empty role list admits every authenticated caller.
    pub fn new<I, R>(authority: Arc<TokenAuthority>, required: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            authority,
            required: required.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the accepted roles.
    #[must_use]
    pub fn required(&self) -> &[String] {
        &self.required
    }
}

impl Middleware for AuthorizeMiddleware {
    fn name(&self) -> &'static str {
        "authorize"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            let Some(claims) = ctx.claims() else {
                return Err(ApiError::shutdown(format!(
                    "authorize reached without claims on route {}",
                    ctx.route()
                )));
            };

            if !self.authority.authorize(claims, &self.required) {
                record_auth_failure("authorize");
                return Err(ApiError::authorization(format!(
                    "subject {} lacks any of [{}]",
                    claims.subject,
                    self.required.join(", ")
                )));
            }

            next.run(ctx, request).await
        })
    }
}
