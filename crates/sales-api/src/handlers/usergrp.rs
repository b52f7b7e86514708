//! User management and token refresh routes.

use std::sync::Arc;

use chrono::{Duration, Utc};
use http::StatusCode;
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;
use warden_auth::TokenAuthority;
use warden_core::{roles, ApiError, Claims};
use warden_middleware::{BoxFuture, Handler, Request, RequestContext, StageResult};

use crate::users::{NewUser, StoreError, UpdateUser, User, UserStore};

/// How refreshed tokens are minted.
#[derive(Debug, Clone)]
pub struct TokenSettings {
    /// Key id tokens are signed with.
    pub kid: String,
    /// `iss` written into tokens.
    pub issuer: String,
    /// Token lifetime.
    pub ttl: Duration,
}

/// The user route operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserOp {
    /// `GET /users/token`
    Token,
    /// `GET /users/{page}/{rows}`
    Query,
    /// `GET /users/{id}`
    QueryById,
    /// `POST /users`
    Create,
    /// `PUT /users/{id}`
    Update,
    /// `DELETE /users/{id}`
    Delete,
}

/// State shared by the user routes.
pub struct UserGroup {
    store: Arc<dyn UserStore>,
    authority: Arc<TokenAuthority>,
    tokens: TokenSettings,
}

#[derive(Serialize)]
struct TokenBody {
    token: String,
}

impl UserGroup {
    /// Creates the group.
    pub fn new(store: Arc<dyn UserStore>, authority: Arc<TokenAuthority>, tokens: TokenSettings) -> Arc<Self> {
        Arc::new(Self {
            store,
            authority,
            tokens,
        })
    }

    /// Returns the handler for one operation.
    pub fn handler(self: &Arc<Self>, op: UserOp) -> UserHandler {
        UserHandler {
            group: Arc::clone(self),
            op,
        }
    }

    fn token(&self, ctx: &mut RequestContext) -> StageResult {
        let caller = caller(ctx)?;
        let claims = Claims::new(
            caller.subject.clone(),
            self.tokens.issuer.clone(),
            Utc::now(),
            self.tokens.ttl,
            caller.roles.iter().cloned(),
        );

        let token = self
            .authority
            .generate_token(&claims, &self.tokens.kid)
            .map_err(|e| ApiError::internal_with_source("generating token", e))?;

        ctx.respond_json(StatusCode::OK, &TokenBody { token })
    }

    fn query(&self, ctx: &mut RequestContext) -> StageResult {
        let page = positive_param(ctx, "page")?;
        let rows = positive_param(ctx, "rows")?;

        let users: Vec<User> = self.store.query(page, rows).into_iter().map(User::from).collect();
        ctx.respond_json(StatusCode::OK, &users)
    }

    fn query_by_id(&self, ctx: &mut RequestContext) -> StageResult {
        let id = id_param(ctx)?;

        let caller = caller(ctx)?;
        if caller.subject != id.to_string() && !caller.has_role(roles::ADMIN) {
            return Err(ApiError::authorization(format!(
                "subject {} may not view user {id}",
                caller.subject
            )));
        }

        let user = User::from(self.store.query_by_id(id).map_err(store_error)?);
        ctx.respond_json(StatusCode::OK, &user)
    }

    async fn create(&self, ctx: &mut RequestContext, request: Request) -> StageResult {
        let new: NewUser = decode(request).await?;
        new.validate()?;

        let record = self.store.create(new, Utc::now()).map_err(store_error)?;
        tracing::info!(trace_id = %ctx.trace_id(), user_id = %record.user_id, "user created");
        ctx.respond_json(StatusCode::CREATED, &User::from(record))
    }

    async fn update(&self, ctx: &mut RequestContext, request: Request) -> StageResult {
        let id = id_param(ctx)?;
        let update: UpdateUser = decode(request).await?;
        update.validate()?;

        self.store.update(id, update, Utc::now()).map_err(store_error)?;
        ctx.respond_status(StatusCode::NO_CONTENT)
    }

    fn delete(&self, ctx: &mut RequestContext) -> StageResult {
        let id = id_param(ctx)?;

        self.store.delete(id).map_err(store_error)?;
        ctx.respond_status(StatusCode::NO_CONTENT)
    }
}

impl std::fmt::Debug for UserGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserGroup")
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

/// One user route bound to the shared group state.
#[derive(Debug, Clone)]
pub struct UserHandler {
    group: Arc<UserGroup>,
    op: UserOp,
}

impl Handler for UserHandler {
    fn call<'a>(&'a self, ctx: &'a mut RequestContext, request: Request) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            let group = &self.group;
            match self.op {
                UserOp::Token => group.token(ctx),
                UserOp::Query => group.query(ctx),
                UserOp::QueryById => group.query_by_id(ctx),
                UserOp::Create => group.create(ctx, request).await,
                UserOp::Update => group.update(ctx, request).await,
                UserOp::Delete => group.delete(ctx),
            }
        })
    }
}

/// The authenticated caller; Authenticate runs before every user route.
fn caller(ctx: &RequestContext) -> Result<Claims, ApiError> {
    ctx.claims()
        .cloned()
        .ok_or_else(|| ApiError::internal(format!("no claims on route {}", ctx.route())))
}

fn positive_param(ctx: &RequestContext, name: &str) -> Result<usize, ApiError> {
    let raw = ctx.param(name).unwrap_or_default();
    match raw.parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ApiError::bad_request(format!("invalid {name} format [{raw}]"))),
    }
}

fn id_param(ctx: &RequestContext) -> Result<Uuid, ApiError> {
    let raw = ctx.param("id").unwrap_or_default();
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("ID is not in its proper form [{raw}]")))
}

async fn decode<T: DeserializeOwned>(request: Request) -> Result<T, ApiError> {
    let bytes = match request.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(never) => match never {},
    };
    serde_json::from_slice(&bytes).map_err(|e| ApiError::bad_request(format!("unable to decode payload: {e}")))
}

fn store_error(err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound => ApiError::not_found(err.to_string()),
        StoreError::DuplicateEmail => ApiError::request(StatusCode::CONFLICT, err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with(params: &[(&str, &str)]) -> RequestContext {
        let mut ctx = RequestContext::new();
        ctx.set_route(
            "/users/{page}/{rows}",
            params.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect(),
        );
        ctx
    }

    #[test]
    fn test_positive_param() {
        let ctx = ctx_with(&[("page", "2"), ("rows", "0")]);
        assert_eq!(positive_param(&ctx, "page").unwrap(), 2);

        let err = positive_param(&ctx, "rows").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("invalid rows format [0]"));

        let err = positive_param(&ctx_with(&[("page", "two")]), "page").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_id_param() {
        let id = Uuid::new_v4();
        let raw = id.to_string();
        let ctx = ctx_with(&[("id", raw.as_str())]);
        assert_eq!(id_param(&ctx).unwrap(), id);

        let err = id_param(&ctx_with(&[("id", "12")])).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_store_error_mapping() {
        assert_eq!(store_error(StoreError::NotFound).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(store_error(StoreError::DuplicateEmail).status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_caller_without_claims_is_internal() {
        let err = caller(&RequestContext::new()).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
