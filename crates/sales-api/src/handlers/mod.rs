//! Route table for the sales API.

pub mod testgrp;
pub mod usergrp;

use std::sync::Arc;

use http::Method;
use warden_auth::TokenAuthority;
use warden_core::roles;
use warden_middleware::stages::{AuthenticateMiddleware, AuthorizeMiddleware};
use warden_middleware::BoxedMiddleware;
use warden_server::{App, ShutdownCoordinator};

use crate::users::UserStore;
use testgrp::StatusHandler;
use usergrp::{TokenSettings, UserGroup, UserOp};

/// What the routes need at runtime.
#[derive(Clone)]
pub struct Deps {
    /// Validates bearer tokens and mints refreshed ones.
    pub authority: Arc<TokenAuthority>,
    /// User persistence.
    pub store: Arc<dyn UserStore>,
    /// Settings for minted tokens.
    pub tokens: TokenSettings,
}

impl std::fmt::Debug for Deps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deps").field("tokens", &self.tokens).finish_non_exhaustive()
    }
}

/// Builds the API app with every route registered.
pub fn api_mux(shutdown: ShutdownCoordinator, deps: Deps) -> App {
    let authenticate: BoxedMiddleware = Arc::new(AuthenticateMiddleware::new(Arc::clone(&deps.authority)));
    let admin: BoxedMiddleware = Arc::new(AuthorizeMiddleware::new(Arc::clone(&deps.authority), [roles::ADMIN]));

    let mut app = App::new(shutdown);
    app.register(Method::GET, "/test", StatusHandler, Vec::new());
    app.register(
        Method::GET,
        "/testauth",
        StatusHandler,
        vec![Arc::clone(&authenticate), Arc::clone(&admin)],
    );

    let users = UserGroup::new(deps.store, deps.authority, deps.tokens);
    let authn = || vec![Arc::clone(&authenticate)];
    let authn_admin = || vec![Arc::clone(&authenticate), Arc::clone(&admin)];

    // `/users/token` must precede `/users/{id}`.
    app.register(Method::GET, "/users/token", users.handler(UserOp::Token), authn());
    app.register(Method::GET, "/users/{page}/{rows}", users.handler(UserOp::Query), authn_admin());
    app.register(Method::GET, "/users/{id}", users.handler(UserOp::QueryById), authn());
    app.register(Method::POST, "/users", users.handler(UserOp::Create), authn_admin());
    app.register(Method::PUT, "/users/{id}", users.handler(UserOp::Update), authn_admin());
    app.register(Method::DELETE, "/users/{id}", users.handler(UserOp::Delete), authn_admin());

    app
}
