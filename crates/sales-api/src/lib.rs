//! The sales API service.
//!
//! Wires configuration, keys, the user routes and the HTTP server
//! together. The `sales-api` binary is a thin wrapper around [`run`];
//! the `admin` binary generates keys and tokens for local use.
//!
//! | Route | Stages after the global ones |
//! |---|---|
//! | `GET /test` | none |
//! | `GET /testauth` | authenticate, authorize(ADMIN) |
//! | `GET /users/token` | authenticate |
//! | `GET /users/{page}/{rows}` | authenticate, authorize(ADMIN) |
//! | `GET /users/{id}` | authenticate (self or ADMIN) |
//! | `POST /users` | authenticate, authorize(ADMIN) |
//! | `PUT /users/{id}` | authenticate, authorize(ADMIN) |
//! | `DELETE /users/{id}` | authenticate, authorize(ADMIN) |

#![doc(html_root_url = "https://docs.rs/sales-api/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod handlers;
pub mod users;

use std::sync::Arc;

use chrono::Duration;
use warden_auth::{KeyStore, TokenAuthority};
use warden_config::{AuthConfig, ConfigError, WardenConfig};
use warden_server::{HealthCheck, ReadinessCheck, Server, ServerConfig, ShutdownCoordinator};

pub use error::SalesError;
use handlers::usergrp::TokenSettings;
use handlers::Deps;
use users::MemoryUserStore;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Loads the key store and builds the token authority `auth` describes.
///
/// # Errors
///
/// Fails if the keys cannot be loaded, the algorithm is not allowed, or
/// the active key id cannot sign.
pub fn build_authority(auth: &AuthConfig) -> Result<Arc<TokenAuthority>, SalesError> {
    let keys = Arc::new(KeyStore::load(&auth.keys_dir)?);
    if !keys.can_sign(&auth.active_kid) {
        return Err(SalesError::ActiveKeyMissing(auth.active_kid.clone()));
    }

    let algorithm = warden_auth::validation::accepted_algorithm(&auth.algorithm)?;
    let mut builder = TokenAuthority::builder(keys)
        .algorithm(algorithm)
        .clock_skew(seconds("auth.clock_skew_secs", auth.clock_skew_secs)?);
    if auth.pin_issuer {
        builder = builder.pin_issuer(auth.issuer.clone());
    }

    Ok(Arc::new(builder.build()?))
}

/// Settings for tokens minted by `GET /users/token`.
///
/// # Errors
///
/// Fails if the token lifetime is out of range.
pub fn token_settings(auth: &AuthConfig) -> Result<TokenSettings, SalesError> {
    Ok(TokenSettings {
        kid: auth.active_kid.clone(),
        issuer: auth.issuer.clone(),
        ttl: seconds("auth.token_ttl_secs", auth.token_ttl_secs)?,
    })
}

fn seconds(field: &str, secs: u64) -> Result<Duration, ConfigError> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| ConfigError::invalid_value(field, format!("{secs} seconds is out of range")))
}

/// Converts the server section to runtime settings.
#[must_use]
pub fn server_config(config: &WardenConfig) -> ServerConfig {
    ServerConfig::builder()
        .http_addr(config.server.http_addr.clone())
        .debug_addr(config.server.debug_addr.clone())
        .shutdown_timeout(std::time::Duration::from_secs(config.server.shutdown_timeout_secs))
        .request_timeout(std::time::Duration::from_millis(config.server.request_timeout_ms))
        .max_body_bytes(config.server.max_body_bytes)
        .build()
}

/// Builds and serves the API until shutdown completes.
///
/// OS signals are handled here; an escaped shutdown error from any route
/// triggers the same drain.
///
/// # Errors
///
/// Fails on key, algorithm or bind errors.
pub async fn run(config: WardenConfig) -> Result<(), SalesError> {
    let authority = build_authority(&config.auth)?;
    let deps = Deps {
        authority: Arc::clone(&authority),
        store: Arc::new(MemoryUserStore::new()),
        tokens: token_settings(&config.auth)?,
    };

    let shutdown = ShutdownCoordinator::new();
    shutdown.listen_for_os_signals();

    let app = handlers::api_mux(shutdown.clone(), deps);
    let active_kid = config.auth.active_kid.clone();
    let readiness = ReadinessCheck::new().add_check("signing_key", move || authority.keys().can_sign(&active_kid));

    tracing::info!(
        version = VERSION,
        routes = app.route_count(),
        http_addr = %config.server.http_addr,
        debug_addr = %config.server.debug_addr,
        "starting sales-api"
    );

    Server::new(app, server_config(&config))
        .with_health(HealthCheck::new(config.telemetry.service_name.clone(), VERSION))
        .with_readiness(readiness)
        .run()
        .await?;

    if let Some(reason) = shutdown.reason() {
        tracing::info!(reason = %reason, "sales-api stopped");
    }
    Ok(())
}
