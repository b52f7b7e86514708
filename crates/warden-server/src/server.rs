//! HTTP server.
//!
//! Two listeners run side by side: the API listener feeds every request
//! to [`App::dispatch`], and the debug listener answers the liveness and
//! readiness probes. Both are plain HTTP/1.1 over Hyper with one task
//! per connection.
//!
//! Once the app's [`ShutdownCoordinator`] fires, the server drains:
//!
//! 1. readiness flips to not-ready (the drain hook),
//! 2. the API accept loop stops,
//! 3. open connections finish their in-flight request and close,
//! 4. the server waits for them, bounded by the shutdown timeout.
//!
//! # Example
//!
//! ```rust,no_run
//! use warden_server::{App, Server, ServerConfig, ShutdownCoordinator};
//!
//! # async fn run() -> Result<(), warden_server::ServerError> {
//! let shutdown = ShutdownCoordinator::new();
//! shutdown.listen_for_os_signals();
//!
//! let app = App::new(shutdown);
//! Server::new(app, ServerConfig::default()).run().await
//! # }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};
use warden_core::ApiError;
use warden_middleware::{error_response, json_response, Request, Response};

use crate::app::App;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::health::{HealthCheck, ReadinessCheck, LIVENESS_PATH, READINESS_PATH};
use crate::shutdown::{ConnectionTracker, ShutdownCoordinator};

struct Shared {
    app: App,
    config: ServerConfig,
    health: HealthCheck,
    readiness: ReadinessCheck,
}

/// The warden HTTP server.
pub struct Server {
    shared: Shared,
}

impl Server {
    /// Creates a server for `app`.
    #[must_use]
    pub fn new(app: App, config: ServerConfig) -> Self {
        Self {
            shared: Shared {
                app,
                config,
                health: HealthCheck::new("warden", env!("CARGO_PKG_VERSION")),
                readiness: ReadinessCheck::new(),
            },
        }
    }

    /// Replaces the liveness reporter.
    #[must_use]
    pub fn with_health(mut self, health: HealthCheck) -> Self {
        self.shared.health = health;
        self
    }

    /// Replaces the readiness tracker.
    #[must_use]
    pub fn with_readiness(mut self, readiness: ReadinessCheck) -> Self {
        self.shared.readiness = readiness;
        self
    }

    /// Returns the readiness tracker.
    #[must_use]
    pub const fn readiness(&self) -> &ReadinessCheck {
        &self.shared.readiness
    }

    /// Binds both listeners.
    ///
    /// # Errors
    ///
    /// Returns an error if an address is invalid or cannot be bound.
    pub async fn bind(self) -> Result<BoundServer, ServerError> {
        let api = bind(self.shared.config.parse_http_addr()?).await?;
        let debug = bind(self.shared.config.parse_debug_addr()?).await?;

        Ok(BoundServer {
            api_addr: api.local_addr()?,
            debug_addr: debug.local_addr()?,
            api,
            debug,
            shared: Arc::new(self.shared),
        })
    }

    /// Binds and serves until shutdown completes.
    ///
    /// # Errors
    ///
    /// Returns an error if the listeners cannot be bound.
    pub async fn run(self) -> Result<(), ServerError> {
        self.bind().await?.serve().await
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("app", &self.shared.app)
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

async fn bind(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

/// A server whose listeners are bound but not yet accepting.
pub struct BoundServer {
    api: TcpListener,
    debug: TcpListener,
    api_addr: SocketAddr,
    debug_addr: SocketAddr,
    shared: Arc<Shared>,
}

impl BoundServer {
    /// Returns the bound API address.
    #[must_use]
    pub const fn api_addr(&self) -> SocketAddr {
        self.api_addr
    }

    /// Returns the bound debug address.
    #[must_use]
    pub const fn debug_addr(&self) -> SocketAddr {
        self.debug_addr
    }

    /// Serves requests until shutdown is triggered and the drain finishes.
    ///
    /// # Errors
    ///
    /// Currently always returns `Ok`; accept failures are logged and
    /// retried.
    pub async fn serve(self) -> Result<(), ServerError> {
        let Self {
            api,
            debug,
            api_addr,
            debug_addr,
            shared,
        } = self;

        let shutdown = shared.app.shutdown().clone();
        let readiness = shared.readiness.clone();
        shutdown.on_drain(move |reason| {
            readiness.set_ready(false);
            info!(reason = %reason, "draining: readiness set to not ready");
        });

        info!(api = %api_addr, debug = %debug_addr, "server listening");

        let debug_task = tokio::spawn(accept_debug(debug, Arc::clone(&shared)));
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                accepted = api.accept() => match accepted {
                    Ok((stream, remote)) => {
                        let token = tracker.acquire();
                        let shared = Arc::clone(&shared);
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            serve_api_connection(stream, remote, shared, shutdown).await;
                            drop(token);
                        });
                    }
                    Err(e) => warn!(error = %e, "failed to accept connection"),
                },
                reason = shutdown.wait() => {
                    info!(reason = %reason, "shutdown started, no longer accepting connections");
                    break;
                }
            }
        }
        drop(api);

        let timeout = shared.config.shutdown_timeout();
        info!(
            active_connections = tracker.active_connections(),
            timeout_secs = timeout.as_secs(),
            "waiting for open connections"
        );
        match tokio::time::timeout(timeout, tracker.wait_idle()).await {
            Ok(()) => info!("all connections closed"),
            Err(_) => warn!(
                active_connections = tracker.active_connections(),
                "shutdown timeout reached with connections still open"
            ),
        }

        debug_task.abort();
        info!("server stopped");
        Ok(())
    }
}

impl std::fmt::Debug for BoundServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundServer")
            .field("api_addr", &self.api_addr)
            .field("debug_addr", &self.debug_addr)
            .finish_non_exhaustive()
    }
}

async fn serve_api_connection(
    stream: TcpStream,
    remote: SocketAddr,
    shared: Arc<Shared>,
    shutdown: ShutdownCoordinator,
) {
    let service = service_fn(move |request: hyper::Request<Incoming>| {
        let shared = Arc::clone(&shared);
        async move { Ok::<_, Infallible>(handle_api(&shared, request).await) }
    });

    let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
    tokio::pin!(conn);

    let result = tokio::select! {
        result = conn.as_mut() => result,
        _ = shutdown.wait() => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };

    if let Err(e) = result {
        debug!(remote = %remote, error = %e, "connection closed with error");
    }
}

/// Reads the body under the size and time limits, then dispatches. A body
/// that breaks a limit is rejected through the app's global stages.
async fn handle_api(shared: &Shared, request: hyper::Request<Incoming>) -> Response {
    let (parts, body) = request.into_parts();
    let limited = Limited::new(body, shared.config.max_body_bytes());

    let (status, message) = match tokio::time::timeout(shared.config.request_timeout(), limited.collect()).await {
        Ok(Ok(collected)) => {
            return shared.app.dispatch(Request::from_parts(parts, Full::new(collected.to_bytes()))).await;
        }
        Ok(Err(e)) if e.downcast_ref::<LengthLimitError>().is_some() => {
            warn!(http.path = parts.uri.path(), limit = shared.config.max_body_bytes(), "request body too large");
            (StatusCode::PAYLOAD_TOO_LARGE, "request body too large")
        }
        Ok(Err(e)) => {
            warn!(http.path = parts.uri.path(), error = %e, "failed to read request body");
            (StatusCode::BAD_REQUEST, "failed to read request body")
        }
        Err(_) => {
            warn!(http.path = parts.uri.path(), "request body read timed out");
            (StatusCode::REQUEST_TIMEOUT, "request body read timed out")
        }
    };

    let request = Request::from_parts(parts, Full::new(Bytes::new()));
    shared.app.reject(request, status, message).await
}

async fn accept_debug(listener: TcpListener, shared: Arc<Shared>) {
    loop {
        let (stream, remote) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "failed to accept debug connection");
                continue;
            }
        };

        let shared = Arc::clone(&shared);
        tokio::spawn(async move {
            let service = service_fn(move |request: hyper::Request<Incoming>| {
                let response = handle_debug(&shared, request.method(), request.uri().path());
                async move { Ok::<_, Infallible>(response) }
            });

            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                debug!(remote = %remote, error = %e, "debug connection closed with error");
            }
        });
    }
}

fn handle_debug(shared: &Shared, method: &Method, path: &str) -> Response {
    if *method != Method::GET {
        return error_response(&ApiError::request(StatusCode::METHOD_NOT_ALLOWED, "method not allowed"));
    }

    let result = match path {
        LIVENESS_PATH => json_response(StatusCode::OK, &shared.health.status()),
        READINESS_PATH => {
            let status = shared.readiness.status();
            let code = if status.ready {
                StatusCode::OK
            } else {
                StatusCode::SERVICE_UNAVAILABLE
            };
            json_response(code, &status)
        }
        _ => Err(ApiError::not_found("route not found")),
    };

    result.unwrap_or_else(|e| error_response(&e))
}
