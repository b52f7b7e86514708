//! Shutdown coordination.
//!
//! Two things can stop the service: an OS termination signal, and a
//! [`ApiError::Shutdown`](warden_core::ApiError::Shutdown) escaping a request
//! chain. Both go through [`ShutdownCoordinator::trigger`], which lets
//! exactly one caller win, runs the drain hook once and wakes every waiter.
//!
//! # Example
//!
//! ```
//! use warden_server::{ShutdownCoordinator, ShutdownReason};
//!
//! let shutdown = ShutdownCoordinator::new();
//! assert!(shutdown.trigger(ShutdownReason::InBand("integrity failure".into())));
//! assert!(!shutdown.trigger(ShutdownReason::Signal("SIGTERM".into())));
//! assert_eq!(shutdown.reason(), Some(ShutdownReason::InBand("integrity failure".into())));
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use warden_telemetry::metrics::record_shutdown_trigger;

/// Why the service is stopping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// An OS signal, by name (`SIGTERM`, `SIGINT`).
    Signal(String),
    /// A shutdown error escaped a request chain.
    InBand(String),
}

impl ShutdownReason {
    /// Returns the metrics label for this source.
    #[must_use]
    pub const fn source(&self) -> &'static str {
        match self {
            Self::Signal(_) => "signal",
            Self::InBand(_) => "in_band",
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(name) => write!(f, "received {name}"),
            Self::InBand(message) => write!(f, "in-band shutdown: {message}"),
        }
    }
}

type DrainHook = Box<dyn FnOnce(&ShutdownReason) + Send>;

struct Inner {
    triggered: AtomicBool,
    drain: Mutex<Option<DrainHook>>,
    reason: watch::Sender<Option<ShutdownReason>>,
}

/// Merges every shutdown source into one drain-and-stop sequence.
///
/// Cloning is cheap; all clones share the same latch.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    inner: Arc<Inner>,
}

impl ShutdownCoordinator {
    /// Creates an untriggered coordinator.
    #[must_use]
    pub fn new() -> Self {
        let (reason, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                triggered: AtomicBool::new(false),
                drain: Mutex::new(None),
                reason,
            }),
        }
    }

    /// Registers the hook run once when shutdown is first triggered.
    ///
    /// If shutdown has already been triggered the hook runs immediately.
    /// Registering again replaces a hook that has not run yet.
    pub fn on_drain<F>(&self, hook: F)
    where
        F: FnOnce(&ShutdownReason) + Send + 'static,
    {
        let mut slot = self.inner.drain.lock();
        match self.reason() {
            Some(reason) => {
                drop(slot);
                hook(&reason);
            }
            None => *slot = Some(Box::new(hook)),
        }
    }

    /// Requests shutdown.
    ///
    /// Returns `true` for the single caller that flipped the latch; every
    /// later call is a no-op returning `false`.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        if self
            .inner
            .triggered
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!(%reason, "shutdown already in progress");
            return false;
        }

        record_shutdown_trigger(reason.source());
        match &reason {
            ShutdownReason::Signal(_) => tracing::info!(%reason, "shutdown requested"),
            ShutdownReason::InBand(_) => tracing::error!(%reason, "shutdown requested"),
        }

        // The reason is published under the hook lock so `on_drain` either
        // sees it or leaves its hook for this call to take.
        let hook = {
            let mut slot = self.inner.drain.lock();
            self.inner.reason.send_replace(Some(reason.clone()));
            slot.take()
        };
        if let Some(hook) = hook {
            hook(&reason);
        }
        true
    }

    /// Returns `true` once shutdown has been triggered.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::SeqCst)
    }

    /// Returns the winning reason, once triggered.
    #[must_use]
    pub fn reason(&self) -> Option<ShutdownReason> {
        self.inner.reason.borrow().clone()
    }

    /// Resolves with the reason once shutdown is triggered.
    ///
    /// Resolves immediately if it already was.
    pub async fn wait(&self) -> ShutdownReason {
        let mut rx = self.inner.reason.subscribe();
        loop {
            let current = rx.borrow_and_update().clone();
            if let Some(reason) = current {
                return reason;
            }
            if rx.changed().await.is_err() {
                // The sender lives in `inner`, which `self` keeps alive.
                return ShutdownReason::InBand("shutdown coordinator dropped".to_string());
            }
        }
    }

    /// Spawns a task that triggers shutdown on SIGTERM or SIGINT.
    ///
    /// The task ends after the first signal or when shutdown is triggered
    /// some other way.
    pub fn listen_for_os_signals(&self) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                signal = wait_for_os_signal() => match signal {
                    Ok(name) => {
                        coordinator.trigger(ShutdownReason::Signal(name.to_string()));
                    }
                    Err(e) => tracing::error!(error = %e, "failed to listen for shutdown signals"),
                },
                _ = coordinator.wait() => {}
            }
        })
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ShutdownCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownCoordinator")
            .field("triggered", &self.is_triggered())
            .field("reason", &self.reason())
            .finish_non_exhaustive()
    }
}

/// Waits for SIGTERM or SIGINT and returns its name.
#[cfg(unix)]
async fn wait_for_os_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => Ok("SIGTERM"),
        _ = sigint.recv() => Ok("SIGINT"),
    }
}

/// Waits for Ctrl+C.
#[cfg(not(unix))]
async fn wait_for_os_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("SIGINT")
}

/// Counts open connections so the drain can wait for them.
///
/// # Example
///
/// ```
/// use warden_server::shutdown::ConnectionTracker;
///
/// let tracker = ConnectionTracker::new();
/// let token = tracker.acquire();
/// assert_eq!(tracker.active_connections(), 1);
///
/// drop(token);
/// assert_eq!(tracker.active_connections(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl ConnectionTracker {
    /// Creates a new connection tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires a token held for the lifetime of one connection.
    #[must_use]
    pub fn acquire(&self) -> ConnectionToken {
        self.active.fetch_add(1, Ordering::SeqCst);
        ConnectionToken {
            active: Arc::clone(&self.active),
            notify: Arc::clone(&self.notify),
        }
    }

    /// Returns the number of open connections.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Waits until every token has been dropped.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a drop in between is not missed.
            notified.as_mut().enable();
            if self.active.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// An open connection; dropping it decrements the tracker.
#[derive(Debug)]
pub struct ConnectionToken {
    active: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl Drop for ConnectionToken {
    fn drop(&mut self) {
        if self.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify.notify_waiters();
        }
    }
}
