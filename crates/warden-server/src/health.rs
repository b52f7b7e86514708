//! Probe bodies for the debug listener.
//!
//! `GET /debug/liveness` answers 200 for as long as the process serves
//! anything. `GET /debug/readiness` answers 200 until the drain starts or a
//! registered check fails, then 503.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Liveness probe path.
pub const LIVENESS_PATH: &str = "/debug/liveness";

/// Readiness probe path.
pub const READINESS_PATH: &str = "/debug/readiness";

/// Liveness probe body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LivenessStatus {
    /// Always `"up"`.
    pub status: String,
    /// Service name.
    pub service: String,
    /// Build version.
    pub version: String,
    /// `$HOSTNAME` (the pod name under Kubernetes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Whole seconds since the reporter was created.
    pub uptime_seconds: u64,
}

/// Reports liveness for one service instance.
///
/// ```
/// use warden_server::HealthCheck;
///
/// let report = HealthCheck::new("sales-api", "0.1.0").status();
/// assert_eq!((report.status.as_str(), report.service.as_str()), ("up", "sales-api"));
/// ```
#[derive(Debug, Clone)]
pub struct HealthCheck {
    service: String,
    version: String,
    host: Option<String>,
    born: Instant,
}

impl HealthCheck {
    /// Starts the uptime clock.
    #[must_use]
    pub fn new(service: impl Into<String>, version: impl Into<String>) -> Self {
        let host = std::env::var("HOSTNAME").ok().filter(|name| !name.is_empty());
        Self {
            service: service.into(),
            version: version.into(),
            host,
            born: Instant::now(),
        }
    }

    /// Snapshot for the probe.
    #[must_use]
    pub fn status(&self) -> LivenessStatus {
        LivenessStatus {
            status: "up".into(),
            service: self.service.clone(),
            version: self.version.clone(),
            host: self.host.clone(),
            uptime_seconds: self.born.elapsed().as_secs(),
        }
    }
}

/// Readiness probe body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadinessStatus {
    /// Route traffic here.
    pub ready: bool,
    /// Per-check outcome; omitted when no checks are registered.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub checks: BTreeMap<String, bool>,
}

#[derive(Clone)]
struct NamedCheck {
    name: Arc<str>,
    probe: Arc<dyn Fn() -> bool + Send + Sync>,
}

/// Decides whether the instance should receive traffic.
///
/// Ready means not draining and every check passing. Clones share the
/// draining flag, so the shutdown hook can hold one.
///
/// ```
/// use warden_server::ReadinessCheck;
///
/// let readiness = ReadinessCheck::new().add_check("signing_key", || true);
/// let hook_view = readiness.clone();
/// hook_view.set_ready(false);
/// assert!(!readiness.is_ready());
/// ```
#[derive(Clone, Default)]
pub struct ReadinessCheck {
    checks: Vec<NamedCheck>,
    draining: Arc<AtomicBool>,
}

impl ReadinessCheck {
    /// No checks, not draining.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a check run on every probe.
    #[must_use]
    pub fn add_check<F>(mut self, name: impl Into<String>, probe: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.checks.push(NamedCheck {
            name: name.into().into(),
            probe: Arc::new(probe),
        });
        self
    }

    /// Runs the checks.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        !self.draining.load(Ordering::Acquire) && self.checks.iter().all(|c| (c.probe)())
    }

    /// Runs the checks and reports each one.
    #[must_use]
    pub fn status(&self) -> ReadinessStatus {
        let checks: BTreeMap<String, bool> = self.checks.iter().map(|c| (c.name.to_string(), (c.probe)())).collect();
        let ready = !self.draining.load(Ordering::Acquire) && !checks.values().any(|ok| !ok);
        ReadinessStatus { ready, checks }
    }

    /// `false` marks the instance as draining; `true` clears it.
    pub fn set_ready(&self, ready: bool) {
        self.draining.store(!ready, Ordering::Release);
    }
}

impl fmt::Debug for ReadinessCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadinessCheck")
            .field("checks", &self.checks.iter().map(|c| &*c.name).collect::<Vec<_>>())
            .field("draining", &self.draining.load(Ordering::Relaxed))
            .finish()
    }
}
