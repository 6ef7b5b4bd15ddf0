//! Dependency probes: one reachability check per external dependency.
//!
//! A [`Probe`] answers a single question: is this dependency reachable right
//! now? It must answer within its own deadline and resolve to
//! [`ProbeOutcome::timeout`] instead of hanging. Probes do not know their
//! registered name; the [`crate::readiness::ReadinessAggregator`] owns naming
//! and ordering.
//!
//! Two concrete probes are built from config:
//!
//! - [`TcpProbe`] opens a TCP connection (`kind = "tcp"`)
//! - [`HttpProbe`] issues a `GET` and checks the status (`kind = "http"`)

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{ProbeConfig, ProbeKind};

mod http;
mod tcp;

pub use http::HttpProbe;
pub use tcp::TcpProbe;

/// Reason reported when a probe (or the whole evaluation) runs out of time.
pub const TIMEOUT_REASON: &str = "timeout";

/// Result of a single [`Probe::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Healthy,
    /// Dependency unreachable; the reason is shown to `/ready` callers verbatim.
    Unhealthy(String),
}

impl ProbeOutcome {
    pub fn unhealthy(reason: impl Into<String>) -> Self {
        Self::Unhealthy(reason.into())
    }

    pub fn timeout() -> Self {
        Self::Unhealthy(TIMEOUT_REASON.to_string())
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// Reachability check for one dependency.
///
/// Implementations must be cheap to call repeatedly and must bound their own
/// running time. The aggregator also enforces an overall deadline, but a probe
/// that relies on that deadline will be reported as `timeout` on every call.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn check(&self) -> ProbeOutcome;
}

/// Construct the probe described by `cfg`.
pub fn build(cfg: &ProbeConfig) -> anyhow::Result<Arc<dyn Probe>> {
    let probe: Arc<dyn Probe> = match cfg.kind {
        ProbeKind::Tcp => Arc::new(TcpProbe::new(cfg.target.clone(), cfg.timeout())),
        ProbeKind::Http => Arc::new(HttpProbe::new(
            &cfg.target,
            cfg.timeout(),
            cfg.expect_status,
        )?),
    };
    Ok(probe)
}

/// Human-readable reason for a failed connection attempt.
///
/// Refused connections are reported as `connection refused` regardless of the
/// platform's error text, so `/ready` bodies stay stable across hosts.
fn describe_io_error(e: &std::io::Error) -> String {
    match e.kind() {
        std::io::ErrorKind::ConnectionRefused => "connection refused".to_string(),
        std::io::ErrorKind::TimedOut => TIMEOUT_REASON.to_string(),
        _ => e.to_string(),
    }
}
