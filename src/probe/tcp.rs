//! TCP connect probe.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

use super::{describe_io_error, Probe, ProbeOutcome};

/// Healthy when a TCP connection to `addr` completes within `timeout`.
///
/// The connection is dropped immediately; nothing is written to the socket.
pub struct TcpProbe {
    addr: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Probe for TcpProbe {
    async fn check(&self) -> ProbeOutcome {
        match tokio::time::timeout(self.timeout, TcpStream::connect(self.addr.as_str())).await {
            Ok(Ok(_stream)) => ProbeOutcome::Healthy,
            Ok(Err(e)) => {
                tracing::debug!(addr = %self.addr, error = %e, "tcp probe failed");
                ProbeOutcome::Unhealthy(describe_io_error(&e))
            }
            Err(_) => ProbeOutcome::timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn healthy_when_listener_accepts() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let probe = TcpProbe::new(addr.to_string(), Duration::from_secs(1));
        assert_eq!(probe.check().await, ProbeOutcome::Healthy);
    }

    #[tokio::test]
    async fn connection_refused_when_nothing_listens() {
        // Grab a free port, then release it so the connect is refused.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe = TcpProbe::new(addr.to_string(), Duration::from_secs(1));
        assert_eq!(
            probe.check().await,
            ProbeOutcome::Unhealthy("connection refused".into())
        );
    }

    #[tokio::test]
    async fn connect_outlasting_own_timeout_resolves_to_timeout() {
        // A live listener rules out refusals; a zero budget expires before the
        // reactor can report the socket writable.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let probe = TcpProbe::new(addr.to_string(), Duration::ZERO);
        assert_eq!(probe.check().await, ProbeOutcome::timeout());
    }

    #[tokio::test]
    async fn unresolvable_host_is_unhealthy() {
        let probe = TcpProbe::new("no-such-host.invalid:80", Duration::from_secs(2));
        assert!(!probe.check().await.is_healthy());
    }
}
