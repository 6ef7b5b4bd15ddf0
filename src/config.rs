//! Configuration types for hello-web.
//!
//! Config is loaded once at startup from a TOML file and validated before the
//! server opens any ports. When no file is configured the built-in defaults
//! apply: port 3000 and no dependency probes, which makes `/ready` vacuously
//! ready.
//!
//! # Example
//! ```toml
//! [server]
//! port             = 3000
//! ready_timeout_ms = 2000
//!
//! [[probes]]
//! name   = "db"
//! kind   = "tcp"
//! target = "localhost:5432"
//!
//! [[probes]]
//! name   = "cache"
//! kind   = "http"
//! target = "http://localhost:8091/ping"
//! ```

use std::{
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    path::Path,
    time::Duration,
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    /// Dependency probes consulted by `/ready`, in the order they are listed.
    ///
    /// The order here is the order of the `checks` array in verbose readiness
    /// responses and decides which failure is reported first.
    #[serde(default)]
    pub probes: Vec<ProbeConfig>,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let config: Self = toml::from_str(&content).context("parsing config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Apply a `PORT` environment override on top of the loaded values.
    pub fn with_port_override(mut self, port: Option<&str>) -> anyhow::Result<Self> {
        if let Some(raw) = port {
            self.server.port = raw
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a TCP port number, got `{raw}`"))?;
        }
        Ok(self)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.ready_timeout_ms > 0,
            "server.ready_timeout_ms must be greater than zero"
        );

        for probe in &self.probes {
            anyhow::ensure!(!probe.name.trim().is_empty(), "probe name must not be empty");
            anyhow::ensure!(
                !probe.target.trim().is_empty(),
                "probe `{}` has an empty target",
                probe.name
            );
            anyhow::ensure!(
                probe.timeout_ms > 0,
                "probe `{}` timeout_ms must be greater than zero",
                probe.name
            );
            if probe.kind == ProbeKind::Tcp {
                anyhow::ensure!(
                    probe.expect_status.is_none(),
                    "probe `{}` is a tcp probe and cannot set expect_status",
                    probe.name
                );
            }
        }

        // Duplicate names are left to probe registration, which owns that rule.
        Ok(())
    }
}

/// Listener and readiness settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// TCP port to listen on (default: 3000).
    #[serde(default = "defaults::port")]
    pub port: u16,

    /// Address to bind (default: `0.0.0.0`).
    #[serde(default = "defaults::bind")]
    pub bind: IpAddr,

    /// Upper bound on a whole `/ready` evaluation in milliseconds (default: 2000).
    ///
    /// Probes still running when this expires are reported as `timeout`.
    #[serde(default = "defaults::ready_timeout_ms")]
    pub ready_timeout_ms: u64,

    /// Log filter used when `RUST_LOG` is not set.
    #[serde(default)]
    pub log_level: Option<String>,
}

impl ServerConfig {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    /// Where a local `--healthcheck` reaches `/health`.
    ///
    /// A wildcard bind is reached over loopback of the same family; a specific
    /// bind address is used as-is.
    pub fn health_url(&self) -> String {
        let host = match self.bind {
            IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
            ip => ip,
        };
        format!("http://{}/health", SocketAddr::new(host, self.port))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: defaults::port(),
            bind: defaults::bind(),
            ready_timeout_ms: defaults::ready_timeout_ms(),
            log_level: None,
        }
    }
}

/// How a probe reaches its dependency.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    /// Open a TCP connection to `host:port`.
    Tcp,
    /// Issue `GET <url>` and inspect the status code.
    Http,
}

impl std::fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Tcp => "tcp",
            Self::Http => "http",
        })
    }
}

/// A single dependency probe.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProbeConfig {
    /// Unique probe name, e.g. `db`, `cache`.
    pub name: String,

    pub kind: ProbeKind,

    /// `host:port` for tcp probes, a full URL for http probes.
    pub target: String,

    /// The probe's own deadline in milliseconds (default: 1000).
    #[serde(default = "defaults::probe_timeout_ms")]
    pub timeout_ms: u64,

    /// Exact HTTP status required for success. Any 2xx passes when unset.
    #[serde(default)]
    pub expect_status: Option<u16>,
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

mod defaults {
    use std::net::{IpAddr, Ipv4Addr};

    pub fn port() -> u16 { 3000 }
    pub fn bind() -> IpAddr { IpAddr::V4(Ipv4Addr::UNSPECIFIED) }
    pub fn ready_timeout_ms() -> u64 { 2_000 }
    pub fn probe_timeout_ms() -> u64 { 1_000 }
}
