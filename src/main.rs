use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use tracing::info;

mod api;
mod config;
mod error;
mod probe;
mod readiness;
mod server;

use config::Config;
use readiness::ReadinessAggregator;

const DEFAULT_LOG_FILTER: &str = "hello_web=info,tower_http=warn";
const HEALTHCHECK_TIMEOUT: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // When invoked as a container HEALTHCHECK, hit /health and exit immediately.
    if std::env::args().nth(1).as_deref() == Some("--healthcheck") {
        return healthcheck().await;
    }

    let config = load_config()?;

    // RUST_LOG wins, then the config file, then the built-in default.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        config
            .server
            .log_level
            .as_deref()
            .unwrap_or(DEFAULT_LOG_FILTER)
            .into()
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Registration happens once, here, before anything can call /ready.
    // A duplicate probe name stops the process before the port is bound.
    let readiness = ReadinessAggregator::from_config(&config.probes)
        .context("registering readiness probes")?;

    if readiness.is_empty() {
        info!("no readiness probes configured, /ready will always report ready");
    }

    info!(
        port = config.server.port,
        probes = ?readiness.names().collect::<Vec<_>>(),
        ready_timeout_ms = config.server.ready_timeout_ms,
        "hello-web starting"
    );

    let state = Arc::new(server::AppState::new(
        readiness,
        config.server.ready_timeout(),
    ));
    let addr = SocketAddr::new(config.server.bind, config.server.port);

    server::serve(addr, state).await
}

/// Config file from `HELLO_WEB_CONFIG` if set, defaults otherwise; `PORT` on top.
fn load_config() -> anyhow::Result<Config> {
    let config = match std::env::var_os("HELLO_WEB_CONFIG") {
        Some(path) => {
            let path = PathBuf::from(path);
            Config::load(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => Config::default(),
    };
    config.with_port_override(std::env::var("PORT").ok().as_deref())
}

/// Lightweight healthcheck: GET /health and exit 0 on 2xx, 1 otherwise.
/// Invoked via `hello-web --healthcheck`.
async fn healthcheck() -> anyhow::Result<()> {
    let url = load_config()
        .map(|c| c.server.health_url())
        .unwrap_or_else(|_| Config::default().server.health_url());

    let client = reqwest::Client::builder()
        .timeout(HEALTHCHECK_TIMEOUT)
        .build()
        .context("building reqwest client")?;

    match client.get(&url).send().await {
        Ok(resp) if resp.status().is_success() => std::process::exit(0),
        Ok(resp) => {
            eprintln!("{url} returned HTTP {}", resp.status());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{url}: {e}");
            std::process::exit(1);
        }
    }
}
