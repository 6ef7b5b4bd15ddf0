//! HTTP GET probe.
//!
//! Modelled on a lightweight backend health check: one `GET`, no body
//! inspection, only the status code matters.

use std::{error::Error as _, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};

use super::{describe_io_error, Probe, ProbeOutcome};

/// Healthy when `GET url` answers in time with an accepted status.
///
/// Accepted means exactly `expect_status` when one is configured, any 2xx
/// otherwise. Redirects are followed by reqwest before the status is checked.
pub struct HttpProbe {
    client: Client,
    url: Url,
    expect_status: Option<StatusCode>,
}

impl HttpProbe {
    pub fn new(url: &str, timeout: Duration, expect_status: Option<u16>) -> anyhow::Result<Self> {
        let url = Url::parse(url).with_context(|| format!("invalid probe URL `{url}`"))?;
        let expect_status = expect_status
            .map(StatusCode::from_u16)
            .transpose()
            .context("invalid expect_status")?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building reqwest client")?;

        Ok(Self {
            client,
            url,
            expect_status,
        })
    }

    fn accepts(&self, status: StatusCode) -> bool {
        match self.expect_status {
            Some(expected) => status == expected,
            None => status.is_success(),
        }
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn check(&self) -> ProbeOutcome {
        match self.client.get(self.url.clone()).send().await {
            Ok(resp) if self.accepts(resp.status()) => ProbeOutcome::Healthy,
            Ok(resp) => {
                ProbeOutcome::Unhealthy(format!("unexpected status {}", resp.status().as_u16()))
            }
            Err(e) => {
                tracing::debug!(url = %self.url, error = %e, "http probe failed");
                ProbeOutcome::Unhealthy(describe_reqwest_error(&e))
            }
        }
    }
}

/// Reduce a reqwest error to a short reason without echoing the full URL.
fn describe_reqwest_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        return super::TIMEOUT_REASON.to_string();
    }

    // The io::Error that caused a connect failure sits a few levels down.
    let mut source = e.source();
    while let Some(inner) = source {
        if let Some(io) = inner.downcast_ref::<std::io::Error>() {
            return describe_io_error(io);
        }
        source = inner.source();
    }

    if e.is_connect() {
        "connection failed".to_string()
    } else {
        "request failed".to_string()
    }
}
