//! Readiness aggregation: run every registered probe and fold the outcomes
//! into one verdict.
//!
//! The rule is all-must-pass. A verdict is ready iff every probe reported
//! healthy, so an empty registry is vacuously ready.
//!
//! Evaluation is bounded by a single deadline. Probes run concurrently, each
//! in its own task, and whatever is still running when the deadline passes is
//! aborted and reported as `timeout`. Results are always listed in
//! registration order so repeated calls produce stable responses.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use serde::{Serialize, Serializer};
use tokio::task::{self, JoinSet};
use tracing::{debug, warn};

use crate::{
    config::ProbeConfig,
    error::RegistrationError,
    probe::{self, Probe, ProbeOutcome},
};

/// Outcome of one probe within one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub name: String,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(rename = "latency_ms", serialize_with = "serialize_millis")]
    pub latency: Duration,
}

impl ProbeResult {
    fn new(name: &str, outcome: ProbeOutcome, latency: Duration) -> Self {
        let healthy = outcome.is_healthy();
        let detail = match outcome {
            ProbeOutcome::Healthy => None,
            ProbeOutcome::Unhealthy(reason) => Some(reason),
        };
        Self {
            name: name.to_string(),
            healthy,
            detail,
            latency,
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(millis(*d))
}

/// Snapshot answer to "can this process serve traffic right now?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadinessVerdict {
    pub ready: bool,
    pub results: Vec<ProbeResult>,
}

impl ReadinessVerdict {
    fn from_results(results: Vec<ProbeResult>) -> Self {
        Self {
            ready: results.iter().all(|r| r.healthy),
            results,
        }
    }

    /// First unhealthy result in registration order.
    pub fn first_failure(&self) -> Option<&ProbeResult> {
        self.results.iter().find(|r| !r.healthy)
    }

    /// Short reason suitable for the `error` field of a `503` body.
    pub fn failure_summary(&self) -> Option<String> {
        self.first_failure().map(|r| match &r.detail {
            Some(detail) => detail.clone(),
            None => format!("probe `{}` is unhealthy", r.name),
        })
    }
}

/// Ordered registry of named probes.
///
/// Registration takes `&mut self`; once the aggregator is shared (behind an
/// `Arc` in the server state) the registry is frozen.
#[derive(Default)]
pub struct ReadinessAggregator {
    probes: Vec<(String, Arc<dyn Probe>)>,
}

impl ReadinessAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and register every configured probe, in config order.
    pub fn from_config(probes: &[ProbeConfig]) -> anyhow::Result<Self> {
        let mut aggregator = Self::new();
        for cfg in probes {
            aggregator.register(cfg.name.clone(), probe::build(cfg)?)?;
            debug!(probe = %cfg.name, kind = %cfg.kind, target = %cfg.target, "registered probe");
        }
        Ok(aggregator)
    }

    /// Add a probe under `name`. Names are unique.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        probe: Arc<dyn Probe>,
    ) -> Result<(), RegistrationError> {
        let name = name.into();
        if self.probes.iter().any(|(existing, _)| *existing == name) {
            return Err(RegistrationError::DuplicateProbe(name));
        }
        self.probes.push((name, probe));
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// Registered probe names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.probes.iter().map(|(name, _)| name.as_str())
    }

    /// Run every probe concurrently and aggregate the outcomes.
    ///
    /// Returns no later than `overall_timeout` after the call (plus scheduling
    /// slack). Never fails: panics, errors and timeouts all become unhealthy
    /// results.
    pub async fn evaluate(&self, overall_timeout: Duration) -> ReadinessVerdict {
        let started = Instant::now();
        let deadline = tokio::time::Instant::from_std(started) + overall_timeout;

        // Dropping the set aborts every task still in it, so a cancelled
        // evaluation never leaves probe tasks running behind it.
        let mut tasks = JoinSet::new();
        let mut slots: HashMap<task::Id, usize> = HashMap::with_capacity(self.probes.len());
        for (index, (_, probe)) in self.probes.iter().enumerate() {
            let probe = Arc::clone(probe);
            let handle = tasks.spawn(async move {
                let begun = Instant::now();
                let outcome = probe.check().await;
                (outcome, begun.elapsed())
            });
            slots.insert(handle.id(), index);
        }

        let mut outcomes: Vec<Option<(ProbeOutcome, Duration)>> = vec![None; self.probes.len()];
        loop {
            let next = tokio::time::timeout_at(deadline, tasks.join_next_with_id()).await;
            match next {
                Ok(None) => break,
                Ok(Some(Ok((id, finished)))) => outcomes[slots[&id]] = Some(finished),
                Ok(Some(Err(join_err))) => {
                    let reason = if join_err.is_panic() {
                        "probe panicked"
                    } else {
                        "probe cancelled"
                    };
                    outcomes[slots[&join_err.id()]] =
                        Some((ProbeOutcome::unhealthy(reason), started.elapsed()));
                }
                Err(_) => {
                    tasks.abort_all();
                    break;
                }
            }
        }

        let results: Vec<ProbeResult> = self
            .probes
            .iter()
            .zip(outcomes)
            .map(|((name, _), slot)| {
                let (outcome, latency) =
                    slot.unwrap_or_else(|| (ProbeOutcome::timeout(), started.elapsed()));
                ProbeResult::new(name, outcome, latency)
            })
            .collect();

        for r in results.iter().filter(|r| !r.healthy) {
            warn!(
                probe = %r.name,
                detail = r.detail.as_deref().unwrap_or(""),
                latency_ms = millis(r.latency),
                "probe unhealthy"
            );
        }

        ReadinessVerdict::from_results(results)
    }
}
