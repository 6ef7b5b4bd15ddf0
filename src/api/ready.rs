//! Readiness probe endpoint.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{readiness::ProbeResult, server::AppState};

#[derive(Debug, Deserialize)]
pub struct ReadyQuery {
    verbose: Option<String>,
}

impl ReadyQuery {
    /// `?verbose`, `?verbose=1`, `?verbose=true`, `?verbose=yes` and `?verbose=on`
    /// switch on per-probe output. Anything else leaves it off.
    fn is_verbose(&self) -> bool {
        self.verbose.as_deref().is_some_and(|v| {
            v.is_empty()
                || v == "1"
                || ["true", "yes", "on"].iter().any(|t| v.eq_ignore_ascii_case(t))
        })
    }
}

#[derive(Serialize)]
struct ReadyBody<'a> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    checks: Option<&'a [ProbeResult]>,
}

/// `GET /ready` — evaluate every registered probe.
///
/// ```json
/// 200 {"status": "ready"}
/// 503 {"status": "not ready", "error": "connection refused"}
/// ```
///
/// `error` is the detail of the first failing probe in registration order.
/// With `?verbose` both shapes also carry `checks`. A malformed query string
/// is ignored rather than rejected, so the status code always reflects the
/// verdict.
pub async fn ready(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ReadyQuery>, QueryRejection>,
) -> impl IntoResponse {
    let verbose = query.is_ok_and(|Query(q)| q.is_verbose());
    let verdict = state.readiness.evaluate(state.ready_timeout).await;

    let error = verdict.failure_summary();
    let (status, label) = if error.is_none() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    };

    let body = ReadyBody {
        status: label,
        error,
        checks: verbose.then_some(verdict.results.as_slice()),
    };
    (status, Json(body)).into_response()
}
