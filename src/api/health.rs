//! Liveness probe endpoint.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// `GET /health` — always returns 200 OK with `{"status": "ok"}`.
///
/// Deliberately takes no state: liveness must not depend on the readiness
/// probes or anything else that can fail.
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::{
        readiness::{tests::StaticProbe, ReadinessAggregator},
        server::{router, AppState},
    };

    async fn get_health(state: Arc<AppState>) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method("GET")
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = router(state).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_returns_200_ok() {
        let state = Arc::new(AppState::new(ReadinessAggregator::new(), Duration::from_secs(1)));
        let (status, json) = get_health(state).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn health_ignores_failing_and_hung_probes() {
        let mut agg = ReadinessAggregator::new();
        agg.register("db", StaticProbe::unhealthy("connection refused")).unwrap();
        agg.register("hung", StaticProbe::slow(Duration::from_secs(30))).unwrap();
        let state = Arc::new(AppState::new(agg, Duration::from_secs(10)));

        let started = std::time::Instant::now();
        let (status, json) = get_health(state).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
