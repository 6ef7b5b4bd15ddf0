//! `X-Request-ID` middleware.
//!
//! Orchestrators poll `/ready` constantly, and a probe warning is only useful
//! if it can be matched to the poll that produced it. Each request therefore
//! runs inside an `INFO` span carrying its id, so the `probe unhealthy` lines
//! emitted by the aggregator inherit it, and the id is echoed back to the
//! caller. A caller-supplied id is kept; otherwise a UUID v4 is minted.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument as _;
use uuid::Uuid;

const HEADER: &str = "x-request-id";

/// The caller's id when it is usable as a header value, a fresh UUID otherwise.
fn resolve(headers: &HeaderMap) -> HeaderValue {
    headers
        .get(HEADER)
        .filter(|v| !v.is_empty() && v.to_str().is_ok())
        .cloned()
        .unwrap_or_else(|| {
            HeaderValue::from_str(&Uuid::new_v4().to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("unknown"))
        })
}

/// Apply **inside** `tower_http::TraceLayer` so the span nests under it.
pub async fn request_id_middleware(req: Request, next: Next) -> Response {
    let id = resolve(req.headers());
    let span = tracing::info_span!(
        "request",
        id = id.to_str().unwrap_or_default(),
        path = %req.uri().path(),
    );

    let mut response = next.run(req).instrument(span).await;
    response.headers_mut().insert(HEADER, id);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/", get(|| async { "hi" }))
            .layer(axum::middleware::from_fn(request_id_middleware))
    }

    async fn id_for(request: Request<Body>) -> String {
        let resp = app().oneshot(request).await.unwrap();
        resp.headers()[HEADER].to_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn generates_uuid_when_header_missing() {
        let id = id_for(Request::builder().uri("/").body(Body::empty()).unwrap()).await;
        assert!(Uuid::parse_str(&id).is_ok(), "not a uuid: {id}");
    }

    #[tokio::test]
    async fn generated_ids_differ_between_requests() {
        let a = id_for(Request::builder().uri("/").body(Body::empty()).unwrap()).await;
        let b = id_for(Request::builder().uri("/").body(Body::empty()).unwrap()).await;
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn empty_header_is_replaced() {
        let id = id_for(
            Request::builder()
                .uri("/")
                .header(HEADER, "")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[tokio::test]
    async fn caller_supplied_id_is_kept() {
        let id = id_for(
            Request::builder()
                .uri("/")
                .header(HEADER, "poll-7")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(id, "poll-7");
    }

    #[test]
    fn non_visible_ascii_id_is_replaced() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER, HeaderValue::from_bytes(b"caf\xc3\xa9").unwrap());
        let id = resolve(&headers);
        assert!(Uuid::parse_str(id.to_str().unwrap()).is_ok());
    }
}
