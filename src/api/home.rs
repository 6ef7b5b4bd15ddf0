//! Greeting page.

use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
};

const HTML: &str = "<h1>Hello World </h1><p>This is a simple web app!</p>";

/// `GET /` — fixed HTML greeting.
pub async fn index() -> impl IntoResponse {
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/html; charset=utf-8")], HTML)
}
