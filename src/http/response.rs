//! Responses shared across routes.

use axum::{
    http::{Method, StatusCode, Uri},
    response::IntoResponse,
};

/// Fallback for unmatched routes: `404 Cannot <METHOD> <path>`.
pub async fn not_found(method: Method, uri: Uri) -> impl IntoResponse {
    (StatusCode::NOT_FOUND, format!("Cannot {} {}", method, uri.path()))
}
