//! The `GET /x/{id}` endpoint.

use axum::{http::Uri, Json};
use serde::{Deserialize, Serialize};

pub const GREETING: &str = "Hello, World!";

const ROUTE_PREFIX: &str = "/x/";

/// JSON body returned by the echo endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoResponse {
    pub message: String,
    pub id: String,
}

impl EchoResponse {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            message: GREETING.to_string(),
            id: id.into(),
        }
    }
}

/// Echo the id segment exactly as it appears on the wire.
///
/// The segment is taken from the raw path rather than a `Path` extractor so
/// percent sequences are never decoded and the handler cannot reject input.
/// Serves both `/x/{id}` and `/x/`, where the id is empty.
pub async fn echo_id(uri: Uri) -> Json<EchoResponse> {
    let id = uri.path().strip_prefix(ROUTE_PREFIX).unwrap_or_default();
    Json(EchoResponse::new(id))
}
