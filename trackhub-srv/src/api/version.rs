//! Version endpoint
//!
//! Kept for compatibility with tracking clients that probe the recorder
//! API; reports this package's own version.

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: String,
}

/// GET /api/0/version
pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
