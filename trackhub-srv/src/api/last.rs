//! Last-known-location endpoint

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use crate::api::ApiError;
use crate::{db, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct LastLocationParams {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
}

/// GET /api/0/last
///
/// Most recent stored record per (user, device), optionally narrowed to
/// one user and/or one device. Empty parameters mean "no filter".
pub async fn last_locations(
    State(state): State<AppState>,
    Query(params): Query<LastLocationParams>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let user = params.user.as_deref().filter(|u| !u.is_empty());
    let device = params.device.as_deref().filter(|d| !d.is_empty());
    let locations = db::last_locations(&state.db, user, device).await?;
    Ok(Json(locations))
}
