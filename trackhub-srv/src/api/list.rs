//! User and device listing

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::{bad_request, ApiError};
use crate::{db, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub results: Vec<String>,
}

/// GET /api/0/list
///
/// No filter: all user names. With `user`: that user's devices.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, ApiError> {
    let user = params.user.as_deref().filter(|u| !u.is_empty());
    let device = params.device.as_deref().filter(|d| !d.is_empty());
    let results = match (user, device) {
        (None, None) => db::list_users(&state.db).await?,
        (Some(user), None) => db::user_devices(&state.db, user).await?,
        _ => return Err(bad_request("unsupported")),
    };
    Ok(Json(ListResponse { results }))
}
