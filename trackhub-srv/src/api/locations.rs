//! Location history endpoint

use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{bad_request, ApiError};
use crate::db::{self, HistoryFilter};
use crate::AppState;

const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Default, Deserialize)]
pub struct LocationsParams {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LocationsResponse {
    pub count: usize,
    pub data: Vec<Value>,
    pub status: u16,
    pub version: String,
}

/// GET /api/0/locations
///
/// History in insertion order. `from`/`to` are `%Y-%m-%dT%H:%M:%S` UTC
/// and filter on the timestamp embedded in each stored record.
pub async fn locations(
    State(state): State<AppState>,
    Query(params): Query<LocationsParams>,
) -> Result<Json<LocationsResponse>, ApiError> {
    match params.format.as_deref() {
        None | Some("") | Some("json") => {}
        Some(other) => return Err(bad_request(format!("unsupported format: {other:?}"))),
    }

    let from = parse_ts(params.from.as_deref(), "from")?;
    let to = parse_ts(params.to.as_deref(), "to")?;

    let data = db::locations_between(
        &state.db,
        HistoryFilter {
            from,
            to,
            user: params.user.as_deref().filter(|u| !u.is_empty()),
            device: params.device.as_deref().filter(|d| !d.is_empty()),
        },
    )
    .await?;

    Ok(Json(LocationsResponse {
        count: data.len(),
        data,
        status: 200,
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

fn parse_ts(value: Option<&str>, name: &str) -> Result<Option<i64>, ApiError> {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    let parsed = NaiveDateTime::parse_from_str(value, TS_FORMAT)
        .map_err(|e| bad_request(format!("failed to parse {name:?}: {e}")))?;
    Ok(Some(parsed.and_utc().timestamp()))
}
