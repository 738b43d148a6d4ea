//! Ingest endpoint
//!
//! One POST carries one record. The flow is decode → enrich → persist
//! (transactional) → best-effort broadcast → outbox poll; the response
//! is the caller's pending-command list. The record is durable before
//! any broadcast is attempted, and the broadcast runs off the request
//! path so a wall of slow viewers cannot slow ingest down.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use trackhub_common::TrackerRecord;

use crate::api::{auth::VerifiedUser, bad_request, ApiError};
use crate::{db, enrich, outbox, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct PublishParams {
    /// User the record belongs to
    #[serde(default)]
    pub u: Option<String>,
    /// Device the record came from
    #[serde(default)]
    pub d: Option<String>,
}

/// POST /pub?u=<user>&d=<device>
///
/// `u`/`d` may also arrive as `X-Limit-U`/`X-Limit-D` headers. The
/// authenticated username must match `u`.
pub async fn publish(
    State(state): State<AppState>,
    Query(params): Query<PublishParams>,
    Extension(identity): Extension<VerifiedUser>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Vec<Value>>, ApiError> {
    let user = params
        .u
        .or_else(|| header_value(&headers, "x-limit-u"))
        .unwrap_or_default();
    let device = params
        .d
        .or_else(|| header_value(&headers, "x-limit-d"))
        .unwrap_or_default();

    if user.is_empty() || device.is_empty() {
        return Err(bad_request("user and device input is required"));
    }
    if user != identity.0 {
        return Err(bad_request("input data and auth data mismatch"));
    }

    let record = TrackerRecord::decode(&body)?;

    let (data, broadcast) = match record {
        TrackerRecord::Location(mut loc) => {
            enrich::enrich_location(&mut loc, &user, &device)?;
            let encoded = TrackerRecord::Location(loc.clone()).encode()?;
            (encoded, Some(loc))
        }
    };

    let report_id = db::insert_location_report(&state.db, &user, &device, &data).await?;
    debug!(%user, %device, report_id, "location report persisted");

    if let Some(loc) = broadcast {
        let hub = state.hub.clone();
        state.tasks.spawn("live-broadcast", async move {
            hub.broadcast(&loc);
        });
    }

    let commands = outbox::poll(&state.db, &user, &device).await?;
    Ok(Json(commands))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
        .filter(|v| !v.is_empty())
}
