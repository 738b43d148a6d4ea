//! Live location stream
//!
//! One WebSocket per viewer. The connection task alternates between new
//! broadcast records and inbound client messages until the socket
//! closes. Nothing is pushed until the client signals readiness with a
//! case-insensitive `LAST` text frame; delivery after that is best
//! effort for the connection's lifetime.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tracing::{debug, error, warn};

use trackhub_common::{Error, LocationRecord, Result, TrackerRecord};

use crate::hub::BroadcastHub;
use crate::AppState;

/// Marker stamped onto every pushed notification.
const LIVE_LABEL: &str = "OwnTracks";
/// Readiness signal expected as the first client message.
const READY_SIGNAL: &str = "LAST";

/// GET /ws/last
pub async fn ws_last(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_live(socket, state.hub.clone()))
}

async fn handle_live(socket: WebSocket, hub: BroadcastHub) {
    let (mut outbound, mut inbound) = socket.split();

    // Subscribed for the whole connection; the guard unregisters on
    // every exit path
    let mut subscription = hub.subscribe();
    let mut ready = false;

    loop {
        tokio::select! {
            update = subscription.recv(), if ready => {
                let Some(record) = update else { break };
                match live_message(&record) {
                    Ok(text) => {
                        if outbound.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => error!("failed to encode live notification: {e}"),
                }
            }
            message = inbound.next() => {
                match message {
                    None | Some(Err(_)) => break,
                    Some(Ok(Message::Close(_))) => break,
                    Some(Ok(Message::Text(text))) => {
                        if !ready && text.eq_ignore_ascii_case(READY_SIGNAL) {
                            debug!("live subscriber ready");
                            ready = true;
                        } else if !ready {
                            warn!(msg = %text, "unexpected message before readiness signal");
                        }
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}

fn live_message(record: &LocationRecord) -> Result<String> {
    let mut value = serde_json::to_value(TrackerRecord::Location(record.clone()))
        .map_err(|e| Error::Internal(e.to_string()))?;
    if let Some(object) = value.as_object_mut() {
        object.insert("_label".to_string(), json!(LIVE_LABEL));
    }
    serde_json::to_string(&value).map_err(|e| Error::Internal(e.to_string()))
}
