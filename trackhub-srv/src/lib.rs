//! trackhub-srv - Location ingest, fan-out and command outbox service
//!
//! Clients publish location updates over authenticated HTTP; the service
//! enriches and persists them, pushes them to live WebSocket viewers, and
//! answers every ingest with the device's pending commands from a durable
//! outbox.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::SqlitePool;

pub mod api;
pub mod config;
pub mod db;
pub mod enrich;
pub mod geo;
pub mod hub;
pub mod outbox;
pub mod tasks;

use api::auth::Credentials;
use hub::BroadcastHub;
use tasks::TaskSpawner;

/// Deadline applied to every request except the live WebSocket.
///
/// Store calls in flight when it elapses are cancelled with the handler;
/// the caller sees 408 instead of an indefinitely blocked request.
pub const REQUEST_DEADLINE: Duration = Duration::from_secs(5);

/// Application state shared across HTTP handlers.
///
/// Everything in here is an explicitly owned object handed in by `main`
/// (or a test), never ambient global state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Fan-out hub for live subscribers
    pub hub: BroadcastHub,
    /// Supervised fire-and-forget task spawner
    pub tasks: TaskSpawner,
    /// Accepted client credentials
    pub credentials: Arc<Credentials>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        hub: BroadcastHub,
        tasks: TaskSpawner,
        credentials: Credentials,
    ) -> Self {
        Self {
            db,
            hub,
            tasks,
            credentials: Arc::new(credentials),
        }
    }
}

/// Build the application router.
///
/// Everything except the health probe requires Basic auth; everything
/// except the WebSocket endpoint carries the request deadline.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};
    use tower_http::timeout::TimeoutLayer;
    use tower_http::trace::TraceLayer;

    let timed = Router::new()
        .route("/pub", post(api::ingest::publish))
        .route("/api/0/list", get(api::list::list))
        .route("/api/0/last", get(api::last::last_locations))
        .route("/api/0/locations", get(api::locations::locations))
        .route("/api/0/version", get(api::version::version))
        .layer(TimeoutLayer::new(REQUEST_DEADLINE));

    // The live stream is long-lived and must not be cut by the deadline
    let protected = timed
        .merge(Router::new().route("/ws/last", get(api::live::ws_last)))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth::auth_middleware,
        ));

    Router::new()
        .merge(protected)
        .route("/healthz", get(api::health::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
