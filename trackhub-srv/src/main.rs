//! trackhub-srv entry point

use anyhow::Result;
use clap::Parser;
use tracing::info;

use trackhub_srv::api::auth::Credentials;
use trackhub_srv::config::Config;
use trackhub_srv::hub::BroadcastHub;
use trackhub_srv::tasks::TaskSpawner;
use trackhub_srv::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting trackhub-srv v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::parse();

    let pool = trackhub_common::db::init_database(&config.database_file).await?;

    let credentials = Credentials::new(&config.username, &config.password_hash)?;
    let hub = BroadcastHub::new();
    let tasks = TaskSpawner::new();

    let state = AppState::new(pool, hub, tasks.clone(), credentials);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("trackhub-srv listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let post-commit broadcasts finish before the process exits
    tasks.shutdown(std::time::Duration::from_secs(5)).await;
    info!("shutting down");

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
