//! Service configuration
//!
//! Every knob takes a CLI flag with an environment-variable fallback, so
//! the service runs equally well from a shell, a unit file or a container.

use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "trackhub-srv",
    version,
    about = "Location ingest, live fan-out and command outbox service"
)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "TRACKHUB_ADDR", default_value = "127.0.0.1:8989")]
    pub listen_addr: String,

    /// SQLite database file (created on first run)
    #[arg(long, env = "TRACKHUB_DATABASE_FILE", default_value = "./trackhub.sqlite3")]
    pub database_file: PathBuf,

    /// Username clients authenticate as
    #[arg(long, env = "TRACKHUB_USERNAME")]
    pub username: String,

    /// Argon2 PHC-string hash of the client password
    #[arg(long, env = "TRACKHUB_PASSWORD_HASH")]
    pub password_hash: String,
}
