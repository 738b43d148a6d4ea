//! Durable store: schema initialization and row models
//!
//! SQLite via sqlx. The store holds users, the append-only location
//! history, and the command outbox with its per-(user, device) consumer
//! watermark. Writes serialize through SQLite's own locking; a busy
//! timeout keeps contended calls from blocking indefinitely.

mod init;
mod models;

pub use init::{init_database, init_memory_database};
pub use models::{LocationReportRow, OutboxItemRow};

/// Sentinel device value on an outbox item matching any device of its user.
pub const WILDCARD_DEVICE: &str = "*";
