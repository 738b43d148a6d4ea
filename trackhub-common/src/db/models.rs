//! Row models for the trackhub store

use sqlx::FromRow;

/// A row of `location_reports` joined with its owning user.
///
/// `data` is the enriched record JSON; it is immutable once inserted.
#[derive(Debug, Clone, FromRow)]
pub struct LocationReportRow {
    pub id: i64,
    pub user: String,
    pub device: String,
    pub data: String,
}

/// A pending command row of `cmd_outbox`.
#[derive(Debug, Clone, FromRow)]
pub struct OutboxItemRow {
    pub id: i64,
    pub data: String,
}
