//! Outbox consumer protocol
//!
//! Durable, device-targeted commands delivered at-least-once. Each
//! (user, device) owns a persisted watermark: the highest outbox id it
//! has been handed. A poll selects everything newer that matches the
//! device (or the wildcard sentinel) and is unexpired, hands it over in
//! ascending id order, then raises the watermark.
//!
//! The watermark only ever rises, and only when something was selected.
//! A failed watermark write is deliberately swallowed: the items are
//! simply handed over again on a later poll, which is why consumers must
//! tolerate duplicates.

use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{error, warn};

use trackhub_common::db::{OutboxItemRow, WILDCARD_DEVICE};
use trackhub_common::{Error, Result};

/// Poll the outbox for one (user, device), advancing its watermark.
///
/// Triggered synchronously after each successful ingest. A read failure
/// propagates to the caller; a watermark-write failure does not.
pub async fn poll(pool: &SqlitePool, user: &str, device: &str) -> Result<Vec<Value>> {
    let offset: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT last_outbox_id
        FROM cmd_outbox_consumer_idx
        WHERE user = ?1 AND device = ?2
        "#,
    )
    .bind(user)
    .bind(device)
    .fetch_optional(pool)
    .await?;
    let offset = offset.unwrap_or(0);

    // Expiry is judged by the store-side clock; expired items are
    // invisible but never deleted here
    let rows: Vec<OutboxItemRow> = sqlx::query_as(
        r#"
        SELECT id, data
        FROM cmd_outbox
        WHERE id > ?1
            AND user = ?2
            AND device IN (?3, ?4)
            AND COALESCE(expires_at, (1 << 62)) > strftime('%s', 'now')
        ORDER BY id ASC
        "#,
    )
    .bind(offset)
    .bind(user)
    .bind(device)
    .bind(WILDCARD_DEVICE)
    .fetch_all(pool)
    .await?;

    let mut items = Vec::with_capacity(rows.len());
    let mut max_selected = offset;
    for row in rows {
        max_selected = max_selected.max(row.id);
        match serde_json::from_str::<Value>(&row.data) {
            Ok(item) => items.push(item),
            Err(e) => {
                // Skip just this row; redelivering it could never succeed,
                // so its id still counts toward the watermark
                let err = Error::CorruptStoredRecord(format!("outbox item {}: {e}", row.id));
                error!(user, device, "{err}");
            }
        }
    }

    if max_selected > offset {
        advance_offset(pool, user, device, max_selected).await;
    }

    Ok(items)
}

/// Raise the (user, device) watermark to `to`.
///
/// Insert-if-absent, then raise-only: concurrent polls can interleave
/// freely without ever lowering the watermark.
async fn advance_offset(pool: &SqlitePool, user: &str, device: &str, to: i64) {
    let result = sqlx::query(
        r#"
        INSERT INTO cmd_outbox_consumer_idx (user, device, last_outbox_id)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(user, device)
        DO UPDATE SET last_outbox_id = MAX(last_outbox_id, excluded.last_outbox_id)
        "#,
    )
    .bind(user)
    .bind(device)
    .bind(to)
    .execute(pool)
    .await;

    if let Err(e) = result {
        // At-least-once: the items will be handed over again next poll
        warn!(user, device, error = %e, "failed to advance outbox consumer offset");
    }
}
