//! Store queries for the service
//!
//! Thin query layer over the shared pool. Read paths decode stored
//! record JSON row by row; a corrupt row aborts only itself, never its
//! neighbors.

use serde_json::Value;
use sqlx::SqlitePool;
use tracing::error;

use trackhub_common::db::LocationReportRow;
use trackhub_common::{Error, Result};

/// Insert a location report, creating its user lazily.
///
/// Runs in one transaction, so history never contains a report without
/// its user row. Returns the report id.
pub async fn insert_location_report(
    pool: &SqlitePool,
    user: &str,
    device: &str,
    data: &str,
) -> Result<i64> {
    let mut tx = pool.begin().await?;

    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE user = ?1")
        .bind(user)
        .fetch_optional(&mut *tx)
        .await?;
    let user_id = match existing {
        Some(id) => id,
        None => {
            sqlx::query_scalar("INSERT INTO users (user) VALUES (?1) RETURNING id")
                .bind(user)
                .fetch_one(&mut *tx)
                .await?
        }
    };

    let report_id: i64 = sqlx::query_scalar(
        "INSERT INTO location_reports (user_id, device, data) VALUES (?1, ?2, ?3) RETURNING id",
    )
    .bind(user_id)
    .bind(device)
    .bind(data)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(report_id)
}

/// All known user names.
pub async fn list_users(pool: &SqlitePool) -> Result<Vec<String>> {
    let users = sqlx::query_scalar("SELECT user FROM users ORDER BY user")
        .fetch_all(pool)
        .await?;
    Ok(users)
}

/// Distinct devices one user has reported from.
pub async fn user_devices(pool: &SqlitePool, user: &str) -> Result<Vec<String>> {
    let devices = sqlx::query_scalar(
        r#"
        SELECT DISTINCT device
        FROM location_reports AS l
        INNER JOIN users AS u ON l.user_id = u.id
        WHERE u.user = ?1
        ORDER BY device
        "#,
    )
    .bind(user)
    .fetch_all(pool)
    .await?;
    Ok(devices)
}

/// Most recent report per (user, device), optionally filtered.
pub async fn last_locations(
    pool: &SqlitePool,
    user: Option<&str>,
    device: Option<&str>,
) -> Result<Vec<Value>> {
    let mut conds: Vec<&str> = Vec::new();
    if user.is_some() {
        conds.push("user_id = (SELECT id FROM users WHERE user = ?)");
    }
    if device.is_some() {
        conds.push("device = ?");
    }
    if conds.is_empty() {
        conds.push("1 = 1");
    }

    let sql = format!(
        r#"
        WITH last_location_report AS (
            SELECT MAX(id) AS id
            FROM location_reports
            WHERE {}
            GROUP BY user_id, device
        )
        SELECT lr.id, u.user, lr.device, lr.data
        FROM location_reports AS lr
        INNER JOIN users AS u ON lr.user_id = u.id
        WHERE lr.id IN (SELECT id FROM last_location_report)
        "#,
        conds.join(" AND ")
    );

    let mut query = sqlx::query_as::<_, LocationReportRow>(&sql);
    if let Some(user) = user {
        query = query.bind(user);
    }
    if let Some(device) = device {
        query = query.bind(device);
    }
    let rows = query.fetch_all(pool).await?;

    Ok(decode_rows(rows))
}

/// History filter for [`locations_between`]. Timestamps are epoch
/// seconds matched against the record's own `tst` field.
#[derive(Debug, Default)]
pub struct HistoryFilter<'a> {
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub user: Option<&'a str>,
    pub device: Option<&'a str>,
}

/// Reports matching the filter, in insertion order.
pub async fn locations_between(
    pool: &SqlitePool,
    filter: HistoryFilter<'_>,
) -> Result<Vec<Value>> {
    let mut conds: Vec<&str> = Vec::new();
    if filter.from.is_some() {
        conds.push("json_extract(lr.data, '$.tst') >= ?");
    }
    if filter.to.is_some() {
        conds.push("json_extract(lr.data, '$.tst') <= ?");
    }
    if filter.user.is_some() {
        conds.push("u.user = ?");
    }
    if filter.device.is_some() {
        conds.push("lr.device = ?");
    }
    if conds.is_empty() {
        conds.push("1 = 1");
    }

    let sql = format!(
        r#"
        SELECT lr.id, u.user, lr.device, lr.data
        FROM location_reports AS lr
        INNER JOIN users AS u ON lr.user_id = u.id
        WHERE {}
        ORDER BY lr.id ASC
        "#,
        conds.join(" AND ")
    );

    let mut query = sqlx::query_as::<_, LocationReportRow>(&sql);
    if let Some(from) = filter.from {
        query = query.bind(from);
    }
    if let Some(to) = filter.to {
        query = query.bind(to);
    }
    if let Some(user) = filter.user {
        query = query.bind(user);
    }
    if let Some(device) = filter.device {
        query = query.bind(device);
    }
    let rows = query.fetch_all(pool).await?;

    Ok(decode_rows(rows))
}

fn decode_rows(rows: Vec<LocationReportRow>) -> Vec<Value> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_str::<Value>(&row.data) {
            Ok(value) => Some(value),
            Err(e) => {
                let err = Error::CorruptStoredRecord(format!("location report {}: {e}", row.id));
                error!("{err}");
                None
            }
        })
        .collect()
}
