//! Outbox consumer protocol tests
//!
//! Covers the durable-offset properties: idempotence, monotonicity,
//! wildcard visibility, expiry, and per-row corruption handling.

use serde_json::{json, Value};
use sqlx::SqlitePool;

use trackhub_common::db::{init_memory_database, WILDCARD_DEVICE};
use trackhub_srv::outbox;

async fn setup_db() -> SqlitePool {
    init_memory_database().await.expect("in-memory db")
}

async fn insert_item(
    pool: &SqlitePool,
    id: i64,
    user: &str,
    device: &str,
    data: &Value,
    expires_at: Option<i64>,
) {
    sqlx::query(
        "INSERT INTO cmd_outbox (id, user, device, data, expires_at) VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(id)
    .bind(user)
    .bind(device)
    .bind(data.to_string())
    .bind(expires_at)
    .execute(pool)
    .await
    .expect("insert outbox item");
}

async fn set_offset(pool: &SqlitePool, user: &str, device: &str, offset: i64) {
    sqlx::query(
        "INSERT INTO cmd_outbox_consumer_idx (user, device, last_outbox_id) VALUES (?1, ?2, ?3)",
    )
    .bind(user)
    .bind(device)
    .bind(offset)
    .execute(pool)
    .await
    .expect("seed consumer offset");
}

async fn get_offset(pool: &SqlitePool, user: &str, device: &str) -> Option<i64> {
    sqlx::query_scalar(
        "SELECT last_outbox_id FROM cmd_outbox_consumer_idx WHERE user = ?1 AND device = ?2",
    )
    .bind(user)
    .bind(device)
    .fetch_optional(pool)
    .await
    .expect("read consumer offset")
}

fn future_expiry() -> i64 {
    chrono::Utc::now().timestamp() + 3600
}

fn past_expiry() -> i64 {
    chrono::Utc::now().timestamp() - 3600
}

#[tokio::test]
async fn test_wildcard_item_delivered_and_offset_advanced() {
    let pool = setup_db().await;
    let cmd = json!({"_type": "cmd", "action": "reportLocation"});
    insert_item(&pool, 5, "alice", WILDCARD_DEVICE, &cmd, None).await;
    set_offset(&pool, "alice", "phone1", 3).await;

    let items = outbox::poll(&pool, "alice", "phone1").await.unwrap();
    assert_eq!(items, vec![cmd]);
    assert_eq!(get_offset(&pool, "alice", "phone1").await, Some(5));

    // Immediately polling again delivers nothing
    let items = outbox::poll(&pool, "alice", "phone1").await.unwrap();
    assert!(items.is_empty());
    assert_eq!(get_offset(&pool, "alice", "phone1").await, Some(5));
}

#[tokio::test]
async fn test_empty_poll_is_idempotent_and_creates_no_offset_row() {
    let pool = setup_db().await;

    let items = outbox::poll(&pool, "alice", "phone1").await.unwrap();
    assert!(items.is_empty());
    // Nothing selected: the watermark row is not even created
    assert_eq!(get_offset(&pool, "alice", "phone1").await, None);

    let items = outbox::poll(&pool, "alice", "phone1").await.unwrap();
    assert!(items.is_empty());
    assert_eq!(get_offset(&pool, "alice", "phone1").await, None);
}

#[tokio::test]
async fn test_offset_never_decreases() {
    let pool = setup_db().await;
    set_offset(&pool, "alice", "phone1", 7).await;
    insert_item(&pool, 5, "alice", "phone1", &json!({"old": true}), None).await;

    // An item at or below the watermark is not redelivered
    let items = outbox::poll(&pool, "alice", "phone1").await.unwrap();
    assert!(items.is_empty());
    assert_eq!(get_offset(&pool, "alice", "phone1").await, Some(7));

    insert_item(&pool, 9, "alice", "phone1", &json!({"new": true}), None).await;
    let items = outbox::poll(&pool, "alice", "phone1").await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(get_offset(&pool, "alice", "phone1").await, Some(9));
}

#[tokio::test]
async fn test_delivery_is_ascending_by_id() {
    let pool = setup_db().await;
    for id in [2, 4, 6] {
        insert_item(&pool, id, "alice", "phone1", &json!({"id": id}), None).await;
    }

    let items = outbox::poll(&pool, "alice", "phone1").await.unwrap();
    let ids: Vec<i64> = items.iter().map(|i| i["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![2, 4, 6]);
    assert_eq!(get_offset(&pool, "alice", "phone1").await, Some(6));
}

#[tokio::test]
async fn test_wildcard_visible_to_every_device_independently() {
    let pool = setup_db().await;
    let cmd = json!({"action": "ping"});
    insert_item(&pool, 1, "alice", WILDCARD_DEVICE, &cmd, None).await;

    let items = outbox::poll(&pool, "alice", "phone1").await.unwrap();
    assert_eq!(items, vec![cmd.clone()]);
    let items = outbox::poll(&pool, "alice", "tablet").await.unwrap();
    assert_eq!(items, vec![cmd]);

    assert_eq!(get_offset(&pool, "alice", "phone1").await, Some(1));
    assert_eq!(get_offset(&pool, "alice", "tablet").await, Some(1));

    // The wildcard item is never removed after delivery
    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cmd_outbox")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 1);
}

#[tokio::test]
async fn test_targeted_item_is_invisible_to_other_devices() {
    let pool = setup_db().await;
    insert_item(&pool, 1, "alice", "tablet", &json!({"for": "tablet"}), None).await;
    insert_item(&pool, 2, "bob", "phone1", &json!({"for": "bob"}), None).await;

    let items = outbox::poll(&pool, "alice", "phone1").await.unwrap();
    assert!(items.is_empty());
    assert_eq!(get_offset(&pool, "alice", "phone1").await, None);
}

#[tokio::test]
async fn test_expired_item_is_never_returned() {
    let pool = setup_db().await;
    insert_item(&pool, 1, "alice", "phone1", &json!({"stale": true}), Some(past_expiry())).await;

    let items = outbox::poll(&pool, "alice", "phone1").await.unwrap();
    assert!(items.is_empty());
    // Not selected, so it does not move the watermark either
    assert_eq!(get_offset(&pool, "alice", "phone1").await, None);

    // Invisible, not deleted
    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cmd_outbox")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 1);
}

#[tokio::test]
async fn test_unexpired_item_with_future_expiry_is_returned() {
    let pool = setup_db().await;
    let cmd = json!({"fresh": true});
    insert_item(&pool, 1, "alice", "phone1", &cmd, Some(future_expiry())).await;

    let items = outbox::poll(&pool, "alice", "phone1").await.unwrap();
    assert_eq!(items, vec![cmd]);
    assert_eq!(get_offset(&pool, "alice", "phone1").await, Some(1));
}

#[tokio::test]
async fn test_expired_item_above_pending_item_does_not_mask_it() {
    let pool = setup_db().await;
    let pending = json!({"pending": true});
    insert_item(&pool, 1, "alice", "phone1", &pending, None).await;
    insert_item(&pool, 2, "alice", "phone1", &json!({"stale": true}), Some(past_expiry())).await;

    // The unexpired item is delivered; the watermark stops at its id
    let items = outbox::poll(&pool, "alice", "phone1").await.unwrap();
    assert_eq!(items, vec![pending]);
    assert_eq!(get_offset(&pool, "alice", "phone1").await, Some(1));

    // The expired item above it never surfaces
    let items = outbox::poll(&pool, "alice", "phone1").await.unwrap();
    assert!(items.is_empty());
    assert_eq!(get_offset(&pool, "alice", "phone1").await, Some(1));
}

#[tokio::test]
async fn test_corrupt_item_skipped_without_failing_the_poll() {
    let pool = setup_db().await;
    sqlx::query("INSERT INTO cmd_outbox (id, user, device, data) VALUES (1, 'alice', '*', '{broken')")
        .execute(&pool)
        .await
        .unwrap();
    let good = json!({"ok": true});
    insert_item(&pool, 2, "alice", "phone1", &good, None).await;

    let items = outbox::poll(&pool, "alice", "phone1").await.unwrap();
    assert_eq!(items, vec![good]);
    // The corrupt row is permanently skipped, not redelivered forever
    assert_eq!(get_offset(&pool, "alice", "phone1").await, Some(2));
}
