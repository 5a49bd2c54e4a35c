mod common;

use std::collections::HashMap;

use sea_orm::{ConnectionTrait, Statement};
use time::{Duration, OffsetDateTime};
use tower_sessions::session::{Id, Record};
use tower_sessions::{ExpiredDeletion, SessionStore};

use common::test_db;
use ticketdesk::SeaOrmStore;

fn record(expires_in: Duration) -> Record {
    let mut data = HashMap::new();
    data.insert("userId".to_string(), serde_json::json!(7));
    Record {
        id: Id::default(),
        data,
        expiry_date: OffsetDateTime::now_utc() + expires_in,
    }
}

async fn store() -> SeaOrmStore {
    let store = SeaOrmStore::new(test_db().await);
    store.migrate().await.unwrap();
    store
}

#[tokio::test]
async fn create_then_load_round_trips_data() {
    let store = store().await;
    let mut record = record(Duration::hours(1));

    store.create(&mut record).await.unwrap();
    let loaded = store.load(&record.id).await.unwrap().expect("stored");

    assert_eq!(loaded.id, record.id);
    assert_eq!(loaded.data, record.data);
}

#[tokio::test]
async fn create_picks_a_new_id_on_collision() {
    let store = store().await;
    let mut first = record(Duration::hours(1));
    store.create(&mut first).await.unwrap();

    let mut second = record(Duration::hours(1));
    second.id = first.id;
    store.create(&mut second).await.unwrap();

    assert_ne!(first.id, second.id);
    assert!(store.load(&first.id).await.unwrap().is_some());
    assert!(store.load(&second.id).await.unwrap().is_some());
}

#[tokio::test]
async fn save_overwrites_existing_record() {
    let store = store().await;
    let mut record = record(Duration::hours(1));
    store.create(&mut record).await.unwrap();

    record
        .data
        .insert("theme".to_string(), serde_json::json!("dark"));
    store.save(&record).await.unwrap();

    let loaded = store.load(&record.id).await.unwrap().unwrap();
    assert_eq!(loaded.data["theme"], "dark");
}

#[tokio::test]
async fn expired_records_are_invisible_and_swept() {
    let store = store().await;
    let mut live = record(Duration::hours(1));
    let mut stale = record(Duration::hours(-1));
    store.create(&mut live).await.unwrap();
    store.create(&mut stale).await.unwrap();

    assert!(store.load(&stale.id).await.unwrap().is_none());

    store.delete_expired().await.unwrap();

    assert_eq!(test_count(&store, "session").await, 1);
    assert!(store.load(&live.id).await.unwrap().is_some());
}

#[tokio::test]
async fn delete_removes_record() {
    let store = store().await;
    let mut record = record(Duration::hours(1));
    store.create(&mut record).await.unwrap();

    store.delete(&record.id).await.unwrap();
    assert!(store.load(&record.id).await.unwrap().is_none());
}

#[tokio::test]
async fn custom_table_name_is_used() {
    let db = test_db().await;
    let store = SeaOrmStore::new(db).with_table_name("desk_sessions");
    store.migrate().await.unwrap();
    // Idempotent.
    store.migrate().await.unwrap();

    let mut record = record(Duration::hours(1));
    store.create(&mut record).await.unwrap();

    assert_eq!(store.table_name(), "desk_sessions");
    assert_eq!(test_count(&store, "desk_sessions").await, 1);
}

async fn test_count(store: &SeaOrmStore, table: &str) -> i64 {
    let conn = store.connection();
    let row = conn
        .query_one(Statement::from_string(
            conn.get_database_backend(),
            format!("SELECT COUNT(*) AS n FROM {table}"),
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get("", "n").unwrap()
}
