//! Tests for the local draft store

use chrono::Utc;
use ersa_common::db::{init_database, slot_put};
use ersa_common::{natural_key, AnalysisRecord, RiskLevel};
use ersa_sync::drafts::{LocalDraftStore, DRAFTS_SLOT_KEY};
use sqlx::SqlitePool;
use tempfile::TempDir;

async fn scratch_store() -> (LocalDraftStore, SqlitePool, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("ersa.db")).await.unwrap();
    (LocalDraftStore::new(pool.clone()), pool, dir)
}

fn record(plant: &str, score: f64) -> AnalysisRecord {
    AnalysisRecord {
        business_unit: "FX".to_string(),
        plant: plant.to_string(),
        shift: "A001".to_string(),
        area: "Ensamble".to_string(),
        position: "Operador".to_string(),
        flow: "flujo1".to_string(),
        score,
        risk_level: RiskLevel::from_score(score),
        initial_answers: Default::default(),
        weighting_answers: Default::default(),
        timestamp: Utc::now(),
    }
}

#[tokio::test]
async fn test_empty_store_loads_empty() {
    let (store, _pool, _dir) = scratch_store().await;
    assert!(store.load_all().await.is_empty());
}

#[tokio::test]
async fn test_upsert_then_load_round_trip() {
    let (store, _pool, _dir) = scratch_store().await;
    let r = record("2", 42.0);
    let key = natural_key(&r);

    store.upsert(&r, &key).await.unwrap();

    let entries = store.load_all().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].clave_unica, key);
    assert_eq!(entries[0].data, r, "persisted data must deep-equal the input record");
    assert!(!entries[0].synced);
    assert!(!entries[0].id.is_empty());
    assert_eq!(entries[0].created_at, entries[0].updated_at);
}

#[tokio::test]
async fn test_upsert_same_key_updates_in_place() {
    let (store, _pool, _dir) = scratch_store().await;
    let first = record("2", 42.0);
    let second = record("2", 88.0);
    let key = natural_key(&first);
    assert_eq!(key, natural_key(&second));

    store.upsert(&first, &key).await.unwrap();
    let before = store.load_all().await;

    store.upsert(&second, &key).await.unwrap();
    let after = store.load_all().await;

    assert_eq!(after.len(), 1, "same key must never duplicate");
    assert_eq!(after[0].data.score, 88.0, "data must reflect the second upsert");
    assert_eq!(after[0].id, before[0].id, "local id survives the update");
    assert_eq!(after[0].created_at, before[0].created_at);
    assert!(after[0].updated_at >= before[0].updated_at);
    assert!(!after[0].synced);
}

#[tokio::test]
async fn test_upsert_distinct_keys_newest_first() {
    let (store, _pool, _dir) = scratch_store().await;
    let a = record("2", 10.0);
    let b = record("3", 20.0);

    store.upsert(&a, &natural_key(&a)).await.unwrap();
    store.upsert(&b, &natural_key(&b)).await.unwrap();

    let entries = store.load_all().await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].clave_unica, natural_key(&b), "newest entry comes first");
    assert_eq!(entries[1].clave_unica, natural_key(&a));
}

#[tokio::test]
async fn test_remove_by_key() {
    let (store, _pool, _dir) = scratch_store().await;
    let r = record("2", 42.0);
    let key = natural_key(&r);

    store.upsert(&r, &key).await.unwrap();
    let remaining = store.remove_by_key(&key).await.unwrap();
    assert!(remaining.is_empty());
    assert!(store.load_all().await.is_empty());

    // Removing an absent key is a no-op, not an error
    let remaining = store.remove_by_key(&key).await.unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn test_clear_all() {
    let (store, _pool, _dir) = scratch_store().await;
    let r = record("2", 42.0);
    store.upsert(&r, &natural_key(&r)).await.unwrap();

    store.clear_all().await.unwrap();
    assert!(store.load_all().await.is_empty());
}

#[tokio::test]
async fn test_corrupt_slot_treated_as_empty() {
    let (store, pool, _dir) = scratch_store().await;

    slot_put(&pool, DRAFTS_SLOT_KEY, "this is not json").await.unwrap();
    assert!(store.load_all().await.is_empty());

    slot_put(&pool, DRAFTS_SLOT_KEY, r#"{"not":"an array"}"#).await.unwrap();
    assert!(store.load_all().await.is_empty());
}

#[tokio::test]
async fn test_malformed_entries_dropped_individually() {
    let (store, pool, _dir) = scratch_store().await;

    // One well-formed entry surrounded by junk: missing data, missing
    // claveUnica, and a non-object.
    let raw = r#"[
        {"id": "1722-abc", "claveUnica": "FX|2|A001|Ensamble|Operador|flujo1",
         "data": {"businessUnit": "FX", "plant": "2"}},
        {"id": "1723-def", "claveUnica": "FX|3|A001|Ensamble|Operador|flujo1"},
        {"id": "1724-ghi", "data": {"businessUnit": "FX"}},
        42
    ]"#;
    slot_put(&pool, DRAFTS_SLOT_KEY, raw).await.unwrap();

    let entries = store.load_all().await;
    assert_eq!(entries.len(), 1, "only the well-formed entry survives");
    assert_eq!(entries[0].data.business_unit, "FX");
}

#[tokio::test]
async fn test_corrupt_slot_recovers_after_upsert() {
    let (store, pool, _dir) = scratch_store().await;

    slot_put(&pool, DRAFTS_SLOT_KEY, "garbage").await.unwrap();

    let r = record("2", 42.0);
    store.upsert(&r, &natural_key(&r)).await.unwrap();

    let entries = store.load_all().await;
    assert_eq!(entries.len(), 1, "a corrupt slot never blocks a new draft");
}
