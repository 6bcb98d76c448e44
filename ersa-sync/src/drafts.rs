//! Local draft store
//!
//! Keeps the not-yet-confirmed assessment records in one storage slot as a
//! JSON array, newest first, at most one entry per natural key. Reads
//! tolerate missing, corrupt, or partially malformed content so a bad
//! record can never block the app; writes propagate their errors because
//! silently losing a draft would be worse than surfacing the failure.

use chrono::Utc;
use ersa_common::db::{slot_delete, slot_get, slot_put};
use ersa_common::{AnalysisRecord, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::warn;

/// Storage slot holding the draft collection
pub const DRAFTS_SLOT_KEY: &str = "data:analisisLocales";

/// Random suffix length for locally generated draft ids
const LOCAL_ID_SUFFIX_LEN: usize = 6;

/// One locally persisted draft wrapping an assessment record.
///
/// `id` is for local addressing only; identity comparison always goes
/// through `clave_unica` (the natural key).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalDraftEntry {
    pub id: String,
    pub clave_unica: String,
    pub data: AnalysisRecord,
    #[serde(default)]
    pub synced: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Draft collection store over one storage slot
#[derive(Clone)]
pub struct LocalDraftStore {
    pool: SqlitePool,
}

impl LocalDraftStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Load the persisted collection.
    ///
    /// Absent slot, unparseable content, or a non-array value all yield an
    /// empty collection. Individual entries that fail validation are
    /// dropped; the rest survive.
    pub async fn load_all(&self) -> Vec<LocalDraftEntry> {
        let raw = match slot_get(&self.pool, DRAFTS_SLOT_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Draft slot read failed, treating as empty: {}", e);
                return Vec::new();
            }
        };

        let parsed: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!("Draft slot is not valid JSON, treating as empty: {}", e);
                return Vec::new();
            }
        };

        let items = match parsed {
            Value::Array(items) => items,
            _ => {
                warn!("Draft slot is not an array, treating as empty");
                return Vec::new();
            }
        };

        let total = items.len();
        let entries: Vec<LocalDraftEntry> =
            items.into_iter().filter_map(validate_entry).collect();

        if entries.len() < total {
            warn!("Dropped {} malformed draft entries", total - entries.len());
        }

        entries
    }

    /// Insert or update the draft for `natural_key`.
    ///
    /// An existing entry keeps its id and `created_at`; its data is
    /// replaced, `synced` reset, and `updated_at` refreshed. A new entry is
    /// prepended so the collection stays newest first. The whole collection
    /// is re-persisted and returned.
    pub async fn upsert(
        &self,
        record: &AnalysisRecord,
        natural_key: &str,
    ) -> Result<Vec<LocalDraftEntry>> {
        let mut entries = self.load_all().await;
        let now = now_iso();

        match entries.iter_mut().find(|e| e.clave_unica == natural_key) {
            Some(entry) => {
                entry.data = record.clone();
                entry.synced = false;
                entry.updated_at = now;
            }
            None => {
                entries.insert(
                    0,
                    LocalDraftEntry {
                        id: new_local_id(),
                        clave_unica: natural_key.to_string(),
                        data: record.clone(),
                        synced: false,
                        created_at: now.clone(),
                        updated_at: now,
                    },
                );
            }
        }

        self.persist_all(&entries).await?;
        Ok(entries)
    }

    /// Remove the draft for `natural_key`; unknown keys are a no-op
    pub async fn remove_by_key(&self, natural_key: &str) -> Result<Vec<LocalDraftEntry>> {
        let mut entries = self.load_all().await;
        entries.retain(|e| e.clave_unica != natural_key);
        self.persist_all(&entries).await?;
        Ok(entries)
    }

    /// Erase the persisted collection entirely
    pub async fn clear_all(&self) -> Result<()> {
        slot_delete(&self.pool, DRAFTS_SLOT_KEY).await
    }

    async fn persist_all(&self, entries: &[LocalDraftEntry]) -> Result<()> {
        let raw = serde_json::to_string(entries)?;
        slot_put(&self.pool, DRAFTS_SLOT_KEY, &raw).await
    }
}

/// Validate one persisted value into a draft entry.
///
/// Entries missing id, claveUnica, or data are rejected; the tolerated
/// fields (synced, timestamps) default instead.
fn validate_entry(value: Value) -> Option<LocalDraftEntry> {
    let entry: LocalDraftEntry = serde_json::from_value(value).ok()?;
    if entry.id.is_empty() || entry.clave_unica.is_empty() {
        return None;
    }
    Some(entry)
}

/// Millisecond timestamp plus a short random suffix; local addressing only
fn new_local_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(LOCAL_ID_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{}-{}", Utc::now().timestamp_millis(), suffix)
}

fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_entry_requires_identity_fields() {
        assert!(validate_entry(json!({
            "id": "171234-abc123",
            "claveUnica": "FX|2|A001|Ensamble|Operador|flujo1",
            "data": {"businessUnit": "FX"}
        }))
        .is_some());

        // Missing data
        assert!(validate_entry(json!({
            "id": "171234-abc123",
            "claveUnica": "FX|2|A001|Ensamble|Operador|flujo1"
        }))
        .is_none());

        // Missing claveUnica
        assert!(validate_entry(json!({
            "id": "171234-abc123",
            "data": {"businessUnit": "FX"}
        }))
        .is_none());

        // Empty id
        assert!(validate_entry(json!({
            "id": "",
            "claveUnica": "FX|2|A001|Ensamble|Operador|flujo1",
            "data": {"businessUnit": "FX"}
        }))
        .is_none());

        assert!(validate_entry(json!("not an object")).is_none());
    }

    #[test]
    fn test_local_ids_are_unique_enough() {
        let a = new_local_id();
        let b = new_local_id();
        assert_ne!(a, b);
        assert!(a.contains('-'));
    }
}
