//! Reconciliation controller
//!
//! Drives a record from local-only to remote-confirmed:
//! prepare draft → check remote existence → save remote → confirm →
//! discard local draft. A finished record is durable on the device the
//! moment it is prepared; the remote save is an eventually-consistent step
//! that can be retried without creating duplicates because the document id
//! is deterministic and an existing id short-circuits the write.

use crate::drafts::LocalDraftStore;
use crate::remote::{document_id, DocumentStore, WriteReceipt};
use ersa_common::{natural_key, AnalysisRecord, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Flags tracked across one save flow
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub saving: bool,
    pub saved_locally: bool,
    pub saved_remotely: bool,
    pub already_existed_remotely: bool,
    pub error: Option<String>,
}

/// Result of one `save_analysis` call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    pub success: bool,
    pub already_exists: bool,
    /// Write followed by a successful post-write read of the same id
    pub confirmed: bool,
    pub document_id: Option<String>,
    /// Write acknowledgement; present only when this call performed a write
    pub receipt: Option<WriteReceipt>,
    pub error: Option<String>,
}

/// Options for `save_analysis`
#[derive(Debug, Clone, Copy)]
pub struct SaveOptions {
    /// Re-read the document after writing to confirm visibility
    pub verify: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self { verify: true }
    }
}

/// Post-write confirmation policy
#[derive(Debug, Clone, Copy)]
pub struct ConfirmPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for ConfirmPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(200),
        }
    }
}

/// Orchestrates the draft/remote reconciliation flow.
///
/// One controller owns the "current" record and local key for the lifetime
/// of one save flow. Store handles are injected; the controller never
/// constructs its own clients.
pub struct SyncController {
    drafts: LocalDraftStore,
    remote: Arc<dyn DocumentStore>,
    confirm: ConfirmPolicy,
    state: SyncState,
    current_record: Option<AnalysisRecord>,
    current_key: Option<String>,
}

impl SyncController {
    pub fn new(drafts: LocalDraftStore, remote: Arc<dyn DocumentStore>) -> Self {
        Self::with_confirm_policy(drafts, remote, ConfirmPolicy::default())
    }

    pub fn with_confirm_policy(
        drafts: LocalDraftStore,
        remote: Arc<dyn DocumentStore>,
        confirm: ConfirmPolicy,
    ) -> Self {
        Self {
            drafts,
            remote,
            confirm,
            state: SyncState::default(),
            current_record: None,
            current_key: None,
        }
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// Persist `record` as the local draft and make it current.
    ///
    /// The only entry point that creates a draft; callers invoke it as soon
    /// as a record is complete so the assessment survives a restart before
    /// the remote save lands. Returns the natural key. A second prepare
    /// with the same identity updates the existing entry in place.
    pub async fn prepare_draft(&mut self, record: AnalysisRecord) -> Result<String> {
        let key = natural_key(&record);
        self.drafts.upsert(&record, &key).await?;

        self.state.saved_locally = true;
        self.state.saved_remotely = false;
        self.state.already_existed_remotely = false;
        self.state.error = None;

        self.current_record = Some(record);
        self.current_key = Some(key.clone());

        info!("Prepared local draft for {}", key);
        Ok(key)
    }

    /// Probe whether the record's document already exists remotely.
    ///
    /// Uses the current record when none is passed. When the document is
    /// found, the tracked local draft (if any) is discarded so a stale
    /// draft cannot be resubmitted. A failed probe reports "does not
    /// exist" and records the failure without destroying anything.
    pub async fn check_existence(&mut self, record: Option<&AnalysisRecord>) -> bool {
        let record = match record.or(self.current_record.as_ref()) {
            Some(record) => record.clone(),
            None => {
                self.state.error = Some("No analysis record available to check".to_string());
                return false;
            }
        };

        let doc_id = document_id(&record);
        match self.remote.read(&doc_id).await {
            Ok(Some(_)) => {
                self.state.saved_remotely = true;
                self.state.already_existed_remotely = true;
                self.discard_tracked_draft(&natural_key(&record)).await;
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!("Existence probe failed for {}: {}", doc_id, e);
                self.state.error = Some(e.to_string());
                false
            }
        }
    }

    /// Save the record to the remote store.
    ///
    /// Existence is re-checked first; a document already present is treated
    /// as success without re-writing. A failed write leaves the local draft
    /// intact so the save can be retried. A failed post-write confirmation
    /// only clears `confirmed`; it never undoes the write.
    pub async fn save_analysis(
        &mut self,
        record: Option<AnalysisRecord>,
        options: SaveOptions,
    ) -> SaveOutcome {
        let record = match record.or_else(|| self.current_record.clone()) {
            Some(record) => record,
            None => {
                let message = "No analysis record available to save".to_string();
                self.state.error = Some(message.clone());
                return SaveOutcome {
                    success: false,
                    already_exists: false,
                    confirmed: false,
                    document_id: None,
                    receipt: None,
                    error: Some(message),
                };
            }
        };

        self.state.saving = true;
        let key = natural_key(&record);
        let doc_id = document_id(&record);

        // Idempotent short-circuit: an existing document means a previous
        // save (possibly from another session) already landed.
        match self.remote.read(&doc_id).await {
            Ok(Some(_)) => {
                self.discard_tracked_draft(&key).await;
                self.state.saved_remotely = true;
                self.state.already_existed_remotely = true;
                self.state.saving = false;
                info!("Document {} already exists, skipping write", doc_id);
                return SaveOutcome {
                    success: true,
                    already_exists: true,
                    confirmed: true,
                    document_id: Some(doc_id),
                    receipt: None,
                    error: None,
                };
            }
            Ok(None) => {}
            Err(e) => {
                // A failed probe defaults to "does not exist"; the write
                // below decides the outcome.
                warn!("Pre-save existence probe failed for {}: {}", doc_id, e);
            }
        }

        let receipt = match self.remote.write(&doc_id, &record).await {
            Ok(receipt) => receipt,
            Err(e) => {
                let message = e.to_string();
                warn!("Remote write failed for {}: {}", doc_id, message);
                self.state.saving = false;
                self.state.error = Some(message.clone());
                return SaveOutcome {
                    success: false,
                    already_exists: false,
                    confirmed: false,
                    document_id: Some(doc_id),
                    receipt: None,
                    error: Some(message),
                };
            }
        };

        let confirmed = if options.verify {
            self.confirm_written(&doc_id).await
        } else {
            false
        };

        self.discard_tracked_draft(&key).await;
        self.state.saved_remotely = true;
        self.state.already_existed_remotely = false;
        self.state.saving = false;
        self.state.error = None;

        info!("Saved document {} (confirmed: {})", doc_id, confirmed);
        SaveOutcome {
            success: true,
            already_exists: false,
            confirmed,
            document_id: Some(doc_id),
            receipt: Some(receipt),
            error: None,
        }
    }

    /// Drop the tracked local draft and forget the current record.
    ///
    /// Used when the user abandons an in-progress assessment. Remote state
    /// is untouched.
    pub async fn clear_local_draft(&mut self) -> Result<()> {
        if let Some(key) = self.current_key.take() {
            self.drafts.remove_by_key(&key).await?;
        }
        self.current_record = None;
        self.state.saved_locally = false;
        Ok(())
    }

    /// Re-read the written document until it is visible or attempts run out
    async fn confirm_written(&self, doc_id: &str) -> bool {
        for attempt in 1..=self.confirm.attempts {
            match self.remote.read(doc_id).await {
                Ok(Some(_)) => return true,
                Ok(None) => {
                    warn!("Confirmation read {} found no document {}", attempt, doc_id);
                }
                Err(e) => {
                    warn!("Confirmation read {} failed for {}: {}", attempt, doc_id, e);
                }
            }
            if attempt < self.confirm.attempts {
                tokio::time::sleep(self.confirm.delay).await;
            }
        }
        false
    }

    /// Remove the local draft for `key` when it is the one being tracked.
    ///
    /// Cleanup failures are recorded but do not fail the surrounding save;
    /// the remote store is authoritative at that point and the draft will
    /// be dropped by the next existence check.
    async fn discard_tracked_draft(&mut self, key: &str) {
        if self.current_key.as_deref() != Some(key) {
            return;
        }
        if let Err(e) = self.drafts.remove_by_key(key).await {
            warn!("Failed to remove local draft {}: {}", key, e);
            self.state.error = Some(e.to_string());
            return;
        }
        self.current_key = None;
    }
}
