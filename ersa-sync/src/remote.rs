//! Remote document store client
//!
//! The store is an opaque keyed document service: read may return nothing,
//! write replaces the document under a deterministic id. The HTTP
//! implementation talks to the hosted document endpoint; the in-memory
//! implementation backs tests and offline runs.

use async_trait::async_trait;
use chrono::Utc;
use ersa_common::{natural_key, AnalysisRecord, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

const DOCUMENT_ID_PREFIX: &str = "analisis-";
const USER_AGENT: &str = concat!("ERSA/", env!("CARGO_PKG_VERSION"));

/// Compute the remote document id for a record.
///
/// Deterministic over the same six identity fields as the natural key:
/// records with the same logical identity always address the same document.
pub fn document_id(record: &AnalysisRecord) -> String {
    let mut hasher = Sha256::new();
    hasher.update(natural_key(record).as_bytes());
    format!("{}{:x}", DOCUMENT_ID_PREFIX, hasher.finalize())
}

/// Acknowledgement returned by a successful document write
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteReceipt {
    pub receipt_id: Uuid,
    pub document_id: String,
    pub written_at: String,
}

impl WriteReceipt {
    fn new(document_id: &str) -> Self {
        Self {
            receipt_id: Uuid::new_v4(),
            document_id: document_id.to_string(),
            written_at: Utc::now().to_rfc3339(),
        }
    }
}

/// Keyed document store addressed by deterministic document ids
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch the document under `document_id`, `None` when absent
    async fn read(&self, document_id: &str) -> Result<Option<Value>>;

    /// Replace the document under `document_id`
    async fn write(&self, document_id: &str, record: &AnalysisRecord) -> Result<WriteReceipt>;
}

/// HTTP-backed document store
pub struct HttpDocumentStore {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpDocumentStore {
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| Error::Remote(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn document_url(&self, document_id: &str) -> String {
        format!("{}/documents/{}", self.base_url, document_id)
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn read(&self, document_id: &str) -> Result<Option<Value>> {
        let response = self
            .http_client
            .get(self.document_url(document_id))
            .send()
            .await
            .map_err(|e| Error::Remote(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = response
            .error_for_status()
            .map_err(|e| Error::Remote(e.to_string()))?;

        let document: Value = response
            .json()
            .await
            .map_err(|e| Error::Remote(e.to_string()))?;

        Ok(Some(document))
    }

    async fn write(&self, document_id: &str, record: &AnalysisRecord) -> Result<WriteReceipt> {
        self.http_client
            .put(self.document_url(document_id))
            .json(record)
            .send()
            .await
            .map_err(|e| Error::Remote(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::Remote(e.to_string()))?;

        Ok(WriteReceipt::new(document_id))
    }
}

/// In-process document store for tests and offline runs
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<HashMap<String, Value>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held
    pub async fn len(&self) -> usize {
        self.documents.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.lock().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn read(&self, document_id: &str) -> Result<Option<Value>> {
        Ok(self.documents.lock().await.get(document_id).cloned())
    }

    async fn write(&self, document_id: &str, record: &AnalysisRecord) -> Result<WriteReceipt> {
        let document = serde_json::to_value(record)?;
        self.documents
            .lock()
            .await
            .insert(document_id.to_string(), document);
        Ok(WriteReceipt::new(document_id))
    }
}
