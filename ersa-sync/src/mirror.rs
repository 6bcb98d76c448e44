//! Spreadsheet mirror client
//!
//! Best-effort batch POST of saved records to an external spreadsheet
//! webhook. The mirror is an observer: its response body is opaque, its
//! failures collapse to `ok=false`, and nothing in the reconciliation flow
//! waits on or depends on it.

use ersa_common::{AnalysisRecord, Error, Result};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("ERSA/", env!("CARGO_PKG_VERSION"));

/// Outcome of one mirror attempt; never an error
#[derive(Debug, Clone)]
pub struct MirrorOutcome {
    pub ok: bool,
    pub message: String,
}

/// Spreadsheet webhook client
pub struct SheetMirror {
    http_client: reqwest::Client,
    url: String,
}

impl SheetMirror {
    pub fn new(url: &str, timeout_ms: u64) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| Error::Remote(e.to_string()))?;

        Ok(Self {
            http_client,
            url: url.to_string(),
        })
    }

    /// Post a batch of records to the spreadsheet webhook.
    ///
    /// Every failure mode (connect, timeout, HTTP status) is swallowed into
    /// the outcome; the response body is not interpreted.
    pub async fn mirror(&self, records: &[AnalysisRecord]) -> MirrorOutcome {
        let body = json!({ "registros": records });

        let result = self
            .http_client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match result {
            Ok(_) => {
                debug!("Mirrored {} records to spreadsheet", records.len());
                MirrorOutcome {
                    ok: true,
                    message: format!("Mirrored {} records", records.len()),
                }
            }
            Err(e) => {
                warn!("Spreadsheet mirror failed: {}", e);
                MirrorOutcome {
                    ok: false,
                    message: e.to_string(),
                }
            }
        }
    }
}
