//! Analysis reconciliation API
//!
//! Exposes the prepare/check/save flow. Handlers take the controller mutex
//! for the duration of one operation, so flows from concurrent requests do
//! not interleave mid-save.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::controller::{SaveOptions, SaveOutcome, SyncState};
use crate::remote::DocumentStore;
use crate::AppState;
use ersa_common::AnalysisRecord;

/// Request body for POST /api/analysis/save
#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    pub record: AnalysisRecord,
    /// Confirm the write with a post-write read (default true)
    #[serde(default = "default_verify")]
    pub verify: bool,
}

fn default_verify() -> bool {
    true
}

/// Response for POST /api/analysis/draft
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftResponse {
    pub clave_unica: String,
    pub saved_locally: bool,
    pub total_drafts: usize,
}

/// Response for existence probes
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub exists: bool,
    pub error: Option<String>,
}

/// POST /api/analysis/draft
///
/// Persist the record as a local draft and make it the current record.
pub async fn prepare_draft(
    State(state): State<AppState>,
    Json(record): Json<AnalysisRecord>,
) -> Result<Json<DraftResponse>, AnalysisError> {
    let mut controller = state.controller.lock().await;
    let clave_unica = controller
        .prepare_draft(record)
        .await
        .map_err(|e| AnalysisError::Store(e.to_string()))?;

    let total_drafts = state.drafts.load_all().await.len();
    Ok(Json(DraftResponse {
        clave_unica,
        saved_locally: true,
        total_drafts,
    }))
}

/// POST /api/analysis/save
///
/// Run the reconciliation save for the posted record. On success the saved
/// record is mirrored to the spreadsheet in the background; the response
/// never waits on the mirror.
pub async fn save_analysis(
    State(state): State<AppState>,
    Json(request): Json<SaveRequest>,
) -> Json<SaveOutcome> {
    let record = request.record.clone();
    let outcome = {
        let mut controller = state.controller.lock().await;
        controller
            .save_analysis(Some(request.record), SaveOptions { verify: request.verify })
            .await
    };

    if outcome.success {
        if let Some(mirror) = state.mirror.clone() {
            tokio::spawn(async move {
                mirror.mirror(&[record]).await;
            });
        }
    }

    Json(outcome)
}

/// POST /api/analysis/check
///
/// Probe remote existence for the posted record. A found document also
/// discards the matching tracked draft, per the reconciliation flow.
pub async fn check_existence(
    State(state): State<AppState>,
    Json(record): Json<AnalysisRecord>,
) -> Json<CheckResponse> {
    let mut controller = state.controller.lock().await;
    let exists = controller.check_existence(Some(&record)).await;
    let error = controller.state().error.clone();

    Json(CheckResponse { exists, error })
}

/// GET /api/analysis/state
///
/// Current reconciliation flags for the in-flight flow.
pub async fn sync_state(State(state): State<AppState>) -> Json<SyncState> {
    let controller = state.controller.lock().await;
    Json(controller.state().clone())
}

/// GET /api/analysis/exists/:document_id
///
/// Raw existence probe by document id; touches no local state.
pub async fn exists_by_id(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<Json<CheckResponse>, AnalysisError> {
    let document = state
        .remote
        .read(&document_id)
        .await
        .map_err(|e| AnalysisError::Remote(e.to_string()))?;

    Ok(Json(CheckResponse {
        exists: document.is_some(),
        error: None,
    }))
}

/// Build analysis routes
pub fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route("/api/analysis/draft", post(prepare_draft))
        .route("/api/analysis/save", post(save_analysis))
        .route("/api/analysis/check", post(check_existence))
        .route("/api/analysis/state", get(sync_state))
        .route("/api/analysis/exists/:document_id", get(exists_by_id))
}

/// Analysis API errors
#[derive(Debug)]
pub enum AnalysisError {
    Store(String),
    Remote(String),
}

impl IntoResponse for AnalysisError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AnalysisError::Store(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Store error: {}", msg))
            }
            AnalysisError::Remote(msg) => {
                (StatusCode::BAD_GATEWAY, format!("Remote store error: {}", msg))
            }
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
