//! Local draft browsing API

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;

use crate::drafts::LocalDraftEntry;
use crate::AppState;

/// Response for GET /api/drafts
#[derive(Debug, Serialize)]
pub struct DraftsResponse {
    pub total: usize,
    pub drafts: Vec<LocalDraftEntry>,
}

/// Response for DELETE /api/drafts/:clave
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveDraftResponse {
    pub removed: String,
    pub total: usize,
}

/// GET /api/drafts
///
/// List the persisted draft collection, newest first.
pub async fn list_drafts(State(state): State<AppState>) -> Json<DraftsResponse> {
    let drafts = state.drafts.load_all().await;
    Json(DraftsResponse {
        total: drafts.len(),
        drafts,
    })
}

/// DELETE /api/drafts/:clave
///
/// Remove the draft with the given natural key. Removing an unknown key is
/// a no-op and still succeeds.
pub async fn remove_draft(
    State(state): State<AppState>,
    Path(clave): Path<String>,
) -> Result<Json<RemoveDraftResponse>, DraftsError> {
    let remaining = state
        .drafts
        .remove_by_key(&clave)
        .await
        .map_err(|e| DraftsError::Store(e.to_string()))?;

    Ok(Json(RemoveDraftResponse {
        removed: clave,
        total: remaining.len(),
    }))
}

/// Build draft routes
pub fn drafts_routes() -> Router<AppState> {
    Router::new()
        .route("/api/drafts", get(list_drafts))
        .route("/api/drafts/:clave", delete(remove_draft))
}

/// Draft API errors
#[derive(Debug)]
pub enum DraftsError {
    Store(String),
}

impl IntoResponse for DraftsError {
    fn into_response(self) -> Response {
        let DraftsError::Store(msg) = self;
        let body = Json(json!({
            "error": format!("Store error: {}", msg),
        }));

        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}
