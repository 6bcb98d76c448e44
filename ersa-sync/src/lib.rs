//! ersa-sync library - Analysis Sync module
//!
//! Reconciles locally drafted risk assessments with the remote document
//! store and exposes the flow over HTTP.

use axum::Router;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod controller;
pub mod drafts;
pub mod mirror;
pub mod remote;

use controller::SyncController;
use drafts::LocalDraftStore;
use mirror::SheetMirror;
use remote::DocumentStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Local draft collection (read-side handlers use it directly)
    pub drafts: LocalDraftStore,
    /// Remote document store handle
    pub remote: Arc<dyn DocumentStore>,
    /// Reconciliation controller; the mutex serializes save flows within
    /// this process so handlers cannot interleave mid-save
    pub controller: Arc<Mutex<SyncController>>,
    /// Spreadsheet mirror, when configured
    pub mirror: Option<Arc<SheetMirror>>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        drafts: LocalDraftStore,
        remote: Arc<dyn DocumentStore>,
        controller: SyncController,
        mirror: Option<Arc<SheetMirror>>,
    ) -> Self {
        Self {
            drafts,
            remote,
            controller: Arc::new(Mutex::new(controller)),
            mirror,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::analysis_routes())
        .merge(api::drafts_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
