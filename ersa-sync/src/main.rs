//! ersa-sync (Analysis Sync) - Draft/remote reconciliation service
//!
//! Persists completed risk assessments as local drafts the moment they are
//! ready, then synchronizes them to the remote document store without
//! creating duplicates, discarding each draft once its record is confirmed
//! remote.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use ersa_common::config::{database_path, load_sync_config, resolve_root_folder};
use ersa_common::db::init_database;
use ersa_sync::controller::{ConfirmPolicy, SyncController};
use ersa_sync::drafts::LocalDraftStore;
use ersa_sync::mirror::SheetMirror;
use ersa_sync::remote::{DocumentStore, HttpDocumentStore, MemoryDocumentStore};
use ersa_sync::{build_router, AppState};

#[derive(Debug, Parser)]
#[command(name = "ersa-sync", about = "ERSA Analysis Sync service")]
struct Args {
    /// Root folder holding the ERSA database
    #[arg(long)]
    root_folder: Option<String>,

    /// Override the configured HTTP listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!(
        "Starting ERSA Analysis Sync (ersa-sync) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let root_folder = resolve_root_folder(args.root_folder.as_deref());
    std::fs::create_dir_all(&root_folder)?;

    let db_path = database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path).await?;
    let config = load_sync_config(&pool).await?;

    let remote: Arc<dyn DocumentStore> = if config.remote_base_url.is_empty() {
        warn!("remote_base_url is not configured; using in-memory document store");
        Arc::new(MemoryDocumentStore::new())
    } else {
        info!("Remote document store: {}", config.remote_base_url);
        Arc::new(HttpDocumentStore::new(
            &config.remote_base_url,
            config.http_timeout_ms,
        )?)
    };

    let mirror = if config.mirror_url.is_empty() {
        None
    } else {
        info!("Spreadsheet mirror: {}", config.mirror_url);
        Some(Arc::new(SheetMirror::new(
            &config.mirror_url,
            config.http_timeout_ms,
        )?))
    };

    let drafts = LocalDraftStore::new(pool.clone());
    let controller = SyncController::with_confirm_policy(
        drafts.clone(),
        remote.clone(),
        ConfirmPolicy {
            attempts: config.confirm_read_attempts,
            delay: Duration::from_millis(config.confirm_read_delay_ms),
        },
    );

    let state = AppState::new(drafts, remote, controller, mirror);
    let app = build_router(state);

    let port = args.port.unwrap_or(config.listen_port);
    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("ersa-sync listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
