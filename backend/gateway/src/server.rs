//! Main HTTP gateway server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;

use crate::health_api;
use crate::intake::IntakeService;
use crate::processor::RescanJob;
use crate::uploads;
use cvgate_storage::{BlobStore, ScanLedger};

/// Application state shared across routes.
#[derive(Clone)]
pub struct AppState {
    pub intake: Arc<IntakeService>,
    pub store: Arc<dyn BlobStore>,
    pub ledger: Arc<dyn ScanLedger>,
    pub rescan_tx: mpsc::Sender<RescanJob>,
}

/// Build the gateway router. Non-POST requests to the upload route get a
/// 405 from the method router.
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/api/health", get(health_api::health))
        .route("/api/cv", post(uploads::upload_cv))
        .route("/api/cv/:name/status", get(uploads::upload_status))
        .route("/api/cv/:name/rescan", post(uploads::enqueue_rescan))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

/// Bind and serve the router until the process exits.
pub async fn start_server(addr: SocketAddr, router: Router) -> Result<()> {
    info!("CV intake gateway listening on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
