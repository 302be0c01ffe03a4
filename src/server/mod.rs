mod routes;
mod ws;

pub use routes::create_router;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::keypoints::LandmarkExtractor;
use crate::model::Recognizer;
use crate::settings::Settings;

/// Process-wide state shared by every connection.
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<LandmarkExtractor>,
    pub recognizer: Arc<Recognizer>,
    pub settings: Arc<Settings>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(extractor: Arc<LandmarkExtractor>, recognizer: Arc<Recognizer>, settings: Settings) -> Self {
        Self {
            extractor,
            recognizer,
            settings: Arc::new(settings),
            started_at: Utc::now(),
        }
    }
}

pub async fn serve(state: AppState) -> Result<()> {
    let addr = format!("{}:{}", state.settings.server.host, state.settings.server.port);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    log::info!("Listening on http://{addr} (WebSocket at /ws)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}
