//! HTTP routes

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::error::ApiError;
use crate::model::ModelInfo;

use super::{ws::websocket_handler, AppState};

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let static_dir = state.settings.server.static_dir.clone();

    let router = Router::new()
        // Health & model
        .route("/healthz", get(health_check))
        .route("/api/model/info", get(model_info))
        // WebSocket
        .route("/ws", get(websocket_handler))
        .with_state(state);

    let router = match static_dir {
        Some(dir) if dir.is_dir() => {
            let index = dir.join("index.html");
            router.fallback_service(ServeDir::new(&dir).not_found_service(ServeFile::new(index)))
        }
        Some(dir) => {
            log::warn!("static directory {} not found, skipping", dir.display());
            router
        }
        None => router,
    };

    router
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let uptime = chrono::Utc::now() - state.started_at;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": uptime.num_seconds(),
        "components": {
            "extractor": state.extractor.is_ready(),
            "model": state.recognizer.is_ready(),
        },
        "model": state.recognizer.info(),
    }))
}

async fn model_info(State(state): State<AppState>) -> Result<Json<ModelInfo>, ApiError> {
    let info = state.recognizer.info();
    if !info.ready {
        return Err(ApiError::ModelNotReady);
    }
    Ok(Json(info))
}
