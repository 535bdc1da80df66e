use axum::{response::Json, routing::get, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use engine::PlannerConfig;

pub mod api;
pub mod config;
pub mod media;
pub mod pipeline;
pub mod store;

use config::DaemonConfig;
use media::{FFmpegWrapper, MediaEngine};
use store::AssetStore;

/// Shared, immutable state handed to every request.
pub struct AppState {
    pub store: AssetStore,
    pub media: Arc<dyn MediaEngine>,
    pub planner: PlannerConfig,
}

impl AppState {
    pub fn from_config(config: &DaemonConfig) -> Self {
        AppState {
            store: AssetStore::new(config.storage_dir.clone()),
            media: Arc::new(FFmpegWrapper::new(
                config.ffmpeg_bin.clone(),
                config.ffprobe_bin.clone(),
            )),
            planner: PlannerConfig::default(),
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_credentials(false);

    Router::new()
        .route("/health", get(health))
        .nest("/api", api::router(state))
        .layer(cors)
}
