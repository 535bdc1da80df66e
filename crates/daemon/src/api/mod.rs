use axum::{http::StatusCode, response::Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, warn};

use engine::EngineError;

use crate::media::RenderError;
use crate::store::StoreError;
use crate::AppState;

pub mod assets;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new().nest("/assets", assets::router(state))
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

/// Map a failed asset run to a response. Every asset fails on its own; nothing here is retried.
pub fn error_response(err: anyhow::Error) -> ApiError {
    let status = if let Some(store_err) = err.downcast_ref::<StoreError>() {
        match store_err {
            StoreError::InvalidId(_) => StatusCode::BAD_REQUEST,
            StoreError::AssetNotFound(_) | StoreError::MissingArtifact { .. } => {
                StatusCode::NOT_FOUND
            }
            StoreError::Parse { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            StoreError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    } else if err.downcast_ref::<EngineError>().is_some() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else if err.downcast_ref::<RenderError>().is_some() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    let message = format!("{:#}", err);
    if status.is_server_error() {
        error!("{}", message);
    } else {
        warn!("{}", message);
    }

    (status, Json(ErrorBody { error: message }))
}
