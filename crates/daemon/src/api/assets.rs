use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use engine::render::RenderGraph;
use engine::Plan;

use crate::api::{error_response, ApiError, ErrorBody};
use crate::pipeline::{execute_render, plan_asset, prepare_render};
use crate::store::ArtifactKind;
use crate::AppState;

#[derive(Serialize)]
pub struct PlanResponse {
    asset_id: String,
    insertions: Plan,
}

#[derive(Serialize)]
pub struct RenderGraphResponse {
    asset_id: String,
    graph: RenderGraph,
    filters: Vec<String>,
    inputs: Vec<PathBuf>,
}

#[derive(Serialize)]
pub struct RenderResponse {
    asset_id: String,
    output_path: PathBuf,
    insertion_count: usize,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/:asset_id/files/:file_type", get(get_artifact))
        .route("/:asset_id/plan", post(generate_plan))
        .route("/:asset_id/render", post(render))
        .route("/:asset_id/render/graph", get(render_graph))
        .with_state(state)
}

async fn get_artifact(
    State(state): State<Arc<AppState>>,
    Path((asset_id, file_type)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let kind: ArtifactKind = file_type
        .parse()
        .map_err(|error| (StatusCode::BAD_REQUEST, Json(ErrorBody { error })))?;

    let artifact = state
        .store
        .read_artifact(&asset_id, kind)
        .await
        .map_err(|e| error_response(e.into()))?;

    Ok(Json(artifact))
}

async fn generate_plan(
    State(state): State<Arc<AppState>>,
    Path(asset_id): Path<String>,
) -> Result<Json<PlanResponse>, ApiError> {
    let insertions = plan_asset(&state.store, &state.planner, &asset_id)
        .await
        .map_err(error_response)?;

    Ok(Json(PlanResponse {
        asset_id,
        insertions,
    }))
}

async fn render_graph(
    State(state): State<Arc<AppState>>,
    Path(asset_id): Path<String>,
) -> Result<Json<RenderGraphResponse>, ApiError> {
    let prepared = prepare_render(&state.store, state.media.as_ref(), &asset_id)
        .await
        .map_err(error_response)?;

    Ok(Json(RenderGraphResponse {
        asset_id,
        filters: prepared.graph.filters(),
        graph: prepared.graph,
        inputs: prepared.inputs,
    }))
}

async fn render(
    State(state): State<Arc<AppState>>,
    Path(asset_id): Path<String>,
) -> Result<Json<RenderResponse>, ApiError> {
    let prepared = prepare_render(&state.store, state.media.as_ref(), &asset_id)
        .await
        .map_err(error_response)?;
    let output_path = execute_render(state.media.as_ref(), &prepared)
        .await
        .map_err(error_response)?;

    Ok(Json(RenderResponse {
        asset_id,
        output_path,
        insertion_count: prepared.plan.len(),
    }))
}
