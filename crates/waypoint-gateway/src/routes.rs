use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use tracing::info;

use waypoint_core::types::RunId;
use waypoint_engine::GraphSummary;

use crate::error::ApiError;
use crate::protocol::{
    CreateGraphRequest, CreateGraphResponse, RunGraphRequest, RunGraphResponse, RunStateResponse,
};
use crate::state::AppState;

// GET /
pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Waypoint workflow engine is running.",
    }))
}

// GET /api/health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// GET /graph/list
pub async fn list_graphs(State(state): State<Arc<AppState>>) -> Json<Vec<GraphSummary>> {
    let engine = state.engine.lock().await;
    Json(engine.list_graphs())
}

// POST /graph/create
pub async fn create_graph(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateGraphRequest>, JsonRejection>,
) -> Result<Json<CreateGraphResponse>, ApiError> {
    let Json(body) = body?;
    let spec = body.into_spec();
    let mut engine = state.engine.lock().await;
    let graph = engine.create_graph_from_spec(&spec)?;

    info!(graph_id = %graph.id(), name = %graph.name(), "Graph created via gateway");
    Ok(Json(CreateGraphResponse {
        graph_id: graph.id().clone(),
    }))
}

// POST /graph/run
pub async fn run_graph(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RunGraphRequest>, JsonRejection>,
) -> Result<Json<RunGraphResponse>, ApiError> {
    let Json(body) = body?;
    let mut engine = state.engine.lock().await;
    // Requests may lower the configured ceiling, never raise it.
    let ceiling = engine.max_steps();
    let max_steps = body.max_steps.map_or(ceiling, |n| n.min(ceiling));
    let run = engine.run_graph(&body.graph_id, &body.initial_state, max_steps)?;
    Ok(Json(run.into()))
}

// GET /graph/state/{run_id}
pub async fn run_state(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<String>,
) -> Result<Json<RunStateResponse>, ApiError> {
    let engine = state.engine.lock().await;
    let run = engine.get_run(&RunId::from_string(run_id))?;
    Ok(Json(run.clone().into()))
}
