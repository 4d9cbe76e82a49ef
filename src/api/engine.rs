//! Engine bridge API
//!
//! Endpoints the calculation engine uses to feed a view:
//!
//! - POST /api/engine/views/:view_id/compiled - New compilation of the view definition
//! - POST /api/engine/views/:view_id/cycle - Results of a calculation cycle
//! - POST /api/engine/views/:view_id/entities - Changed portfolio entities
//! - POST /api/engine/views/:view_id/portfolio - Reloaded portfolio
//! - POST /api/engine/views/:view_id/depgraphs - Dependency graph behind an output
//! - POST /api/engine/views/:view_id/computation-cache - Non-terminal values
//! - GET /api/engine/views/:view_id/log-modes - Keys the view wants logged in full

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::views::ApiResponse;
use crate::error::Result;
use crate::services::ResultKey;
use crate::types::{
    CompiledViewDefinition, ComputedValue, DependencyGraph, Portfolio, PortfolioEntity,
    ViewCycleResult,
};
use crate::AppState;

/// Create engine bridge router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/views/:view_id/compiled", post(push_compiled))
        .route("/views/:view_id/cycle", post(push_cycle))
        .route("/views/:view_id/entities", post(push_entities))
        .route("/views/:view_id/portfolio", post(push_portfolio))
        .route("/views/:view_id/depgraphs", post(push_depgraph))
        .route("/views/:view_id/computation-cache", post(push_computation_cache))
        .route("/views/:view_id/log-modes", get(get_log_modes))
}

#[derive(Debug, Serialize)]
pub struct UpdatedResponse {
    /// Callback ids pushed to the view's client.
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputationCacheRequest {
    pub calc_config: String,
    pub values: Vec<ComputedValue>,
}

#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub accepted: usize,
}

/// POST /api/engine/views/:view_id/compiled
///
/// Rebuilds every grid of the view. Graphs and values pushed for the
/// previous compilation are dropped.
async fn push_compiled(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
    Json(compiled): Json<CompiledViewDefinition>,
) -> Result<Json<ApiResponse<UpdatedResponse>>> {
    let handle = state.views.view(&view_id)?;
    handle.session.clear_compilation();
    if let Some(portfolio) = &compiled.portfolio {
        handle.session.set_portfolio(portfolio.clone());
    }
    let ids = handle.view.update_structure(compiled)?;
    Ok(Json(ApiResponse {
        data: UpdatedResponse { ids },
    }))
}

/// POST /api/engine/views/:view_id/cycle
async fn push_cycle(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
    Json(result): Json<ViewCycleResult>,
) -> Result<Json<ApiResponse<UpdatedResponse>>> {
    let handle = state.views.view(&view_id)?;
    debug!(%view_id, values = result.value_count(), full = result.full, "Cycle received");
    // the client has already been told about everything that did refresh
    let ids = handle.view.update_results(&result)?.into_result()?;
    Ok(Json(ApiResponse {
        data: UpdatedResponse { ids },
    }))
}

/// POST /api/engine/views/:view_id/entities
async fn push_entities(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
    Json(entities): Json<Vec<PortfolioEntity>>,
) -> Result<Json<ApiResponse<UpdatedResponse>>> {
    let handle = state.views.view(&view_id)?;
    let ids = handle.view.update_entities(&entities)?;
    Ok(Json(ApiResponse {
        data: UpdatedResponse { ids },
    }))
}

/// POST /api/engine/views/:view_id/portfolio
///
/// Stores the snapshot, then has the view reload its portfolio rows.
async fn push_portfolio(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
    Json(portfolio): Json<Portfolio>,
) -> Result<Json<ApiResponse<UpdatedResponse>>> {
    let handle = state.views.view(&view_id)?;
    handle.session.set_portfolio(portfolio);
    let ids = handle.view.portfolio_changed()?;
    Ok(Json(ApiResponse {
        data: UpdatedResponse { ids },
    }))
}

/// POST /api/engine/views/:view_id/depgraphs
async fn push_depgraph(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
    Json(graph): Json<DependencyGraph>,
) -> Result<Json<ApiResponse<AcceptedResponse>>> {
    let handle = state.views.view(&view_id)?;
    let accepted = graph.nodes.len();
    handle.session.push_dependency_graph(graph);
    Ok(Json(ApiResponse {
        data: AcceptedResponse { accepted },
    }))
}

/// POST /api/engine/views/:view_id/computation-cache
async fn push_computation_cache(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
    Json(request): Json<ComputationCacheRequest>,
) -> Result<Json<ApiResponse<AcceptedResponse>>> {
    let handle = state.views.view(&view_id)?;
    let accepted = request.values.len();
    handle
        .session
        .push_values(&request.calc_config, request.values);
    Ok(Json(ApiResponse {
        data: AcceptedResponse { accepted },
    }))
}

/// GET /api/engine/views/:view_id/log-modes
async fn get_log_modes(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<ResultKey>>>> {
    let handle = state.views.view(&view_id)?;
    Ok(Json(ApiResponse {
        data: handle.session.full_log_keys(),
    }))
}
