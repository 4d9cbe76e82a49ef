//! Views API
//!
//! Endpoints clients use to drive their analytics views:
//!
//! Views:
//! - POST /api/views - Create a view for a connected client
//! - DELETE /api/views/:view_id - Close a view
//!
//! Grids (`:grid` is `portfolio` or `primitives`):
//! - GET /api/views/:view_id/:grid/structure - Rows, columns and node tree
//! - POST /api/views/:view_id/:grid/viewports - Create a viewport
//! - PUT /api/views/:view_id/:grid/viewports/:viewport_id - Replace its definition
//! - DELETE /api/views/:view_id/:grid/viewports/:viewport_id - Delete it
//! - GET /api/views/:view_id/:grid/viewports/:viewport_id/data - Latest results
//!
//! Dependency graphs:
//! - POST /api/views/:view_id/:grid/depgraphs - Open the graph behind a cell
//! - DELETE /api/views/:view_id/:grid/depgraphs/:graph_id - Close it
//! - GET /api/views/:view_id/:grid/depgraphs/:graph_id/structure
//! - the viewport routes above under /depgraphs/:graph_id
//!
//! Errors:
//! - GET /api/views/:view_id/errors - Captured errors
//! - DELETE /api/views/:view_id/errors/:error_id - Dismiss one
//!
//! Changes are pushed over the client's WebSocket as callback ids:
//! `{view_id}:{grid}` for a structure, `{view_id}:{grid}:viewport:{id}` for
//! viewport data, `{view_id}:{grid}:depgraph:{graph_id}` (and its
//! `:viewport:{id}`) for dependency graphs, `{view_id}:error:{id}` for errors.

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::grid::{GridStructure, GridType, ViewportDefinition, ViewportNodeStructure, ViewportResults};
use crate::services::{ErrorInfo, ViewHandle};
use crate::view::GridTarget;
use crate::websocket::ClientListener;
use crate::AppState;

/// Create views router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_view))
        .route("/:view_id", delete(delete_view))
        // Errors
        .route("/:view_id/errors", get(list_errors))
        .route("/:view_id/errors/:error_id", delete(delete_error))
        // Main grids
        .route("/:view_id/:grid/structure", get(get_structure))
        .route("/:view_id/:grid/viewports", post(create_viewport))
        .route(
            "/:view_id/:grid/viewports/:viewport_id",
            delete(delete_viewport).put(update_viewport),
        )
        .route("/:view_id/:grid/viewports/:viewport_id/data", get(get_data))
        // Dependency graphs
        .route("/:view_id/:grid/depgraphs", post(open_depgraph))
        .route("/:view_id/:grid/depgraphs/:graph_id", delete(close_depgraph))
        .route("/:view_id/:grid/depgraphs/:graph_id/structure", get(get_structure))
        .route("/:view_id/:grid/depgraphs/:graph_id/viewports", post(create_viewport))
        .route(
            "/:view_id/:grid/depgraphs/:graph_id/viewports/:viewport_id",
            delete(delete_viewport).put(update_viewport),
        )
        .route(
            "/:view_id/:grid/depgraphs/:graph_id/viewports/:viewport_id/data",
            get(get_data),
        )
}

// =============================================================================
// Request / Response Types
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateViewRequest {
    /// Id the client received when its WebSocket connected.
    pub client_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewResponse {
    pub view_id: String,
    pub client_id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<&ViewHandle> for ViewResponse {
    fn from(handle: &ViewHandle) -> Self {
        Self {
            view_id: handle.view_id.clone(),
            client_id: handle.client_id,
            created_at: handle.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureResponse {
    pub structure: GridStructure,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<ViewportNodeStructure>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateViewportRequest {
    pub viewport_id: i32,
    pub definition: ViewportDefinition,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportResponse {
    pub viewport_id: i32,
    /// True if new data is ready and the client was sent the callback id.
    pub updated: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenDepgraphRequest {
    pub graph_id: i32,
    pub row: usize,
    pub column: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepgraphResponse {
    pub graph_id: i32,
    pub callback_ids: Vec<String>,
}

/// Path of a grid, optionally one of its dependency graphs.
#[derive(Debug, Deserialize)]
pub struct GridPath {
    pub view_id: String,
    pub grid: String,
    pub graph_id: Option<i32>,
}

/// Path of a viewport on a grid or dependency graph.
#[derive(Debug, Deserialize)]
pub struct ViewportPath {
    pub view_id: String,
    pub grid: String,
    pub graph_id: Option<i32>,
    pub viewport_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct StructureQuery {
    pub viewport_id: Option<i32>,
}

fn parse_grid(grid: &str) -> Result<GridType> {
    grid.parse().map_err(AppError::BadRequest)
}

fn target(grid: &str, graph_id: Option<i32>) -> Result<GridTarget> {
    let grid = parse_grid(grid)?;
    Ok(match graph_id {
        Some(graph_id) => GridTarget::depgraph(grid, graph_id),
        None => GridTarget::main(grid),
    })
}

fn view(state: &AppState, view_id: &str) -> Result<Arc<ViewHandle>> {
    Ok(state.views.view(view_id)?)
}

// =============================================================================
// View Handlers
// =============================================================================

/// POST /api/views
///
/// Create a view whose updates go to the client's WebSocket.
async fn create_view(
    State(state): State<AppState>,
    Json(request): Json<CreateViewRequest>,
) -> Result<Json<ApiResponse<ViewResponse>>> {
    if !state.connections.is_connected(request.client_id) {
        return Err(AppError::BadRequest(format!(
            "Client not connected: {}",
            request.client_id
        )));
    }
    let listener = Arc::new(ClientListener::new(
        request.client_id,
        state.connections.clone(),
    ));
    let handle = state.views.create_view(request.client_id, listener);
    Ok(Json(ApiResponse {
        data: ViewResponse::from(handle.as_ref()),
    }))
}

/// DELETE /api/views/:view_id
async fn delete_view(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
) -> Result<Json<ApiResponse<DeleteResponse>>> {
    state.views.delete_view(&view_id)?;
    Ok(Json(ApiResponse {
        data: DeleteResponse {
            deleted: true,
            id: view_id,
        },
    }))
}

// =============================================================================
// Grid Handlers
// =============================================================================

/// GET /api/views/:view_id/:grid/structure
///
/// With `?viewport_id=` the response includes that viewport's expanded and
/// collapsed nodes.
async fn get_structure(
    State(state): State<AppState>,
    Path(path): Path<GridPath>,
    Query(query): Query<StructureQuery>,
) -> Result<Json<ApiResponse<StructureResponse>>> {
    let handle = view(&state, &path.view_id)?;
    let snapshot = handle
        .view
        .grid_structure(target(&path.grid, path.graph_id)?, query.viewport_id)?;
    Ok(Json(ApiResponse {
        data: StructureResponse {
            structure: snapshot.structure.as_ref().clone(),
            nodes: snapshot.nodes,
        },
    }))
}

/// POST /api/views/:view_id/:grid/viewports
async fn create_viewport(
    State(state): State<AppState>,
    Path(path): Path<GridPath>,
    Json(request): Json<CreateViewportRequest>,
) -> Result<Json<ApiResponse<ViewportResponse>>> {
    let handle = view(&state, &path.view_id)?;
    let updated = handle.view.create_viewport(
        target(&path.grid, path.graph_id)?,
        request.viewport_id,
        request.definition,
    )?;
    Ok(Json(ApiResponse {
        data: ViewportResponse {
            viewport_id: request.viewport_id,
            updated: updated.is_some(),
        },
    }))
}

/// PUT /api/views/:view_id/:grid/viewports/:viewport_id
async fn update_viewport(
    State(state): State<AppState>,
    Path(path): Path<ViewportPath>,
    Json(definition): Json<ViewportDefinition>,
) -> Result<Json<ApiResponse<ViewportResponse>>> {
    let handle = view(&state, &path.view_id)?;
    let updated = handle.view.update_viewport(
        target(&path.grid, path.graph_id)?,
        path.viewport_id,
        definition,
    )?;
    Ok(Json(ApiResponse {
        data: ViewportResponse {
            viewport_id: path.viewport_id,
            updated: updated.is_some(),
        },
    }))
}

/// DELETE /api/views/:view_id/:grid/viewports/:viewport_id
async fn delete_viewport(
    State(state): State<AppState>,
    Path(path): Path<ViewportPath>,
) -> Result<Json<ApiResponse<DeleteResponse>>> {
    let handle = view(&state, &path.view_id)?;
    handle
        .view
        .delete_viewport(target(&path.grid, path.graph_id)?, path.viewport_id)?;
    Ok(Json(ApiResponse {
        data: DeleteResponse {
            deleted: true,
            id: path.viewport_id.to_string(),
        },
    }))
}

/// GET /api/views/:view_id/:grid/viewports/:viewport_id/data
async fn get_data(
    State(state): State<AppState>,
    Path(path): Path<ViewportPath>,
) -> Result<Json<ApiResponse<ViewportResults>>> {
    let handle = view(&state, &path.view_id)?;
    let results = handle
        .view
        .data(target(&path.grid, path.graph_id)?, path.viewport_id)?;
    Ok(Json(ApiResponse { data: results }))
}

// =============================================================================
// Dependency Graph Handlers
// =============================================================================

/// POST /api/views/:view_id/:grid/depgraphs
///
/// Open the dependency graph behind one cell of a main grid.
async fn open_depgraph(
    State(state): State<AppState>,
    Path((view_id, grid)): Path<(String, String)>,
    Json(request): Json<OpenDepgraphRequest>,
) -> Result<Json<ApiResponse<DepgraphResponse>>> {
    let handle = view(&state, &view_id)?;
    let callback_ids = handle.view.open_dependency_graph(
        parse_grid(&grid)?,
        request.graph_id,
        request.row,
        request.column,
    )?;
    Ok(Json(ApiResponse {
        data: DepgraphResponse {
            graph_id: request.graph_id,
            callback_ids,
        },
    }))
}

/// DELETE /api/views/:view_id/:grid/depgraphs/:graph_id
async fn close_depgraph(
    State(state): State<AppState>,
    Path((view_id, grid, graph_id)): Path<(String, String, i32)>,
) -> Result<Json<ApiResponse<DeleteResponse>>> {
    let handle = view(&state, &view_id)?;
    handle
        .view
        .close_dependency_graph(parse_grid(&grid)?, graph_id)?;
    Ok(Json(ApiResponse {
        data: DeleteResponse {
            deleted: true,
            id: graph_id.to_string(),
        },
    }))
}

// =============================================================================
// Error Handlers
// =============================================================================

/// GET /api/views/:view_id/errors
async fn list_errors(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<ErrorInfo>>>> {
    let handle = view(&state, &view_id)?;
    Ok(Json(ApiResponse {
        data: handle.view.errors(),
    }))
}

/// DELETE /api/views/:view_id/errors/:error_id
async fn delete_error(
    State(state): State<AppState>,
    Path((view_id, error_id)): Path<(String, u64)>,
) -> Result<Json<ApiResponse<DeleteResponse>>> {
    let handle = view(&state, &view_id)?;
    handle.view.delete_error(error_id)?;
    Ok(Json(ApiResponse {
        data: DeleteResponse {
            deleted: true,
            id: error_id.to_string(),
        },
    }))
}
