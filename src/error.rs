use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors raised by the view-state core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewError {
    #[error("View not found: {0}")]
    ViewNotFound(String),

    #[error("Viewport not found: {0}")]
    ViewportNotFound(i32),

    #[error("Dependency graph not found: {0}")]
    DependencyGraphNotFound(i32),

    #[error("Error not found: {0}")]
    ErrorNotFound(u64),

    #[error("No dependency graph available for cell ({row}, {column})")]
    DependencyGraphUnavailable { row: usize, column: usize },

    #[error("Invalid viewport: {0}")]
    InvalidViewport(String),

    #[error("Cell ({row}, {column}) is outside the grid bounds ({rows} rows, {columns} columns)")]
    CellOutOfBounds {
        row: usize,
        column: usize,
        rows: usize,
        columns: usize,
    },

    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ViewError {
    /// Unknown view, viewport or dependency graph.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ViewError::ViewNotFound(_)
                | ViewError::ViewportNotFound(_)
                | ViewError::DependencyGraphNotFound(_)
                | ViewError::ErrorNotFound(_)
                | ViewError::DependencyGraphUnavailable { .. }
        )
    }

    /// Requests rejected before any state was touched.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ViewError::InvalidViewport(_)
                | ViewError::CellOutOfBounds { .. }
                | ViewError::DuplicateId(_)
        )
    }

    /// Failures that are recorded for out-of-band diagnosis.
    pub fn is_unexpected(&self) -> bool {
        matches!(self, ViewError::Engine(_) | ViewError::Internal(_))
    }

    /// Short machine-readable classification.
    pub fn kind(&self) -> &'static str {
        if self.is_not_found() {
            "not_found"
        } else if self.is_validation() {
            "validation"
        } else if matches!(self, ViewError::Engine(_)) {
            "engine"
        } else {
            "internal"
        }
    }
}

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl From<ViewError> for AppError {
    fn from(err: ViewError) -> Self {
        if err.is_not_found() {
            AppError::NotFound(err.to_string())
        } else if err.is_validation() {
            AppError::BadRequest(err.to_string())
        } else {
            AppError::Internal(err.to_string())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::SerdeJson(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            AppError::Anyhow(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
