pub mod engine;
pub mod health;
pub mod views;

use crate::AppState;
use axum::Router;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/api/views", views::router())
        .nest("/api/engine", engine::router())
}
