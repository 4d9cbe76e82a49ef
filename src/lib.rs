//! Vista - analytics grid viewport server

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod grid;
pub mod services;
pub mod types;
pub mod view;
pub mod websocket;

use axum::{routing::get, Router};
use config::Config;
use services::AnalyticsViewManager;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use websocket::ConnectionManager;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub views: Arc<AnalyticsViewManager>,
    pub connections: Arc<ConnectionManager>,
}

impl AppState {
    /// Create application state from configuration.
    pub fn new(config: Config) -> Self {
        Self {
            views: AnalyticsViewManager::new(config.view_settings()),
            connections: ConnectionManager::new(),
            config: Arc::new(config),
        }
    }
}

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api::router())
        .route("/ws", get(websocket::ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
