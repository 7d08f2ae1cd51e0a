use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

// Liveness / info
pub fn ui_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(handlers::ui::index_handler))
}

// API Routes - SQL generation and execution
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/generate-select-sql", post(handlers::api::generate_select_sql))
        .route("/generate-other-sql", post(handlers::api::generate_other_sql))
        .route("/execute-sql", post(handlers::api::execute_sql))
}
