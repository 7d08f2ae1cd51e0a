use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::web::state::AppState;

// Liveness and service info
pub async fn index_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let uptime = chrono::Utc::now()
        .signed_duration_since(state.startup_time)
        .num_seconds();

    Json(json!({
        "message": "Text-to-SQL API is running. POST to /generate-select-sql, /generate-other-sql or /execute-sql.",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": uptime,
    }))
}
