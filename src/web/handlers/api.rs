use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::db::executor::{ExecutionResult, ExecutionStatus};
use crate::llm::prompt::QueryKind;
use crate::web::error::ApiError;
use crate::web::state::AppState;

// Generation types

#[derive(Debug, Deserialize, Clone)]
pub struct GenerateSqlRequest {
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateSqlResponse {
    pub question: String,
    pub sql_query: String,
}

// Execution types

#[derive(Debug, Deserialize)]
pub struct ExecuteSqlRequest {
    pub sql_query: String,
    pub question: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExecuteSqlResponse {
    pub sql_query: String,
    pub result: ExecutionResult,
    pub latency_ms: f64,
    pub status: ExecutionStatus,
}

// API Implementations

pub async fn generate_select_sql(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GenerateSqlRequest>,
) -> Result<Json<GenerateSqlResponse>, ApiError> {
    if payload.question.trim().is_empty() {
        return Err(ApiError::BadRequest("Question cannot be empty."));
    }

    generate(&state, QueryKind::Select, payload.question).await
}

/// Generated statements may modify data or schema.
pub async fn generate_other_sql(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GenerateSqlRequest>,
) -> Result<Json<GenerateSqlResponse>, ApiError> {
    if payload.question.trim().is_empty() {
        return Err(ApiError::BadRequest("Instruction cannot be empty."));
    }

    generate(&state, QueryKind::Modify, payload.question).await
}

async fn generate(
    state: &AppState,
    kind: QueryKind,
    question: String,
) -> Result<Json<GenerateSqlResponse>, ApiError> {
    debug!("Generating {:?} query for: {}", kind, question);
    let sql_query = state.generate_query(kind, &question).await?;

    Ok(Json(GenerateSqlResponse {
        question,
        sql_query,
    }))
}

// SQL failures come back as a normal response with status "error".
pub async fn execute_sql(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ExecuteSqlRequest>,
) -> Result<Json<ExecuteSqlResponse>, ApiError> {
    if payload.sql_query.trim().is_empty() {
        return Err(ApiError::BadRequest("SQL query cannot be empty."));
    }

    info!("Executing SQL query: {}", payload.sql_query);
    let execution = state
        .execute_sql(payload.sql_query.clone(), payload.question)
        .await?;

    Ok(Json(ExecuteSqlResponse {
        sql_query: payload.sql_query,
        result: execution.result,
        latency_ms: execution.latency_ms,
        status: execution.status,
    }))
}
