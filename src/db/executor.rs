use arrow::json::writer::JsonArray;
use arrow::json::WriterBuilder;
use arrow::record_batch::RecordBatch;
use duckdb::Connection;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::db::db_pool::DbPool;

/// Statements containing any of these (upper-cased, anywhere in the text)
/// run on the transactional affected-rows path.
pub const MUTATING_KEYWORDS: [&str; 6] = ["INSERT", "UPDATE", "DELETE", "CREATE", "ALTER", "DROP"];

pub type Row = Map<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    #[error("{0}")]
    Pool(#[from] r2d2::Error),

    #[error("{0}")]
    Database(#[from] duckdb::Error),

    #[error("{0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ExecutionResult {
    Rows(Vec<Row>),
    Affected { rows_affected: usize },
    Error(String),
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Error,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Success => write!(f, "success"),
            ExecutionStatus::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Execution {
    pub result: ExecutionResult,
    pub status: ExecutionStatus,
    pub latency_ms: f64,
}

pub fn is_mutating(sql: &str) -> bool {
    let upper = sql.trim().to_uppercase();
    MUTATING_KEYWORDS.iter().any(|keyword| upper.contains(keyword))
}

/// Runs `sql` verbatim on a pooled connection. Failures are reported in the
/// returned [`Execution`], never propagated.
pub fn execute(pool: &DbPool, sql: &str) -> Execution {
    let start_time = Instant::now();

    let outcome = pool
        .get()
        .map_err(ExecuteError::from)
        .and_then(|mut conn| {
            if is_mutating(sql) {
                execute_in_transaction(&mut conn, sql)
                    .map(|rows_affected| ExecutionResult::Affected { rows_affected })
            } else {
                query_rows(&conn, sql).map(ExecutionResult::Rows)
            }
        });

    let latency_ms = start_time.elapsed().as_secs_f64() * 1000.0;

    match outcome {
        Ok(result) => {
            info!("Query executed successfully in {:.2}ms", latency_ms);
            Execution {
                result,
                status: ExecutionStatus::Success,
                latency_ms,
            }
        }
        Err(e) => {
            warn!("Query failed after {:.2}ms: {}", latency_ms, e);
            Execution {
                result: ExecutionResult::Error(e.to_string()),
                status: ExecutionStatus::Error,
                latency_ms,
            }
        }
    }
}

fn execute_in_transaction(conn: &mut Connection, sql: &str) -> Result<usize, ExecuteError> {
    let tx = conn.transaction()?;
    let rows_affected = tx.execute(sql, [])?;
    tx.commit()?;
    debug!("Transaction committed, {} rows affected", rows_affected);
    Ok(rows_affected)
}

fn query_rows(conn: &Connection, sql: &str) -> Result<Vec<Row>, ExecuteError> {
    let mut stmt = conn.prepare(sql)?;
    let record_batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();
    batches_to_rows(&record_batches)
}

/// Converts Arrow batches to one JSON object per row, keeping NULLs.
fn batches_to_rows(record_batches: &[RecordBatch]) -> Result<Vec<Row>, ExecuteError> {
    let row_count: usize = record_batches.iter().map(|batch| batch.num_rows()).sum();
    if row_count == 0 {
        return Ok(Vec::new());
    }

    let mut writer = WriterBuilder::new()
        .with_explicit_nulls(true)
        .build::<_, JsonArray>(Vec::new());
    let batch_refs: Vec<&RecordBatch> = record_batches.iter().collect();
    writer.write_batches(&batch_refs)?;
    writer.finish()?;

    let rows: Vec<Row> = serde_json::from_slice(&writer.into_inner())?;
    Ok(rows)
}
