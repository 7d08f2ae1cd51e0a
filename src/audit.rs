use serde::Serialize;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::AuditConfig;
use crate::db::executor::ExecutionStatus;

const GENERATION_HEADER: [&str; 2] = ["question", "generated_sql_query"];
const METRICS_HEADER: [&str; 4] = ["question", "sql_query", "latency_ms", "status"];

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Failed to open audit log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write audit log {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

#[derive(Debug, Serialize)]
pub struct GenerationRecord<'a> {
    pub question: &'a str,
    pub generated_sql_query: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ExecutionRecord<'a> {
    pub question: &'a str,
    pub sql_query: &'a str,
    pub latency_ms: f64,
    pub status: ExecutionStatus,
}

/// Append-only CSV writers for generated queries and execution metrics.
///
/// Every write opens the file, adds the header if the file is new, appends a
/// single row and closes it again. Two writers racing on a fresh file can
/// both write the header.
#[derive(Debug, Clone)]
pub struct AuditLog {
    generation_path: PathBuf,
    metrics_path: PathBuf,
}

impl AuditLog {
    pub fn new(config: &AuditConfig) -> Self {
        Self {
            generation_path: config.generation_log.clone(),
            metrics_path: config.metrics_log.clone(),
        }
    }

    pub fn generation_path(&self) -> &Path {
        &self.generation_path
    }

    pub fn metrics_path(&self) -> &Path {
        &self.metrics_path
    }

    pub fn log_generation(&self, question: &str, sql_query: &str) -> Result<(), AuditError> {
        append_row(
            &self.generation_path,
            &GENERATION_HEADER,
            GenerationRecord {
                question,
                generated_sql_query: sql_query,
            },
        )
    }

    /// A missing question is recorded as `N/A`.
    pub fn log_execution(
        &self,
        question: Option<&str>,
        sql_query: &str,
        latency_ms: f64,
        status: ExecutionStatus,
    ) -> Result<(), AuditError> {
        append_row(
            &self.metrics_path,
            &METRICS_HEADER,
            ExecutionRecord {
                question: question.unwrap_or("N/A"),
                sql_query,
                latency_ms,
                status,
            },
        )
    }
}

fn append_row<R: Serialize>(path: &Path, header: &[&str], record: R) -> Result<(), AuditError> {
    let file_exists = path.is_file();

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| AuditError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let csv_error = |source: csv::Error| AuditError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if !file_exists {
        writer.write_record(header).map_err(csv_error)?;
    }
    writer.serialize(record).map_err(csv_error)?;
    writer.flush().map_err(|source| AuditError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("Appended audit row to {}", path.display());
    Ok(())
}
