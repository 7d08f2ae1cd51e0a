use crate::audit::AuditLog;
use crate::config::AppConfig;
use crate::db::db_pool::DbPool;
use crate::db::executor::{self, Execution};
use crate::db::schema;
use crate::llm::generator::QueryGenerator;
use crate::llm::prompt::{PromptBuilder, QueryKind};
use crate::llm::LlmManager;
use tracing::{error, info};

use super::error::ApiError;

/// Shared application state for the web server
pub struct AppState {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub llm_manager: LlmManager,
    pub prompts: PromptBuilder,
    pub audit: AuditLog,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: AppConfig, db_pool: DbPool, llm_manager: LlmManager) -> Self {
        let audit = AuditLog::new(&config.audit);

        Self {
            config,
            db_pool,
            llm_manager,
            prompts: PromptBuilder::new(),
            audit,
            startup_time: chrono::Utc::now(),
        }
    }

    /// Renders the live catalog of the configured namespace. Rebuilt on every
    /// call; returns the unavailable sentinel on failure.
    pub async fn schema_description(&self) -> Result<String, ApiError> {
        let pool = self.db_pool.clone();
        let namespace = self.config.database.schema.clone();

        let description =
            tokio::task::spawn_blocking(move || schema::describe(&pool, &namespace)).await?;
        Ok(description)
    }

    /// Schema → prompt → completion → cleaned SQL, logged on success.
    pub async fn generate_query(&self, kind: QueryKind, question: &str) -> Result<String, ApiError> {
        let db_schema = self.schema_description().await?;
        if schema::is_unavailable(&db_schema) {
            error!("Aborting generation: database schema unavailable");
            return Err(ApiError::SchemaUnavailable);
        }

        let generator = QueryGenerator {
            prompts: &self.prompts,
            llm: &self.llm_manager,
            audit: &self.audit,
        };
        Ok(generator.generate(kind, question, &db_schema).await?)
    }

    /// Runs `sql` and appends one metrics row, whatever the outcome.
    pub async fn execute_sql(
        &self,
        sql: String,
        question: Option<String>,
    ) -> Result<Execution, ApiError> {
        let pool = self.db_pool.clone();
        let audit = self.audit.clone();

        let execution = tokio::task::spawn_blocking(move || -> Result<Execution, ApiError> {
            let execution = executor::execute(&pool, &sql);
            audit.log_execution(
                question.as_deref(),
                &sql,
                execution.latency_ms,
                execution.status,
            )?;
            Ok(execution)
        })
        .await??;

        info!(
            "Execution finished with status {} in {:.2}ms",
            execution.status, execution.latency_ms
        );
        Ok(execution)
    }
}
