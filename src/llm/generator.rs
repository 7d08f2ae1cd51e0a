use tracing::{debug, info};

use crate::audit::{AuditError, AuditLog};
use crate::llm::prompt::{PromptBuilder, QueryKind};
use crate::llm::{LlmError, LlmManager};

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("Failed to render prompt: {0}")]
    Prompt(#[from] minijinja::Error),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Audit(#[from] AuditError),
}

/// Strips markdown fences from model output: every backtick and every
/// literal `sql` is removed, including inside identifiers and literals.
pub fn clean_sql(content: &str) -> String {
    content.trim().replace('`', "").replace("sql", "")
}

/// Turns a question plus a rendered schema into a single SQL statement.
pub struct QueryGenerator<'a> {
    pub prompts: &'a PromptBuilder,
    pub llm: &'a LlmManager,
    pub audit: &'a AuditLog,
}

impl QueryGenerator<'_> {
    /// Successful generations are appended to the generation log before
    /// the statement is returned.
    pub async fn generate(
        &self,
        kind: QueryKind,
        question: &str,
        schema: &str,
    ) -> Result<String, GenerateError> {
        let prompt = self.prompts.build(kind, schema, question)?;
        debug!("Prepared LLM prompt: {}", prompt);

        let content = self.llm.complete(&prompt).await?;
        let sql = clean_sql(&content);
        info!("Generated {:?} query for question '{}'", kind, question);

        self.audit.log_generation(question, &sql)?;
        Ok(sql)
    }
}
