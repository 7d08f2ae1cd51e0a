pub mod generator;
pub mod prompt;
pub mod providers;

use crate::config::LlmConfig;
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM connection error: {0}")]
    ConnectionError(String),
    #[error("LLM response error: {0}")]
    ResponseError(String),
    #[error("LLM configuration error: {0}")]
    ConfigError(String),
}

/// A hosted model that turns a prompt into text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Returns the first content field of the model's reply.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

pub struct LlmManager {
    client: Box<dyn CompletionClient>,
}

impl LlmManager {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = providers::remote::RemoteLlmProvider::new(config)?;
        Ok(Self {
            client: Box::new(client),
        })
    }

    pub fn with_client(client: Box<dyn CompletionClient>) -> Self {
        Self { client }
    }

    pub async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.client.complete(prompt).await
    }
}
