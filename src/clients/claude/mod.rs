pub mod providers;
pub mod models;
pub mod config;

pub use providers::*;
pub use models::*;
pub use config::*;

use crate::config::KeyFromEnv;
use crate::core::{LowLevelClient, ModelRequest, TextStream};
use crate::error::{AIError, ClaudeError};
use crate::streaming::text_from_sse_bytes;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

#[derive(Clone, Debug)]
pub struct ClaudeClient {
    provider: Arc<dyn ClaudeProvider>,
    config: ClaudeConfig,
}

impl KeyFromEnv for ClaudeClient {
    const KEY_NAME: &'static str = "ANTHROPIC_API_KEY";
}

impl ClaudeClient {
    pub fn new(config: ClaudeConfig) -> Self {
        info!(model = %config.model, "Creating new Claude client");
        let provider = Arc::new(AnthropicProvider::new(config.clone()));
        Self { provider, config }
    }

    /// Use a custom provider, e.g. a proxy or a test double.
    pub fn with_provider(config: ClaudeConfig, provider: Arc<dyn ClaudeProvider>) -> Self {
        Self { provider, config }
    }

    /// Build a client from `ANTHROPIC_API_KEY`, failing when it is not set.
    pub fn from_env(model: ClaudeModel) -> Result<Self, AIError> {
        let api_key = Self::find_key().ok_or(AIError::Claude(ClaudeError::Authentication))?;
        Ok(Self::new(ClaudeConfig::anthropic(api_key, model)))
    }

    pub fn config(&self) -> &ClaudeConfig {
        &self.config
    }
}

#[async_trait]
impl LowLevelClient for ClaudeClient {
    async fn ask_raw(&self, request: ModelRequest) -> Result<String, AIError> {
        let request = ClaudeRequest::new(request, &self.config);
        self.provider.call_api(&request).await
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }

    async fn stream_raw(&self, request: ModelRequest) -> Result<TextStream, AIError> {
        let request = ClaudeRequest::new(request, &self.config).streaming();
        let bytes = self.provider.stream_api(&request).await?;
        Ok(text_from_sse_bytes(bytes))
    }
}
