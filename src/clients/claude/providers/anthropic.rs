use crate::core::RawByteStream;
use crate::error::{AIError, ClaudeError};
use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, error, info, instrument, warn};

use super::{ClaudeProvider, ClaudeRequest, ClaudeResponse};
use crate::clients::claude::config::ClaudeConfig;
use futures_util::StreamExt;

#[allow(clippy::module_name_repetitions)]
#[derive(Clone, Debug)]
pub struct AnthropicProvider {
    config: ClaudeConfig,
    client: Client,
}

impl AnthropicProvider {
    #[must_use]
    pub fn new(config: ClaudeConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    async fn send(&self, request: &ClaudeRequest) -> Result<Response, AIError> {
        let response = self
            .client
            .post(self.config.messages_url())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request failed");
                AIError::Claude(ClaudeError::Http(e.to_string()))
            })?;

        debug!(status = %response.status(), "Received response from Anthropic API");

        if response.status() == 429 {
            warn!("Anthropic API rate limit exceeded");
            return Err(AIError::Claude(ClaudeError::RateLimit));
        }

        if response.status() == 401 {
            error!("Anthropic API authentication failed");
            return Err(AIError::Claude(ClaudeError::Authentication));
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "Anthropic API error");
            return Err(AIError::Claude(ClaudeError::Api(error_text)));
        }

        Ok(response)
    }
}

#[async_trait]
impl ClaudeProvider for AnthropicProvider {
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn call_api(&self, request: &ClaudeRequest) -> Result<String, AIError> {
        debug!(model = %request.model, "Preparing Anthropic API request");

        let response = self.send(request).await?;

        let claude_response: ClaudeResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse Anthropic response JSON");
            AIError::Claude(ClaudeError::Http(e.to_string()))
        })?;

        debug!(content_count = claude_response.content.len(), "Parsed Anthropic response");

        let text: String = claude_response
            .content
            .into_iter()
            .filter(|c| c.content_type == "text")
            .filter_map(|c| c.text)
            .collect();

        if text.is_empty() {
            error!("No text content in Anthropic response");
            return Err(AIError::Claude(ClaudeError::Api("No content in response".to_string())));
        }

        info!(response_len = text.len(), "Successfully received Anthropic response");
        Ok(text)
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn stream_api(&self, request: &ClaudeRequest) -> Result<RawByteStream, AIError> {
        let response = self.send(request).await?;
        info!("Anthropic stream opened");

        let s = async_stream::try_stream! {
            let mut bs = response
                .bytes_stream()
                .map(|r| r.map_err(|e| AIError::Claude(ClaudeError::Http(e.to_string()))));
            while let Some(chunk) = bs.next().await {
                let b = chunk?;
                yield b;
            }
        };
        Ok(Box::pin(s))
    }
}
