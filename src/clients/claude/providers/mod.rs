pub mod anthropic;

pub use anthropic::*;

use crate::core::{ContentPart, ModelRequest, RawByteStream};
use crate::error::AIError;
use async_trait::async_trait;
use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use super::config::ClaudeConfig;

#[derive(Debug, Serialize)]
pub struct ClaudeRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<ClaudeMessage>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub struct ClaudeMessage {
    pub role: String,
    pub content: Vec<ClaudeContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClaudeContentBlock {
    Text {
        text: String,
    },
    Document {
        source: DocumentSource,
        #[serde(skip_serializing_if = "Option::is_none")]
        cache_control: Option<CacheControl>,
    },
}

#[derive(Debug, Serialize)]
pub struct DocumentSource {
    #[serde(rename = "type")]
    pub source_type: String,
    pub media_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
pub struct CacheControl {
    #[serde(rename = "type")]
    pub cache_type: String,
}

#[derive(Debug, Deserialize)]
pub struct ClaudeResponse {
    pub content: Vec<ClaudeContent>,
}

#[derive(Debug, Deserialize)]
pub struct ClaudeContent {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl ClaudeRequest {
    #[must_use]
    pub fn new(request: ModelRequest, config: &ClaudeConfig) -> Self {
        let content = request
            .content
            .into_iter()
            .map(|part| match part {
                ContentPart::Text(text) => ClaudeContentBlock::Text { text },
                ContentPart::Document { media_type, data } => {
                    let cache_control = (config.enable_caching && data.len() > config.cache_threshold)
                        .then(|| CacheControl { cache_type: "ephemeral".to_string() });
                    ClaudeContentBlock::Document {
                        source: DocumentSource {
                            source_type: "base64".to_string(),
                            media_type,
                            data: BASE64_STANDARD.encode(&data),
                        },
                        cache_control,
                    }
                }
            })
            .collect();

        Self {
            model: config.model.model_id().to_string(),
            max_tokens: config.max_tokens,
            system: request.system,
            messages: vec![ClaudeMessage {
                role: "user".to_string(),
                content,
            }],
            stream: false,
        }
    }

    #[must_use]
    pub fn streaming(mut self) -> Self {
        self.stream = true;
        self
    }
}

#[async_trait]
pub trait ClaudeProvider: Send + Sync + std::fmt::Debug {
    async fn call_api(&self, request: &ClaudeRequest) -> Result<String, AIError>;

    /// Raw SSE bytes of a streaming request.
    async fn stream_api(&self, _request: &ClaudeRequest) -> Result<RawByteStream, AIError> {
        Err(AIError::Claude(crate::error::ClaudeError::Api("Streaming not implemented for this provider".into())))
    }
}
