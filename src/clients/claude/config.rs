use crate::config::KeyFromEnv;

use super::models::ClaudeModel;

pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";

#[allow(clippy::module_name_repetitions)]
#[derive(Clone)]
pub struct ClaudeConfig {
    pub model: ClaudeModel,
    pub api_key: String,
    pub base_url: String,
    pub max_tokens: u32,
    /// Mark documents larger than `cache_threshold` bytes as cacheable.
    pub enable_caching: bool,
    pub cache_threshold: usize,
}

impl std::fmt::Debug for ClaudeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeConfig")
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .field("enable_caching", &self.enable_caching)
            .field("cache_threshold", &self.cache_threshold)
            .finish()
    }
}

impl KeyFromEnv for ClaudeConfig {
    const KEY_NAME: &'static str = "ANTHROPIC_API_KEY";
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            model: ClaudeModel::default(),
            api_key: Self::find_key().unwrap_or_default(),
            base_url: ANTHROPIC_API_URL.to_string(),
            max_tokens: 8192,
            enable_caching: true,
            cache_threshold: 3000,
        }
    }
}

impl ClaudeConfig {
    #[must_use]
    pub fn anthropic(api_key: String, model: ClaudeModel) -> Self {
        Self {
            model,
            api_key,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: ClaudeModel) -> Self {
        self.model = model;
        self
    }

    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }
}
