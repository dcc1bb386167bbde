use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::clients::claude::ClaudeModel;
use crate::core::GeneratorConfig;

/// Trait for types that can retrieve their configuration key from environment variables
pub trait KeyFromEnv {
    /// The environment variable name for this client's API key
    const KEY_NAME: &'static str;

    /// Find the API key by checking environment variables, after loading `.env`
    fn find_key() -> Option<String> {
        // Missing .env files are fine
        let _ = dotenvy::dotenv();

        env::var(Self::KEY_NAME).ok().filter(|k| !k.trim().is_empty())
    }
}

/// Server settings, read from `QUIZ_*` environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub model: ClaudeModel,
    pub max_tokens: u32,
    pub max_duration: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            model: ClaudeModel::default(),
            max_tokens: 8192,
            max_duration: GeneratorConfig::default().max_duration,
        }
    }
}

impl ServerConfig {
    /// Read overrides from the environment. Unparseable values are reported.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();

        if let Ok(addr) = env::var("QUIZ_BIND_ADDR") {
            config.bind_addr = addr
                .parse()
                .map_err(|e| format!("QUIZ_BIND_ADDR={addr}: {e}"))?;
        }
        if let Ok(model) = env::var("QUIZ_MODEL") {
            config.model = ClaudeModel::from_name(&model);
        }
        if let Ok(tokens) = env::var("QUIZ_MAX_TOKENS") {
            config.max_tokens = tokens
                .parse()
                .map_err(|e| format!("QUIZ_MAX_TOKENS={tokens}: {e}"))?;
        }
        if let Ok(secs) = env::var("QUIZ_MAX_DURATION_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|e| format!("QUIZ_MAX_DURATION_SECS={secs}: {e}"))?;
            config.max_duration = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig { max_duration: self.max_duration }
    }
}
