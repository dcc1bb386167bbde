use std::fmt;

pub struct ClaudeModels;

impl ClaudeModels {
    // Claude 4 Models
    pub const OPUS_4: &'static str = "claude-opus-4-20250514";
    pub const SONNET_4: &'static str = "claude-sonnet-4-20250514";

    // Claude 3.7 Models
    pub const SONNET_3_7: &'static str = "claude-3-7-sonnet-20250219";

    // Claude 3.5 Models
    pub const HAIKU_3_5: &'static str = "claude-3-5-haiku-20241022";
}

/// Models able to read PDF documents.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ClaudeModel {
    Opus4,
    #[default]
    Sonnet4,
    Sonnet37,
    Haiku35,
    /// Any other model id, passed through verbatim.
    Custom(String),
}

impl ClaudeModel {
    #[must_use]
    pub fn model_id(&self) -> &str {
        match self {
            Self::Opus4 => ClaudeModels::OPUS_4,
            Self::Sonnet4 => ClaudeModels::SONNET_4,
            Self::Sonnet37 => ClaudeModels::SONNET_3_7,
            Self::Haiku35 => ClaudeModels::HAIKU_3_5,
            Self::Custom(id) => id,
        }
    }

    /// Map a short alias or a full model id onto a model.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "opus-4" | "opus4" => Self::Opus4,
            "sonnet-4" | "sonnet4" => Self::Sonnet4,
            "sonnet-3.7" | "sonnet37" => Self::Sonnet37,
            "haiku-3.5" | "haiku35" => Self::Haiku35,
            id if id == ClaudeModels::OPUS_4 => Self::Opus4,
            id if id == ClaudeModels::SONNET_4 => Self::Sonnet4,
            id if id == ClaudeModels::SONNET_3_7 => Self::Sonnet37,
            id if id == ClaudeModels::HAIKU_3_5 => Self::Haiku35,
            _ => Self::Custom(name.trim().to_string()),
        }
    }
}

impl fmt::Display for ClaudeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model_id())
    }
}
