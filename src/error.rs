use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuizError {
    #[error("AI error: {0}")]
    Ai(#[from] AIError),
    #[error("Upload rejected: {0}")]
    Upload(#[from] UploadError),
    #[error("Quiz failed validation: {0}")]
    Validation(#[from] ValidationError),
    #[error("Malformed model output: {0}")]
    MalformedOutput(String),
    #[error("Generation exceeded the maximum duration of {0:?}")]
    Timeout(Duration),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("HTTP error: {0}")]
    Http(String),
}

#[derive(Error, Debug)]
pub enum AIError {
    #[error("Claude API error: {0}")]
    Claude(#[from] ClaudeError),
    #[error("Stream error: {0}")]
    Stream(String),
    #[error("Mock error: {0}")]
    Mock(String),
}

#[derive(Error, Debug)]
pub enum ClaudeError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Authentication failed")]
    Authentication,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("{name} is not a PDF (got {mime_type})")]
    NotPdf { name: String, mime_type: String },
    #[error("{name} is {size} bytes, above the {limit} byte limit")]
    TooLarge { name: String, size: usize, limit: usize },
    #[error("No files were provided")]
    NoFiles,
    #[error("{name} exceeds the limit of {limit} files per quiz")]
    TooManyFiles { name: String, limit: usize },
    #[error("File data is not a base64 data URL")]
    InvalidDataUrl,
    #[error("Invalid base64 payload: {0}")]
    Base64(String),
}

impl From<base64::DecodeError> for UploadError {
    fn from(err: base64::DecodeError) -> Self {
        UploadError::Base64(err.to_string())
    }
}

/// Every schema violation found in an assembled quiz.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", issues.join("\n"))]
pub struct ValidationError {
    pub issues: Vec<String>,
}

impl ValidationError {
    pub fn new(issues: Vec<String>) -> Self {
        Self { issues }
    }

    pub fn single(issue: impl Into<String>) -> Self {
        Self { issues: vec![issue.into()] }
    }
}
