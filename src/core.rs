//! Core generation API: wraps a low-level model client with quiz prompting,
//! schema guidance, streaming validation and title generation.
//!
//! Quick start:
//! - `QuizGenerator::stream_quiz()` streams the question array for a PDF
//! - `QuizGenerator::generate_title()` names the quiz from the file name alone

use crate::error::{AIError, QuizError};
use crate::json_utils::extract_all;
use crate::quiz::{Question, QuestionCount};
use crate::streaming::{quiz_stream, GenerationStream};
use async_trait::async_trait;
use bytes::Bytes;
use futures_core::Stream;
use schemars::{schema_for, JsonSchema};
use serde::Deserialize;
use std::fmt::Debug;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Stream of text deltas produced by a model.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, AIError>> + Send>>;

/// Stream of raw bytes from a provider (e.g. an SSE response body).
pub type RawByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, AIError>> + Send>>;

/// Title used whenever no generated title is available.
pub const DEFAULT_TITLE: &str = "Quiz";

/// A piece of user message content.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    /// A binary document sent inline (base64-encoded by the provider).
    Document { media_type: String, data: Bytes },
}

/// Provider-neutral request: an optional system instruction and one user turn.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelRequest {
    pub system: Option<String>,
    pub content: Vec<ContentPart>,
}

impl ModelRequest {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.content.push(ContentPart::Text(text.into()));
        self
    }

    #[must_use]
    pub fn with_document(mut self, media_type: impl Into<String>, data: Bytes) -> Self {
        self.content.push(ContentPart::Document { media_type: media_type.into(), data });
        self
    }

    /// Concatenated text parts, handy for logging and tests.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text(t) => Some(t.as_str()),
                ContentPart::Document { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Low-level model client abstraction.
///
/// Implementors provide `ask_raw`, which executes a request and returns the raw
/// model text. Streaming falls back to a single chunk unless overridden.
#[async_trait]
pub trait LowLevelClient: Send + Sync + Debug {
    async fn ask_raw(&self, request: ModelRequest) -> Result<String, AIError>;

    /// Clone this client into a boxed trait object
    fn clone_box(&self) -> Box<dyn LowLevelClient>;

    /// Stream the response as text deltas.
    async fn stream_raw(&self, request: ModelRequest) -> Result<TextStream, AIError> {
        let text = self.ask_raw(request).await?;
        Ok(Box::pin(futures_util::stream::once(async move { Ok(text) })))
    }
}

impl Clone for Box<dyn LowLevelClient> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

#[async_trait]
impl LowLevelClient for Box<dyn LowLevelClient> {
    async fn ask_raw(&self, request: ModelRequest) -> Result<String, AIError> {
        self.as_ref().ask_raw(request).await
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        self.as_ref().clone_box()
    }

    async fn stream_raw(&self, request: ModelRequest) -> Result<TextStream, AIError> {
        self.as_ref().stream_raw(request).await
    }
}

/// A decoded PDF ready to be sent to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfDocument {
    pub name: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Upper bound on a whole quiz generation, after which the stream aborts.
    pub max_duration: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self { max_duration: Duration::from_secs(60) }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct TitleResponse {
    /// A max three word title for the quiz based on the file provided as context, and the language of the file
    title: String,
}

/// Quiz generator that wraps a LowLevelClient.
#[derive(Debug, Clone)]
pub struct QuizGenerator<C: LowLevelClient> {
    client: C,
    config: GeneratorConfig,
}

impl<C: LowLevelClient> QuizGenerator<C> {
    pub fn new(client: C, config: GeneratorConfig) -> Self {
        info!(max_duration = ?config.max_duration, "Creating new QuizGenerator");
        Self { client, config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// System instruction for a quiz of `count` questions, with schema guidance.
    pub fn quiz_instructions(count: QuestionCount) -> String {
        let base = format!(
            "You are a teacher. Your job is to take a document, and create a multiple choice test \
             (with {count} questions) based on the content of the document. \
             Each option should be roughly equal in length. Respond to the language of the document."
        );
        add_schema_guidance::<Vec<Question>>(base, count)
    }

    /// Build the full model request for a quiz.
    pub fn quiz_request(document: &PdfDocument, count: QuestionCount) -> ModelRequest {
        ModelRequest::new()
            .with_system(Self::quiz_instructions(count))
            .with_text("Create a multiple choice test based on this document.")
            .with_document(crate::composer::PDF_MIME_TYPE, document.bytes.clone())
    }

    /// Stream the quiz for `document`.
    ///
    /// The returned stream yields text deltas whose concatenation is always a
    /// prefix of a JSON array of at most `count` questions, then a final
    /// `Completed` event once the whole array passed strict validation. Any
    /// failure ends the stream with an error.
    #[instrument(target = "pdf_quiz::generator", skip(self, document, count), fields(document = %document.name, bytes = document.bytes.len(), count = %count))]
    pub async fn stream_quiz(&self, document: &PdfDocument, count: QuestionCount) -> Result<GenerationStream, QuizError> {
        let deadline = tokio::time::Instant::now() + self.config.max_duration;
        let request = Self::quiz_request(document, count);
        debug!(system_len = request.system.as_ref().map(String::len), "Sending quiz request");

        let text = tokio::time::timeout_at(deadline, self.client.stream_raw(request))
            .await
            .map_err(|_| QuizError::Timeout(self.config.max_duration))??;
        info!("Successfully initiated quiz stream");

        Ok(Box::pin(quiz_stream(text, count, deadline, self.config.max_duration)))
    }

    /// Generate a short title from the uploaded file's name (never its content).
    #[instrument(target = "pdf_quiz::generator", skip(self))]
    pub async fn generate_title(&self, file_name: &str) -> Result<String, QuizError> {
        let prompt = format!(
            "Generate a title for a quiz based on the following (PDF) file name. \
             Try and extract as much info from the file name as possible. \
             If the file name is just numbers or incoherent, just return quiz.\n\n {file_name}"
        );
        let request = ModelRequest::new().with_text(add_title_guidance(prompt));
        let raw = self.client.ask_raw(request).await?;

        let title = extract_all::<TitleResponse>(&raw)
            .into_iter()
            .next()
            .map(|r| cap_words(&r.title, 3))
            .filter(|t| !t.is_empty());

        match title {
            Some(title) => {
                info!(%title, "Generated quiz title");
                Ok(title)
            }
            None => {
                warn!(response_len = raw.len(), "Title response did not contain a title");
                Err(QuizError::MalformedOutput("no title in model response".to_string()))
            }
        }
    }
}

/// Append JSON schema guidance for `T` to a prompt.
fn add_schema_guidance<T: JsonSchema>(prompt: String, count: QuestionCount) -> String {
    let schema = schema_for!(T);
    let schema_json = serde_json::to_string_pretty(&schema)
        .unwrap_or_else(|_| "Schema serialization failed".to_string());

    format!(
        "{prompt}\n\n## Response Format\nRespond with only a JSON array of exactly {count} questions matching this schema, \
         with no text before or after it:\n```json\n{schema_json}\n```"
    )
}

fn add_title_guidance(prompt: String) -> String {
    let schema = schema_for!(TitleResponse);
    let schema_json = serde_json::to_string_pretty(&schema)
        .unwrap_or_else(|_| "Schema serialization failed".to_string());

    format!("{prompt}\n\n## Response Format\nRespond with JSON matching this schema:\n```json\n{schema_json}\n```")
}

/// Keep at most `max` whitespace-separated words.
pub fn cap_words(text: &str, max: usize) -> String {
    text.split_whitespace().take(max).collect::<Vec<_>>().join(" ")
}
