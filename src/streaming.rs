use crate::core::{RawByteStream, TextStream};
use crate::error::{AIError, QuizError};
use crate::json_utils::{ArrayEvent, ArrayScanner};
use crate::quiz::{validate_quiz, Question, QuestionCount};
use async_stream::{stream, try_stream};
use futures_core::stream::Stream;
use futures_util::StreamExt;
use serde::Deserialize;
use std::pin::Pin;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

/// An event produced while a quiz is being generated.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    /// Text to append to the response body. The concatenation of all deltas is
    /// always a prefix of a JSON array of at most the requested length.
    Delta(String),
    /// An element closed and passed strict validation.
    Question { index: usize, question: Question },
    /// The array is complete and passed final validation.
    Completed(Vec<Question>),
}

pub type GenerationStream = Pin<Box<dyn Stream<Item = Result<GenerationEvent, QuizError>> + Send>>;

// =============== Server-side stream state ===============

/// Growing, validated prefix of the question array for one request.
///
/// Created empty when the request starts, fed model text as it arrives, and
/// consumed by [`StreamState::finish`].
#[derive(Debug)]
pub struct StreamState {
    count: QuestionCount,
    accum: String,
    scanner: ArrayScanner,
    /// Byte offset into `accum` up to which text has been delivered.
    forwarded: Option<usize>,
    delivered: String,
    questions: Vec<Question>,
    closed: bool,
}

impl StreamState {
    pub fn new(count: QuestionCount) -> Self {
        Self {
            count,
            accum: String::new(),
            scanner: ArrayScanner::new(),
            forwarded: None,
            delivered: String::new(),
            questions: Vec::new(),
            closed: false,
        }
    }

    /// Whether the delivered array is closed and further model text is ignored.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Everything delivered so far.
    pub fn delivered(&self) -> &str {
        &self.delivered
    }

    /// Feed a chunk of model text, returning the events it produced.
    ///
    /// Fails as soon as a closed element is not a well-formed question.
    pub fn feed(&mut self, chunk: &str) -> Result<Vec<GenerationEvent>, QuizError> {
        let mut events = Vec::new();
        if self.closed {
            return Ok(events);
        }

        self.accum.push_str(chunk);
        for event in self.scanner.feed(chunk) {
            match event {
                ArrayEvent::Opened(at) => {
                    debug!(target: "pdf_quiz::stream", at, "question array opened");
                    self.forwarded = Some(at);
                }
                ArrayEvent::Element(node) => {
                    self.flush_to(node.end + 1, &mut events);
                    let index = self.questions.len();
                    let question = parse_question(node.slice(&self.accum), index)?;
                    debug!(target: "pdf_quiz::stream", index, "question validated");
                    self.questions.push(question.clone());
                    events.push(GenerationEvent::Question { index, question });

                    if self.questions.len() == self.count.get() {
                        self.push_delta("]".to_string(), &mut events);
                        self.closed = true;
                        info!(target: "pdf_quiz::stream", count = self.questions.len(), "reached requested question count");
                        return Ok(events);
                    }
                }
                ArrayEvent::Closed(at) => {
                    self.flush_to(at + 1, &mut events);
                    self.closed = true;
                    return Ok(events);
                }
            }
        }

        self.flush_to(self.accum.len(), &mut events);
        Ok(events)
    }

    /// Run final validation over the delivered array.
    pub fn finish(self) -> Result<Vec<Question>, QuizError> {
        if self.forwarded.is_none() {
            return Err(QuizError::MalformedOutput("model output did not contain a JSON array".to_string()));
        }
        if !self.closed {
            return Err(QuizError::MalformedOutput(format!(
                "model stream ended after {} questions without closing the array",
                self.questions.len()
            )));
        }
        Ok(validate_quiz(&self.delivered, self.count)?)
    }

    fn flush_to(&mut self, upto: usize, events: &mut Vec<GenerationEvent>) {
        let Some(from) = self.forwarded else { return };
        if upto > from {
            let delta = self.accum[from..upto].to_string();
            self.forwarded = Some(upto);
            self.push_delta(delta, events);
        }
    }

    fn push_delta(&mut self, delta: String, events: &mut Vec<GenerationEvent>) {
        self.delivered.push_str(&delta);
        events.push(GenerationEvent::Delta(delta));
    }
}

fn parse_question(slice: &str, index: usize) -> Result<Question, QuizError> {
    let question: Question = serde_json::from_str(slice).map_err(|e| {
        warn!(target: "pdf_quiz::stream", index, error = %e, "malformed question");
        crate::error::ValidationError::single(format!("question {}: {e}", index + 1))
    })?;
    question.validate().map_err(|e| {
        crate::error::ValidationError::new(
            e.issues.into_iter().map(|issue| format!("question {}: {issue}", index + 1)).collect(),
        )
    })?;
    Ok(question)
}

/// Drive a model text stream through [`StreamState`], enforcing the deadline.
///
/// State machine: collecting tokens, emitting partial objects, array reaches
/// the target length, final validation, then success or a terminal error.
pub fn quiz_stream(
    text: TextStream,
    count: QuestionCount,
    deadline: tokio::time::Instant,
    max_duration: Duration,
) -> impl Stream<Item = Result<GenerationEvent, QuizError>> {
    try_stream! {
        let mut text = text;
        let mut state = StreamState::new(count);

        while !state.is_closed() {
            let next = tokio::time::timeout_at(deadline, text.next())
                .await
                .map_err(|_| QuizError::Timeout(max_duration))?;
            let Some(chunk) = next else { break };
            let chunk = chunk.map_err(QuizError::from)?;
            for event in state.feed(&chunk)? {
                yield event;
            }
        }

        let questions = state.finish()?;
        info!(target: "pdf_quiz::stream", count = questions.len(), "quiz passed final validation");
        yield GenerationEvent::Completed(questions);
    }
}

// =============== Provider SSE decoding ===============

#[derive(Debug, Deserialize)]
struct SseEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    delta: Option<SseDelta>,
    #[serde(default)]
    error: Option<SseError>,
}

#[derive(Debug, Deserialize)]
struct SseDelta {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SseError {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

/// Convert an Anthropic Messages SSE byte stream into text deltas.
///
/// `content_block_delta` events carry text; an `error` event terminates the
/// stream with an error; `message_stop` ends it. Other events are ignored.
pub fn text_from_sse_bytes(byte_stream: RawByteStream) -> TextStream {
    Box::pin(stream! {
        use tokio_util::io::StreamReader;

        let io_stream = byte_stream.map(|res| match res {
            Ok(bytes) => Ok::<bytes::Bytes, std::io::Error>(bytes),
            Err(e) => Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())),
        });
        let reader = StreamReader::new(io_stream);

        let mut lines = BufReader::new(reader).lines();
        let mut data = String::new();

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    yield Err(AIError::Stream(e.to_string()));
                    return;
                }
            };

            if !line.is_empty() {
                // `event:` lines are redundant with the payload's `type`
                if let Some(payload) = line.strip_prefix("data:") {
                    if !data.is_empty() { data.push('\n'); }
                    data.push_str(payload.trim_start());
                }
                continue;
            }
            if data.is_empty() {
                continue;
            }

            let payload = std::mem::take(&mut data);
            let envelope = match serde_json::from_str::<SseEnvelope>(&payload) {
                Ok(envelope) => envelope,
                Err(e) => {
                    debug!(target: "pdf_quiz::sse", error = %e, "skipping unparseable event");
                    continue;
                }
            };

            match envelope.kind.as_str() {
                "content_block_delta" => {
                    if let Some(text) = envelope.delta.and_then(|d| d.text) {
                        yield Ok(text);
                    }
                }
                "error" => {
                    let err = envelope.error.map(|e| format!("{}: {}", e.kind, e.message))
                        .unwrap_or_else(|| "unknown stream error".to_string());
                    warn!(target: "pdf_quiz::sse", error = %err, "provider reported stream error");
                    yield Err(AIError::Stream(err));
                    return;
                }
                "message_stop" => {
                    debug!(target: "pdf_quiz::sse", "message stop");
                    break;
                }
                _ => {}
            }
        }
    })
}
