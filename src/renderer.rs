//! Incremental rendering of a streamed quiz.
//!
//! The renderer is fed the raw response body chunk by chunk. After every chunk
//! it reparses the partial array and either reports progress or makes the
//! one-way transition to a finished quiz.

use crate::core::DEFAULT_TITLE;
use crate::json_utils::parse_partial_array;
use crate::quiz::{PartialQuestion, Question, QuestionCount};
use tracing::{debug, info, warn};

pub const FAILURE_NOTICE: &str = "Failed to generate quiz. Please try again.";

/// A completed quiz, owned by the finished view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedQuiz {
    pub title: String,
    pub questions: Vec<Question>,
}

/// Snapshot of a generation in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationProgress {
    pub requested: QuestionCount,
    /// Elements seen so far, including the one still being written.
    pub partial: Vec<PartialQuestion>,
    /// Leading elements that are closed and fully populated.
    pub completed: usize,
}

impl GenerationProgress {
    /// Percentage of requested questions that are complete.
    pub fn percent(&self) -> f64 {
        (self.completed as f64 / self.requested.get() as f64) * 100.0
    }

    pub fn status(&self) -> String {
        if self.partial.is_empty() {
            "Analyzing PDF content".to_string()
        } else {
            let current = (self.completed + 1).min(self.requested.get());
            format!("Generating question {} of {}", current, self.requested)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderState {
    /// Nothing selected or the last attempt failed.
    Idle,
    Generating(GenerationProgress),
    Finished(FinishedQuiz),
}

#[derive(Debug)]
pub struct QuizRenderer {
    state: RenderState,
    body: String,
    /// Bytes of a UTF-8 sequence split across chunks.
    pending: Vec<u8>,
    title: Option<String>,
    notice: Option<&'static str>,
}

impl Default for QuizRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizRenderer {
    pub fn new() -> Self {
        Self { state: RenderState::Idle, body: String::new(), pending: Vec::new(), title: None, notice: None }
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    /// Failure notice of the last attempt, if it failed.
    pub fn notice(&self) -> Option<&'static str> {
        self.notice
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, RenderState::Finished(_))
    }

    /// Start a new generation of `requested` questions.
    pub fn begin(&mut self, requested: QuestionCount) {
        self.body.clear();
        self.pending.clear();
        self.title = None;
        self.notice = None;
        self.state = RenderState::Generating(GenerationProgress { requested, partial: Vec::new(), completed: 0 });
    }

    /// Record the latest title. Only used if it arrives before completion.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    /// Progress percentage: 0 when idle, 100 when finished.
    pub fn progress(&self) -> f64 {
        match &self.state {
            RenderState::Idle => 0.0,
            RenderState::Generating(p) => p.percent(),
            RenderState::Finished(_) => 100.0,
        }
    }

    pub fn status(&self) -> Option<String> {
        match &self.state {
            RenderState::Generating(p) => Some(p.status()),
            _ => None,
        }
    }

    /// Feed a chunk of the response body.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> &RenderState {
        self.pending.extend_from_slice(chunk);
        let valid = match std::str::from_utf8(&self.pending) {
            Ok(s) => s.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(e) => {
                warn!(error = %e, "response body is not valid UTF-8");
                self.fail();
                return &self.state;
            }
        };
        let complete: Vec<u8> = self.pending.drain(..valid).collect();
        // `valid` bytes were just checked
        let text = String::from_utf8_lossy(&complete).into_owned();
        self.push_str(&text)
    }

    /// Feed a chunk of already decoded body text.
    pub fn push_str(&mut self, chunk: &str) -> &RenderState {
        let RenderState::Generating(progress) = &self.state else {
            debug!("ignoring chunk outside of a generation");
            return &self.state;
        };
        let requested = progress.requested;
        self.body.push_str(chunk);

        let array = parse_partial_array::<PartialQuestion>(&self.body);
        let mut elements = array.elements;
        elements.truncate(requested.get());

        let completed = elements
            .iter()
            .take_while(|e| e.closed && e.value.is_populated())
            .count();

        if completed == requested.get() {
            let questions: Vec<Question> = elements.iter().filter_map(|e| e.value.to_question()).collect();
            let title = self.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string());
            info!(%title, questions = questions.len(), "quiz complete");
            self.state = RenderState::Finished(FinishedQuiz { title, questions });
        } else {
            self.state = RenderState::Generating(GenerationProgress {
                requested,
                partial: elements.into_iter().map(|e| e.value).collect(),
                completed,
            });
        }
        &self.state
    }

    /// The response body ended. Anything short of a finished quiz is a failure.
    pub fn end_of_stream(&mut self) -> &RenderState {
        if matches!(self.state, RenderState::Generating(_)) {
            warn!("stream ended before the quiz was complete");
            self.fail();
        }
        &self.state
    }

    /// Discard all partial state and return to idle with a failure notice.
    pub fn fail(&mut self) {
        self.body.clear();
        self.pending.clear();
        self.state = RenderState::Idle;
        self.notice = Some(FAILURE_NOTICE);
    }

    /// Leave the finished view and start over.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
