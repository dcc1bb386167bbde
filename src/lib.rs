pub mod client;
pub mod clients;
pub mod composer;
pub mod config;
pub mod core;
pub mod error;
pub mod json_utils;
pub mod protocol;
pub mod quiz;
pub mod renderer;
pub mod server;
pub mod session;
pub mod streaming;

// Convenient re-exports
pub use crate::core::{QuizGenerator, GeneratorConfig, LowLevelClient};
pub use quiz::{AnswerLetter, Question, QuestionCount};
pub use renderer::{FinishedQuiz, QuizRenderer, RenderState};
