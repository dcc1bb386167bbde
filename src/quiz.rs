//! Quiz data model: strict `Question` records, the partial shape seen while a
//! question is still streaming, and validation of an assembled quiz.

use crate::error::ValidationError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Letter naming one of the four options of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[schemars(description = "The correct answer, where A is the first option, B is the second, and so on.")]
pub enum AnswerLetter {
    A,
    B,
    C,
    D,
}

impl AnswerLetter {
    pub const ALL: [AnswerLetter; 4] = [AnswerLetter::A, AnswerLetter::B, AnswerLetter::C, AnswerLetter::D];

    /// Zero-based index of the option this letter refers to.
    pub fn index(self) -> usize {
        match self {
            AnswerLetter::A => 0,
            AnswerLetter::B => 1,
            AnswerLetter::C => 2,
            AnswerLetter::D => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Parse a letter case-insensitively, ignoring surrounding whitespace.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "A" | "a" => Some(AnswerLetter::A),
            "B" | "b" => Some(AnswerLetter::B),
            "C" | "c" => Some(AnswerLetter::C),
            "D" | "d" => Some(AnswerLetter::D),
            _ => None,
        }
    }
}

impl fmt::Display for AnswerLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            AnswerLetter::A => 'A',
            AnswerLetter::B => 'B',
            AnswerLetter::C => 'C',
            AnswerLetter::D => 'D',
        };
        write!(f, "{c}")
    }
}

/// A single multiple-choice question as emitted by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[schemars(title = "Question", description = "One multiple choice question about the document")]
pub struct Question {
    /// The question text
    pub question: String,
    /// Four possible answers to the question. Only one should be correct. They should all be of equal lengths.
    pub options: [String; 4],
    pub answer: AnswerLetter,
}

impl Question {
    /// Check the invariants serde cannot express: non-empty text and options.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();
        if self.question.trim().is_empty() {
            issues.push("question text is empty".to_string());
        }
        for (i, option) in self.options.iter().enumerate() {
            if option.trim().is_empty() {
                issues.push(format!("option {} is empty", AnswerLetter::ALL[i]));
            }
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(issues))
        }
    }

    pub fn correct_option(&self) -> &str {
        &self.options[self.answer.index()]
    }
}

/// A question whose JSON may still be arriving. Every field is optional and
/// strings may be truncated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialQuestion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

impl PartialQuestion {
    /// True when every field is present and non-empty, with four options and a
    /// valid answer letter.
    pub fn is_populated(&self) -> bool {
        self.to_question().is_some()
    }

    /// Promote to a strict `Question` if all fields are present and valid.
    pub fn to_question(&self) -> Option<Question> {
        let question = self.question.as_ref()?.clone();
        let options = self.options.as_ref()?;
        let options: [String; 4] = options.clone().try_into().ok()?;
        let answer = AnswerLetter::parse(self.answer.as_deref()?)?;
        let q = Question { question, options, answer };
        q.validate().ok()?;
        Some(q)
    }
}

/// Number of questions a quiz may be generated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct QuestionCount(u32);

impl QuestionCount {
    pub const ALLOWED: [u32; 6] = [3, 4, 5, 6, 8, 10];

    pub fn new(count: u32) -> Result<Self, ValidationError> {
        if Self::ALLOWED.contains(&count) {
            Ok(Self(count))
        } else {
            Err(ValidationError::single(format!(
                "questionsLength must be one of {:?}, got {count}",
                Self::ALLOWED
            )))
        }
    }

    pub fn get(self) -> usize {
        self.0 as usize
    }
}

impl Default for QuestionCount {
    fn default() -> Self {
        Self(4)
    }
}

impl TryFrom<u32> for QuestionCount {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<QuestionCount> for u32 {
    fn from(count: QuestionCount) -> Self {
        count.0
    }
}

impl fmt::Display for QuestionCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strictly validate an assembled JSON array of questions.
///
/// The array must hold exactly `count` elements and each must be a well-formed
/// `Question`. All problems are reported together.
pub fn validate_quiz(array_json: &str, count: QuestionCount) -> Result<Vec<Question>, ValidationError> {
    let elements: Vec<serde_json::Value> = serde_json::from_str(array_json)
        .map_err(|e| ValidationError::single(format!("quiz is not a JSON array: {e}")))?;

    let mut issues = Vec::new();
    if elements.len() != count.get() {
        issues.push(format!("expected {} questions, got {}", count, elements.len()));
    }

    let mut questions = Vec::with_capacity(elements.len());
    for (i, element) in elements.into_iter().enumerate() {
        match serde_json::from_value::<Question>(element) {
            Ok(q) => match q.validate() {
                Ok(()) => questions.push(q),
                Err(e) => issues.extend(e.issues.into_iter().map(|issue| format!("question {}: {issue}", i + 1))),
            },
            Err(e) => issues.push(format!("question {}: {e}", i + 1)),
        }
    }

    if issues.is_empty() {
        Ok(questions)
    } else {
        Err(ValidationError::new(issues))
    }
}
