//! Taking a finished quiz: answering, navigation and scoring.

use crate::quiz::{AnswerLetter, Question};
use crate::renderer::FinishedQuiz;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionReview<'a> {
    pub question: &'a Question,
    pub chosen: Option<AnswerLetter>,
    pub correct: bool,
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    quiz: FinishedQuiz,
    answers: Vec<Option<AnswerLetter>>,
    current: usize,
    submitted: bool,
}

impl QuizSession {
    pub fn new(quiz: FinishedQuiz) -> Self {
        let answers = vec![None; quiz.questions.len()];
        Self { quiz, answers, current: 0, submitted: false }
    }

    pub fn title(&self) -> &str {
        &self.quiz.title
    }

    pub fn len(&self) -> usize {
        self.quiz.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quiz.questions.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<&Question> {
        self.quiz.questions.get(self.current)
    }

    pub fn answer_for(&self, index: usize) -> Option<AnswerLetter> {
        self.answers.get(index).copied().flatten()
    }

    /// Answer the current question. Ignored once submitted.
    pub fn select_answer(&mut self, letter: AnswerLetter) {
        if self.submitted {
            return;
        }
        if let Some(slot) = self.answers.get_mut(self.current) {
            *slot = Some(letter);
        }
    }

    /// Move to the next question; returns false on the last one.
    pub fn next(&mut self) -> bool {
        if self.current + 1 < self.len() {
            self.current += 1;
            true
        } else {
            false
        }
    }

    pub fn previous(&mut self) -> bool {
        if self.current > 0 {
            self.current -= 1;
            true
        } else {
            false
        }
    }

    pub fn all_answered(&self) -> bool {
        self.answers.iter().all(Option::is_some)
    }

    /// Lock in the answers. Only possible once every question is answered.
    pub fn submit(&mut self) -> bool {
        if self.all_answered() {
            self.submitted = true;
        }
        self.submitted
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Number of correct answers.
    pub fn score(&self) -> usize {
        self.quiz
            .questions
            .iter()
            .zip(&self.answers)
            .filter(|(q, a)| **a == Some(q.answer))
            .count()
    }

    pub fn percent(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.score() as f64 / self.len() as f64 * 100.0
    }

    pub fn review(&self) -> Vec<QuestionReview<'_>> {
        self.quiz
            .questions
            .iter()
            .zip(&self.answers)
            .map(|(question, chosen)| QuestionReview {
                question,
                chosen: *chosen,
                correct: *chosen == Some(question.answer),
            })
            .collect()
    }

    /// Clear answers and go back to the first question.
    pub fn reset(&mut self) {
        self.answers.iter_mut().for_each(|a| *a = None);
        self.current = 0;
        self.submitted = false;
    }

    pub fn into_quiz(self) -> FinishedQuiz {
        self.quiz
    }
}
