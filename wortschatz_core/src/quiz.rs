//! Multiple-choice quiz: question generation and the quiz state machine

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::{WordCatalog, WordEntry};
use crate::config::Rules;
use crate::error::{CoreError, CoreResult};
use crate::fuzzy::{check_match, MatchResult};
use crate::progress::QuizSummary;
use crate::session::Session;

/// One question: the target word and its answer options
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizQuestion {
    pub word_id: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub correct_answer: String,
}

/// Build the option set for `word`.
///
/// Distractors are other words' translations from the whole catalog, drawn
/// without replacement. Translations equal to the correct one are skipped so
/// it appears exactly once. With fewer candidates than `distractor_count`,
/// all of them are used.
pub fn build_question<R: Rng + ?Sized>(
    word: &WordEntry,
    catalog: &WordCatalog,
    distractor_count: usize,
    rng: &mut R,
) -> QuizQuestion {
    let pool: Vec<&str> = catalog
        .other_translations(&word.id)
        .into_iter()
        .filter(|t| *t != word.native)
        .collect();

    let mut options: Vec<String> = pool
        .choose_multiple(rng, distractor_count)
        .map(|s| s.to_string())
        .collect();
    options.shuffle(rng);

    let correct_index = rng.gen_range(0..=options.len());
    options.insert(correct_index, word.native.clone());

    QuizQuestion {
        word_id: word.id.clone(),
        prompt: word.target.clone(),
        options,
        correct_index,
        correct_answer: word.native.clone(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizState {
    Asking(usize),
    Answered { index: usize, correct: bool },
    Complete { score: u32 },
}

/// Outcome of answering the current question
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// The question was already answered or the quiz is over
    Ignored,
    Recorded {
        correct: bool,
        correct_answer: String,
        /// How long the host shows the result before calling `advance`
        advance_after: Duration,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuizProgress {
    /// Nothing to advance: the current question is still open
    Waiting,
    Next(usize),
    Complete { score: u32, summary: QuizSummary },
}

pub struct QuizEngine {
    session: Session,
    catalog: Arc<WordCatalog>,
    question: QuizQuestion,
    state: QuizState,
    score: u32,
    asked: u32,
    rng: StdRng,
    rules: Rules,
}

impl QuizEngine {
    pub fn start(
        session: Session,
        catalog: Arc<WordCatalog>,
        rules: Rules,
        mut rng: StdRng,
    ) -> CoreResult<Self> {
        let first = session.current().map_err(|_| CoreError::EmptySession)?;
        let question = build_question(first, &catalog, rules.distractor_count, &mut rng);
        let engine = Self {
            session,
            catalog,
            question,
            state: QuizState::Asking(0),
            score: 0,
            asked: 0,
            rng,
            rules,
        };
        info!(questions = engine.question_count(), "quiz started");
        Ok(engine)
    }

    /// Questions this quiz will ask
    pub fn question_count(&self) -> usize {
        self.session.len().min(self.rules.quiz_question_cap)
    }

    pub fn state(&self) -> QuizState {
        self.state
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state, QuizState::Complete { .. })
    }

    pub fn advance_delay(&self) -> Duration {
        self.rules.answer_display_delay
    }

    pub fn question(&self) -> CoreResult<&QuizQuestion> {
        match self.state {
            QuizState::Complete { .. } => Err(CoreError::IndexOutOfRange {
                index: self.session.cursor() + 1,
                len: self.question_count(),
            }),
            _ => Ok(&self.question),
        }
    }

    pub fn current_word(&self) -> CoreResult<&Arc<WordEntry>> {
        self.question()?;
        self.session.current()
    }

    /// Pick an option. Only the first answer to a question counts.
    pub fn select_option(&mut self, choice: &str) -> Selection {
        let QuizState::Asking(_) = self.state else {
            return Selection::Ignored;
        };
        let correct = choice == self.question.correct_answer;
        self.record(correct)
    }

    /// Answer the current question by typing the translation.
    ///
    /// Returns `None` when the answer is ignored, as with `select_option`.
    pub fn answer_typed(&mut self, input: &str) -> Option<MatchResult> {
        let QuizState::Asking(_) = self.state else {
            return None;
        };
        let result = check_match(
            input,
            &self.question.correct_answer,
            self.rules.typed_answer_threshold,
        );
        self.record(result.is_correct);
        Some(result)
    }

    fn record(&mut self, correct: bool) -> Selection {
        let index = self.session.cursor();
        self.asked += 1;
        if correct {
            self.score += 1;
        }
        self.state = QuizState::Answered { index, correct };
        debug!(word = %self.question.word_id, correct, score = self.score, "quiz answer recorded");
        Selection::Recorded {
            correct,
            correct_answer: self.question.correct_answer.clone(),
            advance_after: self.rules.answer_display_delay,
        }
    }

    /// Timed transition after an answer: next question, or the end of the quiz
    pub fn advance(&mut self) -> QuizProgress {
        match self.state {
            QuizState::Asking(_) => QuizProgress::Waiting,
            QuizState::Complete { score } => QuizProgress::Complete {
                score,
                summary: self.summary(),
            },
            QuizState::Answered { index, .. } => {
                if index + 1 < self.question_count() && self.session.advance() {
                    let next = self.session.cursor();
                    if let Ok(word) = self.session.current() {
                        self.question = build_question(
                            word,
                            &self.catalog,
                            self.rules.distractor_count,
                            &mut self.rng,
                        );
                    }
                    self.state = QuizState::Asking(next);
                    QuizProgress::Next(next)
                } else {
                    self.state = QuizState::Complete { score: self.score };
                    info!(score = self.score, asked = self.asked, "quiz complete");
                    QuizProgress::Complete {
                        score: self.score,
                        summary: self.summary(),
                    }
                }
            }
        }
    }

    pub fn summary(&self) -> QuizSummary {
        QuizSummary::new(self.asked, self.score)
    }
}
