//! Wortschatz Core - session and progression logic for a vocabulary trainer
//!
//! Builds practice and quiz sessions from a word catalog, runs the flashcard
//! review and multiple-choice quiz state machines, and applies the results to
//! learner statistics. Explanations and example sentences come from an
//! injected [`Tutor`].

mod catalog;
mod config;
mod content;
mod error;
mod fuzzy;
mod import;
mod logging;
mod progress;
mod quiz;
mod review;
mod session;
mod trainer;
mod tutor;

#[cfg(feature = "python")]
mod python;

pub use catalog::{
    CategoryInfo, CefrLevel, ExampleSentence, Gender, WordCatalog, WordEntry, WordType,
};
pub use config::Rules;
pub use content::{Content, ContentQueue};
pub use error::{CoreError, CoreResult};
pub use fuzzy::{check_match, MatchResult};
pub use import::{load_catalog, load_csv, load_excel, load_file, read_csv, ImportError};
pub use logging::init_tracing;
pub use progress::{
    apply_quiz_score, apply_review_quality, apply_session_completion_bonus, quiz_xp,
    record_practice_day, with_level_mastery, LearnerStats, Quality, QuizSummary,
};
pub use quiz::{build_question, QuizEngine, QuizProgress, QuizQuestion, QuizState, Selection};
pub use review::{CardContent, ContentTicket, ReviewEngine, ReviewState, ReviewStep};
pub use session::{Session, SessionBuilder, SessionKind};
pub use trainer::{Trainer, TrainerEvent, View};
pub use tutor::{
    example_or_fallback, explain_or_fallback, failed_example, offline_example, parse_sentence,
    LlmTutor, Tutor, TutorConfig, TutorError, CONNECTION_ERROR, EMPTY_EXPLANATION,
    OFFLINE_EXPLANATION,
};

/// Wortschatz Core Python Module
#[cfg(feature = "python")]
#[pyo3::pymodule]
fn wortschatz_core(m: &pyo3::Bound<'_, pyo3::types::PyModule>) -> pyo3::PyResult<()> {
    use pyo3::prelude::*;

    init_tracing(&std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()));

    m.add_class::<python::PyTrainer>()?;
    m.add_function(wrap_pyfunction!(python::py_check_match, m)?)?;

    Ok(())
}
