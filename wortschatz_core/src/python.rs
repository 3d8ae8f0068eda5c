//! Python bindings over the trainer

use std::sync::Arc;

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::catalog::{CefrLevel, WordCatalog};
use crate::config::Rules;
use crate::content::{Content, ContentQueue};
use crate::fuzzy::check_match;
use crate::import::load_catalog;
use crate::progress::{LearnerStats, Quality};
use crate::quiz::Selection;
use crate::trainer::{Trainer, TrainerEvent, View};
use crate::tutor::LlmTutor;

fn runtime_err(e: impl ToString) -> PyErr {
    PyRuntimeError::new_err(e.to_string())
}

fn parse_view(view: &str) -> PyResult<View> {
    match view.to_lowercase().as_str() {
        "onboarding" => Ok(View::Onboarding),
        "dashboard" => Ok(View::Dashboard),
        "practice" => Ok(View::Practice),
        "quiz" => Ok(View::Quiz),
        "settings" => Ok(View::Settings),
        other => Err(PyValueError::new_err(format!("unknown view: {other}"))),
    }
}

fn event_json(event: Option<TrainerEvent>) -> PyResult<Option<String>> {
    event
        .map(|e| serde_json::to_string(&e).map_err(runtime_err))
        .transpose()
}

/// Vocabulary trainer session state
#[pyclass(name = "Trainer", unsendable)]
pub struct PyTrainer {
    inner: Trainer,
    content: ContentQueue<LlmTutor>,
    // tutor requests run on this runtime's worker while Python keeps control
    _runtime: tokio::runtime::Runtime,
}

#[pymethods]
impl PyTrainer {
    #[new]
    #[pyo3(signature = (catalog_path=None, seed=None, demo_stats=false, rules_json=None))]
    fn new(
        catalog_path: Option<&str>,
        seed: Option<u64>,
        demo_stats: bool,
        rules_json: Option<&str>,
    ) -> PyResult<Self> {
        let catalog = match catalog_path {
            Some(path) => load_catalog(path).map_err(runtime_err)?,
            None => WordCatalog::builtin().map_err(runtime_err)?,
        };
        let rules = match rules_json {
            Some(json) => Rules::from_json(json).map_err(|e| PyValueError::new_err(e.to_string()))?,
            None => Rules::default(),
        };
        let stats = if demo_stats {
            LearnerStats::demo()
        } else {
            LearnerStats::default()
        };
        let catalog = Arc::new(catalog);
        let inner = match seed {
            Some(seed) => Trainer::with_seed(catalog, stats, rules, seed),
            None => Trainer::new(catalog, stats, rules),
        };
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .map_err(runtime_err)?;
        Ok(Self {
            inner,
            content: ContentQueue::new(LlmTutor::from_env(), runtime.handle().clone()),
            _runtime: runtime,
        })
    }

    #[pyo3(signature = (level="A1"))]
    fn start_practice(&mut self, level: &str) -> PyResult<()> {
        let level: CefrLevel = level
            .parse()
            .map_err(|e: crate::CoreError| PyValueError::new_err(e.to_string()))?;
        self.inner.start_practice(level).map_err(runtime_err)
    }

    fn start_quiz(&mut self) -> PyResult<()> {
        self.inner.start_quiz().map_err(runtime_err)
    }

    fn navigate(&mut self, view: &str) -> PyResult<()> {
        let view = parse_view(view)?;
        self.inner.navigate(view).map_err(runtime_err)
    }

    fn view(&self) -> &'static str {
        match self.inner.view() {
            View::Onboarding => "onboarding",
            View::Dashboard => "dashboard",
            View::Practice => "practice",
            View::Quiz => "quiz",
            View::Settings => "settings",
        }
    }

    /// Current card or quiz word as JSON
    fn current_word(&self) -> PyResult<String> {
        let word = if let Some(review) = self.inner.review() {
            review.current_word().map_err(runtime_err)?
        } else if let Some(quiz) = self.inner.quiz() {
            quiz.current_word().map_err(runtime_err)?
        } else {
            return Err(runtime_err(crate::CoreError::NoActiveSession));
        };
        serde_json::to_string(&**word).map_err(runtime_err)
    }

    /// Examples shown on the current card, including generated ones
    fn card_examples(&self) -> PyResult<Vec<(String, String)>> {
        let review = self
            .inner
            .review()
            .ok_or_else(|| runtime_err(crate::CoreError::NoActiveSession))?;
        Ok(review
            .content()
            .examples
            .iter()
            .map(|e| (e.target.clone(), e.native.clone()))
            .collect())
    }

    fn quiz_options(&self) -> PyResult<Vec<String>> {
        let quiz = self.inner.quiz().ok_or_else(|| runtime_err(crate::CoreError::NoActiveSession))?;
        Ok(quiz.question().map_err(runtime_err)?.options.clone())
    }

    /// Returns the completion event as JSON when the session ends
    fn submit_quality(&mut self, quality: u8) -> PyResult<Option<String>> {
        let quality = Quality::try_from(quality).map_err(|e| PyValueError::new_err(e.to_string()))?;
        event_json(self.inner.submit_quality(quality).map_err(runtime_err)?)
    }

    /// True/False for a recorded answer, None when ignored
    fn select_option(&mut self, choice: &str) -> PyResult<Option<bool>> {
        match self.inner.select_quiz_option(choice).map_err(runtime_err)? {
            Selection::Recorded { correct, .. } => Ok(Some(correct)),
            Selection::Ignored => Ok(None),
        }
    }

    fn answer_typed(&mut self, answer: &str) -> PyResult<Option<(bool, f64, String)>> {
        let result = self.inner.answer_quiz_typed(answer).map_err(runtime_err)?;
        Ok(result.map(|r| (r.is_correct, r.similarity_score, r.feedback)))
    }

    fn advance_quiz(&mut self) -> PyResult<Option<String>> {
        event_json(self.inner.advance_quiz().map_err(runtime_err)?)
    }

    fn answer_delay_ms(&self) -> u64 {
        self.inner.rules().answer_display_delay.as_millis() as u64
    }

    fn stats(&self) -> PyResult<String> {
        serde_json::to_string(self.inner.stats()).map_err(runtime_err)
    }

    fn xp(&self) -> u64 {
        self.inner.stats().xp()
    }

    fn categories(&self) -> Vec<(String, usize)> {
        self.inner
            .catalog()
            .categories()
            .into_iter()
            .map(|c| (c.name, c.word_count))
            .collect()
    }

    fn card_explanation(&self) -> Option<String> {
        self.inner.review()?.content().explanation.clone()
    }

    fn tutor_available(&self) -> bool {
        self.content.tutor().is_available()
    }

    /// Ask the tutor to explain the current card; returns immediately
    fn request_explanation(&mut self) -> PyResult<()> {
        let ticket = self.inner.content_ticket().map_err(runtime_err)?;
        self.content.request_explanation(ticket);
        Ok(())
    }

    /// Ask for another example sentence for the current card; returns immediately
    fn request_example(&mut self) -> PyResult<()> {
        let ticket = self.inner.content_ticket().map_err(runtime_err)?;
        self.content.request_example(ticket);
        Ok(())
    }

    fn pending_content(&self) -> usize {
        self.content.in_flight()
    }

    /// Apply tutor results that have arrived. Returns `("explanation", text, None)`
    /// or `("example", target, native)` for each one shown on the current card.
    fn poll_content(&mut self) -> Vec<(&'static str, String, Option<String>)> {
        self.content
            .apply_finished(&mut self.inner)
            .into_iter()
            .map(|content| match content {
                Content::Explanation(text) => ("explanation", text, None),
                Content::Example(e) => ("example", e.target, Some(e.native)),
            })
            .collect()
    }

    fn __repr__(&self) -> String {
        format!(
            "Trainer(view={:?}, xp={}, words_learned={})",
            self.inner.view(),
            self.inner.stats().xp(),
            self.inner.stats().words_learned()
        )
    }
}

#[pyfunction]
#[pyo3(name = "check_match", signature = (user_input, expected, threshold=None))]
pub fn py_check_match(
    user_input: &str,
    expected: &str,
    threshold: Option<f64>,
) -> (bool, f64, String) {
    let result = check_match(user_input, expected, threshold.unwrap_or(0.8));
    (result.is_correct, result.similarity_score, result.feedback)
}
