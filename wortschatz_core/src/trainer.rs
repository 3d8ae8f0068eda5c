//! Top-level trainer state: navigation, active session and learner stats
//!
//! The host owns rendering and the event loop. It calls the methods here in
//! response to user actions and shows whatever `view()` reports.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::info;

use crate::catalog::{CefrLevel, ExampleSentence, WordCatalog};
use crate::config::Rules;
use crate::error::{CoreError, CoreResult};
use crate::fuzzy::MatchResult;
use crate::progress::{
    apply_quiz_score, quiz_xp, record_practice_day, with_level_mastery, LearnerStats, Quality,
    QuizSummary,
};
use crate::quiz::{QuizEngine, QuizProgress, Selection};
use crate::review::{ContentTicket, ReviewEngine, ReviewStep};
use crate::session::SessionBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Onboarding,
    Dashboard,
    Practice,
    Quiz,
    Settings,
}

/// Emitted when a session ends; the trainer has already returned to the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrainerEvent {
    SessionComplete {
        xp_gained: u64,
    },
    QuizComplete {
        score: u32,
        xp_gained: u64,
        summary: QuizSummary,
    },
}

enum Activity {
    Idle,
    Review { engine: ReviewEngine, start_xp: u64 },
    Quiz(QuizEngine),
}

pub struct Trainer {
    catalog: Arc<WordCatalog>,
    rules: Rules,
    stats: LearnerStats,
    view: View,
    selected_level: CefrLevel,
    activity: Activity,
    learned: BTreeSet<String>,
    rng: StdRng,
    clock: fn() -> NaiveDate,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

impl Trainer {
    pub fn new(catalog: Arc<WordCatalog>, stats: LearnerStats, rules: Rules) -> Self {
        Self::with_rng(catalog, stats, rules, StdRng::from_entropy())
    }

    /// Deterministic quiz selection and option order
    pub fn with_seed(
        catalog: Arc<WordCatalog>,
        stats: LearnerStats,
        rules: Rules,
        seed: u64,
    ) -> Self {
        Self::with_rng(catalog, stats, rules, StdRng::seed_from_u64(seed))
    }

    fn with_rng(catalog: Arc<WordCatalog>, stats: LearnerStats, rules: Rules, rng: StdRng) -> Self {
        Self {
            catalog,
            rules,
            stats,
            view: View::Dashboard,
            selected_level: CefrLevel::A1,
            activity: Activity::Idle,
            learned: BTreeSet::new(),
            rng,
            clock: local_today,
        }
    }

    /// Replace the calendar used for streak tracking
    pub fn with_clock(mut self, clock: fn() -> NaiveDate) -> Self {
        self.clock = clock;
        self
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn stats(&self) -> &LearnerStats {
        &self.stats
    }

    pub fn catalog(&self) -> &Arc<WordCatalog> {
        &self.catalog
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn selected_level(&self) -> CefrLevel {
        self.selected_level
    }

    pub fn review(&self) -> Option<&ReviewEngine> {
        match &self.activity {
            Activity::Review { engine, .. } => Some(engine),
            _ => None,
        }
    }

    pub fn quiz(&self) -> Option<&QuizEngine> {
        match &self.activity {
            Activity::Quiz(engine) => Some(engine),
            _ => None,
        }
    }

    pub fn start_practice(&mut self, level: CefrLevel) -> CoreResult<()> {
        let session = SessionBuilder::new(&self.catalog, &self.rules).practice(level)?;
        let engine = ReviewEngine::start(session, self.rules.clone())?;
        self.activity = Activity::Review {
            engine,
            start_xp: self.stats.xp(),
        };
        self.selected_level = level;
        self.view = View::Practice;
        Ok(())
    }

    pub fn start_quiz(&mut self) -> CoreResult<()> {
        let session = SessionBuilder::new(&self.catalog, &self.rules).quiz(&mut self.rng)?;
        let rng = StdRng::seed_from_u64(self.rng.gen());
        let engine =
            QuizEngine::start(session, Arc::clone(&self.catalog), self.rules.clone(), rng)?;
        self.activity = Activity::Quiz(engine);
        self.view = View::Quiz;
        Ok(())
    }

    /// Move to another view. Practice and quiz start a fresh session; any
    /// other view abandons the running one.
    pub fn navigate(&mut self, view: View) -> CoreResult<()> {
        match view {
            View::Practice => self.start_practice(self.selected_level),
            View::Quiz => self.start_quiz(),
            other => {
                self.activity = Activity::Idle;
                self.view = other;
                Ok(())
            }
        }
    }

    pub fn submit_quality(&mut self, quality: Quality) -> CoreResult<Option<TrainerEvent>> {
        let Activity::Review { engine, start_xp } = &mut self.activity else {
            return Err(CoreError::NoActiveSession);
        };
        let word_id = engine.current_word()?.id.clone();
        let step = engine.submit_quality(quality, &self.stats)?;
        if quality > Quality::Hard {
            self.learned.insert(word_id);
        }

        match step {
            ReviewStep::Next { stats, .. } => {
                self.stats = stats;
                Ok(None)
            }
            ReviewStep::Complete { stats } => {
                let xp_gained = stats.xp().saturating_sub(*start_xp);
                let levels: BTreeSet<CefrLevel> =
                    engine.session().words().iter().map(|w| w.level).collect();
                self.stats = record_practice_day(&stats, (self.clock)());
                for level in levels {
                    self.refresh_mastery(level);
                }
                self.finish_session();
                info!(xp_gained, streak = self.stats.streak(), "practice session finished");
                Ok(Some(TrainerEvent::SessionComplete { xp_gained }))
            }
        }
    }

    pub fn select_quiz_option(&mut self, choice: &str) -> CoreResult<Selection> {
        Ok(self.quiz_engine_mut()?.select_option(choice))
    }

    pub fn answer_quiz_typed(&mut self, input: &str) -> CoreResult<Option<MatchResult>> {
        Ok(self.quiz_engine_mut()?.answer_typed(input))
    }

    /// Called by the host once the answer display delay has elapsed
    pub fn advance_quiz(&mut self) -> CoreResult<Option<TrainerEvent>> {
        match self.quiz_engine_mut()?.advance() {
            QuizProgress::Waiting | QuizProgress::Next(_) => Ok(None),
            QuizProgress::Complete { score, summary } => {
                self.stats = apply_quiz_score(&self.stats, score, &self.rules);
                self.stats = record_practice_day(&self.stats, (self.clock)());
                self.finish_session();
                let xp_gained = quiz_xp(score, &self.rules);
                info!(score, xp_gained, "quiz finished");
                Ok(Some(TrainerEvent::QuizComplete {
                    score,
                    xp_gained,
                    summary,
                }))
            }
        }
    }

    /// Ticket for a tutor request about the card on screen
    pub fn content_ticket(&self) -> CoreResult<ContentTicket> {
        self.review().ok_or(CoreError::NoActiveSession)?.content_ticket()
    }

    pub fn apply_explanation(&mut self, ticket: &ContentTicket, text: String) -> bool {
        match &mut self.activity {
            Activity::Review { engine, .. } => engine.apply_explanation(ticket, text),
            _ => false,
        }
    }

    pub fn apply_example(&mut self, ticket: &ContentTicket, example: ExampleSentence) -> bool {
        match &mut self.activity {
            Activity::Review { engine, .. } => engine.apply_example(ticket, example),
            _ => false,
        }
    }

    fn quiz_engine_mut(&mut self) -> CoreResult<&mut QuizEngine> {
        match &mut self.activity {
            Activity::Quiz(engine) => Ok(engine),
            _ => Err(CoreError::NoActiveSession),
        }
    }

    fn refresh_mastery(&mut self, level: CefrLevel) {
        let at_level = self.catalog.by_level(level);
        let learned = at_level.iter().filter(|w| self.learned.contains(&w.id)).count();
        self.stats = with_level_mastery(&self.stats, level, learned, at_level.len());
    }

    fn finish_session(&mut self) {
        self.activity = Activity::Idle;
        self.view = View::Dashboard;
    }
}
