//! Flashcard review: one word at a time, a quality judgment per card

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::catalog::{ExampleSentence, WordEntry};
use crate::config::Rules;
use crate::error::{CoreError, CoreResult};
use crate::progress::{apply_review_quality, apply_session_completion_bonus, LearnerStats, Quality};
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    AwaitingResponse(usize),
    Complete,
}

/// Result of submitting a quality judgment
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewStep {
    Next { stats: LearnerStats, index: usize },
    Complete { stats: LearnerStats },
}

impl ReviewStep {
    pub fn stats(&self) -> &LearnerStats {
        match self {
            ReviewStep::Next { stats, .. } | ReviewStep::Complete { stats } => stats,
        }
    }
}

/// Supplementary content for the card on screen
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardContent {
    pub examples: Vec<ExampleSentence>,
    pub explanation: Option<String>,
}

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies the card an external content request was issued for
#[derive(Debug, Clone)]
pub struct ContentTicket {
    session_id: u64,
    position: usize,
    word: Arc<WordEntry>,
}

impl ContentTicket {
    pub fn word(&self) -> &WordEntry {
        &self.word
    }
}

pub struct ReviewEngine {
    id: u64,
    session: Session,
    state: ReviewState,
    content: CardContent,
    rules: Rules,
}

impl ReviewEngine {
    pub fn start(session: Session, rules: Rules) -> CoreResult<Self> {
        let first = session.current().map_err(|_| CoreError::EmptySession)?;
        let content = CardContent {
            examples: first.examples.clone(),
            explanation: None,
        };
        info!(words = session.len(), kind = ?session.kind(), "review session started");
        Ok(Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            session,
            state: ReviewState::AwaitingResponse(0),
            content,
            rules,
        })
    }

    pub fn state(&self) -> ReviewState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == ReviewState::Complete
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn current_word(&self) -> CoreResult<&Arc<WordEntry>> {
        match self.state {
            ReviewState::AwaitingResponse(_) => self.session.current(),
            ReviewState::Complete => Err(CoreError::IndexOutOfRange {
                index: self.session.len(),
                len: self.session.len(),
            }),
        }
    }

    /// Record the learner's judgment for the current card and move on.
    ///
    /// The last card completes the session and adds the completion bonus.
    pub fn submit_quality(
        &mut self,
        quality: Quality,
        stats: &LearnerStats,
    ) -> CoreResult<ReviewStep> {
        let word_id = self.current_word()?.id.clone();
        let mut stats = apply_review_quality(stats, quality, &self.rules);
        debug!(word = %word_id, ?quality, "card reviewed");

        if self.session.advance() {
            let index = self.session.cursor();
            self.state = ReviewState::AwaitingResponse(index);
            self.reset_content()?;
            return Ok(ReviewStep::Next { stats, index });
        }

        stats = apply_session_completion_bonus(&stats, &self.rules);
        self.state = ReviewState::Complete;
        self.content = CardContent::default();
        info!(words = self.session.len(), xp = stats.xp(), "review session complete");
        Ok(ReviewStep::Complete { stats })
    }

    pub fn content(&self) -> &CardContent {
        &self.content
    }

    /// Ticket for an explanation or example request about the current card
    pub fn content_ticket(&self) -> CoreResult<ContentTicket> {
        Ok(ContentTicket {
            session_id: self.id,
            position: self.session.cursor(),
            word: Arc::clone(self.current_word()?),
        })
    }

    /// Apply a late explanation; false if the card has changed since
    pub fn apply_explanation(&mut self, ticket: &ContentTicket, text: String) -> bool {
        if !self.is_current(ticket) {
            debug!(word = %ticket.word.id, "discarding stale explanation");
            return false;
        }
        self.content.explanation = Some(text);
        true
    }

    /// Append a generated example; false if the card has changed since
    pub fn apply_example(&mut self, ticket: &ContentTicket, example: ExampleSentence) -> bool {
        if !self.is_current(ticket) {
            debug!(word = %ticket.word.id, "discarding stale example");
            return false;
        }
        self.content.examples.push(example);
        true
    }

    fn is_current(&self, ticket: &ContentTicket) -> bool {
        ticket.session_id == self.id
            && self.state == ReviewState::AwaitingResponse(ticket.position)
            && self
                .session
                .current()
                .is_ok_and(|w| Arc::ptr_eq(w, &ticket.word))
    }

    fn reset_content(&mut self) -> CoreResult<()> {
        self.content = CardContent {
            examples: self.session.current()?.examples.clone(),
            explanation: None,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::*;
    use crate::catalog::{CefrLevel, WordCatalog};
    use crate::session::{SessionBuilder, SessionKind};

    fn practice(catalog: &WordCatalog) -> ReviewEngine {
        let session = SessionBuilder::new(catalog, &Rules::default())
            .practice(CefrLevel::A1)
            .unwrap();
        ReviewEngine::start(session, Rules::default()).unwrap()
    }

    #[test]
    fn empty_session_does_not_start() {
        let session = Session::new(SessionKind::Practice(CefrLevel::A1), Vec::new());
        assert!(matches!(
            ReviewEngine::start(session, Rules::default()),
            Err(CoreError::EmptySession)
        ));
    }

    #[test]
    fn hard_on_single_word_completes_with_bonus_only() {
        let catalog = WordCatalog::new(vec![entry("1", "Haus", "Ev", CefrLevel::A1)]).unwrap();
        let mut engine = practice(&catalog);
        let step = engine.submit_quality(Quality::Hard, &LearnerStats::default()).unwrap();

        assert!(matches!(step, ReviewStep::Complete { .. }));
        assert_eq!(step.stats().words_learned(), 0);
        assert_eq!(step.stats().xp(), 50);
        assert!(engine.is_complete());
    }

    #[test]
    fn easy_on_every_card_gives_twenty_per_word_plus_bonus() {
        let catalog = numbered_catalog(12);
        let session = Session::new(
            SessionKind::Practice(CefrLevel::A1),
            catalog.iter().cloned().collect(),
        );
        let mut engine = ReviewEngine::start(session, Rules::default()).unwrap();
        let mut stats = LearnerStats::default();

        while !engine.is_complete() {
            stats = engine.submit_quality(Quality::Easy, &stats).unwrap().stats().clone();
        }

        assert_eq!(stats.xp(), 20 * 12 + 50);
        assert_eq!(stats.words_learned(), 12);
    }

    #[test]
    fn querying_after_completion_is_out_of_range() {
        let catalog = a1_catalog();
        let mut engine = practice(&catalog);
        let mut stats = LearnerStats::default();
        for expected in [1, 2] {
            let step = engine.submit_quality(Quality::Good, &stats).unwrap();
            assert!(matches!(step, ReviewStep::Next { index, .. } if index == expected));
            assert_eq!(engine.state(), ReviewState::AwaitingResponse(expected));
            stats = step.stats().clone();
        }
        engine.submit_quality(Quality::Good, &stats).unwrap();

        assert!(matches!(engine.current_word(), Err(CoreError::IndexOutOfRange { .. })));
        assert!(matches!(
            engine.submit_quality(Quality::Good, &stats),
            Err(CoreError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn content_starts_from_catalog_examples() {
        let catalog = a1_catalog();
        let engine = practice(&catalog);
        assert_eq!(engine.content().examples, catalog.get("1").unwrap().examples);
        assert!(engine.content().explanation.is_none());
    }

    #[test]
    fn late_results_apply_only_to_the_displayed_card() {
        let catalog = a1_catalog();
        let mut engine = practice(&catalog);
        let stale = engine.content_ticket().unwrap();
        let example = ExampleSentence::new("Das Haus ist alt.", "Ev eski.");

        assert!(engine.apply_example(&stale, example.clone()));
        assert_eq!(engine.content().examples.len(), 2);

        engine.submit_quality(Quality::Good, &LearnerStats::default()).unwrap();
        assert!(!engine.apply_example(&stale, example));
        assert!(!engine.apply_explanation(&stale, "zu spät".to_string()));
        assert_eq!(engine.content().examples.len(), 1);
        assert!(engine.content().explanation.is_none());

        let fresh = engine.content_ticket().unwrap();
        assert_eq!(fresh.word().target, "Apfel");
        assert!(engine.apply_explanation(&fresh, "Meyve.".to_string()));
        assert_eq!(engine.content().explanation.as_deref(), Some("Meyve."));
    }

    #[test]
    fn tickets_do_not_carry_over_to_a_restarted_session() {
        let catalog = a1_catalog();
        let first = practice(&catalog);
        let ticket = first.content_ticket().unwrap();
        drop(first);

        let mut second = practice(&catalog);
        assert!(Arc::ptr_eq(&second.content_ticket().unwrap().word, &ticket.word));
        assert!(!second.apply_explanation(&ticket, "eski oturum".to_string()));
        assert!(second.content().explanation.is_none());
    }

    #[test]
    fn generated_examples_do_not_touch_the_catalog() {
        let catalog = a1_catalog();
        let mut engine = practice(&catalog);
        let ticket = engine.content_ticket().unwrap();
        engine.apply_example(&ticket, ExampleSentence::new("a", "b"));
        assert_eq!(catalog.get("1").unwrap().examples.len(), 1);
    }
}
