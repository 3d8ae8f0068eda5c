//! Session building: picks the words a practice run or quiz works through

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::catalog::{CefrLevel, WordCatalog, WordEntry};
use crate::config::Rules;
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Practice(CefrLevel),
    Quiz,
}

/// Ordered word list with a cursor.
///
/// The cursor stays within `[0, len)`; `advance` refuses to move past the
/// last word and the engines switch to their terminal state instead.
#[derive(Debug, Clone)]
pub struct Session {
    kind: SessionKind,
    words: Vec<Arc<WordEntry>>,
    cursor: usize,
}

impl Session {
    pub fn new(kind: SessionKind, words: Vec<Arc<WordEntry>>) -> Self {
        Self {
            kind,
            words,
            cursor: 0,
        }
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn words(&self) -> &[Arc<WordEntry>] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> CoreResult<&Arc<WordEntry>> {
        self.words.get(self.cursor).ok_or(CoreError::IndexOutOfRange {
            index: self.cursor,
            len: self.words.len(),
        })
    }

    /// Move to the next word; false when already on the last one
    pub(crate) fn advance(&mut self) -> bool {
        if self.cursor + 1 < self.words.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }
}

/// Selects practice and quiz word lists from a catalog
pub struct SessionBuilder<'a> {
    catalog: &'a WordCatalog,
    quiz_size: usize,
}

impl<'a> SessionBuilder<'a> {
    pub fn new(catalog: &'a WordCatalog, rules: &Rules) -> Self {
        Self {
            catalog,
            quiz_size: rules.quiz_session_size,
        }
    }

    /// Words at `level` in catalog order, or the whole catalog when the level
    /// has none. Only an empty catalog yields `EmptySession`.
    pub fn practice(&self, level: CefrLevel) -> CoreResult<Session> {
        let mut words = self.catalog.by_level(level);
        if words.is_empty() {
            debug!(%level, "no words at level, falling back to full catalog");
            words = self.catalog.iter().cloned().collect();
        }
        if words.is_empty() {
            return Err(CoreError::EmptySession);
        }
        Ok(Session::new(SessionKind::Practice(level), words))
    }

    /// Up to `quiz_session_size` distinct words in uniformly random order
    pub fn quiz<R: Rng + ?Sized>(&self, rng: &mut R) -> CoreResult<Session> {
        if self.catalog.is_empty() {
            return Err(CoreError::EmptySession);
        }
        let mut words: Vec<Arc<WordEntry>> = self.catalog.iter().cloned().collect();
        words.shuffle(rng);
        words.truncate(self.quiz_size.min(words.len()));
        Ok(Session::new(SessionKind::Quiz, words))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::catalog::fixtures::*;

    #[test]
    fn practice_filters_by_level() {
        let catalog = WordCatalog::builtin().unwrap();
        let session = SessionBuilder::new(&catalog, &Rules::default())
            .practice(CefrLevel::B1)
            .unwrap();
        assert_eq!(session.len(), 1);
        assert_eq!(session.current().unwrap().target, "Entscheidung");
        assert_eq!(session.kind(), SessionKind::Practice(CefrLevel::B1));
    }

    #[test]
    fn practice_falls_back_to_full_catalog() {
        let catalog = WordCatalog::builtin().unwrap();
        let session = SessionBuilder::new(&catalog, &Rules::default())
            .practice(CefrLevel::C1)
            .unwrap();
        assert_eq!(session.len(), catalog.len());
    }

    #[test]
    fn empty_catalog_gives_empty_session_error() {
        let catalog = WordCatalog::default();
        let builder = SessionBuilder::new(&catalog, &Rules::default());
        assert!(matches!(builder.practice(CefrLevel::A1), Err(CoreError::EmptySession)));
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(builder.quiz(&mut rng), Err(CoreError::EmptySession)));
    }

    #[test]
    fn cursor_stops_at_last_word() {
        let catalog = a1_catalog();
        let mut session = SessionBuilder::new(&catalog, &Rules::default())
            .practice(CefrLevel::A1)
            .unwrap();
        assert!(session.advance());
        assert!(session.advance());
        assert!(!session.advance());
        assert_eq!(session.cursor(), 2);
        assert_eq!(session.current().unwrap().target, "laufen");
    }

    #[test]
    fn quiz_shuffle_reaches_every_permutation_evenly() {
        let catalog = a1_catalog();
        let builder = SessionBuilder::new(&catalog, &Rules::default());
        let mut rng = StdRng::seed_from_u64(7);
        let trials = 6000;
        let mut counts: HashMap<Vec<String>, usize> = HashMap::new();

        for _ in 0..trials {
            let session = builder.quiz(&mut rng).unwrap();
            let order = session.words().iter().map(|w| w.id.clone()).collect();
            *counts.entry(order).or_default() += 1;
        }

        // 3! orderings, each expected 1000 times
        assert_eq!(counts.len(), 6);
        for (order, count) in &counts {
            assert!(
                (850..=1150).contains(count),
                "ordering {order:?} seen {count} times"
            );
        }
    }

    proptest! {
        #[test]
        fn practice_is_never_empty(size in 1usize..20, level_idx in 0usize..6) {
            let catalog = numbered_catalog(size);
            let session = SessionBuilder::new(&catalog, &Rules::default())
                .practice(CefrLevel::ALL[level_idx])
                .unwrap();
            prop_assert!(!session.is_empty());
        }

        #[test]
        fn quiz_has_up_to_five_distinct_words(size in 1usize..20, seed in any::<u64>()) {
            let catalog = numbered_catalog(size);
            let mut rng = StdRng::seed_from_u64(seed);
            let session = SessionBuilder::new(&catalog, &Rules::default()).quiz(&mut rng).unwrap();
            prop_assert_eq!(session.len(), size.min(5));
            let ids: HashSet<_> = session.words().iter().map(|w| w.id.as_str()).collect();
            prop_assert_eq!(ids.len(), session.len());
        }
    }
}
