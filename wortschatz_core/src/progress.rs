//! Progress tracking - learner statistics and their update rules
//!
//! Every update takes the current stats by reference and returns a new value;
//! nothing here mutates shared state.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::catalog::CefrLevel;
use crate::config::Rules;
use crate::error::CoreError;

/// Self-reported recall difficulty for a flashcard
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Quality {
    Hard = 0,
    Good = 1,
    Easy = 2,
}

impl Quality {
    pub fn points(self) -> u64 {
        self as u64
    }
}

impl TryFrom<u8> for Quality {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Quality::Hard),
            1 => Ok(Quality::Good),
            2 => Ok(Quality::Easy),
            other => Err(CoreError::InvalidQuality(other)),
        }
    }
}

/// Cumulative learner statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerStats {
    streak: u32,
    words_learned: u32,
    xp: u64,
    level_progress: BTreeMap<CefrLevel, u8>,
    last_practice: Option<NaiveDate>,
}

impl Default for LearnerStats {
    fn default() -> Self {
        Self {
            streak: 0,
            words_learned: 0,
            xp: 0,
            level_progress: CefrLevel::ALL.into_iter().map(|l| (l, 0)).collect(),
            last_practice: None,
        }
    }
}

impl LearnerStats {
    /// Dashboard starter values shown to a new learner
    pub fn demo() -> Self {
        let mut stats = Self {
            streak: 3,
            words_learned: 142,
            xp: 2450,
            ..Self::default()
        };
        stats.level_progress.insert(CefrLevel::A1, 85);
        stats.level_progress.insert(CefrLevel::A2, 42);
        stats.level_progress.insert(CefrLevel::B1, 15);
        stats
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn words_learned(&self) -> u32 {
        self.words_learned
    }

    pub fn xp(&self) -> u64 {
        self.xp
    }

    pub fn last_practice(&self) -> Option<NaiveDate> {
        self.last_practice
    }

    pub fn mastery(&self, level: CefrLevel) -> u8 {
        self.level_progress.get(&level).copied().unwrap_or(0)
    }

    pub fn level_progress(&self) -> &BTreeMap<CefrLevel, u8> {
        &self.level_progress
    }
}

/// Credit one flashcard answer. Hard answers change nothing.
pub fn apply_review_quality(stats: &LearnerStats, quality: Quality, rules: &Rules) -> LearnerStats {
    let mut next = stats.clone();
    if quality > Quality::Hard {
        next.words_learned = next.words_learned.saturating_add(1);
        next.xp = next.xp.saturating_add(quality.points() * rules.review_xp_per_quality);
    }
    next
}

pub fn apply_session_completion_bonus(stats: &LearnerStats, rules: &Rules) -> LearnerStats {
    let mut next = stats.clone();
    next.xp = next.xp.saturating_add(rules.session_bonus_xp);
    next
}

pub fn apply_quiz_score(stats: &LearnerStats, score: u32, rules: &Rules) -> LearnerStats {
    let mut next = stats.clone();
    next.xp = next.xp.saturating_add(quiz_xp(score, rules));
    next
}

pub fn quiz_xp(score: u32, rules: &Rules) -> u64 {
    u64::from(score) * rules.quiz_xp_per_correct
}

/// Count a completed session towards the daily streak.
///
/// Same day: unchanged. Day after the last practice: +1. Any longer gap:
/// back to 1. Without a recorded practice day the existing streak is
/// carried on, so seeded stats keep their count. A date before the last
/// practice is ignored.
pub fn record_practice_day(stats: &LearnerStats, today: NaiveDate) -> LearnerStats {
    let mut next = stats.clone();
    match stats.last_practice {
        Some(last) if today <= last => return next,
        Some(last) if last.succ_opt() != Some(today) => next.streak = 1,
        _ => next.streak = next.streak.saturating_add(1),
    }
    next.last_practice = Some(today);
    next
}

/// Set a level's mastery from learned/total word counts, clamped to 0..=100
pub fn with_level_mastery(
    stats: &LearnerStats,
    level: CefrLevel,
    learned: usize,
    total: usize,
) -> LearnerStats {
    let mut next = stats.clone();
    next.level_progress.insert(level, mastery_percent(learned, total));
    next
}

fn mastery_percent(learned: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = (learned as f64 / total as f64 * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}

/// Right/wrong tally for a finished quiz
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizSummary {
    pub total: u32,
    pub correct: u32,
    pub incorrect: u32,
    pub accuracy_percent: f64,
}

impl QuizSummary {
    pub fn new(total: u32, correct: u32) -> Self {
        let accuracy = if total > 0 {
            (f64::from(correct) / f64::from(total)) * 100.0
        } else {
            0.0
        };
        Self {
            total,
            correct,
            incorrect: total.saturating_sub(correct),
            accuracy_percent: accuracy,
        }
    }
}
