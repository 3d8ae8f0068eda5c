//! Business rules for sessions, scoring and experience points

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Numeric rules shared by the session builder, engines and stats updates.
///
/// `Rules::default()` carries the values the app ships with. Hosts may
/// deserialize an override from JSON; missing fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    /// Words drawn for a quiz session
    pub quiz_session_size: usize,
    /// Maximum questions asked in one quiz
    pub quiz_question_cap: usize,
    /// Wrong options shown next to the correct translation
    pub distractor_count: usize,
    /// XP per review quality point
    pub review_xp_per_quality: u64,
    /// Flat XP granted when a review session completes
    pub session_bonus_xp: u64,
    /// XP per correct quiz answer
    pub quiz_xp_per_correct: u64,
    /// How long an answered question stays on screen before advancing
    #[serde(with = "millis")]
    pub answer_display_delay: Duration,
    /// Similarity needed for a typed answer to count as correct
    pub typed_answer_threshold: f64,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            quiz_session_size: 5,
            quiz_question_cap: 10,
            distractor_count: 3,
            review_xp_per_quality: 10,
            session_bonus_xp: 50,
            quiz_xp_per_correct: 20,
            answer_display_delay: Duration::from_millis(1500),
            typed_answer_threshold: 0.8,
        }
    }
}

impl Rules {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
