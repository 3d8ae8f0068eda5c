//! Fuzzy string matching for typed quiz answers

use serde::Serialize;
use strsim::{jaro_winkler, levenshtein, normalized_levenshtein};

/// Result of comparing a typed answer against a translation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub is_correct: bool,
    pub similarity_score: f64,
    pub feedback: String,
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

fn similarity(a: &str, b: &str) -> f64 {
    // Jaro-Winkler forgives typos near the end of a word better
    normalized_levenshtein(a, b) * 0.4 + jaro_winkler(a, b) * 0.6
}

/// Check a typed answer against `expected`.
///
/// A translation like `"yürümek, koşmak"` lists alternatives; matching any one
/// of them counts.
pub fn check_match(user_input: &str, expected: &str, threshold: f64) -> MatchResult {
    let input = normalize(user_input);

    let mut candidates: Vec<String> = expected
        .split(',')
        .map(normalize)
        .filter(|s| !s.is_empty())
        .collect();
    candidates.push(normalize(expected));

    if !input.is_empty() && candidates.iter().any(|c| *c == input) {
        return MatchResult {
            is_correct: true,
            similarity_score: 1.0,
            feedback: "Harika!".to_string(),
        };
    }

    let best = candidates
        .iter()
        .map(|c| (c, similarity(&input, c)))
        .max_by(|a, b| a.1.total_cmp(&b.1));

    let (is_correct, score, feedback) = match best {
        Some((_, score)) if input.is_empty() => (false, score, format!("Doğru cevap: {expected}")),
        Some((_, score)) if score >= threshold => (
            true,
            score,
            format!("Neredeyse! ({}% eşleşme)", (score * 100.0) as i32),
        ),
        Some((candidate, score)) if score >= 0.5 => {
            let distance = levenshtein(&input, candidate);
            (false, score, format!("{distance} harf farkı. Doğru cevap: {expected}"))
        }
        Some((_, score)) => (false, score, format!("Doğru cevap: {expected}")),
        None => (false, 0.0, format!("Doğru cevap: {expected}")),
    };

    MatchResult {
        is_correct,
        similarity_score: score,
        feedback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_ignores_case_and_whitespace() {
        let result = check_match("  ELMA ", "Elma", 0.8);
        assert!(result.is_correct);
        assert_eq!(result.similarity_score, 1.0);
    }

    #[test]
    fn any_listed_alternative_counts() {
        assert!(check_match("koşmak", "yürümek, koşmak", 0.8).is_correct);
        assert!(check_match("yürümek", "yürümek, koşmak", 0.8).is_correct);
    }

    #[test]
    fn small_typo_passes_threshold() {
        let result = check_match("surdurulebilir", "sürdürülebilir", 0.8);
        assert!(result.is_correct);
        assert!(result.similarity_score < 1.0);
    }

    #[test]
    fn unrelated_answer_fails() {
        let result = check_match("Karar", "Elma", 0.8);
        assert!(!result.is_correct);
        assert!(result.feedback.contains("Elma"));
    }

    #[test]
    fn empty_input_fails() {
        assert!(!check_match("   ", "Ev", 0.8).is_correct);
    }
}
