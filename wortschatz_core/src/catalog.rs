//! In-memory word catalog: entries, levels and lookups

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

const BUILTIN_CATALOG: &str = include_str!("../data/catalog.json");

/// CEFR proficiency level, ordered from beginner to near-native
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl CefrLevel {
    pub const ALL: [CefrLevel; 6] = [
        CefrLevel::A1,
        CefrLevel::A2,
        CefrLevel::B1,
        CefrLevel::B2,
        CefrLevel::C1,
        CefrLevel::C2,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CefrLevel::A1 => "A1",
            CefrLevel::A2 => "A2",
            CefrLevel::B1 => "B1",
            CefrLevel::B2 => "B2",
            CefrLevel::C1 => "C1",
            CefrLevel::C2 => "C2",
        }
    }
}

impl fmt::Display for CefrLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CefrLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        CefrLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| CoreError::UnknownLevel(trimmed.to_string()))
    }
}

/// Grammatical gender, shown as the German article
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Der,
    Die,
    Das,
}

impl Gender {
    pub fn article(self) -> &'static str {
        match self {
            Gender::Der => "der",
            Gender::Die => "die",
            Gender::Das => "das",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "der" | "m" | "masculine" => Some(Gender::Der),
            "die" | "f" | "feminine" => Some(Gender::Die),
            "das" | "n" | "neuter" => Some(Gender::Das),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordType {
    Noun,
    Verb,
    Adjective,
    Adverb,
    Phrase,
}

impl WordType {
    pub fn as_str(self) -> &'static str {
        match self {
            WordType::Noun => "noun",
            WordType::Verb => "verb",
            WordType::Adjective => "adjective",
            WordType::Adverb => "adverb",
            WordType::Phrase => "phrase",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "noun" | "substantiv" | "isim" => Some(WordType::Noun),
            "verb" | "fiil" => Some(WordType::Verb),
            "adjective" | "adjektiv" | "sıfat" => Some(WordType::Adjective),
            "adverb" | "zarf" => Some(WordType::Adverb),
            "phrase" | "ausdruck" | "deyim" => Some(WordType::Phrase),
            _ => None,
        }
    }
}

/// Example sentence in the target language with its native translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleSentence {
    #[serde(alias = "german")]
    pub target: String,
    #[serde(alias = "turkish")]
    pub native: String,
}

impl ExampleSentence {
    pub fn new(target: impl Into<String>, native: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            native: native.into(),
        }
    }
}

/// Catalog record for one vocabulary item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordEntry {
    pub id: String,
    /// Learner's language (Turkish)
    #[serde(alias = "turkish")]
    pub native: String,
    /// Language being learned (German)
    #[serde(alias = "german")]
    pub target: String,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub plural: Option<String>,
    pub level: CefrLevel,
    pub category: String,
    pub word_type: WordType,
    #[serde(default)]
    pub examples: Vec<ExampleSentence>,
    #[serde(default)]
    pub pronunciation: Option<String>,
    /// 0 (trivial) to 100 (hardest)
    pub difficulty: u8,
    #[serde(default = "Utc::now")]
    pub next_review_at: DateTime<Utc>,
}

/// Category name with its word count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryInfo {
    pub name: String,
    pub word_count: usize,
}

/// Read-only table of word entries keyed by id.
///
/// Entries are shared (`Arc`) so sessions can hold them without borrowing the
/// catalog.
#[derive(Debug, Clone, Default)]
pub struct WordCatalog {
    words: Vec<Arc<WordEntry>>,
    index: HashMap<String, usize>,
}

impl WordCatalog {
    /// Build a catalog, rejecting duplicate ids and out-of-range difficulty
    pub fn new(entries: Vec<WordEntry>) -> CoreResult<Self> {
        let mut index = HashMap::with_capacity(entries.len());
        let mut words = Vec::with_capacity(entries.len());

        for (position, entry) in entries.into_iter().enumerate() {
            if entry.id.trim().is_empty() {
                return Err(CoreError::InvalidEntry {
                    id: format!("#{}", position + 1),
                    reason: "empty id".to_string(),
                });
            }
            if entry.difficulty > 100 {
                return Err(CoreError::InvalidEntry {
                    id: entry.id,
                    reason: format!("difficulty {} exceeds 100", entry.difficulty),
                });
            }
            if index.insert(entry.id.clone(), position).is_some() {
                return Err(CoreError::DuplicateId(entry.id));
            }
            words.push(Arc::new(entry));
        }

        Ok(Self { words, index })
    }

    pub fn from_json(text: &str) -> CoreResult<Self> {
        let entries: Vec<WordEntry> = serde_json::from_str(text)?;
        Self::new(entries)
    }

    /// The starter German-Turkish catalog bundled with the crate
    pub fn builtin() -> CoreResult<Self> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn get(&self, id: &str) -> CoreResult<&Arc<WordEntry>> {
        self.index
            .get(id)
            .map(|&i| &self.words[i])
            .ok_or_else(|| CoreError::NotFound(id.to_string()))
    }

    pub fn filter<P>(&self, predicate: P) -> Vec<Arc<WordEntry>>
    where
        P: Fn(&WordEntry) -> bool,
    {
        self.words
            .iter()
            .filter(|w| predicate(w))
            .cloned()
            .collect()
    }

    pub fn by_level(&self, level: CefrLevel) -> Vec<Arc<WordEntry>> {
        self.filter(|w| w.level == level)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<WordEntry>> {
        self.words.iter()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// All categories with word counts, sorted by name
    pub fn categories(&self) -> Vec<CategoryInfo> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for word in &self.words {
            *counts.entry(word.category.as_str()).or_default() += 1;
        }
        counts
            .into_iter()
            .map(|(name, word_count)| CategoryInfo {
                name: name.to_string(),
                word_count,
            })
            .collect()
    }

    /// Distinct native translations of every word except `exclude_id`
    pub(crate) fn other_translations(&self, exclude_id: &str) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.words
            .iter()
            .filter(|w| w.id != exclude_id)
            .map(|w| w.native.as_str())
            .filter(|t| seen.insert(*t))
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn entry(id: &str, target: &str, native: &str, level: CefrLevel) -> WordEntry {
        WordEntry {
            id: id.to_string(),
            native: native.to_string(),
            target: target.to_string(),
            gender: None,
            plural: None,
            level,
            category: "Allgemein".to_string(),
            word_type: WordType::Noun,
            examples: vec![ExampleSentence::new(format!("{target}!"), format!("{native}!"))],
            pronunciation: None,
            difficulty: 10,
            next_review_at: Utc::now(),
        }
    }

    /// Haus, Apfel and laufen, all A1
    pub fn a1_catalog() -> WordCatalog {
        WordCatalog::new(vec![
            entry("1", "Haus", "Ev", CefrLevel::A1),
            entry("2", "Apfel", "Elma", CefrLevel::A1),
            entry("3", "laufen", "yürümek, koşmak", CefrLevel::A1),
        ])
        .unwrap()
    }

    /// `n` words with distinct translations, spread across levels
    pub fn numbered_catalog(n: usize) -> WordCatalog {
        let entries = (0..n)
            .map(|i| {
                entry(
                    &format!("w{i}"),
                    &format!("Wort{i}"),
                    &format!("kelime{i}"),
                    CefrLevel::ALL[i % CefrLevel::ALL.len()],
                )
            })
            .collect();
        WordCatalog::new(entries).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn builtin_catalog_loads() {
        let catalog = WordCatalog::builtin().unwrap();
        assert_eq!(catalog.len(), 6);
        let haus = catalog.get("1").unwrap();
        assert_eq!(haus.target, "Haus");
        assert_eq!(haus.native, "Ev");
        assert_eq!(haus.gender, Some(Gender::Das));
        assert_eq!(catalog.by_level(CefrLevel::A1).len(), 3);
        assert!(catalog.by_level(CefrLevel::C2).is_empty());
    }

    #[test]
    fn lookup_miss_is_not_found() {
        let catalog = a1_catalog();
        assert!(matches!(catalog.get("nope"), Err(CoreError::NotFound(id)) if id == "nope"));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let result = WordCatalog::new(vec![
            entry("1", "Haus", "Ev", CefrLevel::A1),
            entry("1", "Apfel", "Elma", CefrLevel::A1),
        ]);
        assert!(matches!(result, Err(CoreError::DuplicateId(_))));
    }

    #[test]
    fn difficulty_above_hundred_is_rejected() {
        let mut word = entry("1", "Haus", "Ev", CefrLevel::A1);
        word.difficulty = 101;
        assert!(matches!(
            WordCatalog::new(vec![word]),
            Err(CoreError::InvalidEntry { .. })
        ));
    }

    #[test]
    fn level_parsing_is_case_insensitive() {
        assert_eq!("b2".parse::<CefrLevel>().unwrap(), CefrLevel::B2);
        assert!(matches!("D1".parse::<CefrLevel>(), Err(CoreError::UnknownLevel(_))));
        assert!(CefrLevel::A1 < CefrLevel::C2);
    }

    #[test]
    fn categories_are_counted_and_sorted() {
        let catalog = WordCatalog::builtin().unwrap();
        let categories = catalog.categories();
        let names: Vec<_> = categories.iter().map(|c| c.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(categories.iter().map(|c| c.word_count).sum::<usize>(), 6);
    }

    #[test]
    fn other_translations_skip_self_and_duplicates() {
        let catalog = WordCatalog::new(vec![
            entry("1", "Haus", "Ev", CefrLevel::A1),
            entry("2", "Heim", "Ev", CefrLevel::A2),
            entry("3", "Apfel", "Elma", CefrLevel::A1),
        ])
        .unwrap();
        assert_eq!(catalog.other_translations("3"), vec!["Ev"]);
    }

    #[test]
    fn legacy_field_names_are_accepted() {
        let json = r#"[{ "id": "x", "german": "Tisch", "turkish": "Masa", "level": "A1",
            "category": "Haus und Möbel", "word_type": "noun", "difficulty": 5,
            "examples": [{ "german": "Der Tisch ist neu.", "turkish": "Masa yeni." }] }]"#;
        let catalog = WordCatalog::from_json(json).unwrap();
        let word = catalog.get("x").unwrap();
        assert_eq!(word.target, "Tisch");
        assert_eq!(word.examples[0].native, "Masa yeni.");
    }
}
