//! Vocabulary configuration for utterance classification
//!
//! Each signal dimension (intent, emotion, tone) is an ordered list of
//! categories. Order is priority: the first category with a matching entry
//! wins. Entries are lemmas or short phrases.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{ParleyError, Result};

static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+(?:['’][\p{L}]+)*").expect("valid token pattern"));

/// A labelled set of vocabulary entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Label produced when the category matches
    pub label: String,
    /// Lemmas or phrases that trigger the category
    pub words: Vec<String>,
}

impl Category {
    /// Create a new category
    pub fn new(label: impl Into<String>, words: &[&str]) -> Self {
        Self {
            label: label.into(),
            words: words.iter().map(|w| w.to_string()).collect(),
        }
    }
}

/// Category-to-lemma mappings for intent, emotion and tone, plus the
/// gazetteer of known person names used for target detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    /// Literal markers that make an utterance a question
    pub question_markers: Vec<String>,
    /// Intent categories in priority order
    pub intents: Vec<Category>,
    /// Emotion categories in priority order
    pub emotions: Vec<Category>,
    /// Tone categories in priority order
    pub tones: Vec<Category>,
    /// Known person names
    pub people: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            question_markers: vec!["?".to_string()],
            intents: vec![
                Category::new("flirt", &["love", "adore", "kiss", "flirt", "date"]),
                Category::new(
                    "challenge",
                    &["fight", "challenge", "battle", "confront", "hate", "dislike"],
                ),
                Category::new("comfort", &["comfort", "hug", "console"]),
            ],
            emotions: vec![
                Category::new("anger", &["angry", "mad", "furious", "anger", "rage"]),
                Category::new("joy", &["happy", "glad", "joy", "delighted", "thrilled"]),
                Category::new(
                    "sadness",
                    &["sad", "unhappy", "sorrow", "miserable", "depressed", "cry"],
                ),
            ],
            tones: vec![
                Category::new(
                    "sarcastic",
                    &["yeah right", "sure thing", "obviously", "whatever", "big deal"],
                ),
                Category::new("serious", &["seriously", "honestly", "important", "listen"]),
                Category::new("playful", &["haha", "lol", "hehe", "tease", "joking"]),
                Category::new("polite", &["please", "kindly"]),
                Category::new("demanding", &["now", "immediately"]),
            ],
            people: Vec::new(),
        }
    }
}

impl Vocabulary {
    /// Load a vocabulary from a TOML, YAML or JSON file (chosen by extension).
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be parsed or the
    /// vocabulary fails validation.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        use figment::{
            Figment,
            providers::{Format, Json, Toml, Yaml},
        };

        let path = path.as_ref();
        if !path.exists() {
            return Err(ParleyError::Configuration(format!(
                "Vocabulary file not found: {}",
                path.display()
            )));
        }

        let figment = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Figment::new().merge(Yaml::file(path)),
            Some("json") => Figment::new().merge(Json::file(path)),
            _ => Figment::new().merge(Toml::file(path)),
        };

        let vocabulary: Vocabulary = figment.extract().map_err(|e| {
            ParleyError::Configuration(format!(
                "Failed to load vocabulary from {}: {}",
                path.display(),
                e
            ))
        })?;

        vocabulary.validate()?;
        Ok(vocabulary)
    }

    /// Check that every category is usable.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for missing question markers, blank or
    /// duplicate labels, empty word lists, or entries with no word characters.
    pub fn validate(&self) -> Result<()> {
        if self.question_markers.iter().all(|m| m.trim().is_empty()) {
            return Err(ParleyError::Configuration(
                "vocabulary.question_markers must contain at least one marker".to_string(),
            ));
        }

        for (dimension, categories) in [
            ("intents", &self.intents),
            ("emotions", &self.emotions),
            ("tones", &self.tones),
        ] {
            let mut seen = HashSet::new();
            for category in categories {
                let label = category.label.trim().to_lowercase();
                if label.is_empty() {
                    return Err(ParleyError::Configuration(format!(
                        "vocabulary.{dimension} has a category with an empty label"
                    )));
                }
                if !seen.insert(label.clone()) {
                    return Err(ParleyError::Configuration(format!(
                        "vocabulary.{dimension} defines '{label}' more than once"
                    )));
                }
                if category.words.is_empty() {
                    return Err(ParleyError::Configuration(format!(
                        "vocabulary.{dimension}.{label} has no words"
                    )));
                }
                if let Some(word) = category.words.iter().find(|w| tokenize(w).is_empty()) {
                    return Err(ParleyError::Configuration(format!(
                        "vocabulary.{dimension}.{label} has an unusable entry {word:?}"
                    )));
                }
            }
        }

        if let Some(name) = self.people.iter().find(|p| tokenize(p).is_empty()) {
            return Err(ParleyError::Configuration(format!(
                "vocabulary.people has an unusable entry {name:?}"
            )));
        }

        Ok(())
    }

    /// Add names to the people list, skipping duplicates and entries with no
    /// word characters
    pub fn with_people<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            let name = name.as_ref().trim();
            let lower = name.to_lowercase();
            if tokenize(name).is_empty() || self.people.iter().any(|p| p.trim().to_lowercase() == lower)
            {
                continue;
            }
            self.people.push(name.to_string());
        }
        self
    }

    /// Whether the text contains any question marker
    pub fn is_question(&self, text: &str) -> bool {
        self.question_markers
            .iter()
            .filter(|m| !m.is_empty())
            .any(|m| text.contains(m.as_str()))
    }
}

/// A word token with its byte offset in the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token<'a> {
    pub text: &'a str,
    pub lower: String,
    pub start: usize,
    pub end: usize,
}

/// Split text into word tokens. Hyphens and punctuation separate tokens;
/// apostrophes inside a word do not.
pub(crate) fn tokenize(text: &str) -> Vec<Token<'_>> {
    TOKEN_PATTERN
        .find_iter(text)
        .map(|m| Token {
            text: m.as_str(),
            lower: m.as_str().to_lowercase(),
            start: m.start(),
            end: m.end(),
        })
        .collect()
}

/// Candidate surface forms for each token position.
///
/// The lexical strategy supplies just the lower-cased token; the linguistic
/// strategy adds lemma candidates.
pub(crate) type TokenForms = Vec<Vec<String>>;

/// A phrase as lower-cased word sequence
type Phrase = Vec<String>;

fn phrase(entry: &str) -> Phrase {
    tokenize(entry).into_iter().map(|t| t.lower).collect()
}

/// Position of the first occurrence of `phrase` in `forms`
fn find_phrase(forms: &TokenForms, phrase: &Phrase) -> Option<usize> {
    if phrase.is_empty() || phrase.len() > forms.len() {
        return None;
    }

    (0..=forms.len() - phrase.len()).find(|&start| {
        phrase
            .iter()
            .enumerate()
            .all(|(offset, word)| forms[start + offset].iter().any(|form| form == word))
    })
}

/// One dimension of the vocabulary compiled into phrases
#[derive(Debug, Clone)]
pub(crate) struct CategorySet {
    categories: Vec<(String, Vec<Phrase>)>,
}

impl CategorySet {
    pub fn compile(categories: &[Category]) -> Self {
        Self {
            categories: categories
                .iter()
                .map(|c| {
                    (
                        c.label.trim().to_lowercase(),
                        c.words.iter().map(|w| phrase(w)).collect(),
                    )
                })
                .collect(),
        }
    }

    /// Label of the highest-priority category with any entry present
    pub fn first_match(&self, forms: &TokenForms) -> Option<&str> {
        self.categories
            .iter()
            .find(|(_, phrases)| phrases.iter().any(|p| find_phrase(forms, p).is_some()))
            .map(|(label, _)| label.as_str())
    }
}

/// Known person names compiled for lookup
#[derive(Debug, Clone)]
pub(crate) struct Gazetteer {
    names: Vec<(String, Phrase)>,
}

impl Gazetteer {
    pub fn compile(people: &[String]) -> Self {
        Self {
            names: people
                .iter()
                .map(|name| (name.trim().to_string(), phrase(name)))
                .collect(),
        }
    }

    /// Earliest gazetteer name in the text as (token index, canonical name).
    /// Longer names win ties at the same position.
    pub fn earliest(&self, forms: &TokenForms) -> Option<(usize, &str)> {
        self.names
            .iter()
            .filter_map(|(name, p)| find_phrase(forms, p).map(|pos| (pos, p.len(), name)))
            .min_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
            .map(|(pos, _, name)| (pos, name.as_str()))
    }
}
