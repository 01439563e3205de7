//! Utterance Classification
//!
//! Maps raw user text to a [`SignalTuple`] of intent, emotion, tone and target.
//!
//! Every dimension is a priority-ordered list of vocabulary categories: the
//! first category with a matching entry wins and later ones are not
//! consulted. Intent has one built-in rule ahead of the vocabulary: any
//! question marker makes the utterance a `question`.
//!
//! Two interchangeable strategies implement [`UtteranceClassifier`]:
//!
//! - [`LexicalClassifier`]: exact lower-cased token matching
//! - [`LinguisticClassifier`]: lemma matching plus name-span detection
//!
//! # Example
//!
//! ```rust
//! use parley_core::classifier::{build_classifier, ClassifierStrategy, Intent, Vocabulary};
//!
//! let classifier = build_classifier(ClassifierStrategy::Lexical, &Vocabulary::default()).unwrap();
//! let signal = classifier.classify("I love you?");
//! assert_eq!(signal.intent, Intent::Question);
//! ```

mod lexical;
mod linguistic;
mod signal;
mod vocabulary;

#[cfg(test)]
mod tests;

pub use lexical::LexicalClassifier;
pub use linguistic::{LinguisticClassifier, lemma_candidates};
pub use signal::{Emotion, Intent, SignalTuple, Tone};
pub use vocabulary::{Category, Vocabulary};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ParleyError, Result};

/// Which classifier implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierStrategy {
    /// Plain keyword matching
    #[default]
    Lexical,
    /// Lemma matching and name-span detection
    Linguistic,
}

impl fmt::Display for ClassifierStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifierStrategy::Lexical => f.write_str("lexical"),
            ClassifierStrategy::Linguistic => f.write_str("linguistic"),
        }
    }
}

impl std::str::FromStr for ClassifierStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lexical" | "keyword" => Ok(ClassifierStrategy::Lexical),
            "linguistic" | "lemma" => Ok(ClassifierStrategy::Linguistic),
            _ => Err(format!("Unknown classifier strategy: {}", s)),
        }
    }
}

/// Trait for turning an utterance into a signal tuple.
///
/// Implementations are pure: no state changes between calls and the same
/// text always yields the same tuple. Classification of text never fails;
/// only [`classify_bytes`](Self::classify_bytes) can reject input.
pub trait UtteranceClassifier: Send + Sync {
    /// Classify well-formed text
    fn classify(&self, text: &str) -> SignalTuple;

    /// Strategy implemented by this classifier
    fn strategy(&self) -> ClassifierStrategy;

    /// Validate raw input as text, then classify it.
    ///
    /// # Errors
    ///
    /// Returns [`ParleyError::InvalidInput`] if the bytes are not text.
    fn classify_bytes(&self, raw: &[u8]) -> Result<SignalTuple> {
        let text = validate_utterance(raw)?;
        Ok(self.classify(text))
    }
}

/// Check that raw turn input is text.
///
/// Accepts UTF-8 without control characters other than tab, carriage return
/// and newline.
///
/// # Errors
///
/// Returns [`ParleyError::InvalidInput`] for invalid UTF-8 or binary content.
pub fn validate_utterance(raw: &[u8]) -> Result<&str> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| ParleyError::InvalidInput(format!("input is not valid UTF-8 ({})", e)))?;

    if let Some(c) = text
        .chars()
        .find(|c| c.is_control() && !matches!(c, '\t' | '\r' | '\n'))
    {
        return Err(ParleyError::InvalidInput(format!(
            "input contains control character U+{:04X}",
            c as u32
        )));
    }

    Ok(text)
}

/// Build the classifier selected by `strategy` over a validated vocabulary.
///
/// # Errors
///
/// Returns a configuration error if the vocabulary is malformed.
pub fn build_classifier(
    strategy: ClassifierStrategy,
    vocabulary: &Vocabulary,
) -> Result<Box<dyn UtteranceClassifier>> {
    vocabulary.validate()?;
    tracing::debug!(%strategy, "Building utterance classifier");

    Ok(match strategy {
        ClassifierStrategy::Lexical => Box::new(LexicalClassifier::new(vocabulary.clone())),
        ClassifierStrategy::Linguistic => Box::new(LinguisticClassifier::new(vocabulary.clone())),
    })
}
