//! Lexical keyword classifier

use super::signal::{Emotion, Intent, SignalTuple, Tone};
use super::vocabulary::{CategorySet, Gazetteer, TokenForms, Vocabulary, tokenize};
use super::{ClassifierStrategy, UtteranceClassifier};

/// Classifier that matches lower-cased tokens against the vocabulary.
///
/// No stemming: `"loves"` does not match the lemma `"love"`. Targets come only
/// from the configured gazetteer of known people.
#[derive(Debug, Clone)]
pub struct LexicalClassifier {
    vocabulary: Vocabulary,
    intents: CategorySet,
    emotions: CategorySet,
    tones: CategorySet,
    people: Gazetteer,
}

impl LexicalClassifier {
    /// Compile a classifier from a vocabulary
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self {
            intents: CategorySet::compile(&vocabulary.intents),
            emotions: CategorySet::compile(&vocabulary.emotions),
            tones: CategorySet::compile(&vocabulary.tones),
            people: Gazetteer::compile(&vocabulary.people),
            vocabulary,
        }
    }

    /// The vocabulary this classifier was built from
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }
}

impl Default for LexicalClassifier {
    fn default() -> Self {
        Self::new(Vocabulary::default())
    }
}

impl UtteranceClassifier for LexicalClassifier {
    fn classify(&self, text: &str) -> SignalTuple {
        let forms: TokenForms = tokenize(text).into_iter().map(|t| vec![t.lower]).collect();

        let intent = if self.vocabulary.is_question(text) {
            Intent::Question
        } else {
            self.intents
                .first_match(&forms)
                .map(Intent::from)
                .unwrap_or(Intent::Statement)
        };

        SignalTuple {
            text: text.to_string(),
            intent,
            emotion: self.emotions.first_match(&forms).map(Emotion::from),
            tone: self.tones.first_match(&forms).map(Tone::from),
            target: self
                .people
                .earliest(&forms)
                .map(|(_, name)| name.to_string()),
        }
    }

    fn strategy(&self) -> ClassifierStrategy {
        ClassifierStrategy::Lexical
    }
}
