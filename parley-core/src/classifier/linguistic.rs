//! Linguistic classifier with lemma matching and name-span detection

use once_cell::sync::Lazy;
use regex::Regex;

use super::signal::{Emotion, Intent, SignalTuple, Tone};
use super::vocabulary::{CategorySet, Gazetteer, Token, TokenForms, Vocabulary, tokenize};
use super::{ClassifierStrategy, UtteranceClassifier};

/// Honorific followed by one or more capitalised words
static TITLED_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:Dr|Mr|Mrs|Ms|Miss|Professor|Captain|Commissioner|General|Agent|King|Queen|Lord|Lady|Sir|Dame)\.?\s+[A-Z][\p{L}'-]*(?:\s+[A-Z][\p{L}'-]*)*",
    )
    .expect("valid title pattern")
});

/// Capitalised words that never start a person reference
const NON_NAMES: &[&str] = &[
    "i", "i'm", "i've", "i'll", "i'd", "god", "monday", "tuesday", "wednesday", "thursday",
    "friday", "saturday", "sunday", "ok", "okay",
];

/// Shortest stem kept after stripping a suffix
const MIN_STEM: usize = 3;

/// Candidate lemmas for a lower-cased word, the word itself first.
///
/// Strips possessive, plural, past-tense, gerund and adverb suffixes, restoring
/// a silent `e` or undoubling a final consonant where that yields a plausible
/// stem. A bare `-es` stem is only offered after a sibilant or `o`
/// (`kisses`, `heroes`), so `glades` yields `glade` but not `glad`.
pub fn lemma_candidates(word: &str) -> Vec<String> {
    let mut candidates = vec![word.to_string()];
    let mut push = |candidate: String| {
        if candidate.chars().count() >= MIN_STEM && !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    };

    let word = word
        .strip_suffix("'s")
        .or_else(|| word.strip_suffix("’s"))
        .inspect(|stem| push(stem.to_string()))
        .unwrap_or(word);

    for (suffix, replacement) in [("ies", "y"), ("ied", "y"), ("ily", "y"), ("ier", "y")] {
        if let Some(stem) = word.strip_suffix(suffix) {
            push(format!("{stem}{replacement}"));
        }
    }

    for suffix in ["ing", "ed", "es", "er", "ly", "s", "d"] {
        let Some(stem) = word.strip_suffix(suffix) else {
            continue;
        };
        if stem.chars().count() < MIN_STEM {
            continue;
        }
        if suffix != "es" || takes_es_plural(stem) {
            push(stem.to_string());
        }
        if suffix != "s" && suffix != "d" {
            push(format!("{stem}e"));
        }
        let mut chars = stem.chars().rev();
        if let (Some(last), Some(prev)) = (chars.next(), chars.next())
            && last == prev
            && !"aeiou".contains(last)
        {
            push(stem[..stem.len() - last.len_utf8()].to_string());
        }
    }

    candidates
}

/// Whether a stem forms its plural or third person with `-es`
fn takes_es_plural(stem: &str) -> bool {
    ["s", "x", "z", "ch", "sh", "o"]
        .iter()
        .any(|ending| stem.ends_with(ending))
}

/// Classifier that lemmatises tokens before vocabulary lookup and detects
/// person references from the gazetteer, honorifics and capitalised spans.
#[derive(Debug, Clone)]
pub struct LinguisticClassifier {
    vocabulary: Vocabulary,
    intents: CategorySet,
    emotions: CategorySet,
    tones: CategorySet,
    people: Gazetteer,
}

impl LinguisticClassifier {
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

    /// First person reference in the text, by byte offset
    fn find_target(&self, text: &str, tokens: &[Token<'_>], forms: &TokenForms) -> Option<String> {
        let mut candidates: Vec<(usize, String)> = Vec::new();

        if let Some((index, name)) = self.people.earliest(forms) {
            candidates.push((tokens[index].start, name.to_string()));
        }

        if let Some(m) = TITLED_NAME.find(text) {
            candidates.push((m.start(), m.as_str().to_string()));
        }

        if let Some(span) = capitalised_span(text, tokens) {
            candidates.push(span);
        }

        candidates
            .into_iter()
            .min_by_key(|(start, _)| *start)
            .map(|(_, name)| name)
    }
}

impl Default for LinguisticClassifier {
    fn default() -> Self {
        Self::new(Vocabulary::default())
    }
}

/// Whether the token opens a sentence (so its capital letter says nothing)
fn starts_sentence(text: &str, token: &Token<'_>) -> bool {
    text[..token.start]
        .trim_end()
        .chars()
        .next_back()
        .is_none_or(|c| matches!(c, '.' | '!' | '?' | '"' | '“'))
}

fn is_capitalised(token: &Token<'_>) -> bool {
    token.text.chars().next().is_some_and(char::is_uppercase)
        && !NON_NAMES.contains(&token.lower.as_str())
}

/// First run of capitalised tokens that does not open a sentence
fn capitalised_span(text: &str, tokens: &[Token<'_>]) -> Option<(usize, String)> {
    let start = tokens
        .iter()
        .position(|t| is_capitalised(t) && !starts_sentence(text, t))?;

    let mut end = start;
    while end + 1 < tokens.len()
        && is_capitalised(&tokens[end + 1])
        && text[tokens[end].end..tokens[end + 1].start]
            .chars()
            .all(|c| c == ' ' || c == '-')
    {
        end += 1;
    }

    let span = &text[tokens[start].start..tokens[end].end];
    Some((tokens[start].start, span.to_string()))
}

impl UtteranceClassifier for LinguisticClassifier {
    fn classify(&self, text: &str) -> SignalTuple {
        let tokens = tokenize(text);
        let forms: TokenForms = tokens.iter().map(|t| lemma_candidates(&t.lower)).collect();

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
            target: self.find_target(text, &tokens, &forms),
        }
    }

    fn strategy(&self) -> ClassifierStrategy {
        ClassifierStrategy::Linguistic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_lemma(word: &str, lemma: &str) -> bool {
        lemma_candidates(word).iter().any(|c| c == lemma)
    }

    #[test]
    fn test_lemma_candidates() {
        assert!(has_lemma("loves", "love"));
        assert!(has_lemma("loving", "love"));
        assert!(has_lemma("hugging", "hug"));
        assert!(has_lemma("dated", "date"));
        assert!(has_lemma("battles", "battle"));
        assert!(has_lemma("consoled", "console"));
        assert!(has_lemma("cried", "cry"));
        assert!(has_lemma("angrily", "angry"));
        assert!(has_lemma("kissing", "kiss"));
        assert!(has_lemma("superman's", "superman"));
        assert_eq!(lemma_candidates("fight")[0], "fight");
    }

    #[test]
    fn test_lemma_candidates_do_not_overstrip() {
        assert!(has_lemma("glades", "glade"));
        assert!(!has_lemma("glades", "glad"));
        assert!(has_lemma("kisses", "kiss"));
        assert!(has_lemma("watches", "watch"));
        assert!(!has_lemma("bed", "b"));
        assert!(!has_lemma("madly", "ma"));

        let classifier = LinguisticClassifier::default();
        let signal = classifier.classify("We walked through the glades");
        assert_eq!(signal.emotion, None);
        assert_eq!(signal.intent, Intent::Statement);
    }

    #[test]
    fn test_inflected_intents() {
        let classifier = LinguisticClassifier::default();
        assert_eq!(classifier.classify("She loves you").intent, Intent::Flirt);
        assert_eq!(
            classifier.classify("We were fighting all night").intent,
            Intent::Challenge
        );
        assert_eq!(
            classifier.classify("He consoled me").intent,
            Intent::Comfort
        );
        assert_eq!(
            classifier.classify("She cried all day").emotion,
            Some(Emotion::Sadness)
        );
    }

    #[test]
    fn test_question_mark_still_wins() {
        let classifier = LinguisticClassifier::default();
        assert_eq!(classifier.classify("Kissing is fun?").intent, Intent::Question);
    }

    #[test]
    fn test_target_from_titled_name() {
        let classifier = LinguisticClassifier::default();
        let signal = classifier.classify("have you met Dr. Hamilton yet");
        assert_eq!(signal.target.as_deref(), Some("Dr. Hamilton"));
    }

    #[test]
    fn test_target_from_capitalised_span() {
        let classifier = LinguisticClassifier::default();
        let signal = classifier.classify("I think Lois Lane likes you");
        assert_eq!(signal.target.as_deref(), Some("Lois Lane"));
    }

    #[test]
    fn test_sentence_start_and_pronoun_are_not_targets() {
        let classifier = LinguisticClassifier::default();
        assert_eq!(classifier.classify("Yesterday I went home").target, None);
        assert_eq!(classifier.classify("Fine. I will go").target, None);
    }

    #[test]
    fn test_gazetteer_catches_sentence_initial_name() {
        let vocabulary = Vocabulary {
            people: vec!["Jimmy Olsen".to_string()],
            ..Default::default()
        };
        let classifier = LinguisticClassifier::new(vocabulary);
        let signal = classifier.classify("Jimmy Olsen took my photo");
        assert_eq!(signal.target.as_deref(), Some("Jimmy Olsen"));
    }

    #[test]
    fn test_earliest_reference_wins() {
        let vocabulary = Vocabulary {
            people: vec!["Jimmy".to_string()],
            ..Default::default()
        };
        let classifier = LinguisticClassifier::new(vocabulary);
        let signal = classifier.classify("tell Perry White that jimmy is late");
        assert_eq!(signal.target.as_deref(), Some("Perry White"));
    }
}
