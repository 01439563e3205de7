//! Signal tuple produced by classification

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declares a label enum with a fixed set of well-known values plus a
/// `Custom` variant for labels introduced through vocabulary configuration.
///
/// Labels serialize as lower-case strings and parse case-insensitively, so a
/// configured category named `"Joy"` resolves to the built-in variant.
macro_rules! signal_label {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
            /// Label introduced by configuration
            Custom(String),
        }

        impl $name {
            /// Lower-case label text
            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $text,)+
                    $name::Custom(label) => label,
                }
            }
        }

        impl From<&str> for $name {
            fn from(label: &str) -> Self {
                let label = label.trim().to_lowercase();
                match label.as_str() {
                    $($text => $name::$variant,)+
                    _ => $name::Custom(label),
                }
            }
        }

        impl From<String> for $name {
            fn from(label: String) -> Self {
                $name::from(label.as_str())
            }
        }

        impl From<$name> for String {
            fn from(label: $name) -> Self {
                label.as_str().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

signal_label! {
    /// Coarse communicative purpose of an utterance
    Intent {
        /// Contains a question marker
        Question => "question",
        /// Affection vocabulary
        Flirt => "flirt",
        /// Conflict vocabulary
        Challenge => "challenge",
        /// Comfort vocabulary
        Comfort => "comfort",
        /// Nothing else matched
        Statement => "statement",
    }
}

signal_label! {
    /// Emotion expressed by the speaker
    Emotion {
        Anger => "anger",
        Joy => "joy",
        Sadness => "sadness",
    }
}

signal_label! {
    /// Register the utterance is delivered in
    Tone {
        Sarcastic => "sarcastic",
        Serious => "serious",
        Playful => "playful",
    }
}

impl Default for Intent {
    fn default() -> Self {
        Intent::Statement
    }
}

/// Structured classification of one utterance.
///
/// Exactly one intent; emotion, tone and target are each optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalTuple {
    /// Verbatim input text
    pub text: String,
    /// Communicative intent
    pub intent: Intent,
    /// Detected emotion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<Emotion>,
    /// Detected tone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<Tone>,
    /// Referenced person's name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl SignalTuple {
    /// Create a signal with the given intent and no optional fields
    pub fn new(text: impl Into<String>, intent: impl Into<Intent>) -> Self {
        Self {
            text: text.into(),
            intent: intent.into(),
            emotion: None,
            tone: None,
            target: None,
        }
    }

    /// Plain statement with no emotion, tone or target
    pub fn statement(text: impl Into<String>) -> Self {
        Self::new(text, Intent::Statement)
    }

    /// Set the emotion
    pub fn with_emotion(mut self, emotion: impl Into<Emotion>) -> Self {
        self.emotion = Some(emotion.into());
        self
    }

    /// Set the tone
    pub fn with_tone(mut self, tone: impl Into<Tone>) -> Self {
        self.tone = Some(tone.into());
        self
    }

    /// Set the target
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_parsing_is_case_insensitive() {
        assert_eq!(Intent::from("Question"), Intent::Question);
        assert_eq!(Emotion::from(" JOY "), Emotion::Joy);
        assert_eq!(Tone::from("playful"), Tone::Playful);
    }

    #[test]
    fn test_custom_labels() {
        let intent = Intent::from("Greeting");
        assert_eq!(intent, Intent::Custom("greeting".to_string()));
        assert_eq!(intent.as_str(), "greeting");
        assert_eq!(Tone::from("polite").to_string(), "polite");
    }

    #[test]
    fn test_signal_serializes_labels_as_strings() {
        let signal = SignalTuple::new("I love you", Intent::Flirt).with_emotion(Emotion::Joy);
        let json = serde_json::to_value(&signal).unwrap();
        assert_eq!(json["intent"], "flirt");
        assert_eq!(json["emotion"], "joy");
        assert!(json.get("tone").is_none());
    }
}
