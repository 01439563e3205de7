//! Signal-driven update rules

use serde::{Deserialize, Serialize};

use crate::classifier::{Emotion, Intent, SignalTuple, Tone};
use crate::error::{ParleyError, Result};

use super::state::{RelationshipState, STAT_MAX, STAT_MIN};

/// Adjusts one stat when a signal matches every condition the rule sets.
///
/// Rules are evaluated independently: every matching rule fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRule {
    /// Required intent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    /// Required emotion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<Emotion>,
    /// Required tone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<Tone>,
    /// Stat to adjust
    pub stat: String,
    /// Amount added to the stat (negative to decrease)
    pub delta: i64,
}

impl UpdateRule {
    /// Rule that fires on an intent
    pub fn on_intent(intent: Intent, stat: impl Into<String>, delta: i64) -> Self {
        Self {
            intent: Some(intent),
            emotion: None,
            tone: None,
            stat: stat.into(),
            delta,
        }
    }

    /// Additionally require an emotion
    pub fn with_emotion(mut self, emotion: Emotion) -> Self {
        self.emotion = Some(emotion);
        self
    }

    /// Additionally require a tone
    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = Some(tone);
        self
    }

    /// Whether the signal satisfies every condition
    pub fn matches(&self, signal: &SignalTuple) -> bool {
        self.intent.as_ref().is_none_or(|i| *i == signal.intent)
            && self
                .emotion
                .as_ref()
                .is_none_or(|e| signal.emotion.as_ref() == Some(e))
            && self
                .tone
                .as_ref()
                .is_none_or(|t| signal.tone.as_ref() == Some(t))
    }

    fn has_condition(&self) -> bool {
        self.intent.is_some() || self.emotion.is_some() || self.tone.is_some()
    }
}

/// Relationship defaults and update rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationshipConfig {
    /// Value every recognized stat starts at on first contact
    pub initial_value: u8,
    /// Recognized stats, created on first contact
    pub stats: Vec<String>,
    /// Update rules applied once per turn
    pub rules: Vec<UpdateRule>,
}

impl Default for RelationshipConfig {
    fn default() -> Self {
        Self {
            initial_value: 5,
            stats: vec!["trust".to_string(), "attraction".to_string()],
            rules: vec![
                UpdateRule::on_intent(Intent::Flirt, "attraction", 1),
                UpdateRule::on_intent(Intent::Challenge, "trust", -1),
                UpdateRule::on_intent(Intent::Question, "trust", 1).with_emotion(Emotion::Joy),
            ],
        }
    }
}

impl RelationshipConfig {
    /// State for a character with no history
    pub fn initial_state(&self) -> RelationshipState {
        RelationshipState::uniform(&self.stats, self.initial_value)
    }

    /// Check the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an out-of-range initial value, blank
    /// stat names, or rules without conditions or with a zero delta.
    pub fn validate(&self) -> Result<()> {
        if !(STAT_MIN..=STAT_MAX).contains(&self.initial_value) {
            return Err(ParleyError::Configuration(format!(
                "relationship.initial_value {} is outside {}..={}",
                self.initial_value, STAT_MIN, STAT_MAX
            )));
        }

        if self.stats.iter().any(|s| s.trim().is_empty()) {
            return Err(ParleyError::Configuration(
                "relationship.stats contains a blank stat name".to_string(),
            ));
        }

        for (index, rule) in self.rules.iter().enumerate() {
            if rule.stat.trim().is_empty() {
                return Err(ParleyError::Configuration(format!(
                    "relationship.rules[{index}] has a blank stat"
                )));
            }
            if !rule.has_condition() {
                return Err(ParleyError::Configuration(format!(
                    "relationship.rules[{index}] has no intent, emotion or tone condition"
                )));
            }
            if rule.delta == 0 {
                return Err(ParleyError::Configuration(format!(
                    "relationship.rules[{index}] has a zero delta"
                )));
            }
        }

        Ok(())
    }
}
