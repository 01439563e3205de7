//! Persona-conditioned response generation
//!
//! A reply is assembled from three parts:
//!
//! 1. a base template chosen by intent (with a fallback for unmapped intents),
//! 2. an optional clause chosen by emotion,
//! 3. an optional persona tag, shown when the persona selected from the
//!    relationship state has a description in the character profile.
//!
//! Templates use `{{variable}}` placeholders: `name`, `real_name`,
//! `persona`, `intent` and `target`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::classifier::SignalTuple;
use crate::error::{ParleyError, Result};
use crate::profile::{CharacterProfile, NAME_PLACEHOLDER};
use crate::relationship::{RelationshipState, STAT_MAX};

/// Substitute `{{key}}` placeholders
fn render(template: &str, variables: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in variables {
        let placeholder = format!("{{{{{}}}}}", key);
        result = result.replace(&placeholder, value);
    }
    result
}

/// `"man_of_steel"` -> `"Man Of Steel"`
pub(crate) fn title_case(key: &str) -> String {
    key.split(['_', ' ', '-'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reply templates keyed by intent and emotion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseTemplates {
    /// Intent label -> base template
    pub intents: BTreeMap<String, String>,
    /// Base template for intents with no entry
    pub fallback: String,
    /// Emotion label -> clause appended to the base
    pub emotions: BTreeMap<String, String>,
    /// Prefix shown for a described persona
    pub persona_tag: String,
    /// Stands in for `{{name}}` when the profile has no name
    pub name_placeholder: String,
}

impl Default for ResponseTemplates {
    fn default() -> Self {
        let intents = [
            ("question", "{{name}} ponders your question thoughtfully."),
            ("flirt", "{{name}} smiles warmly at you."),
            ("challenge", "{{name}} looks taken aback by your hostility."),
            ("comfort", "{{name}} accepts the gesture with a grateful nod."),
        ];
        let emotions = [
            ("anger", "{{name}} seems unsettled by your anger."),
            ("joy", "Your good mood is contagious."),
        ];

        Self {
            intents: intents
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            fallback: "{{name}} nods in acknowledgement.".to_string(),
            emotions: emotions
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            persona_tag: "[{{persona}}]".to_string(),
            name_placeholder: NAME_PLACEHOLDER.to_string(),
        }
    }
}

impl ResponseTemplates {
    /// Check templates are usable.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a blank fallback or blank entries.
    pub fn validate(&self) -> Result<()> {
        if self.fallback.trim().is_empty() {
            return Err(ParleyError::Configuration(
                "responses.fallback must not be empty".to_string(),
            ));
        }
        for (section, map) in [("intents", &self.intents), ("emotions", &self.emotions)] {
            if let Some((key, _)) = map.iter().find(|(_, t)| t.trim().is_empty()) {
                return Err(ParleyError::Configuration(format!(
                    "responses.{section}.{key} must not be empty"
                )));
            }
        }
        Ok(())
    }
}

/// Default persona selection: one stat against one threshold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaRule {
    /// Stat compared against the threshold
    pub stat: String,
    /// Values below this select `below`, the rest `at_or_above`
    pub threshold: u8,
    /// Persona key below the threshold
    pub below: String,
    /// Persona key at or above the threshold
    pub at_or_above: String,
}

impl Default for PersonaRule {
    fn default() -> Self {
        Self {
            stat: "trust".to_string(),
            threshold: 7,
            below: "restrained".to_string(),
            at_or_above: "open".to_string(),
        }
    }
}

impl PersonaRule {
    /// Check the rule is usable.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for blank keys or an unreachable threshold.
    pub fn validate(&self) -> Result<()> {
        if self.stat.trim().is_empty()
            || self.below.trim().is_empty()
            || self.at_or_above.trim().is_empty()
        {
            return Err(ParleyError::Configuration(
                "persona.stat, persona.below and persona.at_or_above must not be empty".to_string(),
            ));
        }
        if self.threshold > STAT_MAX + 1 {
            return Err(ParleyError::Configuration(format!(
                "persona.threshold {} is beyond the stat range",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Renders in-character replies. Deterministic: no randomness, no I/O.
#[derive(Debug, Clone)]
pub struct ResponseGenerator {
    templates: ResponseTemplates,
    rule: PersonaRule,
    stat_default: u8,
}

impl Default for ResponseGenerator {
    fn default() -> Self {
        Self {
            templates: ResponseTemplates::default(),
            rule: PersonaRule::default(),
            stat_default: 5,
        }
    }
}

impl ResponseGenerator {
    /// Create a generator from validated templates and persona rule.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if either fails validation.
    pub fn new(templates: ResponseTemplates, rule: PersonaRule) -> Result<Self> {
        templates.validate()?;
        rule.validate()?;
        Ok(Self {
            templates,
            rule,
            stat_default: 5,
        })
    }

    /// Value assumed for stats missing from the state
    pub fn with_stat_default(mut self, value: u8) -> Self {
        self.stat_default = value;
        self
    }

    /// Persona key for the current state.
    ///
    /// Personas in the profile that declare a `min` threshold are considered
    /// first; the satisfied one with the highest threshold wins. Otherwise
    /// the configured [`PersonaRule`] decides.
    pub fn select_persona<'a>(
        &'a self,
        profile: &'a CharacterProfile,
        state: &RelationshipState,
    ) -> &'a str {
        let mut best: Option<(&str, u8)> = None;
        for (key, persona) in &profile.personas {
            let Some(min) = persona.min else { continue };
            let stat = persona.stat.as_deref().unwrap_or(&self.rule.stat);
            if state.value_or(stat, self.stat_default) >= min
                && best.is_none_or(|(_, best_min)| min > best_min)
            {
                best = Some((key.as_str(), min));
            }
        }

        if let Some((key, _)) = best {
            return key;
        }

        if state.value_or(&self.rule.stat, self.stat_default) < self.rule.threshold {
            &self.rule.below
        } else {
            &self.rule.at_or_above
        }
    }

    /// Render the reply for one turn
    pub fn generate(
        &self,
        profile: &CharacterProfile,
        signal: &SignalTuple,
        state: &RelationshipState,
    ) -> String {
        let name = profile.display_name_or(&self.templates.name_placeholder);
        let persona = self.select_persona(profile, state);
        let persona_label = title_case(persona);
        let variables = [
            ("name", name),
            ("real_name", profile.real_name.as_deref().unwrap_or(name)),
            ("persona", persona_label.as_str()),
            ("intent", signal.intent.as_str()),
            ("target", signal.target.as_deref().unwrap_or("someone")),
        ];

        let base = self
            .templates
            .intents
            .get(signal.intent.as_str())
            .unwrap_or(&self.templates.fallback);
        let mut reply = render(base, &variables);

        if let Some(clause) = signal
            .emotion
            .as_ref()
            .and_then(|e| self.templates.emotions.get(e.as_str()))
        {
            reply.push(' ');
            reply.push_str(&render(clause, &variables));
        }

        let described = profile
            .persona(persona)
            .is_some_and(|p| !p.description.trim().is_empty());
        if described {
            reply = format!("{} {}", render(&self.templates.persona_tag, &variables), reply);
        }

        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Emotion, Intent, Tone};
    use crate::profile::PersonaProfile;

    fn state(trust: i64) -> RelationshipState {
        [("trust", trust), ("attraction", 5)].into_iter().collect()
    }

    fn superman() -> CharacterProfile {
        CharacterProfile::named("Superman")
            .with_persona("clark", PersonaProfile::new("Mild-mannered reporter"))
            .with_persona("superman", PersonaProfile::new("The Man of Steel"))
    }

    fn clark_rule() -> PersonaRule {
        PersonaRule {
            below: "clark".to_string(),
            at_or_above: "superman".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_intent_templates() {
        let generator = ResponseGenerator::default();
        let profile = CharacterProfile::named("Superman");
        let cases = [
            (Intent::Question, "Superman ponders your question thoughtfully."),
            (Intent::Flirt, "Superman smiles warmly at you."),
            (Intent::Challenge, "Superman looks taken aback by your hostility."),
            (Intent::Comfort, "Superman accepts the gesture with a grateful nod."),
            (Intent::Statement, "Superman nods in acknowledgement."),
            (
                Intent::Custom("greeting".to_string()),
                "Superman nods in acknowledgement.",
            ),
        ];
        for (intent, expected) in cases {
            let reply = generator.generate(&profile, &SignalTuple::new("x", intent), &state(5));
            assert_eq!(reply, expected);
        }
    }

    #[test]
    fn test_emotion_clauses() {
        let generator = ResponseGenerator::default();
        let profile = CharacterProfile::named("Superman");

        let angry = SignalTuple::new("x", Intent::Statement).with_emotion(Emotion::Anger);
        assert_eq!(
            generator.generate(&profile, &angry, &state(5)),
            "Superman nods in acknowledgement. Superman seems unsettled by your anger."
        );

        let joyful = SignalTuple::new("x", Intent::Flirt).with_emotion(Emotion::Joy);
        assert_eq!(
            generator.generate(&profile, &joyful, &state(5)),
            "Superman smiles warmly at you. Your good mood is contagious."
        );

        let sad = SignalTuple::new("x", Intent::Flirt).with_emotion(Emotion::Sadness);
        assert_eq!(
            generator.generate(&profile, &sad, &state(5)),
            "Superman smiles warmly at you."
        );
    }

    #[test]
    fn test_persona_tag_follows_threshold() {
        let generator =
            ResponseGenerator::new(ResponseTemplates::default(), clark_rule()).unwrap();
        let signal = SignalTuple::new("hi", Intent::Statement);

        assert_eq!(
            generator.generate(&superman(), &signal, &state(6)),
            "[Clark] Superman nods in acknowledgement."
        );
        assert_eq!(
            generator.generate(&superman(), &signal, &state(7)),
            "[Superman] Superman nods in acknowledgement."
        );
    }

    #[test]
    fn test_undescribed_persona_has_no_tag() {
        let generator = ResponseGenerator::default();
        let profile = CharacterProfile::named("Superman")
            .with_persona("restrained", PersonaProfile::new("  "));
        let reply = generator.generate(&profile, &SignalTuple::statement("hi"), &state(2));
        assert_eq!(reply, "Superman nods in acknowledgement.");
    }

    #[test]
    fn test_profile_declared_thresholds() {
        let generator = ResponseGenerator::default();
        let profile = CharacterProfile::named("Batman")
            .with_persona("guarded", PersonaProfile::new("Cold").with_threshold("trust", 0))
            .with_persona("ally", PersonaProfile::new("Warm").with_threshold("trust", 4))
            .with_persona("partner", PersonaProfile::new("Close").with_threshold("trust", 9));

        assert_eq!(generator.select_persona(&profile, &state(2)), "guarded");
        assert_eq!(generator.select_persona(&profile, &state(5)), "ally");
        assert_eq!(generator.select_persona(&profile, &state(10)), "partner");
    }

    #[test]
    fn test_missing_stat_uses_default() {
        let generator = ResponseGenerator::default().with_stat_default(8);
        let profile = CharacterProfile::named("Superman");
        assert_eq!(
            generator.select_persona(&profile, &RelationshipState::new()),
            "open"
        );
    }

    #[test]
    fn test_missing_name_placeholder() {
        let generator = ResponseGenerator::default();
        let reply = generator.generate(
            &CharacterProfile::default(),
            &SignalTuple::new("?", Intent::Question),
            &state(5),
        );
        assert_eq!(reply, "Unknown ponders your question thoughtfully.");

        let templates = ResponseTemplates {
            name_placeholder: "The stranger".to_string(),
            ..Default::default()
        };
        let generator = ResponseGenerator::new(templates, PersonaRule::default()).unwrap();
        let reply = generator.generate(
            &CharacterProfile::default(),
            &SignalTuple::new("hi", Intent::Flirt),
            &state(5),
        );
        assert_eq!(reply, "The stranger smiles warmly at you.");
    }

    #[test]
    fn test_generation_is_deterministic() {
        let generator =
            ResponseGenerator::new(ResponseTemplates::default(), clark_rule()).unwrap();
        let signal = SignalTuple::new("x", Intent::Challenge)
            .with_emotion(Emotion::Anger)
            .with_tone(Tone::Sarcastic)
            .with_target("Lex Luthor");
        for trust in 0..=10 {
            let first = generator.generate(&superman(), &signal, &state(trust));
            let second = generator.generate(&superman(), &signal, &state(trust));
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_template_variables() {
        let mut templates = ResponseTemplates::default();
        templates.intents.insert(
            "challenge".to_string(),
            "{{real_name}} refuses to fight {{target}}.".to_string(),
        );
        let generator = ResponseGenerator::new(templates, PersonaRule::default()).unwrap();
        let profile = CharacterProfile {
            real_name: Some("Kal-El".to_string()),
            ..CharacterProfile::named("Superman")
        };
        let signal = SignalTuple::new("x", Intent::Challenge).with_target("Zod");
        assert_eq!(
            generator.generate(&profile, &signal, &state(5)),
            "Kal-El refuses to fight Zod."
        );
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("clark"), "Clark");
        assert_eq!(title_case("man_of_steel"), "Man Of Steel");
    }

    #[test]
    fn test_validation() {
        let templates = ResponseTemplates {
            fallback: String::new(),
            ..Default::default()
        };
        assert!(ResponseGenerator::new(templates, PersonaRule::default()).is_err());

        let rule = PersonaRule {
            below: " ".to_string(),
            ..Default::default()
        };
        assert!(ResponseGenerator::new(ResponseTemplates::default(), rule).is_err());
    }
}
