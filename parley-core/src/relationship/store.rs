//! Relationship store: load, update and persist per-character state

use std::sync::Arc;

use crate::classifier::SignalTuple;
use crate::error::{ParleyError, Result};

use super::persistence::RelationshipPersistence;
use super::rules::RelationshipConfig;
use super::state::RelationshipState;

/// Applies update rules to relationship state and moves it to and from a
/// persistence backend.
#[derive(Clone)]
pub struct RelationshipStore {
    persistence: Arc<dyn RelationshipPersistence>,
    config: RelationshipConfig,
}

impl std::fmt::Debug for RelationshipStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationshipStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RelationshipStore {
    /// Create a store over a persistence backend.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` fails validation.
    pub fn new(
        persistence: Arc<dyn RelationshipPersistence>,
        config: RelationshipConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            persistence,
            config,
        })
    }

    /// Store configuration
    pub fn config(&self) -> &RelationshipConfig {
        &self.config
    }

    /// State for a character: the persisted one with any missing recognized
    /// stats filled in, or the initial state on first contact.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read or holds malformed data.
    pub fn load(&self, character_id: &str) -> Result<RelationshipState> {
        match self.persistence.get(character_id)? {
            Some(mut state) => {
                for stat in &self.config.stats {
                    state.fill(stat, self.config.initial_value);
                }
                tracing::info!(character = %character_id, %state, "Loaded relationship state");
                Ok(state)
            }
            None => {
                let state = self.config.initial_state();
                tracing::info!(character = %character_id, %state, "No relationship history, using defaults");
                Ok(state)
            }
        }
    }

    /// Apply every matching rule to a copy of `state`.
    ///
    /// Stats a rule names but the state lacks start from the initial value.
    /// Every write is clamped.
    pub fn update(&self, state: &RelationshipState, signal: &SignalTuple) -> RelationshipState {
        let mut next = state.clone();
        for rule in self.config.rules.iter().filter(|r| r.matches(signal)) {
            let value = next.adjust(&rule.stat, rule.delta, self.config.initial_value);
            tracing::debug!(
                intent = %signal.intent,
                stat = %rule.stat,
                delta = rule.delta,
                value,
                "Relationship rule fired"
            );
        }
        next
    }

    /// Persist a character's state.
    ///
    /// # Errors
    ///
    /// Returns [`ParleyError::PersistenceWrite`] if the backend write fails.
    pub fn persist(&self, character_id: &str, state: &RelationshipState) -> Result<()> {
        self.persistence
            .put(character_id, state)
            .map_err(|e| match e {
                ParleyError::PersistenceWrite(_) => e,
                other => ParleyError::PersistenceWrite(other.to_string()),
            })
    }
}
