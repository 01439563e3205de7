//! Bounded relationship stats

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lowest value a stat can hold
pub const STAT_MIN: u8 = 0;

/// Highest value a stat can hold
pub const STAT_MAX: u8 = 10;

/// Clamp any integer into the stat range
pub fn clamp_stat(value: i64) -> u8 {
    value.clamp(STAT_MIN as i64, STAT_MAX as i64) as u8
}

/// Per-character mapping of stat name to a value in `STAT_MIN..=STAT_MAX`.
///
/// Every write clamps, so no sequence of operations can move a value out of
/// range. Deserialization clamps too: a persisted `-3` loads as `0`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, i64>", into = "BTreeMap<String, i64>")]
pub struct RelationshipState {
    stats: BTreeMap<String, u8>,
}

impl RelationshipState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a state with every named stat at `value` (clamped)
    pub fn uniform<S: AsRef<str>>(stats: &[S], value: u8) -> Self {
        let mut state = Self::new();
        for stat in stats {
            state.set(stat.as_ref(), value as i64);
        }
        state
    }

    /// Current value of a stat, if present
    pub fn get(&self, stat: &str) -> Option<u8> {
        self.stats.get(stat).copied()
    }

    /// Current value of a stat, or `default` (clamped) when absent
    pub fn value_or(&self, stat: &str, default: u8) -> u8 {
        self.get(stat).unwrap_or_else(|| clamp_stat(default as i64))
    }

    /// Whether the stat is present
    pub fn contains(&self, stat: &str) -> bool {
        self.stats.contains_key(stat)
    }

    /// Set a stat, clamping into range. Returns the stored value.
    pub fn set(&mut self, stat: impl Into<String>, value: i64) -> u8 {
        let value = clamp_stat(value);
        self.stats.insert(stat.into(), value);
        value
    }

    /// Add `delta` to a stat (absent stats start from `default`), clamping
    /// into range. Returns the stored value.
    pub fn adjust(&mut self, stat: &str, delta: i64, default: u8) -> u8 {
        let current = self.value_or(stat, default) as i64;
        self.set(stat, current.saturating_add(delta))
    }

    /// Insert `value` for a stat only if it is absent
    pub fn fill(&mut self, stat: &str, value: u8) {
        if !self.contains(stat) {
            self.set(stat, value as i64);
        }
    }

    /// Iterate over (stat, value) pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u8)> {
        self.stats.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of stats
    pub fn len(&self) -> usize {
        self.stats.len()
    }

    /// Whether the state has no stats
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}

impl From<BTreeMap<String, i64>> for RelationshipState {
    fn from(raw: BTreeMap<String, i64>) -> Self {
        let mut state = Self::new();
        for (stat, value) in raw {
            let stored = state.set(stat.as_str(), value);
            if stored as i64 != value {
                tracing::warn!(
                    stat = %stat,
                    found = value,
                    stored,
                    "Relationship stat out of range, clamped"
                );
            }
        }
        state
    }
}

impl From<RelationshipState> for BTreeMap<String, i64> {
    fn from(state: RelationshipState) -> Self {
        state
            .stats
            .into_iter()
            .map(|(k, v)| (k, v as i64))
            .collect()
    }
}

impl<S: Into<String>> FromIterator<(S, i64)> for RelationshipState {
    fn from_iter<I: IntoIterator<Item = (S, i64)>>(iter: I) -> Self {
        let mut state = Self::new();
        for (stat, value) in iter {
            state.set(stat, value);
        }
        state
    }
}

impl std::fmt::Display for RelationshipState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{}", parts.join(", "))
    }
}
