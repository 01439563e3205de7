//! Relationship State
//!
//! Per-character mapping of named stats (trust, attraction, ...) to integers
//! in `0..=10`, updated once per turn from the classifier's signal tuple.
//!
//! - [`RelationshipState`] clamps on every write.
//! - [`UpdateRule`]s are configuration: every rule whose conditions match the
//!   signal fires.
//! - [`RelationshipStore`] loads state (defaults on first contact), applies
//!   rules as a pure transform, and persists through a
//!   [`RelationshipPersistence`] backend.

mod persistence;
mod rules;
mod state;
mod store;

pub use persistence::{InMemoryRelationships, JsonFileRelationships, RelationshipPersistence};
pub(crate) use persistence::check_character_id;
pub use rules::{RelationshipConfig, UpdateRule};
pub use state::{RelationshipState, STAT_MAX, STAT_MIN, clamp_stat};
pub use store::RelationshipStore;
