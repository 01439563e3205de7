//! # Parley - Turn-based conversations with fictional characters
//!
//! Each turn of a Parley conversation runs one fixed pipeline:
//! - classify the utterance into a signal tuple (intent, emotion, tone, target)
//! - update the per-character relationship state (trust, attraction, ...)
//! - render a persona-conditioned reply from templates
//! - record both lines in the session transcript
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parley_core::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let config = ParleyConfig::load()?;
//!     let mut session = SessionBuilder::from_config(&config)?.start("superman")?;
//!
//!     let stdin = std::io::stdin();
//!     let summary = session.run(stdin.lock(), std::io::stdout())?;
//!     println!("{} turns", summary.turns);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Classifier**: pluggable strategies behind [`classifier::UtteranceClassifier`]
//! - **Relationship**: clamped stats, configurable update rules, file or
//!   in-memory persistence
//! - **Responder**: intent/emotion templates and threshold-selected personas
//! - **Session**: the sequential turn loop, transcript and end-of-session
//!   persistence
//! - **Catalog**: fetches character profiles from ComicVine

pub mod catalog;
pub mod classifier;
pub mod config;
pub mod error;
pub mod profile;
pub mod relationship;
pub mod responder;
pub mod session;
pub mod transcript;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::catalog::{CatalogConfig, CharacterCatalog, ComicVineCatalog};
    pub use crate::classifier::{
        ClassifierStrategy, Emotion, Intent, LexicalClassifier, LinguisticClassifier, SignalTuple,
        Tone, UtteranceClassifier, Vocabulary, build_classifier,
    };
    pub use crate::config::{ClassifierConfig, ParleyConfig, StorageConfig};
    pub use crate::error::{ParleyError, Result};
    pub use crate::profile::{
        CharacterProfile, InMemoryProfiles, JsonProfileDirectory, PersonaProfile, ProfileSource,
    };
    pub use crate::relationship::{
        InMemoryRelationships, JsonFileRelationships, RelationshipConfig, RelationshipPersistence,
        RelationshipState, RelationshipStore, UpdateRule,
    };
    pub use crate::responder::{PersonaRule, ResponseGenerator, ResponseTemplates};
    pub use crate::session::{
        ConversationSession, SessionBuilder, SessionConfig, SessionSummary, TurnOutcome, TurnState,
    };
    pub use crate::transcript::{FileTranscript, MemoryTranscript, TranscriptSink};
}
