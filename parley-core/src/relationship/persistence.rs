//! Relationship state persistence backends

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{ParleyError, Result};

use super::state::RelationshipState;

/// Read/write store of relationship state keyed by character identifier
pub trait RelationshipPersistence: Send + Sync {
    /// Persisted state for a character, `None` if there is none
    fn get(&self, character_id: &str) -> Result<Option<RelationshipState>>;

    /// Replace the persisted state for a character
    fn put(&self, character_id: &str, state: &RelationshipState) -> Result<()>;
}

/// Reject identifiers that would escape the storage directory
pub(crate) fn check_character_id(character_id: &str) -> Result<()> {
    let invalid = character_id.trim().is_empty()
        || character_id.contains(['/', '\\', '\0'])
        || character_id == "."
        || character_id == "..";

    if invalid {
        return Err(ParleyError::InvalidInput(format!(
            "invalid character identifier {character_id:?}"
        )));
    }
    Ok(())
}

/// One flat JSON object per character at `<dir>/<id>_memory.json`
#[derive(Debug, Clone)]
pub struct JsonFileRelationships {
    dir: PathBuf,
}

impl JsonFileRelationships {
    /// Store files under `dir` (created on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Storage directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding a character's state
    pub fn path_for(&self, character_id: &str) -> PathBuf {
        self.dir.join(format!("{character_id}_memory.json"))
    }
}

impl RelationshipPersistence for JsonFileRelationships {
    fn get(&self, character_id: &str) -> Result<Option<RelationshipState>> {
        check_character_id(character_id)?;
        let path = self.path_for(character_id);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)?;
        let state: RelationshipState = serde_json::from_str(&content)?;
        tracing::debug!(path = %path.display(), %state, "Loaded relationship state");
        Ok(Some(state))
    }

    fn put(&self, character_id: &str, state: &RelationshipState) -> Result<()> {
        check_character_id(character_id)?;
        let path = self.path_for(character_id);
        let write_err = |e: std::io::Error| {
            ParleyError::PersistenceWrite(format!("{}: {}", path.display(), e))
        };

        std::fs::create_dir_all(&self.dir).map_err(write_err)?;

        // Write beside the target then rename, so a crash never leaves a
        // truncated state file.
        let content = serde_json::to_string_pretty(state)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(write_err)?;
        std::fs::rename(&tmp, &path).map_err(write_err)?;

        tracing::debug!(path = %path.display(), %state, "Persisted relationship state");
        Ok(())
    }
}

/// In-memory persistence, for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct InMemoryRelationships {
    states: RwLock<HashMap<String, RelationshipState>>,
}

impl InMemoryRelationships {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a character's state
    pub fn with_state(self, character_id: impl Into<String>, state: RelationshipState) -> Self {
        if let Ok(mut states) = self.states.write() {
            states.insert(character_id.into(), state);
        }
        self
    }
}

impl RelationshipPersistence for InMemoryRelationships {
    fn get(&self, character_id: &str) -> Result<Option<RelationshipState>> {
        let states = self
            .states
            .read()
            .map_err(|e| ParleyError::Other(format!("relationship store poisoned: {e}")))?;
        Ok(states.get(character_id).cloned())
    }

    fn put(&self, character_id: &str, state: &RelationshipState) -> Result<()> {
        let mut states = self
            .states
            .write()
            .map_err(|e| ParleyError::PersistenceWrite(format!("relationship store poisoned: {e}")))?;
        states.insert(character_id.to_string(), state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_json_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileRelationships::new(dir.path().join("logs"));
        let state: RelationshipState = [("trust", 3), ("attraction", 8)].into_iter().collect();

        assert_eq!(store.get("superman").unwrap(), None);
        store.put("superman", &state).unwrap();
        assert_eq!(store.get("superman").unwrap(), Some(state));
        assert!(dir.path().join("logs/superman_memory.json").exists());
        assert!(!dir.path().join("logs/superman_memory.json.tmp").exists());
    }

    #[test]
    fn test_json_file_is_flat_object() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileRelationships::new(dir.path());
        let state: RelationshipState = [("trust", 5)].into_iter().collect();
        store.put("batman", &state).unwrap();

        let raw = std::fs::read_to_string(store.path_for("batman")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, serde_json::json!({"trust": 5}));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileRelationships::new(dir.path());
        std::fs::write(store.path_for("joker"), "not json").unwrap();
        assert!(matches!(
            store.get("joker"),
            Err(ParleyError::Serialization(_))
        ));
    }

    #[test]
    fn test_rejects_path_like_ids() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileRelationships::new(dir.path());
        let state = RelationshipState::new();
        assert!(store.put("../escape", &state).is_err());
        assert!(store.get("").is_err());
    }

    #[test]
    fn test_write_failure_is_persistence_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not a directory").unwrap();
        let store = JsonFileRelationships::new(blocker.join("nested"));

        let result = store.put("superman", &RelationshipState::new());
        assert!(matches!(result, Err(ParleyError::PersistenceWrite(_))));
    }

    #[test]
    fn test_in_memory_round_trip() {
        let state: RelationshipState = [("trust", 9)].into_iter().collect();
        let store = InMemoryRelationships::new().with_state("wonder_woman", state.clone());
        assert_eq!(store.get("wonder_woman").unwrap(), Some(state));
        assert_eq!(store.get("flash").unwrap(), None);
    }
}
