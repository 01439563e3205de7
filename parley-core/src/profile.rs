//! Character profiles and where they come from

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::error::{ParleyError, Result};
use crate::relationship::check_character_id;

/// Name used when a profile has none
pub const NAME_PLACEHOLDER: &str = "Unknown";

/// A response style variant of a character
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PersonaProfile {
    /// Shown to the user as a persona tag when non-empty
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,

    /// Stat that gates this persona (defaults to the configured rule's stat)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stat: Option<String>,

    /// Lowest stat value at which this persona applies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u8>,
}

impl PersonaProfile {
    /// Persona with a description and no threshold of its own
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            stat: None,
            min: None,
        }
    }

    /// Gate the persona on `stat >= min`
    pub fn with_threshold(mut self, stat: impl Into<String>, min: u8) -> Self {
        self.stat = Some(stat.into());
        self.min = Some(min);
        self
    }
}

/// Read-only record describing a character
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CharacterProfile {
    /// Display name
    #[serde(default)]
    pub name: Option<String>,

    /// Secret identity or legal name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_name: Option<String>,

    /// Other names; accepts a list or one newline-separated string
    #[serde(default, deserialize_with = "string_or_list")]
    pub aliases: Vec<String>,

    /// Short description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Power names
    #[serde(default, deserialize_with = "null_as_default")]
    pub powers: Vec<String>,

    /// Persona key -> persona
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub personas: BTreeMap<String, PersonaProfile>,
}

impl CharacterProfile {
    /// Profile with just a name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Add a persona
    pub fn with_persona(mut self, key: impl Into<String>, persona: PersonaProfile) -> Self {
        self.personas.insert(key.into(), persona);
        self
    }

    /// The name, or [`NAME_PLACEHOLDER`] when missing or blank
    pub fn display_name(&self) -> &str {
        self.display_name_or(NAME_PLACEHOLDER)
    }

    /// The name, or `placeholder` when missing or blank
    pub fn display_name_or<'a>(&'a self, placeholder: &'a str) -> &'a str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(placeholder)
    }

    /// Look up a persona by key
    pub fn persona(&self, key: &str) -> Option<&PersonaProfile> {
        self.personas.get(key)
    }

    /// Name, real name and aliases, without blanks or duplicates
    pub fn known_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let candidates = self
            .name
            .iter()
            .chain(self.real_name.iter())
            .chain(self.aliases.iter());
        for name in candidates {
            let name = name.trim();
            if !name.is_empty() && !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                names.push(name.to_string());
            }
        }
        names
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Aliases {
        Text(String),
        List(Vec<String>),
    }

    let aliases = match Option::<Aliases>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Aliases::Text(text)) => text.lines().map(str::to_string).collect(),
        Some(Aliases::List(list)) => list,
    };

    Ok(aliases
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect())
}

/// File-name slug for a character name: lower-cased, spaces to underscores
pub fn slugify(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Source of character profiles addressed by identifier
pub trait ProfileSource: Send + Sync {
    /// Profile for a character, `None` if there is none
    fn get(&self, character_id: &str) -> Result<Option<CharacterProfile>>;

    /// Profile for a character, or [`ParleyError::ProfileNotFound`]
    fn require(&self, character_id: &str) -> Result<CharacterProfile> {
        self.get(character_id)?
            .ok_or_else(|| ParleyError::ProfileNotFound(character_id.to_string()))
    }
}

/// Profiles stored as `<dir>/<id>.json`
#[derive(Debug, Clone)]
pub struct JsonProfileDirectory {
    dir: PathBuf,
}

impl JsonProfileDirectory {
    /// Read and write profiles under `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Profile directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding a character's profile
    pub fn path_for(&self, character_id: &str) -> PathBuf {
        self.dir.join(format!("{character_id}.json"))
    }

    /// Save a profile as pretty JSON under the slug of `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the slug is unusable or the file cannot be written.
    pub fn save(&self, name: &str, profile: &CharacterProfile) -> Result<PathBuf> {
        let slug = slugify(name);
        check_character_id(&slug)?;

        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&slug);
        std::fs::write(&path, serde_json::to_string_pretty(profile)?)?;
        tracing::info!(path = %path.display(), "Saved character profile");
        Ok(path)
    }
}

impl ProfileSource for JsonProfileDirectory {
    fn get(&self, character_id: &str) -> Result<Option<CharacterProfile>> {
        check_character_id(character_id)?;
        let path = self.path_for(character_id);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No profile file");
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)?;
        let profile = serde_json::from_str(&content)?;
        Ok(Some(profile))
    }
}

/// Profiles held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryProfiles {
    profiles: HashMap<String, CharacterProfile>,
}

impl InMemoryProfiles {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a profile
    pub fn with_profile(mut self, character_id: impl Into<String>, profile: CharacterProfile) -> Self {
        self.profiles.insert(character_id.into(), profile);
        self
    }
}

impl ProfileSource for InMemoryProfiles {
    fn get(&self, character_id: &str) -> Result<Option<CharacterProfile>> {
        Ok(self.profiles.get(character_id).cloned())
    }
}
