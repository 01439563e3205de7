//! Configuration types for Parley

use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::catalog::CatalogConfig;
use crate::classifier::{ClassifierStrategy, Vocabulary};
use crate::error::{ParleyError, Result};
use crate::relationship::RelationshipConfig;
use crate::responder::{PersonaRule, ResponseTemplates};
use crate::session::SessionConfig;

/// Configuration file name looked up in the config directories
pub const CONFIG_FILE_NAME: &str = "parley.toml";

/// Environment variable naming an extra configuration file
pub const CONFIG_PATH_ENV: &str = "PARLEY_CONFIG_PATH";

/// Prefix of environment overrides, nested with `__`
pub const ENV_PREFIX: &str = "PARLEY_";

/// Main configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ParleyConfig {
    /// Classifier selection
    pub classifier: ClassifierConfig,

    /// Classification vocabulary
    pub vocabulary: Vocabulary,

    /// Relationship defaults and update rules
    pub relationship: RelationshipConfig,

    /// Default persona selection
    pub persona: PersonaRule,

    /// Reply templates
    pub responses: ResponseTemplates,

    /// Turn loop settings
    pub session: SessionConfig,

    /// File locations
    pub storage: StorageConfig,

    /// Remote character catalog
    pub catalog: CatalogConfig,
}

/// Classifier configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Which classifier to build
    pub strategy: ClassifierStrategy,

    /// Vocabulary file (TOML, YAML or JSON) used instead of the
    /// `[vocabulary]` section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocabulary_file: Option<PathBuf>,
}

/// Where profiles, relationship state and transcripts live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Character profiles, one `<id>.json` each
    pub characters_dir: PathBuf,

    /// Relationship state, one `<id>_memory.json` each
    pub state_dir: PathBuf,

    /// Session transcripts
    pub transcript_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            characters_dir: PathBuf::from("characters"),
            state_dir: PathBuf::from("logs"),
            transcript_dir: PathBuf::from("logs"),
        }
    }
}

impl StorageConfig {
    fn validate(&self) -> Result<()> {
        let blank = [
            ("characters_dir", &self.characters_dir),
            ("state_dir", &self.state_dir),
            ("transcript_dir", &self.transcript_dir),
        ]
        .into_iter()
        .find(|(_, dir)| dir.as_os_str().is_empty());

        match blank {
            Some((field, _)) => Err(ParleyError::Configuration(format!(
                "storage.{field} must not be empty"
            ))),
            None => Ok(()),
        }
    }
}

impl ParleyConfig {
    /// Load configuration from the standard locations.
    ///
    /// Loads in this order, later sources overriding earlier ones:
    /// 1. Default configuration
    /// 2. `parley.toml` in the user config directory
    /// 3. `parley.toml` in the working directory
    /// 4. The file named by `PARLEY_CONFIG_PATH`
    /// 5. `PARLEY_` environment variables (`PARLEY_SESSION__PERSIST_EVERY_TURN=false`)
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a source is malformed or the result
    /// fails validation.
    pub fn load() -> Result<Self> {
        Self::load_with(None)
    }

    /// Like [`load`](Self::load), with `path` taking the place of
    /// `PARLEY_CONFIG_PATH` when given.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `path` does not exist, a source is
    /// malformed, or the result fails validation.
    pub fn load_with(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path
            && !path.exists()
        {
            return Err(ParleyError::Configuration(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        Self::extract(Self::layered(path, ENV_PREFIX))
    }

    fn layered(explicit: Option<&Path>, env_prefix: &str) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(ParleyConfig::default()));

        if let Some(dir) = dirs::config_dir() {
            figment = figment.merge(Toml::file(dir.join("parley").join(CONFIG_FILE_NAME)));
        }
        figment = figment.merge(Toml::file(CONFIG_FILE_NAME));

        let extra = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));
        if let Some(path) = extra {
            tracing::debug!(path = %path.display(), "Using configuration file");
            figment = merge_by_extension(figment, &path);
        }

        figment.merge(Env::prefixed(env_prefix).split("__"))
    }

    /// Load configuration from a single file. TOML by default; `.yaml`,
    /// `.yml` and `.json` files are read as such.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or fails
    /// validation.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ParleyError::Configuration(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        let figment = Figment::from(Serialized::defaults(ParleyConfig::default()));
        Self::extract(merge_by_extension(figment, path))
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: ParleyConfig = figment.extract().map_err(|e| {
            ParleyError::Configuration(format!("Failed to load configuration: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// The classification vocabulary: the file named by
    /// `classifier.vocabulary_file` when set, the `[vocabulary]` section
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file is missing or malformed.
    pub fn resolve_vocabulary(&self) -> Result<Vocabulary> {
        match &self.classifier.vocabulary_file {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading vocabulary file");
                Vocabulary::from_file(path)
            }
            None => Ok(self.vocabulary.clone()),
        }
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error found.
    pub fn validate(&self) -> Result<()> {
        self.vocabulary.validate()?;
        self.relationship.validate()?;
        self.persona.validate()?;
        self.responses.validate()?;
        self.session.validate()?;
        self.storage.validate()?;
        self.catalog.validate()?;

        if !self.relationship.stats.contains(&self.persona.stat) {
            tracing::warn!(
                stat = %self.persona.stat,
                "Persona stat is not a recognized relationship stat; the initial value will be assumed"
            );
        }
        Ok(())
    }
}

fn merge_by_extension(figment: Figment, path: &Path) -> Figment {
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => figment.merge(Toml::file(path)),
    }
}
