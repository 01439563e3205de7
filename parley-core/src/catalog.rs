//! Remote character catalog
//!
//! Looks characters up by name in the ComicVine API and maps the result into
//! a [`CharacterProfile`] ready to be saved in the profile directory.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

use crate::error::{ParleyError, Result};
use crate::profile::CharacterProfile;

/// ComicVine API root
pub const DEFAULT_BASE_URL: &str = "https://comicvine.gamespot.com/api";

/// ComicVine reports success with status code 1
const STATUS_OK: i64 = 1;

/// Catalog connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// API root
    pub base_url: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// User-Agent sent with every request
    pub user_agent: String,

    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: "COMICVINE_API_KEY".to_string(),
            user_agent: format!("parley/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(30),
        }
    }
}

impl CatalogConfig {
    /// Check the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for blank fields or a zero timeout.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() || self.api_key_env.trim().is_empty() {
            return Err(ParleyError::Configuration(
                "catalog.base_url and catalog.api_key_env must not be empty".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(ParleyError::Configuration(
                "catalog.timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// A searchable source of character records
#[async_trait]
pub trait CharacterCatalog: Send + Sync {
    /// Best match for `name`, `None` if the catalog has none
    async fn find(&self, name: &str) -> Result<Option<CharacterProfile>>;
}

/// ComicVine-backed catalog
#[derive(Debug, Clone)]
pub struct ComicVineCatalog {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl ComicVineCatalog {
    /// Create a catalog client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>, config: &CatalogConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .map_err(|e| ParleyError::Catalog(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create from the environment variable named by `config.api_key_env`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the variable is unset or empty.
    pub fn from_env(config: &CatalogConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ParleyError::Configuration(format!(
                    "{} environment variable not set",
                    config.api_key_env
                ))
            })?;
        Self::new(api_key, config)
    }

    /// API root in use
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<ApiResponse<T>> {
        let response = self
            .client
            .get(url)
            .query(&[("api_key", self.api_key.as_str()), ("format", "json")])
            .query(query)
            .send()
            .await
            .map_err(|e| ParleyError::Catalog(format!("Failed to send request to catalog: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ParleyError::Catalog(format!(
                "Catalog API error ({}): {}",
                status, text
            )));
        }

        let body: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| ParleyError::Catalog(format!("Failed to parse catalog response: {}", e)))?;
        body.check()?;
        Ok(body)
    }
}

#[async_trait]
impl CharacterCatalog for ComicVineCatalog {
    async fn find(&self, name: &str) -> Result<Option<CharacterProfile>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ParleyError::InvalidInput(
                "character name must not be empty".to_string(),
            ));
        }

        let url = format!("{}/search/", self.base_url);
        tracing::info!(%name, "Searching character catalog");
        let search: ApiResponse<Vec<SearchHit>> = self
            .get(&url, &[("resources", "character"), ("query", name)])
            .await?;

        let Some(detail_url) = first_detail_url(search.results.unwrap_or_default())? else {
            tracing::info!(%name, "No catalog match");
            return Ok(None);
        };

        tracing::debug!(%detail_url, "Fetching character detail");
        let detail: ApiResponse<CharacterDetail> = self.get(&detail_url, &[]).await?;
        let detail = detail.results.ok_or_else(|| {
            ParleyError::Catalog("Catalog detail response had no results".to_string())
        })?;

        Ok(Some(profile_from_detail(detail)))
    }
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct ApiResponse<T> {
    error: Option<String>,
    status_code: Option<i64>,
    /// Failed lookups carry `[]` here whatever the resource type
    #[serde(default, deserialize_with = "empty_array_as_none")]
    results: Option<T>,
}

fn empty_array_as_none<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Array(items)) if items.is_empty() => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

impl<T> ApiResponse<T> {
    fn check(&self) -> Result<()> {
        match self.status_code {
            Some(code) if code != STATUS_OK => Err(ParleyError::Catalog(format!(
                "Catalog rejected request ({}): {}",
                code,
                self.error.as_deref().unwrap_or("unknown error")
            ))),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    api_detail_url: Option<String>,
}

/// Character record as the catalog returns it
#[derive(Debug, Default, Deserialize)]
pub struct CharacterDetail {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    real_name: Option<String>,
    #[serde(default)]
    aliases: Option<String>,
    #[serde(default)]
    deck: Option<String>,
    #[serde(default)]
    powers: Option<Vec<NamedRef>>,
}

#[derive(Debug, Deserialize)]
struct NamedRef {
    #[serde(default)]
    name: Option<String>,
}

fn first_detail_url(hits: Vec<SearchHit>) -> Result<Option<String>> {
    let Some(first) = hits.into_iter().next() else {
        return Ok(None);
    };
    first
        .api_detail_url
        .filter(|url| !url.trim().is_empty())
        .map(Some)
        .ok_or_else(|| ParleyError::Catalog("Character result missing detail URL".to_string()))
}

/// Map a catalog record to a profile: `deck` becomes the description and
/// the newline-separated alias string becomes a list.
pub fn profile_from_detail(detail: CharacterDetail) -> CharacterProfile {
    let non_blank = |s: String| {
        let trimmed = s.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    };

    CharacterProfile {
        name: detail.name.and_then(non_blank),
        real_name: detail.real_name.and_then(non_blank),
        aliases: detail
            .aliases
            .unwrap_or_default()
            .lines()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect(),
        description: detail.deck.and_then(non_blank),
        powers: detail
            .powers
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.name.and_then(non_blank))
            .collect(),
        personas: Default::default(),
    }
}
