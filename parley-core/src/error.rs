//! Error types for Parley operations

/// Result type for Parley operations
pub type Result<T> = std::result::Result<T, ParleyError>;

/// Error types for the conversation engine
#[derive(Debug, thiserror::Error)]
pub enum ParleyError {
    /// No profile exists for the requested character identifier
    #[error("Character profile '{0}' not found")]
    ProfileNotFound(String),

    /// Turn input was not valid text
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Relationship state or transcript could not be written
    #[error("Persistence write failed: {0}")]
    PersistenceWrite(String),

    /// Vocabulary, persona or other configuration is missing or malformed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Remote character catalog request failed
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl ParleyError {
    /// Whether the error prevents a session from starting or continuing.
    ///
    /// Invalid input and persistence failures are recoverable: the turn loop
    /// reports them and carries on.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ParleyError::ProfileNotFound(_) | ParleyError::Configuration(_)
        )
    }
}

impl From<String> for ParleyError {
    fn from(s: String) -> Self {
        ParleyError::Other(s)
    }
}

impl From<&str> for ParleyError {
    fn from(s: &str) -> Self {
        ParleyError::Other(s.to_string())
    }
}

impl From<anyhow::Error> for ParleyError {
    fn from(err: anyhow::Error) -> Self {
        ParleyError::Other(err.to_string())
    }
}

impl From<figment::Error> for ParleyError {
    fn from(err: figment::Error) -> Self {
        ParleyError::Configuration(err.to_string())
    }
}
