//! Conclave Common Error Types
//!
//! Centralized error handling for all Conclave components

use std::time::Duration;

/// Main error type for Conclave operations
#[derive(Debug, thiserror::Error)]
pub enum ConclaveError {
    /// Caller supplied unusable input (e.g. empty user text)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A fully assembled prompt was empty
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A command referenced an agent that is not registered
    #[error("unresolved agent reference: {0}")]
    UnresolvedReference(String),

    /// A command line violated the command grammar
    #[error("malformed command: {0}")]
    MalformedCommand(String),

    /// Missing prompt templates, credentials or invalid limits
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Failure reported by the generation service
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),

    /// IO-related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Configuration file parse errors
    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Errors surfaced by a generation service call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Quota or rate-limit exhaustion on the provider side
    #[error("quota exhausted: {0}")]
    Quota(String),

    /// The call exceeded its deadline
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    /// Any other provider failure
    #[error("service failure: {0}")]
    Service(String),

    /// The service is not usable with the current configuration
    #[error("service misconfigured: {0}")]
    Configuration(String),
}

impl GenerationError {
    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, GenerationError::Quota(_))
    }
}

/// Convenience result type for Conclave operations
pub type Result<T> = std::result::Result<T, ConclaveError>;
