use thiserror::Error;

use mockstory_core::MockError;

/// Errors emitted while resolving instances and mutating stories.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Mock(#[from] MockError),
    #[error("unknown generator '{0}'")]
    UnknownGenerator(String),
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error("unknown story slot '{0}'")]
    UnknownSlot(String),
    #[error("story slot '{0}' is already taken")]
    DuplicateSlot(String),
    #[error("no '{trigger}' action on '{owner}' for '{related}'")]
    NoMatchingAction {
        owner: String,
        trigger: String,
        related: String,
    },
    #[error("invalid collection '{field}': {reason}")]
    InvalidCollection { field: String, reason: String },
    #[error("referential integrity violated: {0}")]
    ReferentialIntegrity(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}
