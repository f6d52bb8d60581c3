//! Error types for nlsql.

use thiserror::Error;

/// The main error type for nlsql operations.
#[derive(Debug, Error)]
pub enum NlSqlError {
    /// No entity alias matched and the schema has more than one entity.
    #[error(
        "Could not determine which entity (e.g. members, orders) the request is about. \
         Please mention the entity name more explicitly or configure more aliases."
    )]
    AmbiguousOrUnknownRequest,

    /// The intent names an entity that has no table configured.
    #[error("No table configured for entity '{entity}'")]
    MissingSchemaMapping { entity: String },

    /// Operator and value shape do not fit together.
    #[error("Invalid intent: {0}")]
    InvalidIntent(String),

    /// Schema document could not be read or parsed.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Settings file could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NlSqlError {
    /// Create a missing-table error for the given entity.
    pub fn missing_mapping(entity: impl Into<String>) -> Self {
        Self::MissingSchemaMapping {
            entity: entity.into(),
        }
    }

    /// Whether the caller should re-prompt the user rather than fix configuration.
    pub fn is_request_error(&self) -> bool {
        matches!(self, Self::AmbiguousOrUnknownRequest | Self::InvalidIntent(_))
    }
}

/// Result type alias for nlsql operations.
pub type NlSqlResult<T> = Result<T, NlSqlError>;
