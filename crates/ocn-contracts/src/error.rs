//! Error types for contract validation
//!
//! Only configuration problems are errors. A document or envelope that fails
//! validation is reported as data in a [`crate::ValidationResult`].

use thiserror::Error;

use crate::key::SchemaKey;

/// Main error type for contract operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    /// No schema is bound or resolvable for the key
    #[error("Schema not found: {key}")]
    SchemaNotFound { key: String },

    /// The schema document is not JSON or not a supported JSON Schema
    #[error("Invalid schema {key}: {message}")]
    SchemaParseError { key: String, message: String },

    /// The event type was never registered
    #[error("Unknown CloudEvent type: {0}")]
    UnknownEventType(String),

    /// Reading schema storage failed for a reason other than absence
    #[error("I/O error reading {path}: {message}")]
    Io { path: String, message: String },
}

impl ContractError {
    /// Create a schema-not-found error
    pub fn schema_not_found(key: &SchemaKey) -> Self {
        ContractError::SchemaNotFound {
            key: key.to_string(),
        }
    }

    /// Create a schema parse error
    pub fn schema_parse(key: &SchemaKey, message: impl Into<String>) -> Self {
        ContractError::SchemaParseError {
            key: key.to_string(),
            message: message.into(),
        }
    }

    /// Create an unknown event type error
    pub fn unknown_event_type(event_type: impl Into<String>) -> Self {
        ContractError::UnknownEventType(event_type.into())
    }

    /// Check if this error stems from registry or schema configuration
    /// rather than from the data being validated.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ContractError::SchemaNotFound { .. }
                | ContractError::SchemaParseError { .. }
                | ContractError::UnknownEventType(_)
                | ContractError::Io { .. }
        )
    }
}

/// Result type alias for contract operations
pub type Result<T> = std::result::Result<T, ContractError>;
