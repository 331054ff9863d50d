// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Error types for schema operations.

use thiserror::Error;

/// Errors that can occur during schema operations.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Failed to parse YAML schema definition.
    #[error("failed to parse schema YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Schema file not found.
    #[error("schema file not found: {path}")]
    FileNotFound { path: String },

    /// Failed to read schema file.
    #[error("failed to read schema file: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid schema name format.
    #[error("invalid schema name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Missing required field in schema.
    #[error("missing required field '{field}' in schema")]
    MissingField { field: String },

    /// Schema not found in registry.
    #[error("schema '{name}' not found in registry")]
    NotFound { name: String },

    /// Schema registered twice under the same full name.
    #[error("schema '{name}' is already registered")]
    AlreadyRegistered { name: String },

    /// Argument key that the schema does not declare.
    #[error("schema '{schema}' has no field '{field}'. Valid fields: {}", valid.join(", "))]
    UnknownField {
        schema: String,
        field: String,
        valid: Vec<String>,
    },

    /// Argument value that does not fit the declared field type.
    #[error("field '{field}' of schema '{schema}' expects {expected}, got {found}")]
    TypeMismatch {
        schema: String,
        field: String,
        expected: String,
        found: String,
    },

    /// MessagePack encode/decode failure.
    #[error("payload codec failed: {0}")]
    Codec(String),
}

/// Result type alias for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
