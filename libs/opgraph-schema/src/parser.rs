// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! YAML schema parsing.

use crate::definition::{Field, SchemaDefinition};
use crate::error::{Result, SchemaError};
use std::collections::HashSet;
use std::path::Path;

/// Parse a schema from a YAML string.
pub fn parse_yaml(yaml: &str) -> Result<SchemaDefinition> {
    let schema: SchemaDefinition = serde_yaml::from_str(yaml)?;
    validate_schema(&schema)?;
    Ok(schema)
}

/// Parse a schema from a YAML file.
pub fn parse_yaml_file(path: &Path) -> Result<SchemaDefinition> {
    let yaml = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SchemaError::FileNotFound {
                path: path.display().to_string(),
            }
        } else {
            SchemaError::IoError(e)
        }
    })?;

    parse_yaml(&yaml)
}

/// Validate a parsed schema.
fn validate_schema(schema: &SchemaDefinition) -> Result<()> {
    // Validate name format (reverse domain notation)
    if schema.name.is_empty() {
        return Err(SchemaError::MissingField {
            field: "name".to_string(),
        });
    }

    if !schema.name.contains('.') || schema.name.contains('@') {
        return Err(SchemaError::InvalidName {
            name: schema.name.clone(),
            reason: "must use reverse domain notation (e.g., com.example.myschema)".to_string(),
        });
    }

    // Validate version format (semver-like)
    if schema.version.is_empty() {
        return Err(SchemaError::MissingField {
            field: "version".to_string(),
        });
    }

    let version_parts: Vec<&str> = schema.version.split('.').collect();
    if version_parts.len() < 2 || version_parts.len() > 3 {
        return Err(SchemaError::InvalidName {
            name: schema.version.clone(),
            reason: "version must be in format X.Y or X.Y.Z".to_string(),
        });
    }

    for part in &version_parts {
        if part.parse::<u32>().is_err() {
            return Err(SchemaError::InvalidName {
                name: schema.version.clone(),
                reason: "version parts must be numeric".to_string(),
            });
        }
    }

    validate_fields(&schema.fields, &schema.name)
}

/// Validate fields recursively.
fn validate_fields(fields: &[Field], schema_name: &str) -> Result<()> {
    let mut seen = HashSet::new();

    for field in fields {
        if field.name.is_empty() {
            return Err(SchemaError::InvalidName {
                name: schema_name.to_string(),
                reason: "field name cannot be empty".to_string(),
            });
        }

        if !seen.insert(field.name.as_str()) {
            return Err(SchemaError::InvalidName {
                name: schema_name.to_string(),
                reason: format!("field '{}' is declared twice", field.name),
            });
        }

        if !field.field_type.is_known() {
            return Err(SchemaError::InvalidName {
                name: schema_name.to_string(),
                reason: format!(
                    "field '{}' has unsupported type '{}'",
                    field.name,
                    field.field_type.type_name()
                ),
            });
        }

        // Recursively validate nested fields
        if !field.fields.is_empty() {
            validate_fields(&field.fields, schema_name)?;
        }
    }

    Ok(())
}
