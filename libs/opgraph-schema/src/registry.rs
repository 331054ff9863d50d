// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! In-memory schema registry.

use crate::codec::{decode_with_schema, encode_with_schema, ArgBag};
use crate::definition::SchemaDefinition;
use crate::error::{Result, SchemaError};
use crate::parser::{parse_yaml, parse_yaml_file};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Schemas keyed by full name (`name@version`).
///
/// Lookups accept either the full name or the bare name; a bare name resolves
/// to the newest registered version.
#[derive(Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<SchemaDefinition>>,
}

impl SchemaRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parsed schema. Full names are write-once.
    pub fn register(&mut self, schema: SchemaDefinition) -> Result<Arc<SchemaDefinition>> {
        let full_name = schema.full_name();
        if self.schemas.contains_key(&full_name) {
            return Err(SchemaError::AlreadyRegistered { name: full_name });
        }

        tracing::debug!("Registered schema: {}", full_name);
        let schema = Arc::new(schema);
        self.schemas.insert(full_name, schema.clone());
        Ok(schema)
    }

    /// Register a schema from YAML content.
    pub fn register_yaml(&mut self, yaml: &str) -> Result<Arc<SchemaDefinition>> {
        self.register(parse_yaml(yaml)?)
    }

    /// Register a schema from a local YAML file.
    pub fn register_file(&mut self, path: &Path) -> Result<Arc<SchemaDefinition>> {
        self.register(parse_yaml_file(path)?)
    }

    /// Get a schema by full or bare name.
    pub fn get(&self, name: &str) -> Option<Arc<SchemaDefinition>> {
        if let Some(schema) = self.schemas.get(name) {
            return Some(schema.clone());
        }
        if name.contains('@') {
            return None;
        }

        self.schemas
            .values()
            .filter(|s| s.name == name)
            .max_by_key(|s| s.version_key())
            .cloned()
    }

    /// Like [`get`](Self::get), but a missing schema is an error.
    pub fn resolve(&self, name: &str) -> Result<Arc<SchemaDefinition>> {
        self.get(name).ok_or_else(|| SchemaError::NotFound {
            name: name.to_string(),
        })
    }

    /// Top-level field names of a schema, in declaration order.
    pub fn field_names(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.resolve(name)?.field_names())
    }

    /// Encode a keyed bag with the named schema.
    pub fn encode(&self, name: &str, bag: &ArgBag) -> Result<Vec<u8>> {
        let schema = self.resolve(name)?;
        encode_with_schema(&schema, bag)
    }

    /// Decode a payload produced by [`encode`](Self::encode).
    pub fn decode(&self, name: &str, bytes: &[u8]) -> Result<ArgBag> {
        let schema = self.resolve(name)?;
        decode_with_schema(&schema, bytes)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Full names of all registered schemas, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.schemas.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const RESIZE_V1: &str = r#"
name: com.example.resize.args
version: 1.0.0
fields:
  - name: width
    type: uint32
"#;

    const RESIZE_V2: &str = r#"
name: com.example.resize.args
version: 1.2.0
fields:
  - name: width
    type: uint32
  - name: height
    type: uint32
"#;

    #[test]
    fn test_register_yaml() {
        let mut registry = SchemaRegistry::new();
        let schema = registry.register_yaml(RESIZE_V1).unwrap();
        assert_eq!(schema.name, "com.example.resize.args");

        let retrieved = registry.resolve("com.example.resize.args@1.0.0").unwrap();
        assert_eq!(retrieved.version, "1.0.0");
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = SchemaRegistry::new();
        registry.register_yaml(RESIZE_V1).unwrap();

        let result = registry.register_yaml(RESIZE_V1);
        assert!(matches!(result, Err(SchemaError::AlreadyRegistered { .. })));
    }

    #[test]
    fn test_bare_name_picks_newest_version() {
        let mut registry = SchemaRegistry::new();
        registry.register_yaml(RESIZE_V2).unwrap();
        registry.register_yaml(RESIZE_V1).unwrap();

        let schema = registry.resolve("com.example.resize.args").unwrap();
        assert_eq!(schema.version, "1.2.0");
        assert_eq!(
            registry.field_names("com.example.resize.args").unwrap(),
            vec!["width", "height"]
        );
    }

    #[test]
    fn test_register_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("resize.yaml");
        std::fs::write(&path, RESIZE_V1).unwrap();

        let mut registry = SchemaRegistry::new();
        registry.register_file(&path).unwrap();
        assert_eq!(registry.list(), vec!["com.example.resize.args@1.0.0"]);
    }

    #[test]
    fn test_encode_decode_through_registry() {
        let mut registry = SchemaRegistry::new();
        registry.register_yaml(RESIZE_V2).unwrap();

        let bag = json!({"width": 640, "height": 480})
            .as_object()
            .cloned()
            .unwrap();
        let bytes = registry.encode("com.example.resize.args", &bag).unwrap();
        assert_eq!(registry.decode("com.example.resize.args", &bytes).unwrap(), bag);
    }

    #[test]
    fn test_encode_resolves_latest_version() {
        let mut registry = SchemaRegistry::new();
        registry.register_yaml(RESIZE_V1).unwrap();
        registry.register_yaml(RESIZE_V2).unwrap();

        let bag = json!({"width": 32, "height": 16})
            .as_object()
            .cloned()
            .unwrap();
        let bytes = registry.encode("com.example.resize.args", &bag).unwrap();
        let decoded = registry.decode("com.example.resize.args", &bytes).unwrap();
        assert_eq!(decoded.get("width"), Some(&json!(32)));
        assert_eq!(decoded.get("height"), Some(&json!(16)));
    }

    #[test]
    fn test_encode_unknown_schema() {
        let registry = SchemaRegistry::new();
        let bag = ArgBag::new();

        assert!(matches!(
            registry.encode("com.missing.args", &bag),
            Err(SchemaError::NotFound { .. })
        ));
        assert!(matches!(
            registry.decode("com.missing.args", &[]),
            Err(SchemaError::NotFound { .. })
        ));
    }

    #[test]
    fn test_not_found() {
        let registry = SchemaRegistry::new();

        let result = registry.resolve("com.nonexistent.schema@1.0.0");
        assert!(matches!(result, Err(SchemaError::NotFound { .. })));
        assert!(registry.is_empty());
    }
}
