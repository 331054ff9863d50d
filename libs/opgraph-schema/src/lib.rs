// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Parameter schemas for opgraph operators.
//!
//! This crate provides:
//! - YAML schema parsing and validation
//! - An in-memory schema registry keyed by `name@version`
//! - Schema-checked payload encoding and the generic keyed-payload codec
//!
//! # Example
//!
//! ```
//! use opgraph_schema::{ArgBag, SchemaRegistry};
//!
//! let mut registry = SchemaRegistry::new();
//! registry
//!     .register_yaml(
//!         r#"
//! name: com.example.blur.args
//! version: 1.0.0
//! fields:
//!   - name: sigma
//!     type: float64
//! "#,
//!     )
//!     .unwrap();
//!
//! let mut bag = ArgBag::new();
//! bag.insert("sigma".to_string(), serde_json::json!(1.5));
//! let bytes = registry.encode("com.example.blur.args", &bag).unwrap();
//! let decoded = registry.decode("com.example.blur.args", &bytes).unwrap();
//! assert_eq!(decoded, bag);
//! ```

pub mod codec;
pub mod definition;
pub mod error;
pub mod parser;
pub mod registry;

pub use codec::{decode_bag, encode_bag, ArgBag};
pub use definition::{Field, FieldType, SchemaDefinition};
pub use error::{Result, SchemaError};
pub use parser::{parse_yaml, parse_yaml_file};
pub use registry::SchemaRegistry;
