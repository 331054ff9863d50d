// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Schema definition types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A complete parameter schema parsed from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDefinition {
    /// Schema name (e.g., "com.example.blur.args")
    pub name: String,

    /// Schema version (e.g., "1.0.0")
    pub version: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,

    /// Fields in declaration order. Encoding preserves this order.
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl SchemaDefinition {
    /// Returns the full schema name with version (e.g., "com.example.blur.args@1.0.0").
    pub fn full_name(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    /// Top-level field names in declaration order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Numeric version parts, used to pick the newest of several versions.
    pub(crate) fn version_key(&self) -> Vec<u32> {
        self.version
            .split('.')
            .map(|p| p.parse::<u32>().unwrap_or(0))
            .collect()
    }
}

/// A field within a schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    /// Field name.
    pub name: String,

    /// Field type.
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,

    /// Nested fields (for object types).
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Field {
    /// Whether `value` fits this field, including nested object fields.
    pub fn accepts(&self, value: &Value) -> bool {
        if !self.fields.is_empty() {
            let Some(object) = value.as_object() else {
                return false;
            };
            return object.iter().all(|(key, nested)| {
                self.fields
                    .iter()
                    .find(|f| &f.name == key)
                    .is_some_and(|f| f.accepts(nested))
            });
        }
        self.field_type.accepts(value)
    }
}

/// Supported field types in schemas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    // Primitive types
    String,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    Bytes,

    // Complex types (parsed from strings like "array<uint8>")
    #[serde(untagged)]
    Complex(String),
}

impl FieldType {
    /// Parse a type string that may contain generics.
    ///
    /// Examples:
    /// - "string" -> FieldType::String
    /// - "array<uint8>" -> FieldType::Complex("array<uint8>")
    /// - "optional<string>" -> FieldType::Complex("optional<string>")
    /// - "map<string,int32>" -> FieldType::Complex("map<string,int32>")
    /// - "object" -> FieldType::Complex("object")
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "string" => FieldType::String,
            "bool" => FieldType::Bool,
            "int8" => FieldType::Int8,
            "int16" => FieldType::Int16,
            "int32" => FieldType::Int32,
            "int64" => FieldType::Int64,
            "uint8" => FieldType::Uint8,
            "uint16" => FieldType::Uint16,
            "uint32" => FieldType::Uint32,
            "uint64" => FieldType::Uint64,
            "float32" => FieldType::Float32,
            "float64" => FieldType::Float64,
            "bytes" => FieldType::Bytes,
            _ => FieldType::Complex(s.trim().to_string()),
        }
    }

    /// True for `array<T>` types, whose values are themselves sequences.
    pub fn is_array(&self) -> bool {
        matches!(self, FieldType::Complex(s) if generic_arg(s, "array").is_some())
    }

    /// Whether this type string is one the codec understands.
    pub fn is_known(&self) -> bool {
        match self {
            FieldType::Complex(s) => {
                if s == "object" {
                    return true;
                }
                if let Some(inner) = generic_arg(s, "array").or_else(|| generic_arg(s, "optional"))
                {
                    return FieldType::parse(inner).is_known();
                }
                if let Some(inner) = generic_arg(s, "map") {
                    return match inner.split_once(',') {
                        Some((key, value)) => {
                            FieldType::parse(key) == FieldType::String
                                && FieldType::parse(value).is_known()
                        }
                        None => false,
                    };
                }
                false
            }
            _ => true,
        }
    }

    /// Whether `value` can be encoded as this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Bool => value.is_boolean(),
            FieldType::Int8 => int_in_range(value, i8::MIN as i64, i8::MAX as i64),
            FieldType::Int16 => int_in_range(value, i16::MIN as i64, i16::MAX as i64),
            FieldType::Int32 => int_in_range(value, i32::MIN as i64, i32::MAX as i64),
            FieldType::Int64 => value.as_i64().is_some(),
            FieldType::Uint8 => uint_in_range(value, u8::MAX as u64),
            FieldType::Uint16 => uint_in_range(value, u16::MAX as u64),
            FieldType::Uint32 => uint_in_range(value, u32::MAX as u64),
            FieldType::Uint64 => value.as_u64().is_some(),
            FieldType::Float32 | FieldType::Float64 => value.is_number(),
            FieldType::Bytes => match value {
                Value::String(_) => true,
                Value::Array(items) => items.iter().all(|v| uint_in_range(v, u8::MAX as u64)),
                _ => false,
            },
            FieldType::Complex(s) => accepts_complex(s, value),
        }
    }

    /// Type name as written in YAML, for error messages.
    pub fn type_name(&self) -> String {
        match self {
            FieldType::String => "string".to_string(),
            FieldType::Bool => "bool".to_string(),
            FieldType::Int8 => "int8".to_string(),
            FieldType::Int16 => "int16".to_string(),
            FieldType::Int32 => "int32".to_string(),
            FieldType::Int64 => "int64".to_string(),
            FieldType::Uint8 => "uint8".to_string(),
            FieldType::Uint16 => "uint16".to_string(),
            FieldType::Uint32 => "uint32".to_string(),
            FieldType::Uint64 => "uint64".to_string(),
            FieldType::Float32 => "float32".to_string(),
            FieldType::Float64 => "float64".to_string(),
            FieldType::Bytes => "bytes".to_string(),
            FieldType::Complex(s) => s.clone(),
        }
    }
}

fn accepts_complex(s: &str, value: &Value) -> bool {
    if s == "object" {
        return value.is_object();
    }
    if let Some(inner) = generic_arg(s, "array") {
        let element = FieldType::parse(inner);
        return value
            .as_array()
            .is_some_and(|items| items.iter().all(|v| element.accepts(v)));
    }
    if let Some(inner) = generic_arg(s, "optional") {
        return value.is_null() || FieldType::parse(inner).accepts(value);
    }
    if let Some(inner) = generic_arg(s, "map") {
        let Some((_, value_type)) = inner.split_once(',') else {
            return false;
        };
        let value_type = FieldType::parse(value_type);
        return value
            .as_object()
            .is_some_and(|map| map.values().all(|v| value_type.accepts(v)));
    }
    false
}

/// Extract `T` from `wrapper<T>`.
fn generic_arg<'a>(s: &'a str, wrapper: &str) -> Option<&'a str> {
    s.strip_prefix(wrapper)?
        .strip_prefix('<')?
        .strip_suffix('>')
        .map(str::trim)
}

fn int_in_range(value: &Value, min: i64, max: i64) -> bool {
    value.as_i64().is_some_and(|v| v >= min && v <= max)
}

fn uint_in_range(value: &Value, max: u64) -> bool {
    value.as_u64().is_some_and(|v| v <= max)
}

/// JSON kind of a value, for error messages.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
