// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Keyed-bag payload codecs.
//!
//! Two encodings share the MessagePack map layout:
//! - the generic codec writes any bag as-is (used for reflection-registered
//!   kernels, which decode it back into their [`ArgBag`] context),
//! - the schema codec first checks every key and value against a
//!   [`SchemaDefinition`] and writes fields in declaration order.

use serde_json::Value;

use crate::definition::{value_kind, SchemaDefinition};
use crate::error::{Result, SchemaError};

/// Flat keyed argument bag, insertion ordered.
pub type ArgBag = serde_json::Map<String, Value>;

/// Encode a bag with the generic codec.
pub fn encode_bag(bag: &ArgBag) -> Result<Vec<u8>> {
    rmp_serde::to_vec(bag).map_err(|e| SchemaError::Codec(e.to_string()))
}

/// Decode bytes produced by [`encode_bag`]. An empty payload decodes to an empty bag.
pub fn decode_bag(bytes: &[u8]) -> Result<ArgBag> {
    if bytes.is_empty() {
        return Ok(ArgBag::new());
    }
    rmp_serde::from_slice(bytes).map_err(|e| SchemaError::Codec(e.to_string()))
}

/// Check a bag against a schema without encoding it.
pub fn validate_bag(schema: &SchemaDefinition, bag: &ArgBag) -> Result<()> {
    for (key, value) in bag {
        let field = schema.field(key).ok_or_else(|| SchemaError::UnknownField {
            schema: schema.full_name(),
            field: key.clone(),
            valid: schema.field_names(),
        })?;

        if !field.accepts(value) {
            return Err(SchemaError::TypeMismatch {
                schema: schema.full_name(),
                field: key.clone(),
                expected: field.field_type.type_name(),
                found: value_kind(value).to_string(),
            });
        }
    }
    Ok(())
}

/// Encode a bag against a schema, fields in declaration order.
pub fn encode_with_schema(schema: &SchemaDefinition, bag: &ArgBag) -> Result<Vec<u8>> {
    validate_bag(schema, bag)?;

    let mut ordered = ArgBag::new();
    for field in &schema.fields {
        if let Some(value) = bag.get(&field.name) {
            ordered.insert(field.name.clone(), value.clone());
        }
    }
    encode_bag(&ordered)
}

/// Decode a schema payload, rejecting keys the schema does not declare.
pub fn decode_with_schema(schema: &SchemaDefinition, bytes: &[u8]) -> Result<ArgBag> {
    let bag = decode_bag(bytes)?;
    validate_bag(schema, &bag)?;
    Ok(bag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_yaml;
    use serde_json::json;

    fn histogram_schema() -> SchemaDefinition {
        parse_yaml(
            r#"
name: com.example.histogram.args
version: 1.0.0
fields:
  - name: bins
    type: uint32
  - name: channels
    type: array<uint8>
  - name: label
    type: optional<string>
"#,
        )
        .unwrap()
    }

    fn bag(value: Value) -> ArgBag {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_generic_codec_keeps_every_key() {
        let input = bag(json!({"threshold": 0.5, "mode": "fast", "n": -3}));
        let bytes = encode_bag(&input).unwrap();
        assert_eq!(decode_bag(&bytes).unwrap(), input);
    }

    #[test]
    fn test_empty_payload_is_empty_bag() {
        assert!(decode_bag(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_schema_encoding_reproduces_fields() {
        let schema = histogram_schema();
        let input = bag(json!({"label": "luma", "bins": 16, "channels": [0, 1, 2]}));

        let bytes = encode_with_schema(&schema, &input).unwrap();
        let decoded = decode_with_schema(&schema, &bytes).unwrap();

        assert_eq!(decoded, input);
        let keys: Vec<&String> = decoded.keys().collect();
        assert_eq!(keys, vec!["bins", "channels", "label"]);
    }

    #[test]
    fn test_unknown_field_lists_valid_fields() {
        let schema = histogram_schema();
        let err = encode_with_schema(&schema, &bag(json!({"bucket": 3}))).unwrap_err();

        match &err {
            SchemaError::UnknownField { field, valid, .. } => {
                assert_eq!(field, "bucket");
                assert_eq!(valid, &vec!["bins", "channels", "label"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("bins, channels, label"));
    }

    #[test]
    fn test_type_mismatch() {
        let schema = histogram_schema();
        let err = encode_with_schema(&schema, &bag(json!({"bins": "many"}))).unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { ref expected, .. } if expected == "uint32"));
    }
}
