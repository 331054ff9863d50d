// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Splits one keyword bag into per-stream parameter payloads.

use opgraph_schema::{ArgBag, Field, FieldType, SchemaRegistry};
use serde_json::Value;

use super::error::{GraphError, Result};

/// Encoded parameters for N streams of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerStreamJob {
    /// Full name of the schema the payloads are encoded with.
    pub schema: String,
    pub payloads: Vec<Vec<u8>>,
}

impl PerStreamJob {
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}

/// Pop every key of `kwargs` that `schema` declares and encode one payload
/// per stream.
///
/// A field given as a sequence supplies one element per stream; any other
/// value is broadcast. For `array<T>` and `bytes` fields only a sequence of
/// sequences counts as per-stream. All per-stream sequences must have the
/// same length N; with none, N is 1.
pub fn expand_per_stream(
    op: &str,
    schema: &str,
    kwargs: &mut ArgBag,
    schemas: &SchemaRegistry,
) -> Result<PerStreamJob> {
    let definition = schemas.resolve(schema)?;

    let stream_args: Vec<(&Field, Value)> = definition
        .fields
        .iter()
        .filter_map(|field| kwargs.remove(&field.name).map(|value| (field, value)))
        .collect();

    if stream_args.is_empty() {
        return Err(GraphError::Configuration(format!(
            "Op `{}` received no per-stream arguments. Options: {}",
            op,
            definition.field_names().join(", ")
        )));
    }

    let lengths: Vec<(&str, usize)> = stream_args
        .iter()
        .filter(|(field, value)| is_per_stream(field, value))
        .filter_map(|(field, value)| value.as_array().map(|items| (field.name.as_str(), items.len())))
        .collect();

    let n = match lengths.first() {
        None => 1,
        Some((_, first)) if lengths.iter().all(|(_, len)| len == first) => *first,
        Some(_) => {
            return Err(GraphError::Configuration(format!(
                "Op `{}` received per-stream arguments of different lengths: {}",
                op,
                lengths
                    .iter()
                    .map(|(name, len)| format!("{}={}", name, len))
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
    };

    let payloads = (0..n)
        .map(|i| {
            let bag: ArgBag = stream_args
                .iter()
                .map(|(field, value)| {
                    let element = match value {
                        Value::Array(items) if is_per_stream(field, value) => items[i].clone(),
                        other => other.clone(),
                    };
                    (field.name.clone(), element)
                })
                .collect();
            schemas.encode(schema, &bag).map_err(GraphError::from)
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(
        "Expanded {} per-stream argument(s) of '{}' into {} payload(s)",
        stream_args.len(),
        op,
        payloads.len()
    );

    Ok(PerStreamJob {
        schema: definition.full_name(),
        payloads,
    })
}

fn is_per_stream(field: &Field, value: &Value) -> bool {
    let items = match value {
        Value::Array(items) => items,
        _ => return false,
    };

    match &field.field_type {
        FieldType::Bytes => {
            !items.is_empty() && items.iter().all(|v| v.is_array() || v.is_string())
        }
        t if t.is_array() => !items.is_empty() && items.iter().all(Value::is_array),
        _ => true,
    }
}
