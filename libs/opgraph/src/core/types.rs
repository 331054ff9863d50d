// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Semantic column types, devices, and the element codecs kernels see.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::error::{GraphError, Result};

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Opaque bytes.
    Blob,
    /// Decoded frames; only video columns can be compressed.
    Video,
}

impl ColumnType {
    /// Serialize one element of this type.
    pub fn encode_element(&self, value: &Value) -> Result<Vec<u8>> {
        match (self, value) {
            (ColumnType::Blob, Value::Blob(bytes)) => Ok(bytes.clone()),
            (ColumnType::Video, Value::Frame(frame)) => {
                rmp_serde::to_vec(frame).map_err(|e| GraphError::Codec(e.to_string()))
            }
            (column_type, other) => Err(GraphError::Codec(format!(
                "cannot encode {} as a {} element",
                other.kind(),
                column_type
            ))),
        }
    }

    /// Deserialize one element of this type.
    pub fn decode_element(&self, bytes: &[u8]) -> Result<Value> {
        match self {
            ColumnType::Blob => Ok(Value::Blob(bytes.to_vec())),
            ColumnType::Video => rmp_serde::from_slice(bytes)
                .map(Value::Frame)
                .map_err(|e| GraphError::Codec(format!("invalid frame element: {e}"))),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Blob => write!(f, "blob"),
            ColumnType::Video => write!(f, "video"),
        }
    }
}

/// Device a kernel runs on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    #[default]
    Cpu,
    Gpu,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Cpu => "cpu",
            DeviceType::Gpu => "gpu",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(DeviceType::Cpu),
            "gpu" => Ok(DeviceType::Gpu),
            _ => Err(GraphError::ContractViolation(format!(
                "unknown device '{}'. Valid devices: cpu, gpu",
                s
            ))),
        }
    }
}

/// A decoded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, channels: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            channels,
            data,
        }
    }
}

/// A decoded element handed to or returned from kernel code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Blob(Vec<u8>),
    Frame(Frame),
    /// Batched or stenciled elements.
    List(Vec<Value>),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Blob(_) => "blob",
            Value::Frame(_) => "frame",
            Value::List(_) => "list",
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_frame(&self) -> Option<&Frame> {
        match self {
            Value::Frame(frame) => Some(frame),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Blob(bytes)
    }
}

impl From<Frame> for Value {
    fn from(frame: Frame) -> Self {
        Value::Frame(frame)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

/// Serialized form of an element, nested once per sequence layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Element(Vec<u8>),
    List(Vec<Payload>),
}

impl Payload {
    /// Decode without a type, treating every leaf as an opaque blob.
    pub fn into_raw_value(self) -> Value {
        match self {
            Payload::Element(bytes) => Value::Blob(bytes),
            Payload::List(items) => {
                Value::List(items.into_iter().map(Payload::into_raw_value).collect())
            }
        }
    }
}
