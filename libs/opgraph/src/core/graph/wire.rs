// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Index-addressed serialization of a [`Graph`].

use opgraph_schema::{encode_bag, SchemaRegistry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::graph::{Graph, SOURCE_OP};
use super::handle::EncodeOptions;
use super::node::{GraphNode, NodeArgs, NodeId, ParamCodec, Producer};
use crate::core::error::{GraphError, Result};
use crate::core::types::DeviceType;

/// Producer index of columns that come from outside the graph.
pub const EXTERNAL_INDEX: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireInput {
    pub producer_index: i64,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireNode {
    pub name: String,
    pub device: DeviceType,
    pub stencil: Vec<i32>,
    pub batch: i32,
    pub state_window: i32,
    pub inputs: Vec<WireInput>,
    #[serde(with = "serde_bytes_compat")]
    pub payload: Vec<u8>,
    #[serde(default)]
    pub extra: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireOutput {
    pub producer_index: i64,
    pub column: String,
    #[serde(default)]
    pub encode_options: Option<EncodeOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireGraph {
    pub nodes: Vec<WireNode>,
    #[serde(default)]
    pub outputs: Vec<WireOutput>,
}

impl WireGraph {
    pub fn encode(&self) -> Result<Vec<u8>> {
        rmp_serde::to_vec_named(self).map_err(|e| GraphError::Codec(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        rmp_serde::from_slice(bytes).map_err(|e| GraphError::Codec(e.to_string()))
    }
}

impl Graph {
    /// Serialize the nodes listed in `order`, each addressed by its position.
    ///
    /// Every node-produced input must be listed before its consumer, except
    /// inputs read from a [`SOURCE_OP`] node, which are encoded as
    /// [`EXTERNAL_INDEX`].
    pub fn to_wire(&self, order: &[NodeId], schemas: &SchemaRegistry) -> Result<WireGraph> {
        let mut positions: HashMap<NodeId, i64> = HashMap::with_capacity(order.len());
        let mut nodes = Vec::with_capacity(order.len());

        for (position, id) in order.iter().enumerate() {
            let node = self.node(*id).ok_or_else(|| {
                GraphError::ContractViolation(format!("order lists missing {}", id))
            })?;
            if positions.contains_key(id) {
                return Err(GraphError::ContractViolation(format!(
                    "order lists {} more than once",
                    id
                )));
            }

            let inputs = node
                .inputs
                .iter()
                .map(|input| {
                    Ok(WireInput {
                        producer_index: self.producer_index(node, input.producer, &positions)?,
                        column: input.column.clone(),
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            nodes.push(WireNode {
                name: node.name.clone(),
                device: node.device,
                stencil: node.stencil.clone(),
                batch: node.batch,
                state_window: node.state_window,
                inputs,
                payload: encode_payload(node, schemas)?,
                extra: node.extra.clone(),
            });
            positions.insert(*id, position as i64);
        }

        let outputs = self
            .outputs()
            .iter()
            .map(|handle| {
                let producer_index = match handle.producer() {
                    Producer::External => EXTERNAL_INDEX,
                    Producer::Node(id) => *positions.get(&id).ok_or_else(|| {
                        GraphError::ContractViolation(format!(
                            "graph output '{}' is produced by {}, which the order does not list",
                            handle.column(),
                            id
                        ))
                    })?,
                };
                Ok(WireOutput {
                    producer_index,
                    column: handle.column().to_string(),
                    encode_options: handle.encode_options().copied(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!("Serialized {} of {} nodes", nodes.len(), self.len());

        Ok(WireGraph { nodes, outputs })
    }

    fn producer_index(
        &self,
        consumer: &GraphNode,
        producer: Producer,
        positions: &HashMap<NodeId, i64>,
    ) -> Result<i64> {
        let id = match producer {
            Producer::External => return Ok(EXTERNAL_INDEX),
            Producer::Node(id) => id,
        };

        if self.node(id).is_some_and(|n| n.name == SOURCE_OP) {
            return Ok(EXTERNAL_INDEX);
        }

        positions.get(&id).copied().ok_or_else(|| {
            GraphError::ContractViolation(format!(
                "'{}' ({}) reads from {}, which is not listed before it",
                consumer.name, consumer.id, id
            ))
        })
    }
}

fn encode_payload(node: &GraphNode, schemas: &SchemaRegistry) -> Result<Vec<u8>> {
    let bag = match &node.args {
        NodeArgs::Encoded(encoded) => return Ok(encoded.bytes.clone()),
        NodeArgs::Bag(bag) => bag,
    };

    match &node.codec {
        ParamCodec::Generic => Ok(encode_bag(bag)?),
        ParamCodec::Schema(_) | ParamCodec::None if bag.is_empty() => Ok(Vec::new()),
        ParamCodec::Schema(schema) => Ok(schemas.encode(schema, bag)?),
        ParamCodec::None => Err(GraphError::ContractViolation(format!(
            "'{}' has no parameter schema but received arguments: {}",
            node.name,
            bag.keys().cloned().collect::<Vec<_>>().join(", ")
        ))),
    }
}

/// Byte payloads travel as msgpack bin rather than an integer array.
mod serde_bytes_compat {
    use serde::de::{self, SeqAccess, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        deserializer.deserialize_byte_buf(BytesVisitor)
    }

    struct BytesVisitor;

    impl<'de> Visitor<'de> for BytesVisitor {
        type Value = Vec<u8>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a byte array")
        }

        fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Vec<u8>, E> {
            Ok(v.to_vec())
        }

        fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Vec<u8>, E> {
            Ok(v)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<u8>, A::Error> {
            let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(b) = seq.next_element::<u8>()? {
                bytes.push(b);
            }
            Ok(bytes)
        }
    }
}
