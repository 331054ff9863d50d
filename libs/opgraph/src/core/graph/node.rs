// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use opgraph_schema::ArgBag;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::handle::OutputHandle;
use crate::core::contract::ColumnDescriptor;
use crate::core::types::DeviceType;

/// Position of a node in construction order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Who produces a column consumed by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Producer {
    Node(NodeId),
    /// Column supplied from outside the graph.
    External,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRef {
    pub producer: Producer,
    pub column: String,
}

/// Schema-encoded arguments supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedArgs {
    pub schema: String,
    pub bytes: Vec<u8>,
}

impl EncodedArgs {
    pub fn new(schema: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            schema: schema.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeArgs {
    /// Flat keyword bag, encoded when the graph is serialized.
    Bag(ArgBag),
    Encoded(EncodedArgs),
}

impl Default for NodeArgs {
    fn default() -> Self {
        NodeArgs::Bag(ArgBag::new())
    }
}

/// How a node's keyword bag becomes its parameter payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ParamCodec {
    /// Generic keyed codec, decoded by locally registered kernels.
    Generic,
    /// The operator's parameter schema.
    Schema(String),
    /// Operator takes no keyword arguments.
    #[default]
    None,
}

/// Everything needed to add one node.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub name: String,
    pub device: DeviceType,
    pub batch: i32,
    pub state_window: i32,
    pub stencil: Vec<i32>,
    pub inputs: Vec<OutputHandle>,
    pub args: NodeArgs,
    pub codec: ParamCodec,
    pub extra: Option<serde_json::Value>,
}

impl NodeSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            device: DeviceType::Cpu,
            batch: -1,
            state_window: -1,
            stencil: Vec::new(),
            inputs: Vec::new(),
            args: NodeArgs::default(),
            codec: ParamCodec::None,
            extra: None,
        }
    }

    pub fn input(mut self, handle: OutputHandle) -> Self {
        self.inputs.push(handle);
        self
    }

    pub fn inputs(mut self, handles: impl IntoIterator<Item = OutputHandle>) -> Self {
        self.inputs.extend(handles);
        self
    }

    pub fn device(mut self, device: DeviceType) -> Self {
        self.device = device;
        self
    }

    pub fn args(mut self, args: NodeArgs, codec: ParamCodec) -> Self {
        self.args = args;
        self.codec = codec;
        self
    }
}

/// A node of the graph. Its output set is fixed when it is added.
#[derive(Debug, Clone)]
pub struct GraphNode {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) device: DeviceType,
    pub(crate) batch: i32,
    pub(crate) state_window: i32,
    pub(crate) stencil: Vec<i32>,
    pub(crate) inputs: Vec<InputRef>,
    pub(crate) outputs: Vec<ColumnDescriptor>,
    pub(crate) args: NodeArgs,
    pub(crate) codec: ParamCodec,
    pub(crate) extra: Option<serde_json::Value>,
}

impl GraphNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device(&self) -> DeviceType {
        self.device
    }

    pub fn batch(&self) -> i32 {
        self.batch
    }

    pub fn state_window(&self) -> i32 {
        self.state_window
    }

    pub fn stencil(&self) -> &[i32] {
        &self.stencil
    }

    pub fn inputs(&self) -> &[InputRef] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[ColumnDescriptor] {
        &self.outputs
    }

    pub fn args(&self) -> &NodeArgs {
        &self.args
    }

    pub fn codec(&self) -> &ParamCodec {
        &self.codec
    }

    pub fn extra(&self) -> Option<&serde_json::Value> {
        self.extra.as_ref()
    }
}
