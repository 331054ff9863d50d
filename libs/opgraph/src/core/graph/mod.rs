// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

#[allow(clippy::module_inception)]
mod graph;
mod handle;
mod node;
mod wire;

pub use graph::{is_structural, Graph, SOURCE_OP, STRUCTURAL_OPS};
pub use handle::{EncodeOptions, OutputHandle, VideoEncodeParams, COMPRESSION_CODECS};
pub use node::{
    EncodedArgs, GraphNode, InputRef, NodeArgs, NodeId, NodeSpec, ParamCodec, Producer,
};
pub use wire::{WireGraph, WireInput, WireNode, WireOutput, EXTERNAL_INDEX};
