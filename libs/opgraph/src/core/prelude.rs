// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Commonly used types for `use opgraph::prelude::*`.

pub use crate::core::{
    // Errors
    error::{GraphError, Result},

    // Kernels
    kernel::{
        Annotation, Kernel, KernelArgs, KernelContext, KernelOutput, KernelRegistration,
        KernelSignature,
    },

    // Types
    types::{ColumnType, DeviceType, Frame, Value},

    // Graph construction
    engine::{Engine, InMemoryEngine},
    graph::{Graph, OutputHandle, VideoEncodeParams},
    resolver::{OpCall, OpOutput, OpResolver},
};

pub use opgraph_schema::{ArgBag, SchemaRegistry};
