// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Boundary to the execution engine that owns the authoritative operator table.

mod in_memory;

pub use in_memory::InMemoryEngine;

use serde::{Deserialize, Serialize};

use crate::core::contract::{ColumnDescriptor, OperatorContract, OperatorInputs, StateModel};
use crate::core::error::Result;
use crate::core::kernel::ExecutionAdapter;
use crate::core::types::DeviceType;

/// Shape of an operator as declared to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorDeclaration {
    pub name: String,
    pub inputs: OperatorInputs,
    pub outputs: Vec<ColumnDescriptor>,
    /// Default stencil; `None` when the operator cannot stencil.
    #[serde(default)]
    pub stencil: Option<Vec<i32>>,
    #[serde(default)]
    pub state: StateModel,
    #[serde(default)]
    pub schema: Option<String>,
}

impl OperatorDeclaration {
    pub fn new(
        name: impl Into<String>,
        inputs: OperatorInputs,
        outputs: Vec<ColumnDescriptor>,
    ) -> Self {
        Self {
            name: name.into(),
            inputs,
            outputs,
            stencil: None,
            state: StateModel::Stateless,
            schema: None,
        }
    }

    /// Declaration of a locally registered kernel under its pseudo-name.
    pub fn from_contract(contract: &OperatorContract, pseudo_name: impl Into<String>) -> Self {
        Self {
            name: pseudo_name.into(),
            inputs: contract.inputs.clone(),
            outputs: contract.outputs.clone(),
            stencil: contract.stencil.clone(),
            state: contract.state,
            schema: contract.schema.clone(),
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_stencil(mut self, offsets: Vec<i32>) -> Self {
        self.stencil = Some(offsets);
        self
    }

    pub fn with_state(mut self, state: StateModel) -> Self {
        self.state = state;
        self
    }

    pub fn can_stencil(&self) -> bool {
        self.stencil.is_some()
    }
}

/// One kernel binding for an operator on one device.
#[derive(Debug, Clone)]
pub struct KernelDeclaration {
    pub operator: String,
    pub device: DeviceType,
    pub adapter: ExecutionAdapter,
    pub batch: u32,
}

/// Contract as the engine reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedContract {
    pub name: String,
    pub inputs: OperatorInputs,
    /// Parameter schema used to encode keyword arguments, if any.
    #[serde(default)]
    pub schema: Option<String>,
}

impl ResolvedContract {
    pub fn is_variadic(&self) -> bool {
        self.inputs.is_variadic()
    }
}

/// Synchronous, unretried calls the graph builder issues to the engine.
///
/// Implementations report rejections and unknown names as
/// [`GraphError::Upstream`](crate::core::error::GraphError::Upstream).
pub trait Engine: Send + Sync {
    fn declare_operator(&self, declaration: &OperatorDeclaration) -> Result<()>;

    fn declare_kernel(&self, declaration: KernelDeclaration) -> Result<()>;

    fn resolve_contract(&self, name: &str) -> Result<ResolvedContract>;

    fn output_descriptors(&self, name: &str) -> Result<Vec<ColumnDescriptor>>;
}
