// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use parking_lot::RwLock;
use std::collections::HashMap;

use super::{Engine, KernelDeclaration, OperatorDeclaration, ResolvedContract};
use crate::core::contract::ColumnDescriptor;
use crate::core::error::{GraphError, Result};
use crate::core::kernel::ExecutionAdapter;
use crate::core::types::DeviceType;

/// Process-local engine.
#[derive(Default)]
pub struct InMemoryEngine {
    operators: RwLock<HashMap<String, OperatorDeclaration>>,
    kernels: RwLock<HashMap<String, Vec<KernelDeclaration>>>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operator implemented by the engine itself.
    pub fn register_native(&self, declaration: OperatorDeclaration) -> Result<()> {
        self.declare_operator(&declaration)?;
        tracing::debug!("Registered native operator '{}'", declaration.name);
        Ok(())
    }

    pub fn declaration(&self, name: &str) -> Option<OperatorDeclaration> {
        self.operators.read().get(name).cloned()
    }

    /// Declared operator names, sorted.
    pub fn operators(&self) -> Vec<String> {
        let mut names: Vec<String> = self.operators.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn kernel_devices(&self, operator: &str) -> Vec<DeviceType> {
        self.kernels
            .read()
            .get(operator)
            .map(|kernels| kernels.iter().map(|k| k.device).collect())
            .unwrap_or_default()
    }

    pub fn kernel(&self, operator: &str, device: DeviceType) -> Option<ExecutionAdapter> {
        self.kernels
            .read()
            .get(operator)?
            .iter()
            .find(|k| k.device == device)
            .map(|k| k.adapter.clone())
    }

    fn unknown(name: &str) -> GraphError {
        GraphError::Upstream(format!("Operator '{}' is not registered with the engine", name))
    }
}

impl Engine for InMemoryEngine {
    fn declare_operator(&self, declaration: &OperatorDeclaration) -> Result<()> {
        let mut operators = self.operators.write();
        if operators.contains_key(&declaration.name) {
            return Err(GraphError::Upstream(format!(
                "Operator '{}' is already declared",
                declaration.name
            )));
        }
        operators.insert(declaration.name.clone(), declaration.clone());
        Ok(())
    }

    fn declare_kernel(&self, declaration: KernelDeclaration) -> Result<()> {
        if !self.operators.read().contains_key(&declaration.operator) {
            return Err(GraphError::Upstream(format!(
                "Cannot declare a kernel for undeclared operator '{}'",
                declaration.operator
            )));
        }

        let mut kernels = self.kernels.write();
        let bindings = kernels.entry(declaration.operator.clone()).or_default();
        if bindings.iter().any(|k| k.device == declaration.device) {
            return Err(GraphError::Upstream(format!(
                "Operator '{}' already has a {} kernel",
                declaration.operator, declaration.device
            )));
        }
        bindings.push(declaration);
        Ok(())
    }

    fn resolve_contract(&self, name: &str) -> Result<ResolvedContract> {
        let operators = self.operators.read();
        let declaration = operators.get(name).ok_or_else(|| Self::unknown(name))?;
        Ok(ResolvedContract {
            name: declaration.name.clone(),
            inputs: declaration.inputs.clone(),
            schema: declaration.schema.clone(),
        })
    }

    fn output_descriptors(&self, name: &str) -> Result<Vec<ColumnDescriptor>> {
        self.operators
            .read()
            .get(name)
            .map(|declaration| declaration.outputs.clone())
            .ok_or_else(|| Self::unknown(name))
    }
}
