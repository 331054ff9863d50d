// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Operator contract types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::kernel::ExecutionAdapter;
use crate::core::registration_id::RegistrationId;
use crate::core::types::{ColumnType, DeviceType};

/// A named, typed column slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }

    pub fn blob(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Blob)
    }

    pub fn video(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Video)
    }
}

/// Input shape of an operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "columns")]
pub enum OperatorInputs {
    /// Named inputs, bound by keyword, in declaration order.
    Fixed(Vec<ColumnDescriptor>),
    /// Any number of positional inputs; arity is fixed per call.
    Variadic,
}

impl OperatorInputs {
    pub fn is_variadic(&self) -> bool {
        matches!(self, OperatorInputs::Variadic)
    }

    /// Declared inputs; empty for variadic operators.
    pub fn descriptors(&self) -> &[ColumnDescriptor] {
        match self {
            OperatorInputs::Fixed(columns) => columns,
            OperatorInputs::Variadic => &[],
        }
    }

    /// Declared arity, `None` when variadic.
    pub fn arity(&self) -> Option<usize> {
        match self {
            OperatorInputs::Fixed(columns) => Some(columns.len()),
            OperatorInputs::Variadic => None,
        }
    }
}

/// Dependency of an operator on its own earlier outputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "window")]
pub enum StateModel {
    #[default]
    Stateless,
    /// Needs the previous `n` elements.
    Bounded(u32),
    /// Needs every previous element.
    Unbounded,
}

/// Where kernels for an operator may run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceAffinity {
    Type(DeviceType),
    /// `(device, count)` pairs; one kernel binding per listed device.
    Sets(Vec<(DeviceType, u32)>),
}

impl Default for DeviceAffinity {
    fn default() -> Self {
        DeviceAffinity::Type(DeviceType::Cpu)
    }
}

impl DeviceAffinity {
    /// Devices that get a kernel binding, in declaration order.
    pub fn devices(&self) -> Vec<DeviceType> {
        match self {
            DeviceAffinity::Type(device) => vec![*device],
            DeviceAffinity::Sets(sets) => sets.iter().map(|(device, _)| *device).collect(),
        }
    }

    pub fn supports(&self, device: DeviceType) -> bool {
        self.devices().contains(&device)
    }

    /// Declared instance count for a device; only device sets carry one.
    pub fn count_for(&self, device: DeviceType) -> Option<u32> {
        match self {
            DeviceAffinity::Type(_) => None,
            DeviceAffinity::Sets(sets) => sets
                .iter()
                .find(|(d, _)| *d == device)
                .map(|(_, count)| *count),
        }
    }
}

/// Contract of a kernel registered in this process.
///
/// Built once by [`KernelRegistration::register`](crate::core::kernel::KernelRegistration::register)
/// and immutable afterwards.
#[derive(Clone)]
pub struct OperatorContract {
    pub name: String,
    pub registration_id: RegistrationId,
    pub inputs: OperatorInputs,
    pub outputs: Vec<ColumnDescriptor>,
    /// Default stencil; `None` means the kernel cannot stencil.
    pub stencil: Option<Vec<i32>>,
    pub batch: u32,
    pub state: StateModel,
    pub devices: DeviceAffinity,
    /// Parameter schema the kernel documents its arguments with.
    pub schema: Option<String>,
    pub adapter: ExecutionAdapter,
}

impl OperatorContract {
    pub fn can_stencil(&self) -> bool {
        self.stencil.is_some()
    }

    pub fn can_batch(&self) -> bool {
        self.batch > 1
    }

    pub fn is_variadic(&self) -> bool {
        self.inputs.is_variadic()
    }

    /// Name the engine knows this kernel by.
    pub fn pseudo_name(&self) -> String {
        self.registration_id.pseudo_name(&self.name)
    }
}

impl fmt::Debug for OperatorContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorContract")
            .field("name", &self.name)
            .field("registration_id", &self.registration_id)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("stencil", &self.stencil)
            .field("batch", &self.batch)
            .field("state", &self.state)
            .field("devices", &self.devices)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variadic_has_no_arity() {
        assert_eq!(OperatorInputs::Variadic.arity(), None);
        assert!(OperatorInputs::Variadic.descriptors().is_empty());

        let fixed = OperatorInputs::Fixed(vec![ColumnDescriptor::blob("a")]);
        assert_eq!(fixed.arity(), Some(1));
    }

    #[test]
    fn test_device_sets() {
        let affinity = DeviceAffinity::Sets(vec![(DeviceType::Cpu, 4), (DeviceType::Gpu, 1)]);
        assert_eq!(affinity.devices(), vec![DeviceType::Cpu, DeviceType::Gpu]);
        assert_eq!(affinity.count_for(DeviceType::Cpu), Some(4));
        assert!(affinity.supports(DeviceType::Gpu));

        let single = DeviceAffinity::default();
        assert_eq!(single.devices(), vec![DeviceType::Cpu]);
        assert_eq!(single.count_for(DeviceType::Cpu), None);
    }

    #[test]
    fn test_inputs_serialize_tagged() {
        let json = serde_json::to_value(OperatorInputs::Variadic).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "variadic"}));
    }
}
