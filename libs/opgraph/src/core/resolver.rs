// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Name resolution: local registry first, then the engine.

use opgraph_schema::ArgBag;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use super::contract::{ColumnDescriptor, DeviceAffinity, OperatorContract, OperatorInputs};
use super::engine::{Engine, KernelDeclaration, OperatorDeclaration};
use super::error::{GraphError, Result};
use super::graph::{is_structural, EncodedArgs, Graph, NodeArgs, NodeSpec, OutputHandle, ParamCodec};
use super::registry::{global_registry, OperatorRegistry};
use super::types::DeviceType;

/// Resolves operator names and declares local kernels to the engine on first use.
pub struct OpResolver {
    engine: Arc<dyn Engine>,
    registry: Arc<Mutex<OperatorRegistry>>,
    /// Local operators already declared to the engine, by operator name.
    declared: Mutex<HashMap<String, Declaration>>,
    default_device: DeviceType,
}

impl OpResolver {
    /// Resolver over the process-wide kernel registry.
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self::with_registry(engine, global_registry())
    }

    pub fn with_registry(engine: Arc<dyn Engine>, registry: Arc<Mutex<OperatorRegistry>>) -> Self {
        Self {
            engine,
            registry,
            declared: Mutex::new(HashMap::new()),
            default_device: DeviceType::Cpu,
        }
    }

    pub fn with_default_device(mut self, device: DeviceType) -> Self {
        self.default_device = device;
        self
    }

    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    /// Pseudo-name a local kernel was declared under, if it has been.
    pub fn pseudo_name(&self, name: &str) -> Option<String> {
        self.declared.lock().get(name).map(|d| d.pseudo.clone())
    }

    pub fn resolve(&self, name: &str) -> Result<ResolvedOp> {
        if is_structural(name) {
            return Ok(ResolvedOp {
                name: name.to_string(),
                engine_name: name.to_string(),
                kind: OpKind::Structural,
                inputs: OperatorInputs::Variadic,
                outputs: Vec::new(),
                schema: None,
                default_device: self.default_device,
            });
        }

        let local = {
            let registry = self.registry.lock();
            match registry.get(name) {
                Some(contract) => Some(contract.clone()),
                None => match registry.rejection(name) {
                    Some(e) => return Err(e),
                    None => None,
                },
            }
        };

        let (engine_name, kind) = match local {
            Some(contract) => (self.declare_local(&contract)?, OpKind::Local(contract.devices)),
            None => (name.to_string(), OpKind::Engine),
        };

        let resolved = self.engine.resolve_contract(&engine_name)?;
        let outputs = self.engine.output_descriptors(&engine_name)?;

        Ok(ResolvedOp {
            name: name.to_string(),
            engine_name,
            kind,
            inputs: resolved.inputs,
            outputs,
            schema: resolved.schema,
            default_device: self.default_device,
        })
    }

    /// Resolve and call in one step.
    pub fn call(&self, graph: &mut Graph, name: &str, call: OpCall) -> Result<OpOutput> {
        self.resolve(name)?.call(graph, call)
    }

    /// Declare the operator once, then any of its device kernels not yet bound.
    /// A failed kernel declaration is retried on the next resolve.
    fn declare_local(&self, contract: &OperatorContract) -> Result<String> {
        let mut declared = self.declared.lock();
        let declaration = match declared.entry(contract.name.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let pseudo = contract.pseudo_name();
                self.engine
                    .declare_operator(&OperatorDeclaration::from_contract(contract, &pseudo))?;
                entry.insert(Declaration {
                    pseudo,
                    kernels: Vec::new(),
                })
            }
        };

        let devices = contract.devices.devices();
        let missing: Vec<DeviceType> = devices
            .iter()
            .copied()
            .filter(|device| !declaration.kernels.contains(device))
            .collect();

        if missing.is_empty() {
            tracing::debug!("Kernel '{}' already declared as '{}'", contract.name, declaration.pseudo);
            return Ok(declaration.pseudo.clone());
        }

        for device in missing {
            self.engine.declare_kernel(KernelDeclaration {
                operator: declaration.pseudo.clone(),
                device,
                adapter: contract.adapter.clone(),
                batch: contract.batch,
            })?;
            declaration.kernels.push(device);
        }

        tracing::info!(
            "Declared kernel '{}' as '{}' on {} device(s)",
            contract.name,
            declaration.pseudo,
            devices.len()
        );

        Ok(declaration.pseudo.clone())
    }
}

struct Declaration {
    pseudo: String,
    /// Devices whose kernel the engine has accepted.
    kernels: Vec<DeviceType>,
}

#[derive(Debug, Clone)]
enum OpKind {
    Structural,
    /// Registered in this process; carries its device affinity.
    Local(DeviceAffinity),
    Engine,
}

/// An operator ready to be called.
#[derive(Debug, Clone)]
pub struct ResolvedOp {
    name: String,
    engine_name: String,
    kind: OpKind,
    inputs: OperatorInputs,
    outputs: Vec<ColumnDescriptor>,
    schema: Option<String>,
    default_device: DeviceType,
}

impl ResolvedOp {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name the node carries; the pseudo-name for local kernels.
    pub fn engine_name(&self) -> &str {
        &self.engine_name
    }

    pub fn inputs(&self) -> &OperatorInputs {
        &self.inputs
    }

    pub fn outputs(&self) -> &[ColumnDescriptor] {
        &self.outputs
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn is_local(&self) -> bool {
        matches!(self.kind, OpKind::Local(_))
    }

    pub fn is_structural(&self) -> bool {
        matches!(self.kind, OpKind::Structural)
    }

    /// Build exactly one node from `call` and return its outputs.
    pub fn call(&self, graph: &mut Graph, call: OpCall) -> Result<OpOutput> {
        let OpCall {
            positional,
            mut named,
            mut kwargs,
            device_count,
            encoded,
        } = call;

        let inputs = match &self.inputs {
            OperatorInputs::Variadic => {
                if let Some((input, _)) = named.first() {
                    return Err(GraphError::ContractViolation(format!(
                        "Op {} takes positional inputs only, got named input '{}'",
                        self.name, input
                    )));
                }
                positional
            }
            OperatorInputs::Fixed(columns) => {
                if !positional.is_empty() {
                    return Err(GraphError::ContractViolation(format!(
                        "Op {} takes named inputs ({}), got {} positional",
                        self.name,
                        column_names(columns),
                        positional.len()
                    )));
                }

                let mut bound = Vec::with_capacity(columns.len());
                for column in columns {
                    let index = named
                        .iter()
                        .position(|(input, _)| *input == column.name)
                        .ok_or_else(|| {
                            GraphError::ContractViolation(format!(
                                "Op {} required sequence {} as input",
                                self.name, column.name
                            ))
                        })?;
                    bound.push(named.remove(index).1);
                }

                if let Some((input, _)) = named.first() {
                    return Err(GraphError::ContractViolation(format!(
                        "Op {} has no input named '{}'. Inputs: {}",
                        self.name,
                        input,
                        column_names(columns)
                    )));
                }
                bound
            }
        };

        let reserved = Reserved::extract(&self.name, &mut kwargs)?;
        let device = self.placement(reserved.device, device_count)?;

        let args = match (encoded, reserved.args) {
            (Some(encoded), _) => {
                warn_ignored(&self.name, &kwargs);
                NodeArgs::Encoded(encoded)
            }
            (None, Some(bag)) => {
                warn_ignored(&self.name, &kwargs);
                NodeArgs::Bag(bag)
            }
            (None, None) => NodeArgs::Bag(kwargs),
        };

        let codec = match (&self.kind, &self.schema) {
            (OpKind::Local(_), _) => ParamCodec::Generic,
            (_, Some(schema)) => ParamCodec::Schema(schema.clone()),
            (_, None) => ParamCodec::None,
        };

        if let (ParamCodec::None, NodeArgs::Bag(bag)) = (&codec, &args) {
            if !bag.is_empty() {
                return Err(GraphError::ContractViolation(format!(
                    "Op {} has no parameter schema but received arguments: {}",
                    self.name,
                    bag.keys().cloned().collect::<Vec<_>>().join(", ")
                )));
            }
        }

        let spec = NodeSpec {
            name: self.engine_name.clone(),
            device,
            batch: reserved.batch,
            state_window: reserved.bounded_state,
            stencil: reserved.stencil,
            inputs,
            args,
            codec,
            extra: reserved.extra,
        };

        let mut handles = graph.add_node(spec, &self.outputs)?;
        Ok(if handles.len() == 1 {
            OpOutput::Single(handles.remove(0))
        } else {
            OpOutput::Tuple(handles)
        })
    }

    fn placement(&self, requested: Option<DeviceType>, count: Option<u32>) -> Result<DeviceType> {
        let affinity = match &self.kind {
            OpKind::Local(affinity) => affinity,
            _ => {
                if count.is_some() {
                    return Err(GraphError::ContractViolation(format!(
                        "Op {} declares no device counts",
                        self.name
                    )));
                }
                return Ok(requested.unwrap_or(self.default_device));
            }
        };

        let device = match requested {
            Some(device) if !affinity.supports(device) => {
                return Err(GraphError::ContractViolation(format!(
                    "Op {} has no {} kernel. Devices: {}",
                    self.name,
                    device,
                    affinity
                        .devices()
                        .iter()
                        .map(|d| d.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )));
            }
            Some(device) => device,
            None if affinity.supports(self.default_device) => self.default_device,
            None => affinity.devices().first().copied().unwrap_or(self.default_device),
        };

        if let Some(count) = count {
            match affinity.count_for(device) {
                Some(declared) if declared == count => {}
                Some(declared) => {
                    return Err(GraphError::ContractViolation(format!(
                        "Op {} declares {} {} instance(s), requested {}",
                        self.name, declared, device, count
                    )));
                }
                None => {
                    return Err(GraphError::ContractViolation(format!(
                        "Op {} declares no device counts",
                        self.name
                    )));
                }
            }
        }

        Ok(device)
    }
}

/// Inputs and keyword arguments of one operator call.
#[derive(Debug, Clone, Default)]
pub struct OpCall {
    positional: Vec<OutputHandle>,
    named: Vec<(String, OutputHandle)>,
    kwargs: ArgBag,
    device_count: Option<u32>,
    encoded: Option<EncodedArgs>,
}

impl OpCall {
    pub fn new() -> Self {
        Self::default()
    }

    /// Positional input of a variadic operator.
    pub fn input(mut self, handle: OutputHandle) -> Self {
        self.positional.push(handle);
        self
    }

    pub fn inputs(mut self, handles: impl IntoIterator<Item = OutputHandle>) -> Self {
        self.positional.extend(handles);
        self
    }

    /// Named input of a fixed-arity operator.
    pub fn with(mut self, name: impl Into<String>, handle: OutputHandle) -> Self {
        self.named.push((name.into(), handle));
        self
    }

    /// Keyword argument; reserved keywords are consumed by the call.
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    pub fn args(mut self, bag: ArgBag) -> Self {
        self.kwargs.extend(bag);
        self
    }

    pub fn device(self, device: DeviceType) -> Self {
        self.arg("device", device.as_str())
    }

    /// Instance count for the chosen device; must match the declared device set.
    pub fn device_count(mut self, count: u32) -> Self {
        self.device_count = Some(count);
        self
    }

    pub fn batch(self, batch: i32) -> Self {
        self.arg("batch", batch)
    }

    pub fn bounded_state(self, window: i32) -> Self {
        self.arg("bounded_state", window)
    }

    pub fn stencil(self, offsets: Vec<i32>) -> Self {
        self.arg("stencil", offsets)
    }

    pub fn extra(self, extra: JsonValue) -> Self {
        self.arg("extra", extra)
    }

    /// Pre-encoded schema arguments; the keyword bag is ignored.
    pub fn args_encoded(mut self, encoded: EncodedArgs) -> Self {
        self.encoded = Some(encoded);
        self
    }
}

/// Output handles of one call, in declared order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpOutput {
    Single(OutputHandle),
    Tuple(Vec<OutputHandle>),
}

impl OpOutput {
    pub fn into_single(self) -> Result<OutputHandle> {
        match self {
            OpOutput::Single(handle) => Ok(handle),
            OpOutput::Tuple(handles) => Err(GraphError::ContractViolation(format!(
                "expected one output, operator produced {}",
                handles.len()
            ))),
        }
    }

    pub fn into_vec(self) -> Vec<OutputHandle> {
        match self {
            OpOutput::Single(handle) => vec![handle],
            OpOutput::Tuple(handles) => handles,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            OpOutput::Single(_) => 1,
            OpOutput::Tuple(handles) => handles.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct Reserved {
    device: Option<DeviceType>,
    batch: i32,
    bounded_state: i32,
    stencil: Vec<i32>,
    extra: Option<JsonValue>,
    args: Option<ArgBag>,
}

impl Reserved {
    fn extract(op: &str, kwargs: &mut ArgBag) -> Result<Self> {
        let invalid = |key: &str, expected: &str| {
            GraphError::ContractViolation(format!(
                "Op {}: reserved argument '{}' must be {}",
                op, key, expected
            ))
        };

        let device = match kwargs.remove("device") {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::String(s)) => Some(s.parse::<DeviceType>()?),
            Some(_) => return Err(invalid("device", "a device name")),
        };

        let mut int = |key: &str| -> Result<i32> {
            match kwargs.remove(key) {
                None | Some(JsonValue::Null) => Ok(-1),
                Some(v) => v
                    .as_i64()
                    .and_then(|n| i32::try_from(n).ok())
                    .ok_or_else(|| invalid(key, "an integer")),
            }
        };
        let batch = int("batch")?;
        let bounded_state = int("bounded_state")?;

        let stencil = match kwargs.remove("stencil") {
            None | Some(JsonValue::Null) => Vec::new(),
            Some(JsonValue::Array(items)) => items
                .iter()
                .map(|v| v.as_i64().and_then(|n| i32::try_from(n).ok()))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| invalid("stencil", "a list of integers"))?,
            Some(_) => return Err(invalid("stencil", "a list of integers")),
        };

        let extra = kwargs.remove("extra").filter(|v| !v.is_null());

        let args = match kwargs.remove("args") {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::Object(bag)) => Some(bag),
            Some(_) => return Err(invalid("args", "a keyword map")),
        };

        Ok(Self {
            device,
            batch,
            bounded_state,
            stencil,
            extra,
            args,
        })
    }
}

fn column_names(columns: &[ColumnDescriptor]) -> String {
    columns
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn warn_ignored(op: &str, kwargs: &ArgBag) {
    if !kwargs.is_empty() {
        tracing::warn!(
            "Op {}: explicit args given, ignoring keyword arguments: {}",
            op,
            kwargs.keys().cloned().collect::<Vec<_>>().join(", ")
        );
    }
}
