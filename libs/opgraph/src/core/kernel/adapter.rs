// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Execution adapters: the uniform calling convention handed to the engine.

use std::fmt;
use std::sync::Arc;

use opgraph_schema::{decode_bag, ArgBag};
use serde::de::DeserializeOwned;

use super::signature::Annotation;
use crate::core::error::{GraphError, Result};
use crate::core::types::{DeviceType, Frame, Payload, Value};

/// Per-instance context passed to kernel code.
#[derive(Debug, Clone)]
pub struct KernelContext {
    operator: String,
    device: DeviceType,
    args: ArgBag,
}

impl KernelContext {
    pub fn new(operator: impl Into<String>, device: DeviceType, args: ArgBag) -> Self {
        Self {
            operator: operator.into(),
            device,
            args,
        }
    }

    /// Build a context from a node's parameter payload (generic keyed codec).
    pub fn from_payload(
        operator: impl Into<String>,
        device: DeviceType,
        payload: &[u8],
    ) -> Result<Self> {
        Ok(Self::new(operator, device, decode_bag(payload)?))
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn device(&self) -> DeviceType {
        self.device
    }

    pub fn args(&self) -> &ArgBag {
        &self.args
    }

    /// Typed view of one argument; `None` when absent.
    pub fn arg<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.args
            .get(key)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|e| {
                    GraphError::ContractViolation(format!(
                        "argument '{}' of kernel '{}' has the wrong type: {}",
                        key, self.operator, e
                    ))
                })
            })
            .transpose()
    }
}

/// Decoded inputs bound for one kernel invocation.
#[derive(Debug, Clone, Default)]
pub struct KernelArgs {
    operator: String,
    named: Vec<(String, Value)>,
    positional: Vec<Value>,
}

impl KernelArgs {
    pub fn named(operator: impl Into<String>, named: Vec<(String, Value)>) -> Self {
        Self {
            operator: operator.into(),
            named,
            positional: Vec::new(),
        }
    }

    pub fn positional(operator: impl Into<String>, positional: Vec<Value>) -> Self {
        Self {
            operator: operator.into(),
            named: Vec::new(),
            positional,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.named.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Remove and return a named input.
    pub fn take(&mut self, name: &str) -> Result<Value> {
        let index = self
            .named
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| self.missing(name))?;
        Ok(self.named.remove(index).1)
    }

    pub fn blob(&self, name: &str) -> Result<&[u8]> {
        let value = self.get(name).ok_or_else(|| self.missing(name))?;
        value.as_blob().ok_or_else(|| self.wrong_kind(name, "blob", value))
    }

    pub fn frame(&self, name: &str) -> Result<&Frame> {
        let value = self.get(name).ok_or_else(|| self.missing(name))?;
        value
            .as_frame()
            .ok_or_else(|| self.wrong_kind(name, "frame", value))
    }

    pub fn list(&self, name: &str) -> Result<&[Value]> {
        let value = self.get(name).ok_or_else(|| self.missing(name))?;
        value.as_list().ok_or_else(|| self.wrong_kind(name, "list", value))
    }

    /// Inputs of a variadic kernel, in call order.
    pub fn values(&self) -> &[Value] {
        &self.positional
    }

    pub fn into_values(self) -> Vec<Value> {
        self.positional
    }

    pub fn len(&self) -> usize {
        self.named.len() + self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn missing(&self, name: &str) -> GraphError {
        GraphError::ContractViolation(format!(
            "kernel '{}' has no input named '{}'",
            self.operator, name
        ))
    }

    fn wrong_kind(&self, name: &str, expected: &str, found: &Value) -> GraphError {
        GraphError::ContractViolation(format!(
            "input '{}' of kernel '{}' is a {}, not a {}",
            name,
            self.operator,
            found.kind(),
            expected
        ))
    }
}

/// Values returned by one kernel invocation, one per output column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelOutput(Vec<Value>);

impl KernelOutput {
    pub fn single(value: impl Into<Value>) -> Self {
        Self(vec![value.into()])
    }

    pub fn tuple(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0
    }
}

impl From<Value> for KernelOutput {
    fn from(value: Value) -> Self {
        Self::single(value)
    }
}

impl From<Vec<u8>> for KernelOutput {
    fn from(bytes: Vec<u8>) -> Self {
        Self::single(bytes)
    }
}

impl From<Frame> for KernelOutput {
    fn from(frame: Frame) -> Self {
        Self::single(frame)
    }
}

/// Stateful kernel, instantiated once per engine instance.
pub trait Kernel: Send + 'static {
    fn new(ctx: &KernelContext) -> Result<Self>
    where
        Self: Sized;

    fn execute(&mut self, args: KernelArgs) -> Result<KernelOutput>;
}

/// Object-safe face of [`Kernel`].
pub trait DynKernel: Send {
    fn execute(&mut self, args: KernelArgs) -> Result<KernelOutput>;
}

impl<K: Kernel> DynKernel for K {
    fn execute(&mut self, args: KernelArgs) -> Result<KernelOutput> {
        Kernel::execute(self, args)
    }
}

mod callback {
    use super::{DynKernel, KernelArgs, KernelContext, KernelOutput, Result};

    pub type KernelFn = dyn Fn(&KernelContext, KernelArgs) -> Result<KernelOutput> + Send + Sync;

    pub type KernelConstructor =
        dyn Fn(&KernelContext) -> Result<Box<dyn DynKernel>> + Send + Sync;
}

#[derive(Clone)]
pub(crate) enum KernelSource {
    Function(Arc<callback::KernelFn>),
    Class(Arc<callback::KernelConstructor>),
}

impl KernelSource {
    pub(crate) fn function<F>(f: F) -> Self
    where
        F: Fn(&KernelContext, KernelArgs) -> Result<KernelOutput> + Send + Sync + 'static,
    {
        KernelSource::Function(Arc::new(f))
    }

    pub(crate) fn class<K: Kernel>() -> Self {
        KernelSource::Class(Arc::new(
            |ctx: &KernelContext| -> Result<Box<dyn DynKernel>> { Ok(Box::new(K::new(ctx)?)) },
        ))
    }
}

/// How serialized columns bind to kernel parameters.
#[derive(Debug)]
pub(crate) struct Binding {
    pub operator: String,
    /// Declared inputs with their full (unstripped) annotations.
    pub inputs: Vec<(String, Annotation)>,
    pub variadic: bool,
    /// Output annotations, batch layer included.
    pub outputs: Vec<Annotation>,
}

/// Uniform execution entry point built once at registration.
#[derive(Clone)]
pub struct ExecutionAdapter {
    binding: Arc<Binding>,
    source: KernelSource,
}

impl ExecutionAdapter {
    pub(crate) fn new(binding: Binding, source: KernelSource) -> Self {
        Self {
            binding: Arc::new(binding),
            source,
        }
    }

    /// Declared input count, `None` for variadic kernels.
    pub fn input_count(&self) -> Option<usize> {
        (!self.binding.variadic).then_some(self.binding.inputs.len())
    }

    pub fn output_count(&self) -> usize {
        self.binding.outputs.len()
    }

    /// Create one kernel instance for the given context.
    pub fn instantiate(&self, ctx: KernelContext) -> Result<KernelInstance> {
        let runner = match &self.source {
            KernelSource::Function(f) => Runner::Function(f.clone()),
            KernelSource::Class(constructor) => Runner::Class(constructor(&ctx)?),
        };
        Ok(KernelInstance {
            binding: self.binding.clone(),
            ctx,
            runner,
        })
    }

    /// Instantiate and run once.
    pub fn execute_once(&self, ctx: KernelContext, inputs: Vec<Payload>) -> Result<Vec<Payload>> {
        self.instantiate(ctx)?.execute(inputs)
    }
}

impl fmt::Debug for ExecutionAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionAdapter")
            .field("operator", &self.binding.operator)
            .field("variadic", &self.binding.variadic)
            .field("outputs", &self.binding.outputs.len())
            .finish_non_exhaustive()
    }
}

enum Runner {
    Function(Arc<callback::KernelFn>),
    Class(Box<dyn DynKernel>),
}

/// A live kernel: decodes inputs, calls user code, encodes outputs.
pub struct KernelInstance {
    binding: Arc<Binding>,
    ctx: KernelContext,
    runner: Runner,
}

impl KernelInstance {
    pub fn context(&self) -> &KernelContext {
        &self.ctx
    }

    pub fn execute(&mut self, inputs: Vec<Payload>) -> Result<Vec<Payload>> {
        let binding = &self.binding;
        let args = if binding.variadic {
            KernelArgs::positional(
                binding.operator.clone(),
                inputs.into_iter().map(Payload::into_raw_value).collect(),
            )
        } else {
            if inputs.len() != binding.inputs.len() {
                return Err(GraphError::ContractViolation(format!(
                    "kernel '{}' takes {} inputs but received {}",
                    binding.operator,
                    binding.inputs.len(),
                    inputs.len()
                )));
            }
            let named = binding
                .inputs
                .iter()
                .zip(inputs)
                .map(|((name, annotation), payload)| {
                    decode_payload(annotation, payload)
                        .map(|value| (name.clone(), value))
                        .map_err(|e| annotate(e, &binding.operator, name))
                })
                .collect::<Result<Vec<_>>>()?;
            KernelArgs::named(binding.operator.clone(), named)
        };

        let output = match &mut self.runner {
            Runner::Function(f) => f(&self.ctx, args)?,
            Runner::Class(kernel) => kernel.execute(args)?,
        };

        let values = output.into_values();
        if values.len() != binding.outputs.len() {
            return Err(GraphError::ContractViolation(format!(
                "kernel '{}' declares {} outputs but returned {}",
                binding.operator,
                binding.outputs.len(),
                values.len()
            )));
        }

        binding
            .outputs
            .iter()
            .zip(values)
            .enumerate()
            .map(|(i, (annotation, value))| {
                encode_value(annotation, value)
                    .map_err(|e| annotate(e, &binding.operator, &format!("ret{}", i)))
            })
            .collect()
    }
}

fn decode_payload(annotation: &Annotation, payload: Payload) -> Result<Value> {
    match (annotation, payload) {
        (Annotation::Sequence(inner), Payload::List(items)) => items
            .into_iter()
            .map(|item| decode_payload(inner, item))
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        (leaf, Payload::Element(bytes)) => match leaf.column_type() {
            Some(column_type) => column_type.decode_element(&bytes),
            None => Err(GraphError::Codec(format!("expected {}, got one element", leaf))),
        },
        (leaf, Payload::List(_)) => Err(GraphError::Codec(format!("expected {}, got a list", leaf))),
    }
}

fn encode_value(annotation: &Annotation, value: Value) -> Result<Payload> {
    match (annotation, value) {
        (Annotation::Sequence(inner), Value::List(items)) => items
            .into_iter()
            .map(|item| encode_value(inner, item))
            .collect::<Result<Vec<_>>>()
            .map(Payload::List),
        (leaf, value) => match leaf.column_type() {
            Some(column_type) => column_type.encode_element(&value).map(Payload::Element),
            None => Err(GraphError::Codec(format!(
                "expected {}, got a {}",
                leaf,
                value.kind()
            ))),
        },
    }
}

fn annotate(err: GraphError, operator: &str, column: &str) -> GraphError {
    match err {
        GraphError::Codec(msg) => {
            GraphError::Codec(format!("kernel '{}', column '{}': {}", operator, column, msg))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn binding(variadic: bool) -> Binding {
        Binding {
            operator: "Concat".to_string(),
            inputs: if variadic {
                Vec::new()
            } else {
                vec![
                    ("left".to_string(), Annotation::Blob),
                    ("right".to_string(), Annotation::Blob),
                ]
            },
            variadic,
            outputs: vec![Annotation::Blob],
        }
    }

    fn ctx() -> KernelContext {
        KernelContext::new("Concat", DeviceType::Cpu, ArgBag::new())
    }

    #[test]
    fn test_named_binding() {
        let adapter = ExecutionAdapter::new(
            binding(false),
            KernelSource::function(|_ctx, args| {
                let mut out = args.blob("left")?.to_vec();
                out.extend_from_slice(args.blob("right")?);
                Ok(KernelOutput::from(out))
            }),
        );

        let out = adapter
            .execute_once(
                ctx(),
                vec![Payload::Element(vec![1]), Payload::Element(vec![2, 3])],
            )
            .unwrap();
        assert_eq!(out, vec![Payload::Element(vec![1, 2, 3])]);
    }

    #[test]
    fn test_positional_binding() {
        let adapter = ExecutionAdapter::new(
            binding(true),
            KernelSource::function(|_ctx, args| {
                Ok(KernelOutput::from(vec![args.values().len() as u8]))
            }),
        );

        let inputs = vec![Payload::Element(vec![]); 3];
        let out = adapter.execute_once(ctx(), inputs).unwrap();
        assert_eq!(out, vec![Payload::Element(vec![3])]);
        assert_eq!(adapter.input_count(), None);
    }

    #[test]
    fn test_wrong_input_count() {
        let adapter = ExecutionAdapter::new(
            binding(false),
            KernelSource::function(|_ctx, _args| Ok(KernelOutput::from(vec![]))),
        );

        let result = adapter.execute_once(ctx(), vec![Payload::Element(vec![1])]);
        assert!(matches!(result, Err(GraphError::ContractViolation(_))));
    }

    #[test]
    fn test_wrong_output_count() {
        let adapter = ExecutionAdapter::new(
            binding(true),
            KernelSource::function(|_ctx, _args| Ok(KernelOutput::tuple(vec![]))),
        );

        let err = adapter.execute_once(ctx(), vec![]).unwrap_err().to_string();
        assert!(err.contains("declares 1 outputs but returned 0"));
    }

    #[test]
    fn test_batched_output_encoded_per_element() {
        let adapter = ExecutionAdapter::new(
            Binding {
                operator: "Split".to_string(),
                inputs: vec![("frames".to_string(), Annotation::sequence(Annotation::Blob))],
                variadic: false,
                outputs: vec![Annotation::sequence(Annotation::Blob)],
            },
            KernelSource::function(|_ctx, args| {
                let reversed: Vec<Value> = args.list("frames")?.iter().rev().cloned().collect();
                Ok(KernelOutput::single(reversed))
            }),
        );

        let out = adapter
            .execute_once(
                ctx(),
                vec![Payload::List(vec![
                    Payload::Element(vec![1]),
                    Payload::Element(vec![2]),
                ])],
            )
            .unwrap();
        assert_eq!(
            out,
            vec![Payload::List(vec![
                Payload::Element(vec![2]),
                Payload::Element(vec![1]),
            ])]
        );
    }

    #[test]
    fn test_context_args() {
        let bytes = opgraph_schema::encode_bag(
            json!({"threshold": 0.25}).as_object().unwrap(),
        )
        .unwrap();
        let ctx = KernelContext::from_payload("Gate", DeviceType::Gpu, &bytes).unwrap();

        assert_eq!(ctx.arg::<f64>("threshold").unwrap(), Some(0.25));
        assert_eq!(ctx.arg::<f64>("missing").unwrap(), None);
        assert!(ctx.arg::<String>("threshold").is_err());
    }

    struct Counter {
        calls: u8,
    }

    impl Kernel for Counter {
        fn new(_ctx: &KernelContext) -> Result<Self> {
            Ok(Self { calls: 0 })
        }

        fn execute(&mut self, _args: KernelArgs) -> Result<KernelOutput> {
            self.calls += 1;
            Ok(KernelOutput::from(vec![self.calls]))
        }
    }

    #[test]
    fn test_class_kernel_keeps_state() {
        let adapter = ExecutionAdapter::new(binding(true), KernelSource::class::<Counter>());
        let mut instance = adapter.instantiate(ctx()).unwrap();

        instance.execute(vec![]).unwrap();
        let second = instance.execute(vec![]).unwrap();
        assert_eq!(second, vec![Payload::Element(vec![2])]);
    }
}
