// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Kernel registration: derives an [`OperatorContract`] from a declared
//! signature and stores it in an [`OperatorRegistry`].

use super::adapter::{Binding, ExecutionAdapter, Kernel, KernelArgs, KernelContext, KernelOutput, KernelSource};
use super::signature::{Annotation, KernelSignature, ParamKind};
use crate::core::contract::{
    ColumnDescriptor, DeviceAffinity, OperatorContract, OperatorInputs, StateModel,
};
use crate::core::error::{GraphError, Result};
use crate::core::graph::{is_structural, STRUCTURAL_OPS};
use crate::core::registration_id::RegistrationId;
use crate::core::registry::{global_registry, OperatorRegistry};
use crate::core::types::{ColumnType, DeviceType};

/// Builder for registering a kernel.
///
/// ```ignore
/// KernelRegistration::function(
///     "Invert",
///     KernelSignature::new()
///         .input("frame", Annotation::Frame)
///         .returns(Annotation::Frame),
///     |_ctx, args| { /* ... */ },
/// )
/// .device_type(DeviceType::Gpu)
/// .register()?;
/// ```
pub struct KernelRegistration {
    name: Option<String>,
    signature: KernelSignature,
    source: KernelSource,
    stencil: Option<Vec<i32>>,
    bounded_state: Option<u32>,
    unbounded_state: bool,
    device_type: Option<DeviceType>,
    device_sets: Option<Vec<(DeviceType, u32)>>,
    batch: u32,
    schema: Option<String>,
}

impl KernelRegistration {
    /// Register a stateless function kernel.
    pub fn function<F>(name: impl Into<String>, signature: KernelSignature, f: F) -> Self
    where
        F: Fn(&KernelContext, KernelArgs) -> Result<KernelOutput> + Send + Sync + 'static,
    {
        Self::with_source(Some(name.into()), signature, KernelSource::function(f))
    }

    /// Register a [`Kernel`] type. Named after the type unless overridden.
    pub fn kernel<K: Kernel>(signature: KernelSignature) -> Self {
        Self::with_source(
            Some(short_type_name::<K>().to_string()),
            signature,
            KernelSource::class::<K>(),
        )
    }

    fn with_source(name: Option<String>, signature: KernelSignature, source: KernelSource) -> Self {
        Self {
            name,
            signature,
            source,
            stencil: None,
            bounded_state: None,
            unbounded_state: false,
            device_type: None,
            device_sets: None,
            batch: 1,
            schema: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Default stencil. Without one the kernel cannot stencil; pass `[0]`
    /// for a kernel that can stencil but does not by default.
    pub fn stencil(mut self, offsets: Vec<i32>) -> Self {
        self.stencil = Some(offsets);
        self
    }

    pub fn bounded_state(mut self, window: u32) -> Self {
        self.bounded_state = Some(window);
        self
    }

    pub fn unbounded_state(mut self) -> Self {
        self.unbounded_state = true;
        self
    }

    pub fn device_type(mut self, device: DeviceType) -> Self {
        self.device_type = Some(device);
        self
    }

    pub fn device_sets(mut self, sets: Vec<(DeviceType, u32)>) -> Self {
        self.device_sets = Some(sets);
        self
    }

    pub fn batch(mut self, batch: u32) -> Self {
        self.batch = batch;
        self
    }

    /// Parameter schema documenting the kernel's arguments.
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Name the contract will be registered under, if one is set.
    pub fn registered_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Derive the contract without registering it.
    pub fn build(self) -> Result<OperatorContract> {
        let name = match self.name {
            Some(name) if !name.is_empty() => name,
            _ => {
                return Err(GraphError::Configuration(
                    "kernel registration requires a non-empty name".into(),
                ));
            }
        };

        if is_structural(&name) {
            return Err(GraphError::Configuration(format!(
                "kernel '{}': name is reserved for a structural operator ({})",
                name,
                STRUCTURAL_OPS.join(", ")
            )));
        }

        if self.batch == 0 {
            return Err(GraphError::Configuration(format!(
                "kernel '{}': batch must be at least 1",
                name
            )));
        }

        let state = match (self.bounded_state, self.unbounded_state) {
            (Some(_), true) => {
                return Err(GraphError::Configuration(format!(
                    "kernel '{}': bounded_state and unbounded_state are mutually exclusive",
                    name
                )));
            }
            (Some(window), false) => StateModel::Bounded(window),
            (None, true) => StateModel::Unbounded,
            (None, false) => StateModel::Stateless,
        };

        let devices = match (self.device_type, self.device_sets) {
            (Some(_), Some(_)) => {
                return Err(GraphError::Configuration(format!(
                    "kernel '{}': specify only one of device_type or device_sets",
                    name
                )));
            }
            (_, Some(sets)) if sets.is_empty() => {
                return Err(GraphError::Configuration(format!(
                    "kernel '{}': device_sets must list at least one device",
                    name
                )));
            }
            (_, Some(sets)) => DeviceAffinity::Sets(sets),
            (Some(device), None) => DeviceAffinity::Type(device),
            (None, None) => DeviceAffinity::Type(DeviceType::Cpu),
        };

        let shape = Shape {
            kernel: &name,
            can_batch: self.batch > 1,
            can_stencil: self.stencil.is_some(),
        };

        let (inputs, bound_inputs) = shape.derive_inputs(&self.signature)?;
        let (outputs, bound_outputs) = shape.derive_outputs(&self.signature)?;

        let adapter = ExecutionAdapter::new(
            Binding {
                operator: name.clone(),
                inputs: bound_inputs,
                variadic: inputs.is_variadic(),
                outputs: bound_outputs,
            },
            self.source,
        );

        Ok(OperatorContract {
            name,
            registration_id: RegistrationId::new(),
            inputs,
            outputs,
            stencil: self.stencil,
            batch: self.batch,
            state,
            devices,
            schema: self.schema,
            adapter,
        })
    }

    /// Derive the contract and insert it into the process-wide registry.
    pub fn register(self) -> Result<OperatorContract> {
        let contract = self.build()?;
        global_registry().lock().register(contract.clone())?;
        tracing::debug!("Registered kernel '{}' as {}", contract.name, contract.pseudo_name());
        Ok(contract)
    }

    /// Derive the contract and insert it into `registry`.
    pub fn register_into(self, registry: &mut OperatorRegistry) -> Result<OperatorContract> {
        let contract = self.build()?;
        registry.register(contract.clone())?;
        Ok(contract)
    }
}

struct Shape<'a> {
    kernel: &'a str,
    can_batch: bool,
    can_stencil: bool,
}

impl Shape<'_> {
    fn derive_inputs(
        &self,
        signature: &KernelSignature,
    ) -> Result<(OperatorInputs, Vec<(String, Annotation)>)> {
        let mut columns = Vec::with_capacity(signature.params.len());
        let mut bound = Vec::with_capacity(signature.params.len());

        for param in &signature.params {
            match param.kind {
                ParamKind::PositionalOnly | ParamKind::VarKeyword => {
                    return Err(GraphError::Configuration(format!(
                        "kernel '{}': parameter '{}' is {}; only keyword parameters \
                         and a single variadic parameter are supported",
                        self.kernel,
                        param.name,
                        match param.kind {
                            ParamKind::PositionalOnly => "positional-only",
                            _ => "a keyword catch-all",
                        }
                    )));
                }
                ParamKind::VarPositional => {
                    if signature.params.len() > 1 {
                        return Err(GraphError::Configuration(format!(
                            "kernel '{}': variadic parameter '{}' cannot be combined with other inputs",
                            self.kernel, param.name
                        )));
                    }
                    return Ok((OperatorInputs::Variadic, Vec::new()));
                }
                ParamKind::Keyword => {}
            }

            let annotation = param.annotation.as_ref().ok_or_else(|| {
                GraphError::Configuration(format!(
                    "kernel '{}': no type annotation for input '{}'. Annotate it as Blob or Frame",
                    self.kernel, param.name
                ))
            })?;

            let column_type = self.unwrap(annotation, true)?;
            columns.push(ColumnDescriptor::new(param.name.clone(), column_type));
            bound.push((param.name.clone(), annotation.clone()));
        }

        Ok((OperatorInputs::Fixed(columns), bound))
    }

    fn derive_outputs(
        &self,
        signature: &KernelSignature,
    ) -> Result<(Vec<ColumnDescriptor>, Vec<Annotation>)> {
        let returns = signature.returns.as_ref().ok_or_else(|| {
            GraphError::Configuration(format!(
                "kernel '{}': a return annotation is required",
                self.kernel
            ))
        })?;

        let items = match returns {
            Annotation::VarTuple(_) => {
                return Err(GraphError::Configuration(format!(
                    "kernel '{}': variable-length tuple returns are not supported",
                    self.kernel
                )));
            }
            Annotation::Tuple(items) if items.is_empty() => {
                return Err(GraphError::Configuration(format!(
                    "kernel '{}': must return at least one column",
                    self.kernel
                )));
            }
            Annotation::Tuple(items) => items.clone(),
            single => vec![single.clone()],
        };

        let columns = items
            .iter()
            .enumerate()
            .map(|(i, annotation)| {
                self.unwrap(annotation, false)
                    .map(|column_type| ColumnDescriptor::new(format!("ret{}", i), column_type))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((columns, items))
    }

    /// Strip the batch layer, then the stencil layer (inputs only), and map
    /// the leaf to a column type.
    fn unwrap(&self, annotation: &Annotation, is_input: bool) -> Result<ColumnType> {
        let mut current = annotation;

        if self.can_batch {
            current = match current {
                Annotation::Sequence(inner) => inner,
                other => {
                    return Err(GraphError::Configuration(format!(
                        "kernel '{}': a batched kernel must annotate every input and output \
                         as Sequence[T], got {}",
                        self.kernel, other
                    )));
                }
            };
        }

        if is_input && self.can_stencil {
            current = match current {
                Annotation::Sequence(inner) => inner,
                _ => {
                    return Err(GraphError::Configuration(format!(
                        "kernel '{}': a stenciled kernel must annotate every input as Sequence[T]. \
                         A kernel that both stencils and batches needs Sequence[Sequence[T]], \
                         where T is Blob or Frame; got {}",
                        self.kernel, annotation
                    )));
                }
            };
        }

        current.column_type().ok_or_else(|| {
            GraphError::Configuration(format!(
                "kernel '{}': unsupported annotation {}; expected Blob or Frame",
                self.kernel, current
            ))
        })
    }
}

fn short_type_name<K>() -> &'static str {
    let full = std::any::type_name::<K>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kernel::KernelParam;

    fn identity(_ctx: &KernelContext, args: KernelArgs) -> Result<KernelOutput> {
        Ok(KernelOutput::from(args.blob("input")?.to_vec()))
    }

    fn blob_in_blob_out() -> KernelSignature {
        KernelSignature::new()
            .input("input", Annotation::Blob)
            .returns(Annotation::Blob)
    }

    fn config_err(result: Result<OperatorContract>) -> String {
        match result {
            Err(GraphError::Configuration(msg)) => msg,
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_single_input_contract() {
        let contract = KernelRegistration::function("Identity", blob_in_blob_out(), identity)
            .build()
            .unwrap();

        assert_eq!(contract.inputs.arity(), Some(1));
        assert_eq!(contract.outputs, vec![ColumnDescriptor::blob("ret0")]);
        assert!(!contract.is_variadic());
        assert!(!contract.can_batch());
        assert!(!contract.can_stencil());
        assert_eq!(contract.devices, DeviceAffinity::Type(DeviceType::Cpu));
        assert_eq!(contract.adapter.input_count(), Some(1));
    }

    #[test]
    fn test_structural_name_rejected() {
        for name in STRUCTURAL_OPS {
            let msg = config_err(
                KernelRegistration::function(name, blob_in_blob_out(), identity).build(),
            );
            assert!(msg.contains(name));
            assert!(msg.contains("structural"));
        }

        let registration = KernelRegistration::function("Sample", blob_in_blob_out(), identity);
        assert_eq!(registration.registered_name(), Some("Sample"));
    }

    #[test]
    fn test_variadic_contract() {
        let contract = KernelRegistration::function(
            "Merge",
            KernelSignature::new().variadic("columns").returns(Annotation::Blob),
            |_ctx, _args| Ok(KernelOutput::from(Vec::new())),
        )
        .build()
        .unwrap();

        assert!(contract.is_variadic());
        assert_eq!(contract.adapter.input_count(), None);
    }

    #[test]
    fn test_variadic_must_be_alone() {
        let signature = KernelSignature::new()
            .input("first", Annotation::Blob)
            .variadic("rest")
            .returns(Annotation::Blob);
        let msg = config_err(KernelRegistration::function("Bad", signature, identity).build());
        assert!(msg.contains("variadic parameter 'rest'"));
    }

    #[test]
    fn test_rejects_disallowed_param_kinds() {
        for kind in [ParamKind::PositionalOnly, ParamKind::VarKeyword] {
            let signature = KernelSignature::new()
                .param(KernelParam::keyword("x", Annotation::Blob).with_kind(kind))
                .returns(Annotation::Blob);
            let msg = config_err(KernelRegistration::function("Bad", signature, identity).build());
            assert!(msg.contains("parameter 'x'"));
        }
    }

    #[test]
    fn test_missing_annotation() {
        let signature = KernelSignature::new()
            .param(KernelParam::unannotated("frame"))
            .returns(Annotation::Blob);
        let msg = config_err(KernelRegistration::function("Bad", signature, identity).build());
        assert!(msg.contains("no type annotation for input 'frame'"));
    }

    #[test]
    fn test_missing_return_annotation() {
        let signature = KernelSignature::new().input("input", Annotation::Blob);
        let msg = config_err(KernelRegistration::function("Bad", signature, identity).build());
        assert!(msg.contains("return annotation is required"));
    }

    #[test]
    fn test_tuple_outputs() {
        let signature = KernelSignature::new()
            .input("frame", Annotation::Frame)
            .returns(Annotation::Tuple(vec![Annotation::Frame, Annotation::Blob]));
        let contract = KernelRegistration::function("Split", signature, identity)
            .build()
            .unwrap();

        assert_eq!(
            contract.outputs,
            vec![ColumnDescriptor::video("ret0"), ColumnDescriptor::blob("ret1")]
        );
    }

    #[test]
    fn test_variable_tuple_rejected() {
        let signature = KernelSignature::new()
            .input("input", Annotation::Blob)
            .returns(Annotation::VarTuple(Box::new(Annotation::Blob)));
        let msg = config_err(KernelRegistration::function("Bad", signature, identity).build());
        assert!(msg.contains("variable-length"));
    }

    #[test]
    fn test_batched_annotations() {
        let ok = KernelSignature::new()
            .input("frame", Annotation::sequence(Annotation::Frame))
            .returns(Annotation::sequence(Annotation::Blob));
        let contract = KernelRegistration::function("Batched", ok, identity)
            .batch(8)
            .build()
            .unwrap();
        assert!(contract.can_batch());
        assert_eq!(contract.inputs.descriptors(), &[ColumnDescriptor::video("frame")]);

        let bad = KernelSignature::new()
            .input("frame", Annotation::Frame)
            .returns(Annotation::sequence(Annotation::Blob));
        let msg = config_err(KernelRegistration::function("Batched", bad, identity).batch(8).build());
        assert!(msg.contains("Sequence[T]"));
    }

    #[test]
    fn test_stenciled_and_batched_annotations() {
        let ok = KernelSignature::new()
            .input(
                "frame",
                Annotation::sequence(Annotation::sequence(Annotation::Frame)),
            )
            .returns(Annotation::sequence(Annotation::Frame));
        let contract = KernelRegistration::function("Flow", ok, identity)
            .stencil(vec![-1, 0])
            .batch(4)
            .build()
            .unwrap();
        assert_eq!(contract.stencil, Some(vec![-1, 0]));
        assert_eq!(contract.inputs.descriptors(), &[ColumnDescriptor::video("frame")]);

        let bad = KernelSignature::new()
            .input("frame", Annotation::sequence(Annotation::Frame))
            .returns(Annotation::sequence(Annotation::Frame));
        let msg = config_err(
            KernelRegistration::function("Flow", bad, identity)
                .stencil(vec![0])
                .batch(4)
                .build(),
        );
        assert!(msg.contains("Sequence[Sequence[T]]"));
    }

    #[test]
    fn test_stencil_does_not_wrap_outputs() {
        let signature = KernelSignature::new()
            .input("frame", Annotation::sequence(Annotation::Frame))
            .returns(Annotation::Frame);
        let contract = KernelRegistration::function("Diff", signature, identity)
            .stencil(vec![0, 1])
            .build()
            .unwrap();
        assert_eq!(contract.outputs, vec![ColumnDescriptor::video("ret0")]);
    }

    #[test]
    fn test_conflicting_options() {
        let msg = config_err(
            KernelRegistration::function("Bad", blob_in_blob_out(), identity)
                .bounded_state(3)
                .unbounded_state()
                .build(),
        );
        assert!(msg.contains("mutually exclusive"));

        let msg = config_err(
            KernelRegistration::function("Bad", blob_in_blob_out(), identity)
                .device_type(DeviceType::Gpu)
                .device_sets(vec![(DeviceType::Cpu, 2)])
                .build(),
        );
        assert!(msg.contains("device_type or device_sets"));

        let msg = config_err(
            KernelRegistration::function("Bad", blob_in_blob_out(), identity)
                .batch(0)
                .build(),
        );
        assert!(msg.contains("at least 1"));
    }

    #[test]
    fn test_state_models() {
        let bounded = KernelRegistration::function("Smooth", blob_in_blob_out(), identity)
            .bounded_state(5)
            .build()
            .unwrap();
        assert_eq!(bounded.state, StateModel::Bounded(5));

        let unbounded = KernelRegistration::function("Track", blob_in_blob_out(), identity)
            .unbounded_state()
            .build()
            .unwrap();
        assert_eq!(unbounded.state, StateModel::Unbounded);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = OperatorRegistry::new();
        KernelRegistration::function("Twice", blob_in_blob_out(), identity)
            .register_into(&mut registry)
            .unwrap();

        let result = KernelRegistration::function("Twice", blob_in_blob_out(), identity)
            .register_into(&mut registry);
        assert!(config_err(result).contains("already registered"));
        assert_eq!(registry.len(), 1);
    }

    struct Histogram;

    impl Kernel for Histogram {
        fn new(_ctx: &KernelContext) -> Result<Self> {
            Ok(Self)
        }

        fn execute(&mut self, _args: KernelArgs) -> Result<KernelOutput> {
            Ok(KernelOutput::from(vec![0u8; 4]))
        }
    }

    #[test]
    fn test_kernel_type_name() {
        let signature = KernelSignature::new()
            .input("frame", Annotation::Frame)
            .returns(Annotation::Blob);

        let contract = KernelRegistration::kernel::<Histogram>(signature.clone())
            .build()
            .unwrap();
        assert_eq!(contract.name, "Histogram");

        let renamed = KernelRegistration::kernel::<Histogram>(signature)
            .name("ColorHistogram")
            .build()
            .unwrap();
        assert_eq!(renamed.name, "ColorHistogram");
    }
}
