// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Process-wide registry, link-time registration, and class kernels.

use opgraph::core::{
    global_registry, is_kernel_registered, try_global_registry, InMemoryEngine, KernelContext, Payload, StateModel,
};
use opgraph::prelude::*;
use opgraph::register_kernel;
use serial_test::serial;
use std::sync::Arc;

/// Running sum of every byte seen so far.
struct RunningSum {
    total: u64,
}

impl Kernel for RunningSum {
    fn new(ctx: &KernelContext) -> opgraph::Result<Self> {
        Ok(Self {
            total: ctx.arg("start")?.unwrap_or(0),
        })
    }

    fn execute(&mut self, args: KernelArgs) -> opgraph::Result<KernelOutput> {
        self.total += args.blob("bytes")?.iter().map(|b| *b as u64).sum::<u64>();
        Ok(KernelOutput::from(self.total.to_le_bytes().to_vec()))
    }
}

fn running_sum() -> KernelRegistration {
    KernelRegistration::kernel::<RunningSum>(
        KernelSignature::new()
            .input("bytes", Annotation::Blob)
            .returns(Annotation::Blob),
    )
    .unbounded_state()
}

register_kernel!(running_sum);

fn frame_sizes() -> KernelRegistration {
    KernelRegistration::function(
        "FrameSizes",
        KernelSignature::new()
            .input("frames", Annotation::sequence(Annotation::Frame))
            .returns(Annotation::sequence(Annotation::Blob)),
        |_ctx, args| {
            let sizes = args
                .list("frames")?
                .iter()
                .map(|v| {
                    let frame = v.as_frame().map(|f| f.data.len()).unwrap_or(0);
                    Value::Blob((frame as u32).to_le_bytes().to_vec())
                })
                .collect::<Vec<_>>();
            Ok(KernelOutput::single(sizes))
        },
    )
    .batch(2)
}

register_kernel!(frame_sizes);

#[test]
#[serial]
fn test_link_time_kernels_are_registered() {
    assert!(is_kernel_registered("RunningSum").unwrap());
    assert!(is_kernel_registered("FrameSizes").unwrap());
    assert!(try_global_registry().is_ok());

    let registry = global_registry();
    let guard = registry.lock();
    let contract = guard.get("RunningSum").unwrap();
    assert_eq!(contract.state, StateModel::Unbounded);
}

#[test]
#[serial]
fn test_runtime_registration_rejects_duplicates() {
    let signature = KernelSignature::new()
        .input("bytes", Annotation::Blob)
        .returns(Annotation::Blob);

    KernelRegistration::kernel::<RunningSum>(signature.clone())
        .name("RunningSumRuntime")
        .register()
        .unwrap();

    let err = KernelRegistration::kernel::<RunningSum>(signature)
        .name("RunningSumRuntime")
        .register()
        .unwrap_err();
    assert!(matches!(err, GraphError::Configuration(_)));
}

#[test]
#[serial]
fn test_global_resolver_declares_once_per_resolver() {
    let engine = Arc::new(InMemoryEngine::new());
    let resolver = OpResolver::new(engine.clone());

    let first = resolver.resolve("RunningSum").unwrap();
    let second = resolver.resolve("RunningSum").unwrap();
    assert_eq!(first.engine_name(), second.engine_name());
    assert!(first.engine_name().starts_with("RunningSum:"));
    assert!(first.is_local());
    assert_eq!(engine.operators().len(), 1);
}

#[test]
#[serial]
fn test_class_kernel_keeps_state_across_calls() {
    let engine = Arc::new(InMemoryEngine::new());
    let resolver = OpResolver::new(engine.clone());
    let resolved = resolver.resolve("RunningSum").unwrap();

    let adapter = engine.kernel(resolved.engine_name(), DeviceType::Cpu).unwrap();
    let args = serde_json::json!({"start": 10}).as_object().cloned().unwrap();
    let mut instance = adapter
        .instantiate(KernelContext::new("RunningSum", DeviceType::Cpu, args))
        .unwrap();

    instance.execute(vec![Payload::Element(vec![1, 2])]).unwrap();
    let out = instance.execute(vec![Payload::Element(vec![3])]).unwrap();
    assert_eq!(out, vec![Payload::Element(16u64.to_le_bytes().to_vec())]);
}

#[test]
#[serial]
fn test_batched_kernel_encodes_each_element() {
    let registry = global_registry();
    let adapter = registry.lock().get("FrameSizes").unwrap().adapter.clone();

    let frame = |len: usize| {
        ColumnType::Video
            .encode_element(&Value::Frame(Frame::new(1, 1, 1, vec![0; len])))
            .unwrap()
    };
    let out = adapter
        .execute_once(
            KernelContext::new("FrameSizes", DeviceType::Cpu, Default::default()),
            vec![Payload::List(vec![
                Payload::Element(frame(3)),
                Payload::Element(frame(5)),
            ])],
        )
        .unwrap();

    assert_eq!(
        out,
        vec![Payload::List(vec![
            Payload::Element(3u32.to_le_bytes().to_vec()),
            Payload::Element(5u32.to_le_bytes().to_vec()),
        ])]
    );
}
