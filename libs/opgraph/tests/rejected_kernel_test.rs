// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Link-time submissions that fail to register surface as configuration errors.

use opgraph::core::{
    global_registry, is_kernel_registered, list_kernels, try_global_registry, GraphError,
    InMemoryEngine,
};
use opgraph::prelude::*;
use opgraph::register_kernel;
use serial_test::serial;
use std::sync::Arc;

fn identity(_ctx: &KernelContext, args: KernelArgs) -> opgraph::Result<KernelOutput> {
    Ok(KernelOutput::from(args.blob("input")?.to_vec()))
}

fn missing_return() -> KernelRegistration {
    KernelRegistration::function(
        "Unterminated",
        KernelSignature::new().input("input", Annotation::Blob),
        identity,
    )
}

register_kernel!(missing_return);

fn tee_first() -> KernelRegistration {
    KernelRegistration::function(
        "Tee",
        KernelSignature::new()
            .input("input", Annotation::Blob)
            .returns(Annotation::Blob),
        identity,
    )
}

fn tee_second() -> KernelRegistration {
    KernelRegistration::function(
        "Tee",
        KernelSignature::new()
            .input("frame", Annotation::Frame)
            .returns(Annotation::Frame),
        |_ctx, mut args| Ok(KernelOutput::from(args.take("frame")?)),
    )
}

register_kernel!(tee_first);
register_kernel!(tee_second);

fn healthy() -> KernelRegistration {
    KernelRegistration::function(
        "Passthrough",
        KernelSignature::new()
            .input("input", Annotation::Blob)
            .returns(Annotation::Blob),
        identity,
    )
}

register_kernel!(healthy);

fn config_message(err: GraphError) -> String {
    match err {
        GraphError::Configuration(msg) => msg,
        other => panic!("expected configuration error, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_invalid_submission_reports_configuration_error() {
    let msg = config_message(is_kernel_registered("Unterminated").unwrap_err());
    assert!(msg.contains("Unterminated"));

    let resolver = OpResolver::new(Arc::new(InMemoryEngine::new()));
    let msg = config_message(resolver.resolve("Unterminated").unwrap_err());
    assert!(msg.contains("Unterminated"));
}

#[test]
#[serial]
fn test_duplicate_submissions_are_both_rejected() {
    let msg = config_message(is_kernel_registered("Tee").unwrap_err());
    assert!(msg.contains("'Tee' is submitted 2 times"));
    assert!(!list_kernels().contains(&"Tee".to_string()));

    let resolver = OpResolver::new(Arc::new(InMemoryEngine::new()));
    assert!(matches!(
        resolver.resolve("Tee"),
        Err(GraphError::Configuration(_))
    ));
}

#[test]
#[serial]
fn test_try_global_registry_lists_failures() {
    let msg = config_message(try_global_registry().unwrap_err());
    assert!(msg.starts_with("2 kernel submission(s) failed"));
    assert!(msg.contains("Tee"));
    assert!(msg.contains("Unterminated"));

    assert!(is_kernel_registered("Passthrough").unwrap());
    assert_eq!(global_registry().lock().rejected(), vec!["Tee", "Unterminated"]);

    let resolver = OpResolver::new(Arc::new(InMemoryEngine::new()));
    assert!(resolver.resolve("Passthrough").is_ok());
}
