// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

mod adapter;
mod registration;
mod signature;

pub use adapter::{
    DynKernel, ExecutionAdapter, Kernel, KernelArgs, KernelContext, KernelInstance, KernelOutput,
};
pub use registration::KernelRegistration;
pub use signature::{Annotation, KernelParam, KernelSignature, ParamKind};
