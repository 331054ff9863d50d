// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Operator contracts and graph construction.
//!
//! Kernels registered with [`KernelRegistration`] are declared to an
//! [`Engine`] under a process-unique pseudo-name the first time an
//! [`OpResolver`] resolves them. Resolved operators build [`Graph`] nodes,
//! which serialize to an index-addressed [`WireGraph`].
//!
//! ```
//! use opgraph::prelude::*;
//! use std::sync::Arc;
//!
//! let engine = Arc::new(InMemoryEngine::new());
//! let resolver = OpResolver::with_registry(engine, Default::default());
//!
//! let mut graph = Graph::new();
//! let frames = graph.source("frame", ColumnType::Video).unwrap();
//! let sampled = resolver
//!     .call(&mut graph, "Sample", OpCall::new().input(frames))
//!     .unwrap()
//!     .into_single()
//!     .unwrap();
//! assert_eq!(sampled.column(), "frame");
//! ```

#![allow(clippy::type_complexity)] // Adapter closures are clear in context

// Re-exported for register_kernel! expansions
pub use inventory;

// Keyword argument values
pub use serde_json;

pub use opgraph_schema as schema;

pub mod core;

pub use core::*;
