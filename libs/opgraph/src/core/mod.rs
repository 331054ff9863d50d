// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod config;
pub mod contract;
pub mod engine;
pub mod error;
pub mod graph;
pub mod kernel;
pub mod logging;
pub mod per_stream;
pub mod prelude;
pub mod registration_id;
pub mod registry;
pub mod resolver;
pub mod types;

pub use config::ProjectConfig;
pub use contract::*;
pub use engine::*;
pub use error::*;
pub use graph::*;
pub use kernel::*;
pub use per_stream::*;
pub use registration_id::*;
pub use registry::*;
pub use resolver::*;
pub use types::*;
