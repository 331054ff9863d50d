// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use opgraph_schema::SchemaError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    /// Registration-time problem with a kernel declaration.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Graph-construction-time misuse of an operator contract.
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// The engine rejected a call or does not know the operator.
    #[error("Engine error: {0}")]
    Upstream(String),

    #[error("Element codec error: {0}")]
    Codec(String),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, GraphError>;
