// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use tracing_subscriber::EnvFilter;

use super::error::{GraphError, Result};

/// Install a stdout subscriber. `RUST_LOG` wins over `default_filter`.
///
/// If a global subscriber is already set this leaves it in place and returns `Ok`.
pub fn try_init(default_filter: &str) -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| GraphError::Configuration(format!("Invalid log filter '{}': {}", default_filter, e)))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init()
        .or_else(|e| {
            // Lost a race with another initializer.
            if tracing::dispatcher::has_been_set() {
                Ok(())
            } else {
                Err(GraphError::Other(anyhow::anyhow!(e)))
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_init_is_ok() {
        try_init("opgraph=debug").unwrap();
        try_init("opgraph=info").unwrap();
        assert!(tracing::dispatcher::has_been_set());
    }
}
