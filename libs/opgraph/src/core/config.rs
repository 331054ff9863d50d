// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Project-level configuration via `opgraph.yaml`.

use opgraph_schema::SchemaRegistry;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::error::{GraphError, Result};
use super::types::DeviceType;

/// Package-level metadata from `opgraph.yaml`.
#[derive(Debug, Deserialize)]
pub struct PackageMetadata {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Project configuration from `opgraph.yaml`.
#[derive(Debug, Default, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub package: Option<PackageMetadata>,

    /// Parameter schema files, relative to the project directory.
    #[serde(default)]
    pub schemas: Vec<PathBuf>,

    /// Device used when a call does not name one.
    #[serde(default)]
    pub default_device: Option<DeviceType>,
}

impl ProjectConfig {
    /// Configuration file name.
    pub const FILE_NAME: &'static str = "opgraph.yaml";

    /// Load project configuration from a directory. Returns error if file is
    /// missing or cannot be parsed.
    pub fn load(project_path: &Path) -> Result<Self> {
        let config_path = project_path.join(Self::FILE_NAME);

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            GraphError::Configuration(format!("Failed to read {}: {}", config_path.display(), e))
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            GraphError::Configuration(format!("Failed to parse {}: {}", config_path.display(), e))
        })?;

        tracing::info!("Loaded project config from {}", config_path.display());
        Ok(config)
    }

    /// Load project configuration from a directory, returning defaults if the
    /// file is missing or unparseable.
    pub fn load_or_default(project_path: &Path) -> Self {
        let config_path = project_path.join(Self::FILE_NAME);

        if !config_path.exists() {
            tracing::debug!(
                "No {} found in {}, using defaults",
                Self::FILE_NAME,
                project_path.display()
            );
            return Self::default();
        }

        match Self::load(project_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    pub fn default_device(&self) -> DeviceType {
        self.default_device.unwrap_or_default()
    }

    /// Register every listed schema file. Returns how many were added.
    pub fn register_schemas(&self, project_path: &Path, registry: &mut SchemaRegistry) -> Result<usize> {
        for relative in &self.schemas {
            let path = project_path.join(relative);
            let schema = registry.register_file(&path)?;
            tracing::debug!("Registered schema {} from {}", schema.full_name(), path.display());
        }
        Ok(self.schemas.len())
    }
}
