// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use super::contract::OperatorContract;
use super::error::{GraphError, Result};
use super::kernel::KernelRegistration;

/// Link-time kernel submission, collected when the global registry is first used.
pub struct KernelRegistrationEntry {
    pub build: fn() -> KernelRegistration,
}

impl KernelRegistrationEntry {
    pub const fn new(build: fn() -> KernelRegistration) -> Self {
        Self { build }
    }
}

inventory::collect!(KernelRegistrationEntry);

/// Submit a kernel for registration into the global registry.
///
/// ```ignore
/// fn blur() -> KernelRegistration {
///     KernelRegistration::function("Blur", signature(), blur_kernel).stencil(vec![-1, 0, 1])
/// }
///
/// register_kernel!(blur);
/// ```
#[macro_export]
macro_rules! register_kernel {
    ($build:path) => {
        $crate::inventory::submit! {
            $crate::core::registry::KernelRegistrationEntry::new($build)
        }
    };
}

/// Insert-only map from operator name to contract.
///
/// Names whose registration failed are remembered with the failure, so a
/// later lookup reports the configuration error instead of a missing operator.
#[derive(Debug)]
pub struct OperatorRegistry {
    contracts: HashMap<String, OperatorContract>,
    rejected: HashMap<String, String>,
}

impl OperatorRegistry {
    pub fn new() -> Self {
        Self {
            contracts: HashMap::new(),
            rejected: HashMap::new(),
        }
    }

    pub fn register(&mut self, contract: OperatorContract) -> Result<()> {
        if self.contracts.contains_key(&contract.name) {
            return Err(GraphError::Configuration(format!(
                "Operator '{}' is already registered",
                contract.name
            )));
        }

        self.contracts.insert(contract.name.clone(), contract);
        Ok(())
    }

    /// Record that `name` failed to register.
    pub fn reject(&mut self, name: impl Into<String>, reason: impl Into<String>) {
        self.rejected.insert(name.into(), reason.into());
    }

    /// The configuration error recorded for `name`, if its registration failed.
    pub fn rejection(&self, name: &str) -> Option<GraphError> {
        self.rejected
            .get(name)
            .map(|reason| GraphError::Configuration(reason.clone()))
    }

    /// Names with a recorded failure, sorted.
    pub fn rejected(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rejected.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn get(&self, name: &str) -> Option<&OperatorContract> {
        self.contracts.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.contracts.contains_key(name)
    }

    /// Registered operator names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.contracts.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_REGISTRY: OnceLock<Arc<Mutex<OperatorRegistry>>> = OnceLock::new();

fn load_submissions() -> OperatorRegistry {
    let mut submissions: HashMap<String, Vec<KernelRegistration>> = HashMap::new();
    for entry in inventory::iter::<KernelRegistrationEntry> {
        let registration = (entry.build)();
        let name = registration.registered_name().unwrap_or_default().to_string();
        submissions.entry(name).or_default().push(registration);
    }

    let mut registry = OperatorRegistry::new();
    for (name, mut registrations) in submissions {
        if registrations.len() > 1 {
            let reason = format!(
                "Operator '{}' is submitted {} times through register_kernel!",
                name,
                registrations.len()
            );
            tracing::error!("{}", reason);
            registry.reject(name, reason);
            continue;
        }

        let Some(registration) = registrations.pop() else {
            continue;
        };
        if let Err(e) = registration.register_into(&mut registry) {
            tracing::error!("Failed to auto-register kernel '{}': {}", name, e);
            let reason = match e {
                GraphError::Configuration(reason) => reason,
                other => other.to_string(),
            };
            registry.reject(name, reason);
        }
    }

    tracing::debug!("Auto-registered {} kernels", registry.len());
    registry
}

/// Process-wide registry, seeded with every `register_kernel!` submission.
///
/// Failed submissions are kept as rejections; see [`try_global_registry`].
pub fn global_registry() -> Arc<Mutex<OperatorRegistry>> {
    GLOBAL_REGISTRY
        .get_or_init(|| Arc::new(Mutex::new(load_submissions())))
        .clone()
}

/// Like [`global_registry`], but fails if any link-time submission was rejected.
pub fn try_global_registry() -> Result<Arc<Mutex<OperatorRegistry>>> {
    let registry = global_registry();
    let failures: Vec<String> = {
        let guard = registry.lock();
        guard
            .rejected()
            .into_iter()
            .filter_map(|name| guard.rejection(&name))
            .map(|e| e.to_string())
            .collect()
    };

    if failures.is_empty() {
        Ok(registry)
    } else {
        Err(GraphError::Configuration(format!(
            "{} kernel submission(s) failed: {}",
            failures.len(),
            failures.join("; ")
        )))
    }
}

/// Whether `name` is in the global registry. A rejected name is an error.
pub fn is_kernel_registered(name: &str) -> Result<bool> {
    let registry = global_registry();
    let guard = registry.lock();
    if guard.contains(name) {
        return Ok(true);
    }
    match guard.rejection(name) {
        Some(e) => Err(e),
        None => Ok(false),
    }
}

pub fn list_kernels() -> Vec<String> {
    global_registry().lock().list()
}
