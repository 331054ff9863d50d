// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

/// Process-unique id minted when a kernel is registered.
///
/// Appended to the operator name to form the pseudo-name the engine sees, so
/// a fresh process never collides with a stale registration left over from an
/// earlier run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationId(String);

impl RegistrationId {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `name:id`, the name the engine registers this kernel under.
    pub fn pseudo_name(&self, operator: &str) -> String {
        format!("{}:{}", operator, self.0)
    }
}

impl Default for RegistrationId {
    fn default() -> Self {
        Self(cuid2::create_id())
    }
}

impl Deref for RegistrationId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Borrow<str> for RegistrationId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RegistrationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RegistrationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RegistrationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(RegistrationId::new(), RegistrationId::new());
    }

    #[test]
    fn test_pseudo_name() {
        let id = RegistrationId::from("abc123");
        assert_eq!(id.pseudo_name("Histogram"), "Histogram:abc123");
    }
}
