//! Versioned cache generations.
//!
//! A generation's store name is a pure function of the deployment prefix and
//! the version string; bumping the version yields a new store and marks every
//! older one stale.

use serde::{Deserialize, Serialize};

/// Which stores `activate` may delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeletionScope {
    /// Only stores carrying this deployment's prefix.
    #[default]
    OwnedPrefix,
    /// Every store whose name is not the current one, including stores
    /// created by unrelated code sharing the same storage.
    AllForeign,
}

/// Map a prefix and version to a store name.
pub fn store_name(prefix: &str, version: &str) -> String {
    format!("{prefix}-{version}")
}

/// The generation identified by a prefix and version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    prefix: String,
    version: String,
    name: String,
}

impl Generation {
    pub fn new(prefix: impl Into<String>, version: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let version = version.into();
        let name = store_name(&prefix, &version);
        Self { prefix, version, name }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Name of this generation's store.
    pub fn store_name(&self) -> &str {
        &self.name
    }

    /// Whether `name` belongs to some generation of this deployment.
    pub fn owns(&self, name: &str) -> bool {
        name.strip_prefix(self.prefix.as_str())
            .is_some_and(|rest| rest.starts_with('-'))
    }

    /// Whether `name` should be removed when this generation activates.
    pub fn is_stale(&self, name: &str, scope: DeletionScope) -> bool {
        if name == self.name {
            return false;
        }
        match scope {
            DeletionScope::OwnedPrefix => self.owns(name),
            DeletionScope::AllForeign => true,
        }
    }
}
