//! Name to group lookup.
//!
//! Peers address groups by name, so every group a process serves must be
//! registered. Most applications use the process-wide [`Registry::global`]
//! through [`new_group`] and [`get_group`]; tests and embedders running
//! several nodes in one process create their own registries.

use super::{Getter, Group};
use crate::config::GroupConfig;
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

static GLOBAL: Lazy<Arc<Registry>> = Lazy::new(|| Arc::new(Registry::new()));

/// Registered groups, keyed by name.
#[derive(Debug, Default)]
pub struct Registry {
    groups: RwLock<HashMap<String, Arc<Group>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> Arc<Registry> {
        GLOBAL.clone()
    }

    /// Build a group and register it under `name`.
    pub fn new_group(
        &self,
        name: impl Into<String>,
        config: GroupConfig,
        getter: impl Getter + 'static,
    ) -> Result<Arc<Group>> {
        let group = Group::builder(name).config(config).getter(getter).build()?;
        self.register(group)
    }

    /// Register an already built group. Names are unique.
    pub fn register(&self, group: Group) -> Result<Arc<Group>> {
        let mut groups = self.groups.write();
        if groups.contains_key(group.name()) {
            return Err(Error::GroupExists(group.name().to_string()));
        }

        let group = Arc::new(group);
        groups.insert(group.name().to_string(), group.clone());
        info!(
            group = group.name(),
            eviction = %group.config().eviction,
            main_cache_bytes = group.config().main_cache_bytes,
            "Group registered"
        );
        Ok(group)
    }

    pub fn get_group(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.read().get(name).cloned()
    }

    /// Names of all registered groups, sorted.
    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }
}

/// Create a group in the process-wide registry.
pub fn new_group(
    name: impl Into<String>,
    config: GroupConfig,
    getter: impl Getter + 'static,
) -> Result<Arc<Group>> {
    GLOBAL.new_group(name, config, getter)
}

/// Look up a group in the process-wide registry.
pub fn get_group(name: &str) -> Option<Arc<Group>> {
    GLOBAL.get_group(name)
}
