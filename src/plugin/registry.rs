//! Plugin registry and route table construction.
//!
//! # Responsibilities
//! - Build every configured plugin for a connection
//! - Own the instances and index them by name
//! - Compile each plugin's routes into the connection's [`RouteTable`]
//! - Provide the fan-out order for descriptor hooks

use std::collections::HashMap;

use crate::config::ConfigError;
use crate::plugin::{PluginCatalog, PluginContext, WebServerPlugin};
use crate::routing::{RoutePattern, RouteTable};

/// Slot of a plugin instance inside a [`PluginRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PluginId(pub(crate) usize);

/// Plugin instances owned by one connection.
///
/// Registering a second instance under an existing name makes the name
/// resolve to the new instance, while the name keeps its original place in
/// fan-out order. Routes already bound to the replaced instance keep
/// pointing at it.
#[derive(Default)]
pub struct PluginRegistry {
    instances: Vec<Box<dyn WebServerPlugin>>,
    by_name: HashMap<String, PluginId>,
    /// Names in first-registration order.
    order: Vec<String>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiate every configured plugin and compile its routes.
    pub fn initialize(
        catalog: &PluginCatalog,
        context: &PluginContext,
    ) -> Result<(Self, RouteTable), ConfigError> {
        let mut registry = Self::new();
        let mut routes = RouteTable::new();

        for class in &context.config.plugins {
            let factory = catalog
                .get(class)
                .ok_or_else(|| ConfigError::UnknownPlugin(class.clone()))?;
            let instance = factory(context.clone());
            let declared = instance.routes();
            let id = registry.register(instance);

            for (kind, pattern) in declared {
                let compiled =
                    RoutePattern::compile(&pattern).map_err(|source| ConfigError::InvalidPattern {
                        plugin: registry.instance(id).name().to_string(),
                        pattern: pattern.clone(),
                        source,
                    })?;
                tracing::trace!(
                    connection_id = %context.uid,
                    plugin = registry.instance(id).name(),
                    protocol = %kind,
                    pattern = %pattern,
                    "Route registered"
                );
                routes.add(kind, compiled, id);
            }
        }

        Ok((registry, routes))
    }

    /// Take ownership of `plugin` under its declared name.
    pub fn register(&mut self, plugin: Box<dyn WebServerPlugin>) -> PluginId {
        let id = PluginId(self.instances.len());
        let name = plugin.name().to_string();
        self.instances.push(plugin);

        if self.by_name.insert(name.clone(), id).is_some() {
            tracing::debug!(plugin = %name, "Plugin name registered twice, later instance wins");
        } else {
            self.order.push(name);
        }
        id
    }

    /// The instance currently registered under `name`.
    pub fn get(&self, name: &str) -> Option<&dyn WebServerPlugin> {
        self.by_name.get(name).map(|id| self.instance(*id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Registered names in fan-out order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Instances reachable by name, in fan-out order.
    pub fn active_ids(&self) -> Vec<PluginId> {
        self.order
            .iter()
            .filter_map(|name| self.by_name.get(name).copied())
            .collect()
    }

    pub fn instance(&self, id: PluginId) -> &dyn WebServerPlugin {
        self.instances[id.0].as_ref()
    }

    pub fn instance_mut(&mut self, id: PluginId) -> &mut dyn WebServerPlugin {
        self.instances[id.0].as_mut()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.order)
            .finish()
    }
}
