//! Plugin catalog: the plugins a process knows how to build.

use std::collections::HashMap;
use std::fmt;

use crate::plugin::{PluginContext, WebServerPlugin};

/// Builds one plugin instance for one connection.
pub type PluginFactory = Box<dyn Fn(PluginContext) -> Box<dyn WebServerPlugin> + Send + Sync>;

/// Name → factory table consulted when a connection is set up.
///
/// Config entries name catalog keys; the instance built may report a
/// different [`WebServerPlugin::name`].
#[derive(Default)]
pub struct PluginCatalog {
    factories: HashMap<String, PluginFactory>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name`, replacing any earlier one.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(PluginContext) -> Box<dyn WebServerPlugin> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
        self
    }

    pub fn get(&self, name: &str) -> Option<&PluginFactory> {
        self.factories.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginCatalog")
            .field("plugins", &self.names())
            .finish()
    }
}
