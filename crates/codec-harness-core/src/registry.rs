//! Codec registry: discovery, lookup and listing

use crate::error::{HarnessError, PluginLoadFailure};
use crate::plugin::CodecPlugin;
use crate::source::{FactoryTable, PluginSource};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of one discovery pass
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Names registered by this pass, in discovery order
    pub loaded: Vec<String>,

    /// Definitions that could not be loaded
    pub failures: Vec<PluginLoadFailure>,
}

/// Codec registry for lookup by name.
///
/// Built once at startup; after discovery it is only read, so a shared
/// reference can serve concurrent encodes without locking.
#[derive(Default)]
pub struct Registry {
    /// All registered plugins by name
    plugins: HashMap<String, Arc<dyn CodecPlugin>>,

    /// Where each registered plugin came from
    origins: HashMap<String, String>,

    /// Load failures collected across discovery passes
    failures: Vec<PluginLoadFailure>,
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            plugins: HashMap::with_capacity(8),
            origins: HashMap::with_capacity(8),
            failures: Vec::new(),
        }
    }

    /// Build a registry from one or more sources
    pub fn from_sources(sources: &[&dyn PluginSource], factories: &FactoryTable) -> Self {
        let mut registry = Self::new();
        for source in sources {
            registry.discover(*source, factories);
        }
        registry
    }

    /// Register a plugin.
    ///
    /// A plugin whose name collides with an existing entry replaces it
    /// (last registration wins) and the replacement is logged.
    pub fn register(
        &mut self,
        plugin: Arc<dyn CodecPlugin>,
        origin: impl Into<String>,
    ) -> Result<(), PluginLoadFailure> {
        let origin = origin.into();
        let name = plugin.name().to_string();

        if name.is_empty() {
            return Err(PluginLoadFailure::new(origin, "plugin declared an empty name"));
        }
        if name != name.to_lowercase() {
            return Err(PluginLoadFailure::new(
                origin,
                format!("plugin name '{name}' must be lower-case"),
            ));
        }

        if let Some(previous) = self.origins.get(&name) {
            warn!(
                "Codec '{}' from {} replaces the one registered from {}",
                name, origin, previous
            );
        }

        info!("Discovered and loaded codec: {}", name);
        self.origins.insert(name.clone(), origin);
        self.plugins.insert(name, plugin);
        Ok(())
    }

    /// Instantiate and register every definition in `source`.
    ///
    /// A broken definition is logged and collected; the rest still load.
    pub fn discover(
        &mut self,
        source: &dyn PluginSource,
        factories: &FactoryTable,
    ) -> DiscoveryReport {
        info!("Discovering codecs from {}", source.describe());
        let mut report = DiscoveryReport::default();

        for definition in source.definitions() {
            let loaded = definition.and_then(|definition| {
                let plugin = factories.build(&definition)?;
                let name = plugin.name().to_string();
                self.register(plugin, definition.origin)?;
                Ok(name)
            });

            match loaded {
                Ok(name) => report.loaded.push(name),
                Err(failure) => {
                    warn!("{}", failure);
                    report.failures.push(failure);
                }
            }
        }

        self.failures.extend(report.failures.iter().cloned());
        report
    }

    /// Exact, case-sensitive lookup
    pub fn resolve(&self, name: &str) -> Result<&dyn CodecPlugin, HarnessError> {
        self.plugins
            .get(name)
            .map(|plugin| plugin.as_ref())
            .ok_or_else(|| HarnessError::CodecNotFound {
                name: name.to_string(),
                available: self.list(),
            })
    }

    /// All registered codec names, sorted
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.plugins.keys().cloned().collect();
        names.sort();
        names
    }

    /// Where the named plugin was registered from
    pub fn origin(&self, name: &str) -> Option<&str> {
        self.origins.get(name).map(String::as_str)
    }

    /// Load failures collected by every discovery pass so far
    pub fn failures(&self) -> &[PluginLoadFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("codecs", &self.list())
            .field("failures", &self.failures.len())
            .finish()
    }
}
