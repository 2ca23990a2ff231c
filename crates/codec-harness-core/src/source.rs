//! Plugin discovery sources and the factory table that instantiates them

use crate::error::{PluginError, PluginLoadFailure};
use crate::plugin::{CodecPlugin, PluginManifest};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Builds a plugin instance from its definition
pub type PluginFactory =
    Arc<dyn Fn(&PluginManifest) -> Result<Arc<dyn CodecPlugin>, PluginError> + Send + Sync>;

/// A plugin definition together with where it came from
#[derive(Debug, Clone)]
pub struct Definition {
    pub origin: String,
    pub manifest: PluginManifest,
}

/// Factories keyed by plugin kind
#[derive(Clone, Default)]
pub struct FactoryTable {
    factories: HashMap<String, PluginFactory>,
}

impl FactoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the factory for `kind`, replacing any previous one
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&PluginManifest) -> Result<Arc<dyn CodecPlugin>, PluginError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(kind.into(), Arc::new(factory));
    }

    #[must_use]
    pub fn with<F>(mut self, kind: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&PluginManifest) -> Result<Arc<dyn CodecPlugin>, PluginError>
            + Send
            + Sync
            + 'static,
    {
        self.register(kind, factory);
        self
    }

    /// Registered kinds, sorted
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.factories.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    /// Instantiate the plugin a definition describes
    pub fn build(&self, definition: &Definition) -> Result<Arc<dyn CodecPlugin>, PluginLoadFailure> {
        let manifest = &definition.manifest;
        let factory = self.factories.get(&manifest.kind).ok_or_else(|| {
            PluginLoadFailure::new(
                definition.origin.clone(),
                format!(
                    "unknown plugin kind '{}' (known kinds: {:?})",
                    manifest.kind,
                    self.kinds()
                ),
            )
        })?;

        let plugin = factory(manifest)
            .map_err(|e| PluginLoadFailure::new(definition.origin.clone(), e))?;

        if plugin.name() != manifest.name {
            return Err(PluginLoadFailure::new(
                definition.origin.clone(),
                format!(
                    "plugin declared name '{}' but its definition names '{}'",
                    plugin.name(),
                    manifest.name
                ),
            ));
        }

        Ok(plugin)
    }
}

/// Where plugin definitions are discovered from
pub trait PluginSource {
    /// Human-readable description of the source, for logs
    fn describe(&self) -> String;

    /// Every definition the source holds. A definition that cannot even be read
    /// is reported as a failure without affecting the others.
    fn definitions(&self) -> Vec<Result<Definition, PluginLoadFailure>>;
}

/// A fixed list of definitions compiled into the binary
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    manifests: Vec<PluginManifest>,
}

impl StaticSource {
    pub fn new(manifests: Vec<PluginManifest>) -> Self {
        Self { manifests }
    }
}

impl PluginSource for StaticSource {
    fn describe(&self) -> String {
        format!("{} built-in definitions", self.manifests.len())
    }

    fn definitions(&self) -> Vec<Result<Definition, PluginLoadFailure>> {
        self.manifests
            .iter()
            .map(|manifest| {
                Ok(Definition {
                    origin: format!("builtin:{}", manifest.name),
                    manifest: manifest.clone(),
                })
            })
            .collect()
    }
}

/// A directory of `*.yaml` / `*.yml` plugin definitions.
///
/// Files are visited in file-name order, so discovery is deterministic.
#[derive(Debug, Clone)]
pub struct ManifestDir {
    dir: PathBuf,
}

impl ManifestDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn is_manifest(path: &Path) -> bool {
        path.is_file()
            && matches!(
                path.extension().and_then(|s| s.to_str()),
                Some("yaml") | Some("yml")
            )
    }
}

impl PluginSource for ManifestDir {
    fn describe(&self) -> String {
        format!("plugin directory {}", self.dir.display())
    }

    fn definitions(&self) -> Vec<Result<Definition, PluginLoadFailure>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![Err(PluginLoadFailure::new(
                    self.dir.display().to_string(),
                    format!("cannot read plugin directory: {e}"),
                ))]
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| Self::is_manifest(path))
            .collect();
        paths.sort();

        paths
            .into_iter()
            .map(|path| {
                let origin = path.display().to_string();
                debug!("Reading plugin definition {}", origin);
                PluginManifest::from_yaml(&path)
                    .map(|manifest| Definition {
                        origin: origin.clone(),
                        manifest,
                    })
                    .map_err(|e| PluginLoadFailure::new(origin, e))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_static_source_origins() {
        let source = StaticSource::new(vec![
            PluginManifest::new("libx264", "ffmpeg-x264"),
            PluginManifest::new("hinerv", "hinerv"),
        ]);
        let defs: Vec<_> = source.definitions().into_iter().map(Result::unwrap).collect();

        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].origin, "builtin:libx264");
        assert_eq!(defs[1].manifest.kind, "hinerv");
    }

    #[test]
    fn test_manifest_dir_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.yaml"), "name: b\nkind: k\n").unwrap();
        std::fs::write(dir.path().join("a.yml"), "name: a\nkind: k\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a plugin").unwrap();
        std::fs::write(dir.path().join("broken.yaml"), "name: [unclosed").unwrap();

        let defs = ManifestDir::new(dir.path()).definitions();

        assert_eq!(defs.len(), 3);
        assert_eq!(defs[0].as_ref().unwrap().manifest.name, "a");
        assert_eq!(defs[1].as_ref().unwrap().manifest.name, "b");
        let failures: Vec<_> = defs.iter().filter_map(|d| d.as_ref().err()).collect();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].origin.ends_with("broken.yaml"));
    }

    #[test]
    fn test_manifest_dir_missing() {
        let defs = ManifestDir::new("/nonexistent/codec-harness/plugins").definitions();
        assert_eq!(defs.len(), 1);
        assert!(defs[0].is_err());
    }

    #[test]
    fn test_factory_unknown_kind() {
        let table = FactoryTable::new();
        let definition = Definition {
            origin: "builtin:x".to_string(),
            manifest: PluginManifest::new("x", "no-such-kind"),
        };
        let failure = match table.build(&definition) {
            Err(failure) => failure,
            Ok(_) => panic!("Expected load failure"),
        };
        assert!(failure.reason.contains("no-such-kind"));
    }
}
