//! Shared codec registry helper
//!
//! Provides the factory table for every plugin kind this binary ships with,
//! the built-in codec definitions, and the function that assembles a
//! registry from those plus an optional directory of YAML definitions.

use codec_harness_core::{
    FactoryTable, ManifestDir, PluginManifest, PluginSource, Registry, StaticSource,
};
use codec_harness_ffmpeg::{KIND_SVTAV1, KIND_X264};
use codec_harness_neural::{KIND_DCVC_RT, KIND_HINERV};
use std::path::Path;
use tracing::warn;

/// Factories for all plugin kinds:
/// - `ffmpeg-x264`, `ffmpeg-svtav1` (codec-harness-ffmpeg)
/// - `dcvc-rt`, `hinerv` (codec-harness-neural)
pub fn builtin_factories() -> FactoryTable {
    let mut table = FactoryTable::new();
    codec_harness_ffmpeg::register_factories(&mut table);
    codec_harness_neural::register_factories(&mut table);
    table
}

/// Definitions of the codecs available without any plugin directory
pub fn builtin_manifests() -> Vec<PluginManifest> {
    vec![
        PluginManifest::new("libx264", KIND_X264)
            .with_description("H.264 encoding via ffmpeg libx264"),
        PluginManifest::new("libsvtav1", KIND_SVTAV1)
            .with_description("AV1 encoding via ffmpeg libsvtav1"),
        PluginManifest::new("dcvc-rt", KIND_DCVC_RT)
            .with_description("DCVC-RT neural video codec"),
        PluginManifest::new("hinerv", KIND_HINERV)
            .with_description("HiNeRV neural representation (model overfitting)"),
    ]
}

/// Build the registry: built-ins first, then `plugin_dir` if given.
///
/// Definitions in the directory replace built-ins of the same name.
/// Broken definitions are logged and skipped.
pub fn build_registry(plugin_dir: Option<&Path>) -> Registry {
    let factories = builtin_factories();
    let builtins = StaticSource::new(builtin_manifests());

    let mut registry = Registry::new();
    registry.discover(&builtins, &factories);

    if let Some(dir) = plugin_dir {
        let source = ManifestDir::new(dir);
        let report = registry.discover(&source, &factories);
        if !report.failures.is_empty() {
            warn!(
                "{} of the definitions in {} could not be loaded",
                report.failures.len(),
                source.describe()
            );
        }
    }

    registry
}
