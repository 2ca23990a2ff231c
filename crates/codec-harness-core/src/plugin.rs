//! Codec plugin trait and plugin definitions

use crate::context::Context;
use crate::error::{ManifestError, PluginError};
use crate::options::CodecOptions;
use crate::plan::EncodePlan;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Core codec trait - every encoder backend implements this
#[async_trait]
pub trait CodecPlugin: Send + Sync {
    /// Unique codec name, used verbatim as the registry key
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str {
        ""
    }

    /// Every option this codec recognises, with its default value
    fn default_options(&self) -> CodecOptions;

    /// Build the stages that encode `frames` into `output` with already merged options
    fn plan(
        &self,
        frames: &Path,
        output: &Path,
        options: &CodecOptions,
    ) -> Result<EncodePlan, PluginError>;

    /// Merge `overrides` over the defaults and run the encode plan
    async fn encode(
        &self,
        ctx: &Context,
        frames: &Path,
        output: &Path,
        overrides: &CodecOptions,
    ) -> Result<EncodeOutcome, PluginError> {
        let start = Instant::now();
        let defaults = self.default_options();
        let options = CodecOptions::merge(&defaults, overrides);

        info!("Encoding with {}...", self.name());
        debug!("Options: {}", options);
        let unknown = overrides.unknown_keys(&defaults);
        if !unknown.is_empty() {
            debug!("Passing through options unknown to {}: {:?}", self.name(), unknown);
        }

        let plan = self.plan(frames, output, &options)?;
        let artifact = plan.execute(ctx).await?;
        let duration = start.elapsed();

        info!(
            "Successfully encoded with {} in {:?}: {}",
            self.name(),
            duration,
            artifact.display()
        );

        Ok(EncodeOutcome {
            codec: self.name().to_string(),
            artifact,
            options,
            stages: plan.stages.len(),
            duration,
        })
    }
}

/// Result of a successful encode
#[derive(Debug, Clone, Serialize)]
pub struct EncodeOutcome {
    /// Codec that produced the artifact
    pub codec: String,

    /// Output file (or directory, for checkpoint-style codecs)
    pub artifact: PathBuf,

    /// Options the plan was built with
    pub options: CodecOptions,

    /// Number of stages executed
    pub stages: usize,

    /// Wall-clock time spent in the plugin
    pub duration: Duration,
}

/// Plugin definition loaded from a YAML file or declared statically
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Registry name of the instance
    pub name: String,

    /// Factory key selecting the concrete plugin type
    pub kind: String,

    #[serde(default)]
    pub description: String,

    /// Overrides of the plugin's built-in defaults
    #[serde(default)]
    pub defaults: CodecOptions,

    /// Plugin-specific settings (tool paths, script locations)
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

impl PluginManifest {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            description: String::new(),
            defaults: CodecOptions::new(),
            settings: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_defaults(mut self, defaults: CodecOptions) -> Self {
        self.defaults = defaults;
        self
    }

    #[must_use]
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Load a definition from a YAML file
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ManifestError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Setting value, or `default` when unset
    pub fn setting_or(&self, key: &str, default: &str) -> String {
        self.settings
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    /// Required setting
    pub fn setting(&self, key: &str) -> Result<&str, PluginError> {
        self.settings
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| PluginError::MissingSetting(key.to_string()))
    }

    /// The plugin's built-in defaults with this definition's overrides applied.
    ///
    /// Fails if an override changes the type of a built-in option.
    pub fn resolve_defaults(&self, builtin: &CodecOptions) -> Result<CodecOptions, PluginError> {
        self.defaults.check_types(builtin)?;
        Ok(CodecOptions::merge(builtin, &self.defaults))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OptionValue;

    #[test]
    fn test_manifest_from_yaml() {
        let yaml = r#"
name: libx264
kind: ffmpeg-x264
description: H.264 via ffmpeg
defaults:
  crf: 20
settings:
  ffmpeg: /usr/local/bin/ffmpeg
"#;
        let manifest = PluginManifest::from_yaml_str(yaml).unwrap();

        assert_eq!(manifest.name, "libx264");
        assert_eq!(manifest.kind, "ffmpeg-x264");
        assert_eq!(manifest.defaults.get("crf"), Some(&OptionValue::Int(20)));
        assert_eq!(manifest.setting_or("ffmpeg", "ffmpeg"), "/usr/local/bin/ffmpeg");
        assert_eq!(manifest.setting_or("python", "python"), "python");
    }

    #[test]
    fn test_manifest_minimal() {
        let manifest = PluginManifest::from_yaml_str("name: hinerv\nkind: hinerv\n").unwrap();
        assert!(manifest.defaults.is_empty());
        assert!(manifest.settings.is_empty());
        assert!(matches!(
            manifest.setting("repo_dir"),
            Err(PluginError::MissingSetting(_))
        ));
    }

    #[test]
    fn test_manifest_missing_kind() {
        assert!(PluginManifest::from_yaml_str("name: libx264\n").is_err());
    }

    #[test]
    fn test_resolve_defaults() {
        let builtin = CodecOptions::new().with("crf", 23).with("preset", "medium");

        let manifest = PluginManifest::new("libx264", "ffmpeg-x264")
            .with_defaults(CodecOptions::new().with("preset", "slow"));
        let resolved = manifest.resolve_defaults(&builtin).unwrap();
        assert_eq!(resolved.text("preset").unwrap(), "slow");
        assert_eq!(resolved.int("crf").unwrap(), 23);

        let bad = PluginManifest::new("libx264", "ffmpeg-x264")
            .with_defaults(CodecOptions::new().with("crf", "low"));
        assert!(bad.resolve_defaults(&builtin).is_err());
    }
}
