//! HiNeRV: overfit an implicit neural representation to the frames

use crate::{absolute, KIND_HINERV};
use async_trait::async_trait;
use codec_harness_core::{
    CodecOptions, CodecPlugin, EncodePlan, PluginError, PluginManifest, ProcessStep,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

const DEFAULT_REPO: &str = "vendor/HiNeRV";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported HiNeRV model size: {0}. Available sizes: s, m, l")]
pub struct UnknownModelSize(pub String);

/// HiNeRV model configurations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelSize {
    #[default]
    #[serde(rename = "s")]
    Small,
    #[serde(rename = "m")]
    Medium,
    #[serde(rename = "l")]
    Large,
}

impl ModelSize {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelSize::Small => "s",
            ModelSize::Medium => "m",
            ModelSize::Large => "l",
        }
    }
}

impl fmt::Display for ModelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelSize {
    type Err = UnknownModelSize;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s" => Ok(ModelSize::Small),
            "m" => Ok(ModelSize::Medium),
            "l" => Ok(ModelSize::Large),
            _ => Err(UnknownModelSize(s.to_string())),
        }
    }
}

/// Resolved HiNeRV parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HinervSettings {
    pub model_size: ModelSize,
    /// Training epochs
    pub epochs: u32,
    /// Config resolution, `WIDTHxHEIGHT`
    pub resolution: String,
}

impl Default for HinervSettings {
    fn default() -> Self {
        Self {
            model_size: ModelSize::Small,
            epochs: 300,
            resolution: "1920x1080".to_string(),
        }
    }
}

fn is_resolution(s: &str) -> bool {
    match s.split_once('x') {
        Some((w, h)) => w.parse::<u32>().is_ok() && h.parse::<u32>().is_ok(),
        None => false,
    }
}

impl HinervSettings {
    pub fn to_options(&self) -> CodecOptions {
        CodecOptions::new()
            .with("model_size", self.model_size.as_str())
            .with("epochs", self.epochs)
            .with("resolution", self.resolution.as_str())
    }

    pub fn from_options(options: &CodecOptions) -> Result<Self, PluginError> {
        let model_size = options
            .text("model_size")?
            .parse::<ModelSize>()
            .map_err(|e| PluginError::InvalidOption {
                key: "model_size".to_string(),
                expected: "one of s, m, l".to_string(),
                found: e.0,
            })?;

        let epochs = options.int("epochs")?;
        let epochs = u32::try_from(epochs)
            .ok()
            .filter(|e| *e > 0)
            .ok_or_else(|| PluginError::InvalidOption {
                key: "epochs".to_string(),
                expected: "positive integer".to_string(),
                found: epochs.to_string(),
            })?;

        let resolution = options.text("resolution")?;
        if !is_resolution(resolution) {
            return Err(PluginError::InvalidOption {
                key: "resolution".to_string(),
                expected: "WIDTHxHEIGHT".to_string(),
                found: resolution.to_string(),
            });
        }

        Ok(Self {
            model_size,
            epochs,
            resolution: resolution.to_string(),
        })
    }

    /// Training config, relative to the repository
    pub fn train_cfg(&self) -> PathBuf {
        PathBuf::from(format!("cfgs/train/hinerv_{}.txt", self.resolution))
    }

    /// Model config, relative to the repository
    pub fn model_cfg(&self) -> PathBuf {
        PathBuf::from(format!(
            "cfgs/models/uvg-hinerv-{}_{}.txt",
            self.model_size, self.resolution
        ))
    }
}

/// The HiNeRV neural codec. Produces a model checkpoint directory.
pub struct HinervPlugin {
    name: String,
    description: String,
    defaults: CodecOptions,
    /// HiNeRV repository checkout (contains hinerv_main.py)
    repo_dir: PathBuf,
    launcher: String,
}

impl HinervPlugin {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: KIND_HINERV.to_string(),
            description: "HiNeRV neural representation (model overfitting)".to_string(),
            defaults: Self::builtin_defaults(),
            repo_dir: repo_dir.into(),
            launcher: "accelerate".to_string(),
        }
    }

    pub fn builtin_defaults() -> CodecOptions {
        HinervSettings::default().to_options()
    }

    /// Settings: `repo_dir` (default `vendor/HiNeRV`), `launcher` (default `accelerate`).
    pub fn from_manifest(manifest: &PluginManifest) -> Result<Self, PluginError> {
        let defaults = manifest.resolve_defaults(&Self::builtin_defaults())?;
        HinervSettings::from_options(&defaults)?;

        Ok(Self {
            name: manifest.name.clone(),
            description: manifest.description.clone(),
            defaults,
            repo_dir: absolute(Path::new(&manifest.setting_or("repo_dir", DEFAULT_REPO)))?,
            launcher: manifest.setting_or("launcher", "accelerate"),
        })
    }
}

impl Default for HinervPlugin {
    fn default() -> Self {
        Self::new(DEFAULT_REPO)
    }
}

#[async_trait]
impl CodecPlugin for HinervPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn default_options(&self) -> CodecOptions {
        self.defaults.clone()
    }

    fn plan(
        &self,
        frames: &Path,
        output: &Path,
        options: &CodecOptions,
    ) -> Result<EncodePlan, PluginError> {
        let settings = HinervSettings::from_options(options)?;
        debug!("HiNeRV settings: {:?}", settings);

        let repo_dir = absolute(&self.repo_dir)?;
        let frames = absolute(frames)?;
        let output = absolute(output)?;
        // Checkpoints land next to the requested output
        let output_dir = output
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));

        let step = ProcessStep::new("encode", self.launcher.as_str())
            .arg("launch")
            .path_arg(&repo_dir.join("hinerv_main.py"))
            .arg("--dataset")
            .path_arg(&frames)
            .args(["--dataset-name", "custom"])
            .arg("--output")
            .path_arg(&output_dir)
            .arg("--train-cfg-txt")
            .path_arg(&repo_dir.join(settings.train_cfg()))
            .arg("--model-cfg-txt")
            .path_arg(&repo_dir.join(settings.model_cfg()))
            .args(["--epochs".to_string(), settings.epochs.to_string()])
            .current_dir(&repo_dir);

        Ok(EncodePlan::with_artifact_dir(output_dir).run(step))
    }
}
