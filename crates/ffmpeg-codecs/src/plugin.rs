//! CodecPlugin implementations for the ffmpeg codecs

use crate::{SvtAv1Settings, X264Settings, KIND_SVTAV1, KIND_X264};
use async_trait::async_trait;
use codec_harness_core::{
    CodecOptions, CodecPlugin, EncodePlan, FactoryTable, PluginError, PluginManifest,
};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Encoder program used when a definition names none
const DEFAULT_FFMPEG: &str = "ffmpeg";

/// H.264 encoding through ffmpeg's libx264
pub struct X264Plugin {
    name: String,
    description: String,
    defaults: CodecOptions,
    ffmpeg: String,
}

impl X264Plugin {
    pub fn new() -> Self {
        Self {
            name: "libx264".to_string(),
            description: "H.264 encoding via ffmpeg libx264".to_string(),
            defaults: Self::builtin_defaults(),
            ffmpeg: DEFAULT_FFMPEG.to_string(),
        }
    }

    pub fn builtin_defaults() -> CodecOptions {
        X264Settings::default().to_options()
    }

    /// Build an instance from a plugin definition
    pub fn from_manifest(manifest: &PluginManifest) -> Result<Self, PluginError> {
        let defaults = manifest.resolve_defaults(&Self::builtin_defaults())?;
        // Reject bad defaults at load time rather than on first encode
        X264Settings::from_options(&defaults)?;

        Ok(Self {
            name: manifest.name.clone(),
            description: manifest.description.clone(),
            defaults,
            ffmpeg: manifest.setting_or("ffmpeg", DEFAULT_FFMPEG),
        })
    }
}

impl Default for X264Plugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CodecPlugin for X264Plugin {
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
        let settings = X264Settings::from_options(options)?;
        debug!("libx264 settings: {:?}", settings);

        Ok(EncodePlan::new(output).run(settings.step(&self.ffmpeg, frames, output)))
    }
}

/// AV1 encoding through ffmpeg's libsvtav1
pub struct SvtAv1Plugin {
    name: String,
    description: String,
    defaults: CodecOptions,
    ffmpeg: String,
}

impl SvtAv1Plugin {
    pub fn new() -> Self {
        Self {
            name: "libsvtav1".to_string(),
            description: "AV1 encoding via ffmpeg libsvtav1".to_string(),
            defaults: Self::builtin_defaults(),
            ffmpeg: DEFAULT_FFMPEG.to_string(),
        }
    }

    pub fn builtin_defaults() -> CodecOptions {
        SvtAv1Settings::default().to_options()
    }

    pub fn from_manifest(manifest: &PluginManifest) -> Result<Self, PluginError> {
        let defaults = manifest.resolve_defaults(&Self::builtin_defaults())?;
        SvtAv1Settings::from_options(&defaults)?;

        Ok(Self {
            name: manifest.name.clone(),
            description: manifest.description.clone(),
            defaults,
            ffmpeg: manifest.setting_or("ffmpeg", DEFAULT_FFMPEG),
        })
    }
}

impl Default for SvtAv1Plugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CodecPlugin for SvtAv1Plugin {
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
        let settings = SvtAv1Settings::from_options(options)?;
        debug!("libsvtav1 settings: {:?}", settings);

        Ok(EncodePlan::new(output).run(settings.step(&self.ffmpeg, frames, output)))
    }
}

/// Register the factories for this crate's plugin kinds
pub fn register_factories(table: &mut FactoryTable) {
    table.register(KIND_X264, |manifest: &PluginManifest| {
        Ok(Arc::new(X264Plugin::from_manifest(manifest)?) as Arc<dyn CodecPlugin>)
    });
    table.register(KIND_SVTAV1, |manifest: &PluginManifest| {
        Ok(Arc::new(SvtAv1Plugin::from_manifest(manifest)?) as Arc<dyn CodecPlugin>)
    });
}
