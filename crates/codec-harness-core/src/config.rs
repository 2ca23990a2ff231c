//! Harness configuration from environment variables or a YAML file

use crate::error::ManifestError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the frame extraction program
pub const ENV_FFMPEG: &str = "CODEC_HARNESS_FFMPEG";
/// Environment variable naming the plugin definition directory
pub const ENV_PLUGIN_DIR: &str = "CODEC_HARNESS_PLUGIN_DIR";
/// Environment variable naming the parent directory for extracted frames
pub const ENV_TEMP_DIR: &str = "CODEC_HARNESS_TEMP_DIR";
/// Environment variable that keeps extracted frames after a successful encode
pub const ENV_KEEP_FRAMES: &str = "CODEC_HARNESS_KEEP_FRAMES";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Program used for frame extraction
    pub ffmpeg: String,

    /// Directory of YAML plugin definitions, discovered in addition to the built-ins
    pub plugin_dir: Option<PathBuf>,

    /// Parent directory for extracted frame directories
    pub temp_root: Option<PathBuf>,

    /// Keep extracted frames after a successful encode
    pub keep_frames: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            plugin_dir: None,
            temp_root: None,
            keep_frames: false,
        }
    }
}

impl HarnessConfig {
    /// Defaults overridden by the `CODEC_HARNESS_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(ffmpeg) = lookup(ENV_FFMPEG).filter(|v| !v.is_empty()) {
            config.ffmpeg = ffmpeg;
        }
        if let Some(dir) = lookup(ENV_PLUGIN_DIR).filter(|v| !v.is_empty()) {
            config.plugin_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = lookup(ENV_TEMP_DIR).filter(|v| !v.is_empty()) {
            config.temp_root = Some(PathBuf::from(dir));
        }
        if let Some(keep) = lookup(ENV_KEEP_FRAMES) {
            config.keep_frames = matches!(keep.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        config
    }

    /// Load from a YAML file; absent keys take their defaults
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_yaml::from_str(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.ffmpeg, "ffmpeg");
        assert!(config.plugin_dir.is_none());
        assert!(!config.keep_frames);
    }

    #[test]
    fn test_from_lookup() {
        let env: HashMap<&str, &str> = [
            (ENV_FFMPEG, "/opt/ffmpeg"),
            (ENV_PLUGIN_DIR, "config/codecs"),
            (ENV_KEEP_FRAMES, "TRUE"),
            (ENV_TEMP_DIR, ""),
        ]
        .into_iter()
        .collect();

        let config = HarnessConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.ffmpeg, "/opt/ffmpeg");
        assert_eq!(config.plugin_dir, Some(PathBuf::from("config/codecs")));
        assert!(config.temp_root.is_none());
        assert!(config.keep_frames);
    }

    #[test]
    fn test_from_yaml_partial() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("harness.yaml");
        std::fs::write(&path, "plugin_dir: /etc/codecs\nkeep_frames: true\n").unwrap();

        let config = HarnessConfig::from_yaml(&path).unwrap();
        assert_eq!(config.ffmpeg, "ffmpeg");
        assert_eq!(config.plugin_dir, Some(PathBuf::from("/etc/codecs")));
        assert!(config.keep_frames);
    }
}
