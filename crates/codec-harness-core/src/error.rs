//! Error types for the codec harness

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A failed external process: the stage that ran it, the rendered command
/// line, its exit code (if any) and captured diagnostic output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessFailure {
    /// Stage label (e.g. `extract-frames`, `encode`, `stage-lossless`)
    pub stage: String,

    /// Rendered command line
    pub command: String,

    /// Exit code, `None` if the process could not be spawned or was killed
    pub status: Option<i32>,

    /// Captured stderr (or the spawn error message)
    pub stderr: String,
}

impl fmt::Display for ProcessFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(code) => write!(
                f,
                "stage '{}' exited with status {}\nCommand: {}\nStderr: {}",
                self.stage, code, self.command, self.stderr
            ),
            None => write!(
                f,
                "stage '{}' did not complete\nCommand: {}\nStderr: {}",
                self.stage, self.command, self.stderr
            ),
        }
    }
}

impl std::error::Error for ProcessFailure {}

/// Errors raised by a codec plugin
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("External process failed: {0}")]
    Process(#[from] ProcessFailure),

    #[error("Invalid value for option '{key}': expected {expected}, found {found}")]
    InvalidOption {
        key: String,
        expected: String,
        found: String,
    },

    #[error("Missing option: {0}")]
    MissingOption(String),

    #[error("Missing plugin setting: {0}")]
    MissingSetting(String),

    #[error("Expected output was not produced: {}", .0.display())]
    OutputNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single plugin definition that could not be loaded. Non-fatal to discovery.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Could not load plugin from {origin}: {reason}")]
pub struct PluginLoadFailure {
    /// Where the definition came from (file path or static label)
    pub origin: String,

    /// Why it failed
    pub reason: String,
}

impl PluginLoadFailure {
    pub fn new(origin: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors reading a plugin definition or harness config file
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced to callers of the orchestration facade
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Input path {} is not a valid file or directory", .0.display())]
    InvalidInput(PathBuf),

    #[error("Frame extraction failed (partial frames kept in {}): {failure}", .frames_dir.display())]
    ExtractionFailure {
        frames_dir: PathBuf,
        failure: ProcessFailure,
    },

    #[error("Codec '{name}' not found. Available codecs: {available:?}")]
    CodecNotFound { name: String, available: Vec<String> },

    #[error("Encoding with '{codec}' failed: {source}")]
    EncodingFailure {
        codec: String,
        #[source]
        source: PluginError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    /// The external process failure behind this error, if any
    pub fn process_failure(&self) -> Option<&ProcessFailure> {
        match self {
            HarnessError::ExtractionFailure { failure, .. } => Some(failure),
            HarnessError::EncodingFailure {
                source: PluginError::Process(failure),
                ..
            } => Some(failure),
            _ => None,
        }
    }
}
