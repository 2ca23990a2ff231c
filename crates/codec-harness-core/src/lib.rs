//! Codec Harness Core - pluggable encoder orchestration
//!
//! This crate provides the core abstractions for dispatching frame sequences
//! to interchangeable encoder backends: the codec plugin contract, typed
//! options, the registry and its discovery sources, encode plans executed
//! through external processes, input normalization, and the facade that
//! ties them together.

pub mod config;
pub mod context;
pub mod error;
pub mod harness;
pub mod input;
pub mod options;
pub mod plan;
pub mod plugin;
pub mod process;
pub mod registry;
pub mod source;

pub use config::HarnessConfig;
pub use context::Context;
pub use error::{HarnessError, ManifestError, PluginError, PluginLoadFailure, ProcessFailure};
pub use harness::{EncodeRequest, Harness};
pub use input::{FrameDirectory, InputNormalizer, FRAME_EXTENSION, FRAME_PATTERN};
pub use options::{CodecOptions, OptionValue};
pub use plan::{staging_path, EncodePlan, Stage};
pub use plugin::{CodecPlugin, EncodeOutcome, PluginManifest};
pub use process::{DryRunRunner, ProcessOutput, ProcessRunner, ProcessStep, SystemRunner};
pub use registry::{DiscoveryReport, Registry};
pub use source::{Definition, FactoryTable, ManifestDir, PluginFactory, PluginSource, StaticSource};
