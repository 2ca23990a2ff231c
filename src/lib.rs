//! Codec Harness - encode frame sequences with interchangeable codecs
//!
//! Umbrella crate over the workspace members:
//! - `codec-harness-core`: plugin contract, registry, input normalization, facade
//! - `codec-harness-ffmpeg`: `libx264` and `libsvtav1`
//! - `codec-harness-neural`: `dcvc-rt` and `hinerv`
//! - `codec-harness-cli`: registry assembly, option parsing, typed wrappers
//!
//! # Example
//! ```no_run
//! use codec_harness::{build_registry, CodecOptions, Context, Harness, HarnessConfig};
//!
//! # async fn run() -> Result<(), codec_harness::HarnessError> {
//! let config = HarnessConfig::from_env();
//! let harness = Harness::from_config(
//!     build_registry(config.plugin_dir.as_deref()),
//!     &config,
//!     Context::standard(),
//! );
//! let options = CodecOptions::new().with("crf", 18);
//! harness.encode("input.mp4", "out.mp4", "libx264", &options).await?;
//! # Ok(())
//! # }
//! ```

pub use codec_harness_cli::{
    build_registry, builtin_factories, builtin_manifests, encode_av1, encode_h264,
    parse_codec_options, Av1Params, H264Params,
};
pub use codec_harness_core::{
    CodecOptions, CodecPlugin, Context, EncodeOutcome, EncodeRequest, Harness, HarnessConfig,
    HarnessError, OptionValue, PluginError, Registry,
};
pub use codec_harness_ffmpeg::{SvtAv1Plugin, X264Plugin, X264Preset};
pub use codec_harness_neural::{DcvcPlugin, HinervPlugin, ModelSize};
