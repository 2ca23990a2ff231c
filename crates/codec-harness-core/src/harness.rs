//! Orchestration facade: normalize input, resolve the codec, encode

use crate::config::HarnessConfig;
use crate::context::Context;
use crate::error::HarnessError;
use crate::input::{FrameDirectory, InputNormalizer};
use crate::options::CodecOptions;
use crate::plugin::EncodeOutcome;
use crate::registry::Registry;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// One orchestration call
#[derive(Debug, Clone)]
pub struct EncodeRequest {
    /// Video file or directory of frames
    pub input: PathBuf,

    /// Where the encoded output goes
    pub output: PathBuf,

    /// Registry name of the codec
    pub codec: String,

    /// Overrides of the codec's default options
    pub options: CodecOptions,
}

impl EncodeRequest {
    pub fn new(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        codec: impl Into<String>,
    ) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            codec: codec.into(),
            options: CodecOptions::new(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: CodecOptions) -> Self {
        self.options = options;
        self
    }
}

/// Composes the input normalizer, the registry and the selected codec
#[derive(Debug)]
pub struct Harness {
    registry: Registry,
    normalizer: InputNormalizer,
    ctx: Context,
}

impl Harness {
    pub fn new(registry: Registry, normalizer: InputNormalizer, ctx: Context) -> Self {
        Self {
            registry,
            normalizer,
            ctx,
        }
    }

    /// Build a harness whose normalizer and cleanup policy follow `config`
    pub fn from_config(registry: Registry, config: &HarnessConfig, ctx: Context) -> Self {
        let mut normalizer = InputNormalizer::new(config.ffmpeg.as_str());
        if let Some(root) = &config.temp_root {
            normalizer = normalizer.with_temp_root(root);
        }
        let keep = ctx.keep_intermediates || config.keep_frames;
        Self::new(registry, normalizer, ctx.with_keep_intermediates(keep))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Encode `input` into `output` with the named codec
    pub async fn encode(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        codec: &str,
        options: &CodecOptions,
    ) -> Result<EncodeOutcome, HarnessError> {
        info!("Starting encoding process for {}...", input.as_ref().display());

        // 1. Frames
        let frames = self.normalizer.normalize(&self.ctx, input.as_ref()).await?;

        // 2. Codec
        let plugin = self.registry.resolve(codec)?;

        // 3. Encode. No retry and no fallback to another codec.
        let result = plugin
            .encode(&self.ctx, frames.path(), output.as_ref(), options)
            .await;

        self.release_frames(frames, result.is_ok());

        let outcome = result.map_err(|source| HarnessError::EncodingFailure {
            codec: codec.to_string(),
            source,
        })?;
        info!("Encoding process completed successfully.");
        Ok(outcome)
    }

    /// Run one [`EncodeRequest`]
    pub async fn run(&self, request: &EncodeRequest) -> Result<EncodeOutcome, HarnessError> {
        self.encode(
            &request.input,
            &request.output,
            &request.codec,
            &request.options,
        )
        .await
    }

    /// Extracted frames are removed after a successful encode and kept after a
    /// failed one, or whenever intermediates are kept.
    fn release_frames(&self, frames: FrameDirectory, succeeded: bool) {
        if !frames.is_extracted() {
            return;
        }
        if self.ctx.keep_intermediates {
            let kept = frames.keep();
            info!("Keeping extracted frames in {}", kept.display());
        } else if !succeeded {
            let kept = frames.keep();
            warn!("Encoding failed; extracted frames kept in {}", kept.display());
        }
    }
}
