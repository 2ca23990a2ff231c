//! Input normalization: turn a video file or frame directory into a frame directory

use crate::context::Context;
use crate::error::HarnessError;
use crate::process::{run_checked, ProcessStep};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{info, warn};

/// File name pattern of extracted frames (5-digit, 1-based index)
pub const FRAME_PATTERN: &str = "frame_%05d.png";

/// Extension of extracted frames
pub const FRAME_EXTENSION: &str = "png";

const TEMP_PREFIX: &str = "codec_harness_frames_";

/// A directory of frames ready for encoding
#[derive(Debug)]
pub enum FrameDirectory {
    /// Supplied by the caller; never modified or removed
    Provided(PathBuf),

    /// Created by frame extraction; removed on drop unless kept
    Extracted(TempDir),
}

impl FrameDirectory {
    pub fn path(&self) -> &Path {
        match self {
            FrameDirectory::Provided(path) => path,
            FrameDirectory::Extracted(dir) => dir.path(),
        }
    }

    pub fn is_extracted(&self) -> bool {
        matches!(self, FrameDirectory::Extracted(_))
    }

    /// Give up ownership so the directory outlives this value
    pub fn keep(self) -> PathBuf {
        match self {
            FrameDirectory::Provided(path) => path,
            FrameDirectory::Extracted(dir) => dir.keep(),
        }
    }
}

/// Produces frame directories, extracting frames with ffmpeg when given a file
#[derive(Debug, Clone)]
pub struct InputNormalizer {
    /// Frame extraction program
    ffmpeg: String,

    /// Parent for extracted frame directories (None = system temp dir)
    temp_root: Option<PathBuf>,
}

impl Default for InputNormalizer {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl InputNormalizer {
    pub fn new(ffmpeg: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            temp_root: None,
        }
    }

    #[must_use]
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    /// The extraction command for `input` into `frames_dir`
    pub fn extraction_step(&self, input: &Path, frames_dir: &Path) -> ProcessStep {
        ProcessStep::new("extract-frames", self.ffmpeg.as_str())
            .arg("-i")
            .path_arg(input)
            .path_arg(&frames_dir.join(FRAME_PATTERN))
    }

    fn create_temp_dir(&self) -> std::io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_PREFIX);
        match &self.temp_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
    }

    /// Ensure `input` is a directory of frames.
    ///
    /// An existing directory is returned as is. An existing file is extracted
    /// into a fresh temporary directory. Anything else fails with
    /// [`HarnessError::InvalidInput`] before any process is spawned.
    pub async fn normalize(&self, ctx: &Context, input: &Path) -> Result<FrameDirectory, HarnessError> {
        if input.is_dir() {
            info!("Input is a directory of frames. Skipping extraction.");
            return Ok(FrameDirectory::Provided(input.to_path_buf()));
        }

        if !input.is_file() {
            return Err(HarnessError::InvalidInput(input.to_path_buf()));
        }

        info!("Input is a video file. Extracting frames...");
        let frames = self.create_temp_dir()?;
        let step = self.extraction_step(input, frames.path());

        match run_checked(ctx.runner(), &step).await {
            Ok(_) => {
                info!(
                    "Frames extracted to temporary directory: {}",
                    frames.path().display()
                );
                Ok(FrameDirectory::Extracted(frames))
            }
            Err(failure) => {
                let frames_dir = frames.keep();
                warn!(
                    "Frame extraction failed; partial frames kept in {}",
                    frames_dir.display()
                );
                Err(HarnessError::ExtractionFailure {
                    frames_dir,
                    failure,
                })
            }
        }
    }
}
