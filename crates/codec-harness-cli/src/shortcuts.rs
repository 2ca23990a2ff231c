//! Typed wrappers around [`Harness::encode`] for the classical codecs

use codec_harness_core::{EncodeOutcome, Harness, HarnessError};
use std::path::Path;

/// Parameters of [`encode_h264`]
pub type H264Params = codec_harness_ffmpeg::X264Settings;

/// Parameters of [`encode_av1`]
pub type Av1Params = codec_harness_ffmpeg::SvtAv1Settings;

/// Encode with the `libx264` codec
pub async fn encode_h264(
    harness: &Harness,
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    params: &H264Params,
) -> Result<EncodeOutcome, HarnessError> {
    harness
        .encode(input, output, "libx264", &params.to_options())
        .await
}

/// Encode with the `libsvtav1` codec
pub async fn encode_av1(
    harness: &Harness,
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    params: &Av1Params,
) -> Result<EncodeOutcome, HarnessError> {
    harness
        .encode(input, output, "libsvtav1", &params.to_options())
        .await
}
