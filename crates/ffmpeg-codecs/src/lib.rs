//! Classical codecs driven through the ffmpeg CLI
//!
//! Each codec encodes a frame directory with one ffmpeg invocation:
//! - `libx264`: H.264, reads the numbered `frame_%05d.png` sequence
//! - `libsvtav1`: AV1 via SVT-AV1, glob-selects frames by extension, scales,
//!   and can write fragmented MP4
//!
//! # Example
//! ```no_run
//! use codec_harness_ffmpeg::{X264Preset, X264Settings};
//! use std::path::Path;
//!
//! let settings = X264Settings {
//!     crf: 18,
//!     preset: X264Preset::Slow,
//!     framerate: 30.0,
//! };
//! let step = settings.step("ffmpeg", Path::new("frames"), Path::new("out.mp4"));
//! println!("{}", step.command_line());
//! ```

pub mod plugin;

use codec_harness_core::{CodecOptions, OptionValue, PluginError, ProcessStep, FRAME_PATTERN};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

pub use plugin::{register_factories, SvtAv1Plugin, X264Plugin};

/// Factory kind of the H.264 plugin
pub const KIND_X264: &str = "ffmpeg-x264";

/// Factory kind of the SVT-AV1 plugin
pub const KIND_SVTAV1: &str = "ffmpeg-svtav1";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported x264 preset: {0}. Available presets: ultrafast, superfast, veryfast, faster, fast, medium, slow, slower, veryslow, placebo")]
pub struct UnknownPreset(pub String);

/// x264 speed/compression presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum X264Preset {
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Fast,
    #[default]
    Medium,
    Slow,
    Slower,
    Veryslow,
    Placebo,
}

impl X264Preset {
    pub fn as_str(self) -> &'static str {
        match self {
            X264Preset::Ultrafast => "ultrafast",
            X264Preset::Superfast => "superfast",
            X264Preset::Veryfast => "veryfast",
            X264Preset::Faster => "faster",
            X264Preset::Fast => "fast",
            X264Preset::Medium => "medium",
            X264Preset::Slow => "slow",
            X264Preset::Slower => "slower",
            X264Preset::Veryslow => "veryslow",
            X264Preset::Placebo => "placebo",
        }
    }
}

impl fmt::Display for X264Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for X264Preset {
    type Err = UnknownPreset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ultrafast" => Ok(X264Preset::Ultrafast),
            "superfast" => Ok(X264Preset::Superfast),
            "veryfast" => Ok(X264Preset::Veryfast),
            "faster" => Ok(X264Preset::Faster),
            "fast" => Ok(X264Preset::Fast),
            "medium" => Ok(X264Preset::Medium),
            "slow" => Ok(X264Preset::Slow),
            "slower" => Ok(X264Preset::Slower),
            "veryslow" => Ok(X264Preset::Veryslow),
            "placebo" => Ok(X264Preset::Placebo),
            _ => Err(UnknownPreset(s.to_string())),
        }
    }
}

fn non_negative(options: &CodecOptions, key: &str) -> Result<u32, PluginError> {
    let value = options.int(key)?;
    u32::try_from(value).map_err(|_| PluginError::InvalidOption {
        key: key.to_string(),
        expected: "non-negative integer".to_string(),
        found: value.to_string(),
    })
}

/// Frame rates may be fractional (29.97) but never zero or negative
fn positive_rate(options: &CodecOptions, key: &str) -> Result<f64, PluginError> {
    let value = options.float(key)?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(PluginError::InvalidOption {
            key: key.to_string(),
            expected: "positive number".to_string(),
            found: value.to_string(),
        })
    }
}

/// Whole rates stay integers in option maps
fn rate_value(rate: f64) -> OptionValue {
    if rate.fract() == 0.0 && rate.abs() < i64::MAX as f64 {
        OptionValue::Int(rate as i64)
    } else {
        OptionValue::Float(rate)
    }
}

/// Resolved libx264 parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct X264Settings {
    /// Constant Rate Factor (0-51, lower is better quality)
    pub crf: u32,
    /// Encoding speed vs. compression
    pub preset: X264Preset,
    pub framerate: f64,
}

impl Default for X264Settings {
    fn default() -> Self {
        Self {
            crf: 23,
            preset: X264Preset::Medium,
            framerate: 30.0,
        }
    }
}

impl X264Settings {
    /// Option mapping equivalent to these settings
    pub fn to_options(&self) -> CodecOptions {
        CodecOptions::new()
            .with("crf", self.crf)
            .with("preset", self.preset.as_str())
            .with("framerate", rate_value(self.framerate))
    }

    /// Read settings from merged options
    pub fn from_options(options: &CodecOptions) -> Result<Self, PluginError> {
        let crf = non_negative(options, "crf")?;
        if crf > 51 {
            return Err(PluginError::InvalidOption {
                key: "crf".to_string(),
                expected: "integer in 0..=51".to_string(),
                found: crf.to_string(),
            });
        }
        let preset_str = options.text("preset")?;
        let preset = preset_str
            .parse::<X264Preset>()
            .map_err(|e| PluginError::InvalidOption {
                key: "preset".to_string(),
                expected: "x264 preset".to_string(),
                found: e.0,
            })?;

        Ok(Self {
            crf,
            preset,
            framerate: positive_rate(options, "framerate")?,
        })
    }

    /// The ffmpeg invocation encoding `frames` into `output`
    pub fn step(&self, ffmpeg: &str, frames: &Path, output: &Path) -> ProcessStep {
        ProcessStep::new("encode", ffmpeg)
            .arg("-y") // Overwrite output file if it exists
            .args(["-framerate".to_string(), self.framerate.to_string()])
            .arg("-i")
            .path_arg(&frames.join(FRAME_PATTERN))
            .args(["-c:v", "libx264"])
            .args(["-preset", self.preset.as_str()])
            .args(["-crf".to_string(), self.crf.to_string()])
            .args(["-pix_fmt", "yuv420p"]) // For compatibility
            .path_arg(output)
    }
}

/// Resolved libsvtav1 parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvtAv1Settings {
    /// SVT-AV1 preset (0-13, higher is faster)
    pub preset: u32,
    /// Target bitrate (e.g. "1600k")
    pub video_bitrate: String,
    /// Keyframe interval in frames
    pub gop_size: u32,
    /// Output height; width follows the aspect ratio
    pub scale_height: u32,
    pub framerate: f64,
    /// Write fragmented MP4 (frag_keyframe+empty_moov)
    pub fragmented_mp4: bool,
    /// Extension of the frame files to glob
    pub frame_extension: String,
}

impl Default for SvtAv1Settings {
    fn default() -> Self {
        Self {
            preset: 8,
            video_bitrate: "1600k".to_string(),
            gop_size: 50,
            scale_height: 540,
            framerate: 30.0,
            fragmented_mp4: true,
            frame_extension: codec_harness_core::FRAME_EXTENSION.to_string(),
        }
    }
}

impl SvtAv1Settings {
    pub fn to_options(&self) -> CodecOptions {
        CodecOptions::new()
            .with("preset", self.preset)
            .with("video_bitrate", self.video_bitrate.as_str())
            .with("gop_size", self.gop_size)
            .with("scale_height", self.scale_height)
            .with("framerate", rate_value(self.framerate))
            .with("fragmented_mp4", self.fragmented_mp4)
            .with("frame_extension", self.frame_extension.as_str())
    }

    pub fn from_options(options: &CodecOptions) -> Result<Self, PluginError> {
        let preset = non_negative(options, "preset")?;
        if preset > 13 {
            return Err(PluginError::InvalidOption {
                key: "preset".to_string(),
                expected: "integer in 0..=13".to_string(),
                found: preset.to_string(),
            });
        }

        Ok(Self {
            preset,
            // Bitrates may be given as plain numbers ("video_bitrate=2000000")
            video_bitrate: options.arg("video_bitrate")?,
            gop_size: non_negative(options, "gop_size")?,
            scale_height: non_negative(options, "scale_height")?,
            framerate: positive_rate(options, "framerate")?,
            fragmented_mp4: options.flag("fragmented_mp4")?,
            frame_extension: options
                .text("frame_extension")?
                .trim_start_matches('.')
                .to_string(),
        })
    }

    pub fn step(&self, ffmpeg: &str, frames: &Path, output: &Path) -> ProcessStep {
        let pattern = frames.join(format!("*.{}", self.frame_extension));

        let mut step = ProcessStep::new("encode", ffmpeg)
            .arg("-y")
            .args(["-framerate".to_string(), self.framerate.to_string()])
            .args(["-pattern_type", "glob", "-i"])
            .path_arg(&pattern)
            .args(["-vf".to_string(), format!("scale=-2:{}", self.scale_height)])
            .args(["-c:v", "libsvtav1"])
            .args(["-preset".to_string(), self.preset.to_string()])
            .args(["-b:v", self.video_bitrate.as_str()])
            .args(["-g".to_string(), self.gop_size.to_string()]);

        if self.fragmented_mp4 {
            step = step.args(["-movflags", "frag_keyframe+empty_moov"]);
        }
        step.path_arg(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preset() {
        assert_eq!("slow".parse::<X264Preset>().unwrap(), X264Preset::Slow);
        assert_eq!("VeryFast".parse::<X264Preset>().unwrap(), X264Preset::Veryfast);
        assert!("warp".parse::<X264Preset>().is_err());
    }

    #[test]
    fn test_x264_settings_round_trip_through_options() {
        let settings = X264Settings {
            crf: 18,
            preset: X264Preset::Slower,
            framerate: 24.0,
        };
        assert_eq!(X264Settings::from_options(&settings.to_options()).unwrap(), settings);
    }

    #[test]
    fn test_x264_rejects_out_of_range_crf() {
        let options = X264Settings::default().to_options().with("crf", 60);
        assert!(matches!(
            X264Settings::from_options(&options),
            Err(PluginError::InvalidOption { .. })
        ));

        let options = X264Settings::default().to_options().with("crf", -1);
        assert!(X264Settings::from_options(&options).is_err());
    }

    #[test]
    fn test_x264_step() {
        let step = X264Settings::default().step("ffmpeg", Path::new("/frames"), Path::new("/out.mp4"));

        assert_eq!(
            step.command_line(),
            "ffmpeg -y -framerate 30 -i /frames/frame_%05d.png -c:v libx264 -preset medium -crf 23 -pix_fmt yuv420p /out.mp4"
        );
    }

    #[test]
    fn test_svtav1_step_fragmented() {
        let step = SvtAv1Settings::default().step("ffmpeg", Path::new("/frames"), Path::new("/out.mp4"));

        assert_eq!(step.arg_after("-i"), Some("/frames/*.png"));
        assert_eq!(step.arg_after("-pattern_type"), Some("glob"));
        assert_eq!(step.arg_after("-vf"), Some("scale=-2:540"));
        assert_eq!(step.arg_after("-c:v"), Some("libsvtav1"));
        assert_eq!(step.arg_after("-b:v"), Some("1600k"));
        assert_eq!(step.arg_after("-g"), Some("50"));
        assert_eq!(step.arg_after("-movflags"), Some("frag_keyframe+empty_moov"));
        assert_eq!(step.args.last().map(Path::new), Some(Path::new("/out.mp4")));
    }

    #[test]
    fn test_svtav1_step_plain_mp4() {
        let settings = SvtAv1Settings {
            fragmented_mp4: false,
            frame_extension: ".jpg".to_string(),
            ..SvtAv1Settings::default()
        };
        let settings = SvtAv1Settings::from_options(&settings.to_options()).unwrap();
        let step = settings.step("ffmpeg", Path::new("/frames"), Path::new("/out.mp4"));

        assert!(!step.has_arg("-movflags"));
        assert_eq!(step.arg_after("-i"), Some("/frames/*.jpg"));
    }

    #[test]
    fn test_fractional_framerate() {
        let options = X264Settings::default().to_options().with("framerate", 29.97);
        let settings = X264Settings::from_options(&options).unwrap();
        assert_eq!(settings.framerate, 29.97);

        let step = settings.step("ffmpeg", Path::new("/frames"), Path::new("/out.mp4"));
        assert_eq!(step.arg_after("-framerate"), Some("29.97"));
        assert_eq!(settings.to_options().get("framerate"), Some(&OptionValue::Float(29.97)));

        let options = SvtAv1Settings::default().to_options().with("framerate", 23.976);
        let step = SvtAv1Settings::from_options(&options)
            .unwrap()
            .step("ffmpeg", Path::new("/frames"), Path::new("/out.mp4"));
        assert_eq!(step.arg_after("-framerate"), Some("23.976"));
    }

    #[test]
    fn test_framerate_must_be_positive() {
        for rate in [OptionValue::Int(0), OptionValue::Int(-24), OptionValue::Float(-1.5)] {
            let options = X264Settings::default().to_options().with("framerate", rate.clone());
            assert!(matches!(
                X264Settings::from_options(&options),
                Err(PluginError::InvalidOption { ref key, .. }) if key == "framerate"
            ));
            let options = SvtAv1Settings::default().to_options().with("framerate", rate);
            assert!(SvtAv1Settings::from_options(&options).is_err());
        }
    }

    #[test]
    fn test_svtav1_numeric_bitrate() {
        let options = SvtAv1Settings::default()
            .to_options()
            .with("video_bitrate", 2_000_000);
        let settings = SvtAv1Settings::from_options(&options).unwrap();
        assert_eq!(settings.video_bitrate, "2000000");
    }
}
