//! DCVC-RT: lossless staging video, DCVC test script, bitstream collection

use crate::{absolute, KIND_DCVC_RT};
use async_trait::async_trait;
use codec_harness_core::{
    staging_path, CodecOptions, CodecPlugin, EncodePlan, PluginError, PluginManifest,
    ProcessStep, FRAME_PATTERN,
};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_REPO: &str = "vendor/DCVC";

/// Resolved DCVC-RT parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DcvcSettings {
    /// Quality index 1-6, lower is higher bitrate
    pub quality: u32,
    /// Model variant (DCVC-RT, DCVC-RT-light, DCVC-RT-tiny)
    pub model: String,
    /// Frame rate of the lossless staging video
    pub framerate: u32,
}

impl Default for DcvcSettings {
    fn default() -> Self {
        Self {
            quality: 3,
            model: "DCVC-RT".to_string(),
            framerate: 30,
        }
    }
}

impl DcvcSettings {
    pub fn to_options(&self) -> CodecOptions {
        CodecOptions::new()
            .with("quality", self.quality)
            .with("model", self.model.as_str())
            .with("framerate", self.framerate)
    }

    pub fn from_options(options: &CodecOptions) -> Result<Self, PluginError> {
        let quality = options.int("quality")?;
        if !(1..=6).contains(&quality) {
            return Err(PluginError::InvalidOption {
                key: "quality".to_string(),
                expected: "integer in 1..=6".to_string(),
                found: quality.to_string(),
            });
        }

        let model = options.text("model")?;
        if model.is_empty() {
            return Err(PluginError::InvalidOption {
                key: "model".to_string(),
                expected: "model name".to_string(),
                found: "empty string".to_string(),
            });
        }

        let framerate = options.int("framerate")?;
        let framerate = u32::try_from(framerate)
            .ok()
            .filter(|f| *f > 0)
            .ok_or_else(|| PluginError::InvalidOption {
                key: "framerate".to_string(),
                expected: "positive integer".to_string(),
                found: framerate.to_string(),
            })?;

        Ok(Self {
            quality: quality as u32,
            model: model.to_string(),
            framerate,
        })
    }
}

/// Microsoft's DCVC-RT neural codec
pub struct DcvcPlugin {
    name: String,
    description: String,
    defaults: CodecOptions,
    /// DCVC repository checkout (contains test.py)
    repo_dir: PathBuf,
    python: String,
    ffmpeg: String,
}

impl DcvcPlugin {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: KIND_DCVC_RT.to_string(),
            description: "DCVC-RT neural video codec".to_string(),
            defaults: Self::builtin_defaults(),
            repo_dir: repo_dir.into(),
            python: "python".to_string(),
            ffmpeg: "ffmpeg".to_string(),
        }
    }

    pub fn builtin_defaults() -> CodecOptions {
        DcvcSettings::default().to_options()
    }

    /// Build an instance from a plugin definition.
    ///
    /// Settings: `repo_dir` (default `vendor/DCVC`), `python`, `ffmpeg`.
    pub fn from_manifest(manifest: &PluginManifest) -> Result<Self, PluginError> {
        let defaults = manifest.resolve_defaults(&Self::builtin_defaults())?;
        DcvcSettings::from_options(&defaults)?;

        let repo_dir = absolute(Path::new(&manifest.setting_or("repo_dir", DEFAULT_REPO)))?;

        Ok(Self {
            name: manifest.name.clone(),
            description: manifest.description.clone(),
            defaults,
            repo_dir,
            python: manifest.setting_or("python", "python"),
            ffmpeg: manifest.setting_or("ffmpeg", "ffmpeg"),
        })
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }
}

impl Default for DcvcPlugin {
    fn default() -> Self {
        Self::new(DEFAULT_REPO)
    }
}

#[async_trait]
impl CodecPlugin for DcvcPlugin {
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
        let settings = DcvcSettings::from_options(options)?;
        debug!("DCVC-RT settings: {:?}", settings);

        // The script runs from its repository, so relative paths would resolve there
        let repo_dir = absolute(&self.repo_dir)?;
        let frames = absolute(frames)?;
        let output = absolute(output)?;

        let output_name = output
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_else(|| OsString::from("output"));
        let mut bitstream_name = output_name.clone();
        bitstream_name.push(".bin");

        // Private to this call; DCVC writes <save_dir>/<output_name>.bin
        let save_dir = staging_path(&output, "dcvc-out", "d");
        let bitstream = save_dir.join(&bitstream_name);

        // DCVC works on video files, not frames
        let staging = staging_path(&output, "dcvc-input", "mp4");

        let lossless = ProcessStep::new("stage-lossless", self.ffmpeg.as_str())
            .arg("-y")
            .args(["-framerate".to_string(), settings.framerate.to_string()])
            .arg("-i")
            .path_arg(&frames.join(FRAME_PATTERN))
            .args(["-c:v", "libx264", "-crf", "0"])
            .path_arg(&staging);

        let encode = ProcessStep::new("encode", self.python.as_str())
            .path_arg(&repo_dir.join("test.py"))
            .arg("--video_path")
            .path_arg(&staging)
            .args(["--model", settings.model.as_str()])
            .args(["--quality".to_string(), settings.quality.to_string()])
            .arg("--save_dir")
            .path_arg(&save_dir)
            .arg("--output_name")
            .arg(output_name)
            .current_dir(&repo_dir);

        let plan = EncodePlan::new(&output)
            .run(lossless)
            .run(encode)
            .collect(&bitstream, &output)
            .cleanup(&staging)
            .scratch_dir(&save_dir);
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codec_harness_core::{Context, DryRunRunner, Stage};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn plugin() -> DcvcPlugin {
        DcvcPlugin::new("/opt/DCVC")
    }

    #[test]
    fn test_quality_range() {
        for quality in [0, 7] {
            let options = DcvcSettings::default().to_options().with("quality", quality);
            assert!(matches!(
                DcvcSettings::from_options(&options),
                Err(PluginError::InvalidOption { ref key, .. }) if key == "quality"
            ));
        }
        let options = DcvcSettings::default().to_options().with("quality", 6);
        assert_eq!(DcvcSettings::from_options(&options).unwrap().quality, 6);
    }

    #[test]
    fn test_plan_stages() {
        let plugin = plugin();
        let plan = plugin
            .plan(
                Path::new("/data/frames"),
                Path::new("/data/out/clip.mp4"),
                &plugin.default_options(),
            )
            .unwrap();

        assert_eq!(plan.stages.len(), 3);
        let steps: Vec<_> = plan.steps().collect();
        assert_eq!(steps[0].label, "stage-lossless");
        assert_eq!(steps[0].arg_after("-i"), Some("/data/frames/frame_%05d.png"));
        assert_eq!(steps[0].arg_after("-crf"), Some("0"));
        let staging = PathBuf::from(steps[0].args.last().unwrap());
        assert!(staging
            .to_str()
            .unwrap()
            .starts_with("/data/out/.clip.dcvc-input-"));

        assert_eq!(steps[1].program, "python");
        assert_eq!(steps[1].args[0], "/opt/DCVC/test.py");
        assert_eq!(steps[1].path_after("--video_path"), Some(staging.as_path()));
        assert_eq!(steps[1].arg_after("--model"), Some("DCVC-RT"));
        assert_eq!(steps[1].arg_after("--quality"), Some("3"));
        assert_eq!(steps[1].arg_after("--output_name"), Some("clip"));
        assert_eq!(steps[1].cwd.as_deref(), Some(Path::new("/opt/DCVC")));

        let save_dir = steps[1].path_after("--save_dir").unwrap().to_path_buf();
        assert_eq!(save_dir.parent(), Some(Path::new("/data/out")));
        assert!(save_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap()
            .starts_with(".clip.dcvc-out-"));

        assert_eq!(
            plan.stages[2],
            Stage::Collect {
                from: save_dir.join("clip.bin"),
                to: PathBuf::from("/data/out/clip.mp4"),
            }
        );
        assert_eq!(plan.cleanup, vec![staging, save_dir]);
        assert_eq!(plan.discard_on_failure, vec![PathBuf::from("/data/out/clip.mp4")]);
    }

    #[test]
    fn test_same_stem_outputs_collect_from_distinct_paths() {
        let plugin = plugin();
        let options = plugin.default_options();
        let a = plugin
            .plan(Path::new("/f"), Path::new("/d/clip.mp4"), &options)
            .unwrap();
        let b = plugin
            .plan(Path::new("/f"), Path::new("/d/clip.mkv"), &options)
            .unwrap();

        let collected_from = |plan: &EncodePlan| match &plan.stages[2] {
            Stage::Collect { from, .. } => from.clone(),
            other => panic!("Expected collect stage, got {other:?}"),
        };
        assert_ne!(collected_from(&a), collected_from(&b));
        assert!(!a.discard_on_failure.contains(&PathBuf::from("/d/clip.bin")));
    }

    #[tokio::test]
    async fn test_failure_leaves_unrelated_bitstream_alone() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("clip.mp4");
        let unrelated = dir.path().join("clip.bin");
        std::fs::write(&unrelated, b"someone else's bitstream").unwrap();
        let runner = Arc::new(DryRunRunner::new().failing("encode", "CUDA out of memory"));
        let ctx = Context::standard().with_runner(runner);

        let plugin = plugin();
        let plan = plugin
            .plan(dir.path(), &output, &plugin.default_options())
            .unwrap();
        // Simulate a partial bitstream in the private save directory
        std::fs::create_dir_all(&plan.cleanup[1]).unwrap();
        std::fs::write(plan.cleanup[1].join("clip.bin"), b"partial").unwrap();

        assert!(plan.execute(&ctx).await.is_err());
        assert!(unrelated.exists());
        assert!(!plan.cleanup[1].exists());
    }

    #[test]
    fn test_staging_names_never_collide() {
        let plugin = plugin();
        let options = plugin.default_options();
        let a = plugin
            .plan(Path::new("/f"), Path::new("/out/a.bin"), &options)
            .unwrap();
        let b = plugin
            .plan(Path::new("/f"), Path::new("/out/a.bin"), &options)
            .unwrap();
        assert_ne!(a.cleanup, b.cleanup);
    }

    #[test]
    fn test_relative_paths_are_absolute_in_plan() {
        let plugin = plugin();
        let plan = plugin
            .plan(
                Path::new("frames"),
                Path::new("out/clip.bin"),
                &plugin.default_options(),
            )
            .unwrap();
        for step in plan.steps() {
            let video = step.arg_after("--video_path").or_else(|| step.arg_after("-i"));
            assert!(Path::new(video.unwrap()).is_absolute());
        }
        assert!(plan.artifact.is_absolute());
    }

    #[tokio::test]
    async fn test_failing_script_removes_staging_video() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("clip.bin");
        let runner = Arc::new(DryRunRunner::new().failing("encode", "CUDA out of memory"));
        let ctx = Context::standard().with_runner(runner.clone());

        let plugin = plugin();
        let plan = plugin
            .plan(dir.path(), &output, &plugin.default_options())
            .unwrap();
        // Simulate the staging video left by the first stage
        std::fs::write(&plan.cleanup[0], b"staging").unwrap();

        let err = plan.execute(&ctx).await.unwrap_err();
        assert!(matches!(err, PluginError::Process(ref f) if f.stage == "encode"));
        assert!(!plan.cleanup[0].exists());
        assert_eq!(runner.step_count(), 2);
    }

    #[tokio::test]
    async fn test_encode_reports_requested_output() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("clip.bin");
        let ctx = Context::standard().with_runner(Arc::new(DryRunRunner::new()));

        let outcome = plugin()
            .encode(&ctx, dir.path(), &output, &CodecOptions::new().with("quality", 1))
            .await
            .unwrap();

        assert_eq!(outcome.artifact, output);
        assert_eq!(outcome.stages, 3);
        assert_eq!(outcome.options.int("quality").unwrap(), 1);
    }
}
