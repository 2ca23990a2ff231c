//! Encode plans: the ordered external stages a plugin runs for one request

use crate::context::Context;
use crate::error::PluginError;
use crate::process::{run_checked, ProcessStep};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// A single stage of an encode plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Stage {
    /// Run an external process
    Run(ProcessStep),

    /// Move an artifact produced by an earlier stage to its final location
    Collect { from: PathBuf, to: PathBuf },
}

/// Ordered stages plus the cleanup obligations of one encode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodePlan {
    pub stages: Vec<Stage>,

    /// Intermediate files and directories removed once the plan finishes, on success or failure
    pub cleanup: Vec<PathBuf>,

    /// Directories created before the first stage runs
    pub scratch_dirs: Vec<PathBuf>,

    /// What the plan reports as its output on success
    pub artifact: PathBuf,

    /// Removed if the plan fails, so a partial output is never mistaken for a result
    pub discard_on_failure: Vec<PathBuf>,
}

impl EncodePlan {
    /// Plan writing a single file at `output`
    pub fn new(output: impl Into<PathBuf>) -> Self {
        let output = output.into();
        Self {
            stages: Vec::with_capacity(3),
            cleanup: Vec::new(),
            scratch_dirs: Vec::new(),
            artifact: output.clone(),
            discard_on_failure: vec![output],
        }
    }

    /// Plan whose artifact is a directory that must survive failure
    pub fn with_artifact_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            stages: Vec::with_capacity(2),
            cleanup: Vec::new(),
            scratch_dirs: Vec::new(),
            artifact: dir.into(),
            discard_on_failure: Vec::new(),
        }
    }

    #[must_use]
    pub fn run(mut self, step: ProcessStep) -> Self {
        self.stages.push(Stage::Run(step));
        self
    }

    #[must_use]
    pub fn collect(mut self, from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        self.stages.push(Stage::Collect {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    #[must_use]
    pub fn cleanup(mut self, path: impl Into<PathBuf>) -> Self {
        self.cleanup.push(path.into());
        self
    }

    /// A directory created for this plan and removed with the other intermediates
    #[must_use]
    pub fn scratch_dir(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.scratch_dirs.push(path.clone());
        self.cleanup.push(path);
        self
    }

    /// Process steps in order, skipping collect stages
    pub fn steps(&self) -> impl Iterator<Item = &ProcessStep> {
        self.stages.iter().filter_map(|stage| match stage {
            Stage::Run(step) => Some(step),
            Stage::Collect { .. } => None,
        })
    }

    /// Execute all stages in order and return the artifact path
    pub async fn execute(&self, ctx: &Context) -> Result<PathBuf, PluginError> {
        let _guard = CleanupGuard {
            paths: &self.cleanup,
            keep: ctx.keep_intermediates,
        };

        match self.execute_stages(ctx).await {
            Ok(()) => Ok(self.artifact.clone()),
            Err(e) => {
                for path in &self.discard_on_failure {
                    if path.is_file() {
                        debug!("Discarding partial output {}", path.display());
                        if let Err(remove_err) = std::fs::remove_file(path) {
                            warn!(
                                "Could not remove partial output {}: {}",
                                path.display(),
                                remove_err
                            );
                        }
                    }
                }
                Err(e)
            }
        }
    }

    async fn execute_stages(&self, ctx: &Context) -> Result<(), PluginError> {
        let runner = ctx.runner();
        let dry_run = runner.is_dry_run();

        if !dry_run {
            for dir in &self.scratch_dirs {
                std::fs::create_dir_all(dir)?;
            }
        }

        for stage in &self.stages {
            match stage {
                Stage::Run(step) => {
                    if ctx.verbose {
                        info!("[{}] {}", step.label, step.command_line());
                    }
                    run_checked(runner, step).await?;
                }
                Stage::Collect { from, to } => {
                    if dry_run {
                        debug!("Would collect {} -> {}", from.display(), to.display());
                        continue;
                    }
                    collect_artifact(from, to)?;
                }
            }
        }

        if !dry_run && !self.artifact.exists() {
            return Err(PluginError::OutputNotFound(self.artifact.clone()));
        }

        Ok(())
    }
}

/// Move `from` to `to`, falling back to copy + remove across filesystems
fn collect_artifact(from: &Path, to: &Path) -> Result<(), PluginError> {
    if from == to {
        return if from.exists() {
            Ok(())
        } else {
            Err(PluginError::OutputNotFound(from.to_path_buf()))
        };
    }
    if !from.exists() {
        return Err(PluginError::OutputNotFound(from.to_path_buf()));
    }

    debug!("Collecting {} -> {}", from.display(), to.display());
    if std::fs::rename(from, to).is_err() {
        std::fs::copy(from, to)?;
        std::fs::remove_file(from)?;
    }
    Ok(())
}

/// Removes intermediates when the plan goes out of scope
struct CleanupGuard<'a> {
    paths: &'a [PathBuf],
    keep: bool,
}

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        for path in self.paths {
            if self.keep {
                if path.exists() {
                    info!("Keeping intermediate {}", path.display());
                }
                continue;
            }
            let removed = if path.is_dir() {
                std::fs::remove_dir_all(path)
            } else if path.is_file() {
                std::fs::remove_file(path)
            } else {
                continue;
            };
            if let Err(e) = removed {
                warn!("Could not remove intermediate {}: {}", path.display(), e);
            }
        }
    }
}

static STAGING_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A collision-free path for an intermediate file next to `output`.
///
/// The name combines the output stem, the process id and a per-process
/// counter, so concurrent encodes never share a staging file.
pub fn staging_path(output: &Path, tag: &str, extension: &str) -> PathBuf {
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let n = STAGING_COUNTER.fetch_add(1, Ordering::Relaxed);
    dir.join(format!(
        ".{stem}.{tag}-{}-{n}.{extension}",
        std::process::id()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::DryRunRunner;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn dry_ctx(runner: Arc<DryRunRunner>) -> Context {
        Context::standard().with_runner(runner)
    }

    #[test]
    fn test_staging_paths_are_unique() {
        let output = Path::new("/videos/out.bin");
        let a = staging_path(output, "lossless", "mp4");
        let b = staging_path(output, "lossless", "mp4");

        assert_ne!(a, b);
        assert_eq!(a.parent(), Some(Path::new("/videos")));
        assert!(a.to_string_lossy().ends_with(".mp4"));
    }

    #[test]
    fn test_staging_path_without_parent() {
        let a = staging_path(Path::new("out.bin"), "lossless", "mp4");
        assert_eq!(a.parent(), Some(Path::new(".")));
    }

    #[tokio::test]
    async fn test_execute_runs_stages_in_order() {
        let runner = Arc::new(DryRunRunner::new());
        let plan = EncodePlan::new("/tmp/out.bin")
            .run(ProcessStep::new("first", "tool-a"))
            .run(ProcessStep::new("second", "tool-b"));

        let artifact = plan.execute(&dry_ctx(runner.clone())).await.unwrap();

        assert_eq!(artifact, PathBuf::from("/tmp/out.bin"));
        let labels: Vec<_> = runner.steps().into_iter().map(|s| s.label).collect();
        assert_eq!(labels, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_failure_stops_plan_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let staging = dir.path().join("staging.mp4");
        let output = dir.path().join("out.bin");
        std::fs::write(&staging, b"intermediate").unwrap();
        std::fs::write(&output, b"partial").unwrap();

        let runner = Arc::new(DryRunRunner::new().failing("second", "boom"));
        let plan = EncodePlan::new(&output)
            .run(ProcessStep::new("first", "tool-a"))
            .run(ProcessStep::new("second", "tool-b"))
            .run(ProcessStep::new("third", "tool-c"))
            .cleanup(&staging);

        let err = plan.execute(&dry_ctx(runner.clone())).await.unwrap_err();

        match err {
            PluginError::Process(failure) => {
                assert_eq!(failure.stage, "second");
                assert_eq!(failure.stderr, "boom");
            }
            other => panic!("Expected process failure, got {other:?}"),
        }
        assert_eq!(runner.step_count(), 2);
        assert!(!staging.exists(), "intermediate should be removed");
        assert!(!output.exists(), "partial output should be discarded");
    }

    #[tokio::test]
    async fn test_intermediate_directory_removed() {
        let dir = TempDir::new().unwrap();
        let scratch = staging_path(&dir.path().join("out.bin"), "scratch", "d");
        std::fs::create_dir_all(&scratch).unwrap();
        std::fs::write(scratch.join("out.bin"), b"bits").unwrap();

        let runner = Arc::new(DryRunRunner::new().failing("only", "killed"));
        let plan = EncodePlan::new(dir.path().join("out.bin"))
            .run(ProcessStep::new("only", "tool"))
            .cleanup(&scratch);

        assert!(plan.execute(&dry_ctx(runner)).await.is_err());
        assert!(!scratch.exists());
    }

    #[tokio::test]
    async fn test_keep_intermediates() {
        let dir = TempDir::new().unwrap();
        let staging = dir.path().join("staging.mp4");
        std::fs::write(&staging, b"intermediate").unwrap();

        let runner = Arc::new(DryRunRunner::new());
        let ctx = Context::debug().with_runner(runner);
        let plan = EncodePlan::new(dir.path().join("out.bin"))
            .run(ProcessStep::new("only", "tool"))
            .cleanup(&staging);

        plan.execute(&ctx).await.unwrap();
        assert!(staging.exists());
    }

    #[test]
    fn test_collect_moves_file() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("out.bin.tmp");
        let to = dir.path().join("final.bin");
        std::fs::write(&from, b"bits").unwrap();

        collect_artifact(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(std::fs::read(&to).unwrap(), b"bits");
    }

    #[test]
    fn test_collect_missing_source() {
        let dir = TempDir::new().unwrap();
        let err = collect_artifact(&dir.path().join("nope.bin"), &dir.path().join("x.bin"))
            .unwrap_err();
        assert!(matches!(err, PluginError::OutputNotFound(_)));
    }
}
