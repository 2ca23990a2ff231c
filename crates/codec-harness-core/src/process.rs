//! External process steps and the runners that execute them

use crate::error::ProcessFailure;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// One external process invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessStep {
    /// Stage label, reported in failures
    pub label: String,

    /// Program to execute
    pub program: OsString,

    /// Arguments, kept as OS strings so paths reach the process unchanged
    pub args: Vec<OsString>,

    /// Working directory (None = inherit)
    pub cwd: Option<PathBuf>,
}

impl ProcessStep {
    pub fn new(label: impl Into<String>, program: impl Into<OsString>) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append a path argument
    #[must_use]
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.as_os_str())
    }

    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Whether any argument equals `value`
    pub fn has_arg(&self, value: &str) -> bool {
        self.args.iter().any(|a| a == value)
    }

    fn os_arg_after(&self, flag: &str) -> Option<&OsStr> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(OsString::as_os_str)
    }

    /// The argument following the first occurrence of `flag`, if it is UTF-8
    pub fn arg_after(&self, flag: &str) -> Option<&str> {
        self.os_arg_after(flag).and_then(OsStr::to_str)
    }

    /// The path argument following the first occurrence of `flag`
    pub fn path_after(&self, flag: &str) -> Option<&Path> {
        self.os_arg_after(flag).map(Path::new)
    }

    /// Command line as shown in logs and failures. Lossy for non-UTF-8 arguments.
    pub fn command_line(&self) -> String {
        let mut line = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            line.push(' ');
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                line.push('\'');
                line.push_str(&arg);
                line.push('\'');
            } else {
                line.push_str(&arg);
            }
        }
        line
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// Exit code (None if terminated by a signal)
    pub status: Option<i32>,

    /// Whether the process exited successfully
    pub success: bool,

    pub stdout: String,

    pub stderr: String,
}

/// Executes process steps. The call returns once the process has exited.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run one step to completion
    async fn run(&self, step: &ProcessStep) -> std::io::Result<ProcessOutput>;

    /// Dry runners do not execute anything, so produced artifacts are not checked
    fn is_dry_run(&self) -> bool {
        false
    }
}

/// Run a step and turn a spawn error or non-success exit into a [`ProcessFailure`]
pub async fn run_checked(
    runner: &dyn ProcessRunner,
    step: &ProcessStep,
) -> Result<ProcessOutput, ProcessFailure> {
    debug!("Running [{}]: {}", step.label, step.command_line());

    let output = runner.run(step).await.map_err(|e| ProcessFailure {
        stage: step.label.clone(),
        command: step.command_line(),
        status: None,
        stderr: format!("Failed to execute {}: {e}", step.program.to_string_lossy()),
    })?;

    if !output.success {
        return Err(ProcessFailure {
            stage: step.label.clone(),
            command: step.command_line(),
            status: output.status,
            stderr: output.stderr,
        });
    }

    Ok(output)
}

/// Spawns real processes through `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, step: &ProcessStep) -> std::io::Result<ProcessOutput> {
        let mut cmd = tokio::process::Command::new(&step.program);
        cmd.args(&step.args);
        if let Some(dir) = &step.cwd {
            cmd.current_dir(dir);
        }

        let output = cmd.output().await?;

        Ok(ProcessOutput {
            status: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Records steps instead of executing them.
///
/// Steps whose label was registered with [`DryRunRunner::failing`] report a
/// non-success exit with the given stderr.
#[derive(Debug, Default)]
pub struct DryRunRunner {
    recorded: Mutex<Vec<ProcessStep>>,
    failures: Vec<(String, String)>,
}

impl DryRunRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every step labelled `label` fail with `stderr`
    #[must_use]
    pub fn failing(mut self, label: impl Into<String>, stderr: impl Into<String>) -> Self {
        self.failures.push((label.into(), stderr.into()));
        self
    }

    /// Steps recorded so far, in execution order
    pub fn steps(&self) -> Vec<ProcessStep> {
        self.recorded
            .lock()
            .map(|steps| steps.clone())
            .unwrap_or_default()
    }

    pub fn step_count(&self) -> usize {
        self.recorded.lock().map(|steps| steps.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ProcessRunner for DryRunRunner {
    async fn run(&self, step: &ProcessStep) -> std::io::Result<ProcessOutput> {
        if let Ok(mut steps) = self.recorded.lock() {
            steps.push(step.clone());
        }

        if let Some((_, stderr)) = self.failures.iter().find(|(label, _)| *label == step.label) {
            return Ok(ProcessOutput {
                status: Some(1),
                success: false,
                stdout: String::new(),
                stderr: stderr.clone(),
            });
        }

        Ok(ProcessOutput {
            status: Some(0),
            success: true,
            ..ProcessOutput::default()
        })
    }

    fn is_dry_run(&self) -> bool {
        true
    }
}
