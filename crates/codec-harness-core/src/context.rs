//! Execution context passed to plugins

use crate::process::{ProcessRunner, SystemRunner};
use std::fmt;
use std::sync::Arc;

/// Context passed to plugins during encoding
#[derive(Clone)]
pub struct Context {
    /// Executes external process steps
    runner: Arc<dyn ProcessRunner>,

    /// Whether verbose logging is enabled
    pub verbose: bool,

    /// Keep intermediate artifacts and extracted frames instead of removing them
    pub keep_intermediates: bool,
}

impl Context {
    /// Verbose, keeps every intermediate for inspection
    pub fn debug() -> Self {
        Self {
            runner: Arc::new(SystemRunner),
            verbose: true,
            keep_intermediates: true,
        }
    }

    /// Quiet, removes intermediates
    pub fn standard() -> Self {
        Self {
            runner: Arc::new(SystemRunner),
            verbose: false,
            keep_intermediates: false,
        }
    }

    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    #[must_use]
    pub fn with_keep_intermediates(mut self, keep: bool) -> Self {
        self.keep_intermediates = keep;
        self
    }

    pub fn runner(&self) -> &dyn ProcessRunner {
        self.runner.as_ref()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("dry_run", &self.runner.is_dry_run())
            .field("verbose", &self.verbose)
            .field("keep_intermediates", &self.keep_intermediates)
            .finish()
    }
}
