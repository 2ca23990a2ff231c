//! Encode command: normalize the input, resolve the codec, run the encode

use anyhow::{Context as _, Result};
use clap::Args;
use codec_harness_cli::{build_registry, parse_codec_options};
use codec_harness_core::{Context, DryRunRunner, Harness, HarnessConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Args)]
pub struct EncodeCommand {
    /// Input video file or directory of frames
    #[arg(short, long)]
    input: PathBuf,

    /// Path for the encoded output
    #[arg(short, long)]
    output: PathBuf,

    /// Codec to encode with (see `codec-harness plugins`)
    #[arg(short, long)]
    codec: String,

    /// Comma-separated key=value codec options (e.g. "crf=18,preset=slow")
    #[arg(long, default_value = "")]
    codec_options: String,

    /// Directory of YAML codec definitions, loaded after the built-ins
    #[arg(long, value_name = "DIR")]
    plugin_dir: Option<PathBuf>,

    /// Harness configuration file (YAML); defaults come from CODEC_HARNESS_* variables
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the commands instead of running them
    #[arg(long, default_value = "false")]
    dry_run: bool,

    /// Keep extracted frames and intermediate files
    #[arg(long, default_value = "false")]
    keep_frames: bool,
}

impl EncodeCommand {
    pub async fn execute(self, verbose: bool) -> Result<()> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::from_yaml(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => HarnessConfig::from_env(),
        };
        if self.plugin_dir.is_some() {
            config.plugin_dir = self.plugin_dir.clone();
        }
        config.keep_frames |= self.keep_frames;
        debug!("Harness config: {:?}", config);

        let options =
            parse_codec_options(&self.codec_options).context("Invalid --codec-options")?;

        let registry = build_registry(config.plugin_dir.as_deref());

        let mut ctx = Context::standard().with_verbose(verbose);
        let dry_runner = self.dry_run.then(|| Arc::new(DryRunRunner::new()));
        if let Some(runner) = &dry_runner {
            ctx = ctx.with_runner(runner.clone());
        }

        let harness = Harness::from_config(registry, &config, ctx);
        let outcome = harness
            .encode(&self.input, &self.output, &self.codec, &options)
            .await
            .with_context(|| format!("Encoding {} failed", self.input.display()))?;

        if let Some(runner) = dry_runner {
            println!("Dry run, {} commands:", runner.step_count());
            for step in runner.steps() {
                println!("  [{}] {}", step.label, step.command_line());
            }
            return Ok(());
        }

        println!(
            "✓ Encoded with {} in {:.3}s: {}",
            outcome.codec,
            outcome.duration.as_secs_f64(),
            outcome.artifact.display()
        );

        Ok(())
    }
}
