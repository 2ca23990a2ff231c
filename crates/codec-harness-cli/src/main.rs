//! Codec Harness CLI - encode frame sequences with interchangeable codecs
//!
//! Command-line interface for the plugin-based codec harness.

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;

use commands::encode::EncodeCommand;
use commands::plugins::PluginsCommand;

#[derive(Parser)]
#[command(
    name = "codec-harness",
    version,
    about = "Modular video codec harness",
    long_about = "Encode a video file or a directory of frames with any registered codec.\n\
                  Classical codecs run through ffmpeg; neural codecs run their research\n\
                  repositories as external multi-stage pipelines.",
    after_help = "EXAMPLES:\n  \
                  # List all available codecs\n  \
                  codec-harness plugins\n\n  \
                  # Encode a video with H.264\n  \
                  codec-harness encode -i input.mp4 -o out.mp4 -c libx264 --codec-options crf=18,preset=slow\n\n  \
                  # Encode a frame directory with AV1, plain MP4\n  \
                  codec-harness encode -i frames/ -o out.mp4 -c libsvtav1 --codec-options fragmented_mp4=false\n\n  \
                  # Show the commands a neural codec would run\n  \
                  codec-harness encode -i input.mp4 -o out.bin -c dcvc-rt --dry-run\n\n\
                  For more details on a specific command:\n  \
                  codec-harness <COMMAND> --help"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a video file or frame directory
    Encode(EncodeCommand),

    /// List available codecs
    Plugins(PluginsCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging (suppress for plugins command to reduce noise)
    let log_level = match &cli.command {
        Commands::Plugins(_) => Level::WARN,
        _ => {
            if cli.verbose {
                Level::DEBUG
            } else {
                Level::INFO
            }
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    match cli.command {
        Commands::Encode(cmd) => cmd.execute(cli.verbose).await,
        Commands::Plugins(cmd) => cmd.execute().await,
    }
}
