//! Shared fixtures for the end-to-end suites

#![allow(dead_code)]

use codec_harness::{build_registry, Context, Harness, Registry};
use codec_harness_core::{DryRunRunner, InputNormalizer};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};

static INIT: Once = Once::new();

/// Route harness logs through the test writer (shown with --nocapture)
pub fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// Write `count` numbered placeholder frames (frame_00001.png, ...)
pub fn write_frames(dir: &Path, count: usize) -> Vec<PathBuf> {
    std::fs::create_dir_all(dir).expect("Failed to create frame directory");
    (1..=count)
        .map(|i| {
            let path = dir.join(format!("frame_{:05}.png", i));
            std::fs::write(&path, b"\x89PNG\r\n\x1a\n").expect("Failed to write frame");
            path
        })
        .collect()
}

/// Write a placeholder input video
pub fn write_video(path: &Path) {
    std::fs::write(path, b"\x00\x00\x00\x18ftypmp42").expect("Failed to write video");
}

/// Harness over `registry` whose processes are recorded by `runner`,
/// extracting frames under `temp_root`
pub fn dry_harness(registry: Registry, runner: Arc<DryRunRunner>, temp_root: &Path) -> Harness {
    Harness::new(
        registry,
        InputNormalizer::default().with_temp_root(temp_root),
        Context::standard().with_runner(runner),
    )
}

/// Built-in codecs only
pub fn builtin_harness(runner: Arc<DryRunRunner>, temp_root: &Path) -> Harness {
    dry_harness(build_registry(None), runner, temp_root)
}

/// The repository's shipped codec definitions
pub fn shipped_codec_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("config/codecs")
}
