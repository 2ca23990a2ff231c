//! Neural codecs driven through their research repositories
//!
//! Neither codec is a single command:
//! - `dcvc-rt` re-assembles the frames into a lossless staging video, runs
//!   the DCVC test script on it and collects the produced bitstream
//! - `hinerv` overfits a HiNeRV model to the frame directory; its result is
//!   the checkpoint directory
//!
//! Both scripts expect to run from their repository checkout, so every path
//! handed to them is made absolute first.

pub mod dcvc;
pub mod hinerv;

use codec_harness_core::{CodecPlugin, FactoryTable, PluginManifest};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use dcvc::{DcvcPlugin, DcvcSettings};
pub use hinerv::{HinervPlugin, HinervSettings, ModelSize, UnknownModelSize};

/// Factory kind of the DCVC-RT plugin
pub const KIND_DCVC_RT: &str = "dcvc-rt";

/// Factory kind of the HiNeRV plugin
pub const KIND_HINERV: &str = "hinerv";

/// Resolve `path` against the current directory
pub(crate) fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        std::path::absolute(path)
    }
}

/// Register the factories for this crate's plugin kinds
pub fn register_factories(table: &mut FactoryTable) {
    table.register(KIND_DCVC_RT, |manifest: &PluginManifest| {
        Ok(Arc::new(DcvcPlugin::from_manifest(manifest)?) as Arc<dyn CodecPlugin>)
    });
    table.register(KIND_HINERV, |manifest: &PluginManifest| {
        Ok(Arc::new(HinervPlugin::from_manifest(manifest)?) as Arc<dyn CodecPlugin>)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use codec_harness_core::Definition;

    #[test]
    fn test_absolute_keeps_absolute_paths() {
        assert_eq!(absolute(Path::new("/a/b")).unwrap(), PathBuf::from("/a/b"));
        assert!(absolute(Path::new("vendor/DCVC")).unwrap().is_absolute());
    }

    #[test]
    fn test_register_factories() {
        let mut table = FactoryTable::new();
        register_factories(&mut table);
        assert_eq!(table.kinds(), vec!["dcvc-rt".to_string(), "hinerv".to_string()]);

        for (name, kind) in [("dcvc-rt", KIND_DCVC_RT), ("hinerv", KIND_HINERV)] {
            let definition = Definition {
                origin: "test".to_string(),
                manifest: PluginManifest::new(name, kind),
            };
            assert_eq!(table.build(&definition).unwrap().name(), name);
        }
    }
}
