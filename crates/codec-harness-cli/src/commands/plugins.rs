//! Plugins listing command

use anyhow::{Context as _, Result};
use clap::Args;
use codec_harness_cli::build_registry;
use codec_harness_core::{CodecOptions, HarnessConfig};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args)]
pub struct PluginsCommand {
    /// Directory of YAML codec definitions, loaded after the built-ins
    #[arg(long, value_name = "DIR")]
    plugin_dir: Option<PathBuf>,

    /// Print the listing as JSON
    #[arg(long, default_value = "false")]
    json: bool,
}

#[derive(Serialize)]
struct PluginInfo<'a> {
    name: &'a str,
    description: &'a str,
    origin: &'a str,
    defaults: CodecOptions,
}

impl PluginsCommand {
    pub async fn execute(self) -> Result<()> {
        let plugin_dir = self
            .plugin_dir
            .or_else(|| HarnessConfig::from_env().plugin_dir);
        let registry = build_registry(plugin_dir.as_deref());

        let mut infos = Vec::with_capacity(registry.len());
        for name in registry.list() {
            let plugin = registry.resolve(&name)?;
            infos.push((name, plugin));
        }

        if self.json {
            let listing: Vec<PluginInfo> = infos
                .iter()
                .map(|(name, plugin)| PluginInfo {
                    name,
                    description: plugin.description(),
                    origin: registry.origin(name).unwrap_or_default(),
                    defaults: plugin.default_options(),
                })
                .collect();
            let json = serde_json::to_string_pretty(&listing)
                .context("Failed to serialize plugin listing")?;
            println!("{}", json);
            return Ok(());
        }

        println!("Available codecs:");
        for (name, plugin) in &infos {
            println!("\n{}", name);
            if !plugin.description().is_empty() {
                println!("  Description: {}", plugin.description());
            }
            if let Some(origin) = registry.origin(name) {
                println!("  Source: {}", origin);
            }
            println!("  Defaults: {}", plugin.default_options());
        }

        for failure in registry.failures() {
            eprintln!("\nSkipped: {}", failure);
        }

        Ok(())
    }
}
