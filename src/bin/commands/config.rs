use anyhow::Result;
use assetdb::{AssetDbConfig, AssetVariant, OutputFormat, PreferenceVersionStore, VersionStore};
use clap::Args;
use serde::Serialize;
use std::path::Path;

/// Arguments for the Config command
#[derive(Args)]
pub struct ConfigArgs {
    /// List bundled assets found in the assets directory
    #[clap(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Serialize)]
struct ConfigInfo {
    config_file: String,
    data_dir: String,
    assets_dir: String,
    database_dir: String,
    preferences: String,
    variant: AssetVariant,
    marker: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    assets: Option<Vec<String>>,
}

pub fn run(config: &AssetDbConfig, args: ConfigArgs, output_format: OutputFormat) -> Result<()> {
    let ConfigArgs { verbose } = args;

    let marker = PreferenceVersionStore::open(config.preferences_path())?.get()?;
    let assets = if verbose {
        Some(list_assets(Path::new(&config.assets_dir)))
    } else {
        None
    };

    let info = ConfigInfo {
        config_file: AssetDbConfig::config_file_path(),
        data_dir: config.data_dir.clone(),
        assets_dir: config.assets_dir.clone(),
        database_dir: config.database_dir(),
        preferences: config.preferences_path(),
        variant: config.variant,
        marker,
        assets,
    };

    if super::print_json(&info, output_format) {
        return Ok(());
    }

    println!("Config File:        {}", info.config_file);
    println!("{}", config.summary());
    println!("Version Marker:     {}", info.marker);
    if let Some(assets) = &info.assets {
        println!();
        if assets.is_empty() {
            println!("No bundled assets found in {}", info.assets_dir);
        } else {
            println!("Bundled assets:");
            for asset in assets {
                println!("  {}", asset);
            }
        }
    }
    Ok(())
}

fn list_assets(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .filter(|e| e.path().is_file())
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
