use std::path::PathBuf;

use anyhow::Result;
use assetdb::{
    format_size, get_database_info, AssetDbConfig, InstalledDatabaseInfo, OutputFormat,
    PreferenceVersionStore, VersionStore,
};
use clap::Args;
use tabled::settings::Style;
use tabled::Table;

/// Arguments for the Status command
#[derive(Args)]
pub struct StatusArgs {
    /// Name of the database file, e.g. "catalog.db"
    #[clap(name = "NAME")]
    pub name: String,

    /// Directory the database was installed into, if not the configured one
    #[clap(long)]
    pub storage_dir: Option<PathBuf>,
}

pub fn run(config: &AssetDbConfig, args: StatusArgs, output_format: OutputFormat) -> Result<()> {
    let StatusArgs { name, storage_dir } = args;

    let store = PreferenceVersionStore::open(config.preferences_path())?;
    let marker = store.get()?;
    let storage_dir = storage_dir.unwrap_or_else(|| PathBuf::from(config.database_dir()));

    let info = get_database_info(&name, &storage_dir, marker);

    if super::print_json(&info, output_format) {
        return Ok(());
    }

    match output_format {
        OutputFormat::Psv => print_psv(&info),
        OutputFormat::Markdown => print_summary(&info, true),
        _ => print_summary(&info, false),
    }
    Ok(())
}

fn print_summary(info: &InstalledDatabaseInfo, markdown: bool) {
    println!("Database:       {}", info.name);
    println!("Path:           {}", info.path);
    println!("Version marker: {}", info.marker);

    if !info.exists {
        println!("Installed:      no");
        return;
    }

    println!("Installed:      yes");
    if let Some(size) = info.size_bytes {
        println!("Size:           {}", format_size(size));
    }
    if let Some(modified) = &info.modified {
        println!("Modified:       {}", modified);
    }
    match info.user_version {
        Some(v) => println!("File version:   {}", v),
        None => println!("File version:   unreadable"),
    }

    if !info.tables.is_empty() {
        let mut table = Table::new(&info.tables);
        if markdown {
            table.with(Style::markdown());
        } else {
            table.with(Style::rounded());
        }
        println!();
        println!("{}", table);
    }
}

fn print_psv(info: &InstalledDatabaseInfo) {
    println!("name|path|marker|exists|size_bytes|user_version");
    println!(
        "{}|{}|{}|{}|{}|{}",
        info.name,
        info.path,
        info.marker,
        info.exists,
        info.size_bytes.map(|s| s.to_string()).unwrap_or_default(),
        info.user_version.map(|v| v.to_string()).unwrap_or_default()
    );
}
