use std::path::PathBuf;

use anyhow::Result;
use assetdb::{
    database_builder, AssetVariant, AssetDbConfig, BuilderOptions, BundledSchema,
    OutputFormat, PreferenceVersionStore, VersionStore,
};
use clap::Args;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Arguments for the Install command
#[derive(Args)]
pub struct InstallArgs {
    /// Name of the bundled database file, e.g. "catalog.db"
    #[clap(name = "NAME")]
    pub name: String,

    /// Version of the bundled database (starts at 1)
    #[clap(short = 'v', long)]
    pub db_version: u32,

    /// Install variant: forced-upgrade (default from config) or recopy
    #[clap(long)]
    pub variant: Option<AssetVariant>,

    /// Directory to install the database into instead of the configured one
    #[clap(long)]
    pub storage_dir: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct InstallReport {
    name: String,
    path: String,
    version: u32,
    variant: AssetVariant,
    previous_marker: u32,
    marker: u32,
    installed: bool,
    migrations: usize,
    destructive_fallback: bool,
    tables: usize,
}

#[derive(Tabled)]
struct Field {
    field: &'static str,
    value: String,
}

pub fn run(config: &AssetDbConfig, args: InstallArgs, output_format: OutputFormat) -> Result<()> {
    let InstallArgs {
        name,
        db_version,
        variant,
        storage_dir,
    } = args;
    let variant = variant.unwrap_or(config.variant);

    let mut store = PreferenceVersionStore::open(config.preferences_path())?;
    let previous_marker = store.get()?;

    let options = BuilderOptions {
        storage_directory: storage_dir,
        cursor_factory: None,
        variant,
    };
    let builder = database_builder::<BundledSchema>(
        &config.context(),
        &mut store,
        &name,
        db_version,
        options,
    )?;

    let migrations = builder.migrations().len();
    let destructive_fallback = builder.is_destructive_fallback();

    let db = builder.build()?;
    let tables = db.connection().query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )? as usize;
    let path = db.path().to_string_lossy().to_string();
    db.close()?;

    let marker = store.get()?;
    let report = InstallReport {
        name,
        path,
        version: db_version,
        variant,
        previous_marker,
        marker,
        installed: marker != previous_marker,
        migrations,
        destructive_fallback,
        tables,
    };

    if !print_report(&report, output_format) {
        println!("{}", report_line(&report));
    }
    Ok(())
}

fn print_report(report: &InstallReport, output_format: OutputFormat) -> bool {
    if super::print_json(report, output_format) {
        return true;
    }

    let rows = vec![
        Field {
            field: "name",
            value: report.name.clone(),
        },
        Field {
            field: "path",
            value: report.path.clone(),
        },
        Field {
            field: "version",
            value: report.version.to_string(),
        },
        Field {
            field: "variant",
            value: report.variant.to_string(),
        },
        Field {
            field: "marker",
            value: format!("{} -> {}", report.previous_marker, report.marker),
        },
        Field {
            field: "installed",
            value: report.installed.to_string(),
        },
        Field {
            field: "migrations",
            value: report.migrations.to_string(),
        },
        Field {
            field: "destructive fallback",
            value: report.destructive_fallback.to_string(),
        },
        Field {
            field: "tables",
            value: report.tables.to_string(),
        },
    ];

    match output_format {
        OutputFormat::Table => {
            println!("{}", Table::new(rows).with(Style::rounded()));
            true
        }
        OutputFormat::Markdown => {
            println!("{}", Table::new(rows).with(Style::markdown()));
            true
        }
        _ => false,
    }
}

fn report_line(report: &InstallReport) -> String {
    format!(
        "name|path|version|variant|previous_marker|marker|installed|migrations|destructive_fallback|tables\n{}|{}|{}|{}|{}|{}|{}|{}|{}|{}",
        report.name,
        report.path,
        report.version,
        report.variant,
        report.previous_marker,
        report.marker,
        report.installed,
        report.migrations,
        report.destructive_fallback,
        report.tables
    )
}
