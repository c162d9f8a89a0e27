use assetdb::{AssetDbConfig, OutputFormat};
use clap::{Parser, Subcommand};
use tracing::Level;

mod commands;

use commands::config::ConfigArgs;
use commands::install::InstallArgs;
use commands::status::StatusArgs;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default $HOME/.assetdb/assetdb.toml is used
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long)]
    debug: bool,

    /// Output format: table, markdown, json, json-pretty, json-line, psv
    #[clap(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a bundled asset database if its version is newer, then open it
    Install(InstallArgs),

    /// Show the version marker and the installed copy of a database
    Status(StatusArgs),

    /// Show the active configuration
    Config(ConfigArgs),
}

fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt()
            // filter spans/events with level INFO or higher.
            .with_max_level(Level::INFO)
            .init();
    }

    let config = match AssetDbConfig::new(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Install(args) => commands::install::run(&config, args, cli.format),
        Commands::Status(args) => commands::status::run(&config, args, cli.format),
        Commands::Config(args) => commands::config::run(&config, args, cli.format),
    };

    if let Err(e) = result {
        eprintln!("ERROR: {:#}", e);
        std::process::exit(1);
    }
}
