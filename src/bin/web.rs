#![cfg(not(tarpaulin_include))]

use clap::Parser;
use inventory::app;
use inventory::config::{BackendKind, Config};
use log::{info, warn};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG: &str = "inventory.toml";

/// Inventory form backed by a Google Sheets document
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// TOML configuration file (defaults to ./inventory.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:3000
    #[arg(short, long)]
    bind: Option<String>,

    /// Keep rows in memory instead of talking to Google Sheets
    #[arg(long)]
    offline: bool,
}

/// Main entry point for the web application
///
/// Configuration is layered: file, then `INVENTORY_*` environment
/// variables, then command line flags.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => Config::from_file(DEFAULT_CONFIG)?,
        None => Config::default(),
    };
    config.apply_env();
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if args.offline {
        config.backend = BackendKind::Memory;
    }
    config.validate()?;

    if config.backend == BackendKind::Memory {
        warn!("running with in-memory sheets; nothing will be persisted");
    }
    info!(
        "Starting inventory server (items sheet '{}', prefix '{}')",
        config.items_sheet, config.id_prefix
    );

    app::run(config).await
}
