use clap::{ArgAction, Parser};
use eyre::eyre;
use keylens_config::{CliOverrides, ConfigLoader};
use std::path::PathBuf;

mod commands;
mod completion;
mod execute;
mod formatters;

use commands::Commands;

#[derive(Parser)]
#[command(name = "keylens")]
#[command(about = "Cache key statistics from a Redis MONITOR stream", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (defaults to $XDG_CONFIG_HOME/keylens/config.json)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Stat store URL: redis://host:port/db or `memory`
    #[arg(long, global = true, value_name = "URL")]
    store: Option<String>,

    /// Cache server measured by memory reports: redis://host:port/db or `memory`
    #[arg(long, global = true, value_name = "URL")]
    source: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    keylens_utils::tracing::init(keylens_utils::level_for_verbosity(cli.verbose))
        .map_err(|e| eyre!("failed to initialise logging: {e}"))?;

    // Completion needs neither configuration nor a store
    if let Commands::Completion { shell } = cli.command {
        completion::generate_completion(shell);
        return Ok(());
    }

    let overrides = CliOverrides {
        store_url: cli.store.clone(),
        source_url: cli.source.clone(),
        ..cli.command.overrides()
    };

    let mut loader = ConfigLoader::new().overrides(overrides);
    if let Some(path) = cli.config {
        loader = loader.config_file(path);
    }
    let config = loader.load()?;
    tracing::debug!(source = ?config.source, store = %config.store.url, "configuration loaded");

    cli.command.execute(config).await?;
    Ok(())
}
