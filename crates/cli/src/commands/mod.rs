use clap::{Subcommand, ValueEnum};
use clap_complete::Shell;
use keylens_config::CliOverrides;
use std::path::PathBuf;

pub mod ingest;
pub mod report;
pub mod stats;

use self::report::ReportCommands;

/// Output format for reports and summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Fixed-width columns
    #[default]
    Table,
    /// One JSON document
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read MONITOR output and update per-key statistics
    ///
    /// Pipe `redis-cli monitor` into this command, or point it at a saved
    /// capture with --input.
    Ingest {
        /// Capture file to read instead of stdin
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Number of aggregation workers
        #[arg(short, long)]
        workers: Option<usize>,

        /// Output format for the run summary
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Generate reports over the collected statistics
    #[command(visible_alias = "r")]
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },

    /// Show the statistics of a single key
    Stats {
        /// The cache key
        key: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Commands {
    /// Configuration values given as flags of this command
    pub fn overrides(&self) -> CliOverrides {
        match self {
            Commands::Ingest { workers, .. } => CliOverrides {
                workers: *workers,
                ..Default::default()
            },
            Commands::Report { command } => command.overrides(),
            Commands::Stats { .. } | Commands::Completion { .. } => CliOverrides::default(),
        }
    }
}
