use super::OutputFormat;
use crate::formatters;
use clap::Subcommand;
use keylens_config::{CliOverrides, Config};
use keylens_core::{Error, Result};
use keylens_report::{
    ClusterParams, ClusterReportRequest, ReportContext, SnapshotCache, TreeReportRequest,
};

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Hitrate, size and lifetime rolled up by key prefix, or memory with `--memory`
    Tree {
        /// Snapshot name, e.g. the client the data belongs to
        #[arg(short, long, default_value = "default")]
        name: String,

        /// How many levels deep the report renders
        #[arg(short, long)]
        level: Option<usize>,

        /// Only show rows under this prefix, e.g. `user:*`
        #[arg(short, long)]
        prefix: Option<String>,

        /// Discard the cached snapshot and rebuild the tree
        #[arg(long)]
        regenerate: bool,

        /// Add estimated network traffic per row
        #[arg(long, conflicts_with = "memory")]
        traffic: bool,

        /// Report memory held on the source server instead of hitrates
        #[arg(long)]
        memory: bool,

        /// Print the whole tree instead of one level of rows
        #[arg(long)]
        dump: bool,

        /// Refuse to report on more keys than this
        #[arg(long)]
        max_keys: Option<usize>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Hitrate of groups of similar keys
    Cluster {
        /// Maximum edit distance as a fraction of the shorter key (0 to 1)
        ///
        /// Values near 0 make many tight groups; values near 1 make fewer,
        /// looser groups.
        #[arg(short, long)]
        similarity: Option<f64>,

        /// Minimum shared prefix: more than (1 - guard) of the shorter key.
        /// Defaults to the similarity.
        #[arg(long)]
        prefix_guard: Option<f64>,

        /// Only show the group summaries
        #[arg(long)]
        prefix_only: bool,

        /// Refuse to report on more keys than this
        #[arg(long)]
        max_keys: Option<usize>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

impl ReportCommands {
    pub fn overrides(&self) -> CliOverrides {
        match self {
            ReportCommands::Tree {
                level, max_keys, ..
            } => CliOverrides {
                levels: *level,
                max_keys: *max_keys,
                ..Default::default()
            },
            ReportCommands::Cluster {
                similarity,
                prefix_guard,
                max_keys,
                ..
            } => CliOverrides {
                similarity: *similarity,
                prefix_guard: *prefix_guard,
                max_keys: *max_keys,
                ..Default::default()
            },
        }
    }

    pub async fn execute(self, config: &Config) -> Result<()> {
        let store = keylens_store::open(&config.store.url).await?;
        let context = ReportContext::new(store).with_max_keys(config.report.max_keys);

        match self {
            ReportCommands::Tree {
                name,
                prefix,
                regenerate,
                traffic,
                memory,
                dump,
                format,
                ..
            } => {
                let context =
                    context.with_snapshots(SnapshotCache::new(config.report.effective_snapshot_dir()));
                let request = TreeReportRequest {
                    name,
                    levels: config.report.levels,
                    prefix,
                    traffic,
                    regenerate,
                };

                if memory && !dump {
                    let source = config.store.source_url.as_deref().ok_or_else(|| {
                        Error::configuration(
                            "memory reports need the cache server: pass --source or set KEYLENS_SOURCE_URL",
                        )
                    })?;
                    let sizer = keylens_store::open_sizer(source).await?;
                    let rows = context.memory_report(&request, sizer).await?;
                    return formatters::print_memory_rows(&rows, format);
                }

                if dump {
                    let rolled = context.tree_for(&request).await?;
                    print!("{}", rolled.tree().print_tree());
                    return Ok(());
                }

                let rows = context.tree_report(&request).await?;
                formatters::print_rows(&rows, traffic, format)
            }
            ReportCommands::Cluster {
                prefix_only,
                format,
                ..
            } => {
                let params = ClusterParams::new(
                    config.report.similarity,
                    config.report.effective_prefix_guard(),
                )?;
                let reports = context
                    .cluster_report(&ClusterReportRequest { params })
                    .await?;
                formatters::print_groups(&reports, prefix_only, format)
            }
        }
    }
}
