//! The `Config` struct and its sections
//!
//! A `Config` is immutable once loaded and cheap to clone, so it can be handed
//! to the ingest workers and the report context alike.

use keylens_core::{Error, Result, DEFAULT_REPORT_LEVELS, DEFAULT_SIMILARITY, DEFAULT_STORE_URL};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete keylens configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where per-key statistics are kept
    pub store: StoreSettings,
    /// Log ingestion settings
    pub ingest: IngestSettings,
    /// Report defaults
    pub report: ReportSettings,
    /// Highest-precedence source that contributed to this configuration
    #[serde(skip)]
    pub source: ConfigSource,
}

/// Stat store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// `redis://...` URL, or `memory` for a process-local store
    pub url: String,
    /// The cache server under analysis, asked for key sizes by memory reports
    pub source_url: Option<String>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_STORE_URL.to_string(),
            source_url: None,
        }
    }
}

/// Ingest pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Number of aggregation workers; records are sharded by key
    pub workers: usize,
    /// Bounded queue length in front of each worker
    pub channel_capacity: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            channel_capacity: 1024,
        }
    }
}

/// Report settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// How many levels deep the tree report renders
    pub levels: usize,
    /// Maximum edit distance as a fraction of the shorter key
    pub similarity: f64,
    /// Prefix overlap guard; falls back to `similarity` when unset
    pub prefix_guard: Option<f64>,
    /// Refuse to build reports over more keys than this
    pub max_keys: Option<usize>,
    /// Where rolled-up snapshots are cached
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            levels: DEFAULT_REPORT_LEVELS,
            similarity: DEFAULT_SIMILARITY,
            prefix_guard: None,
            max_keys: None,
            snapshot_dir: None,
        }
    }
}

impl ReportSettings {
    /// The prefix guard actually used for clustering
    ///
    /// Unset means "same as similarity"; a similarity of zero is not a usable
    /// guard, so the default applies there.
    pub fn effective_prefix_guard(&self) -> f64 {
        match self.prefix_guard {
            Some(guard) => guard,
            None if self.similarity > 0.0 => self.similarity,
            None => DEFAULT_SIMILARITY,
        }
    }

    /// The snapshot directory, defaulting to the XDG data directory
    pub fn effective_snapshot_dir(&self) -> PathBuf {
        self.snapshot_dir
            .clone()
            .unwrap_or_else(keylens_utils::XdgPaths::snapshot_dir)
    }
}

/// Source of configuration for debugging and precedence tracking
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default configuration
    #[default]
    Default,
    /// Configuration file
    ConfigFile(PathBuf),
    /// Environment variable
    EnvironmentVariable(String),
    /// Command line argument
    CommandLine,
}

impl Config {
    /// Check value ranges; called by the loader after every layer is applied
    pub fn validate(&self) -> Result<()> {
        if self.store.url.trim().is_empty() {
            return Err(Error::configuration("store url must not be empty"));
        }
        if self
            .store
            .source_url
            .as_ref()
            .is_some_and(|url| url.trim().is_empty())
        {
            return Err(Error::configuration("store.source_url must not be empty"));
        }
        if self.ingest.workers == 0 {
            return Err(Error::configuration("ingest.workers must be at least 1"));
        }
        if self.ingest.channel_capacity == 0 {
            return Err(Error::configuration(
                "ingest.channel_capacity must be at least 1",
            ));
        }
        if self.report.levels == 0 {
            return Err(Error::configuration("report.levels must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.report.similarity) {
            return Err(Error::configuration(format!(
                "report.similarity must be within [0, 1], got {}",
                self.report.similarity
            )));
        }
        let guard = self.report.effective_prefix_guard();
        if !(guard > 0.0 && guard <= 1.0) {
            return Err(Error::configuration(format!(
                "report.prefix_guard must be within (0, 1], got {guard}"
            )));
        }
        if self.report.max_keys == Some(0) {
            return Err(Error::configuration("report.max_keys must be at least 1"));
        }
        Ok(())
    }
}
