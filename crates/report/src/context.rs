//! Per-run report context
//!
//! A `ReportContext` owns the handles one report run needs (the stat store,
//! the optional snapshot cache, the key-count limit) and is dropped when the
//! run ends. Nothing here is process-wide.

use crate::cluster::{cluster, group_reports, ClusterGroup, ClusterParams, GroupReport};
use crate::flatten::{
    filter_prefix, flatten, flatten_memory, resolve_depth, sort_by_hitrate, sort_by_leaf_count,
    MemoryRow, ReportRow,
};
use crate::rollup::{
    rollup, stored_record, HitrateRollup, MemoryRollup, NodeStats, RolledTree, RollupStrategy,
    TrafficRollup,
};
use crate::snapshot::SnapshotCache;
use crate::tree::PrefixTree;
use keylens_core::{Error, Result, StatRecord};
use keylens_store::{KeySizer, StatStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Parameters of a prefix-tree report
#[derive(Debug, Clone, PartialEq)]
pub struct TreeReportRequest {
    /// Snapshot name, usually the client or environment being reported on
    pub name: String,
    /// Levels to render; a level count of `n` reports depth `n - 1`
    pub levels: usize,
    /// Only rows starting with this prefix; overrides `levels`
    pub prefix: Option<String>,
    /// Include estimated network traffic; ignored by memory reports
    pub traffic: bool,
    /// Discard any cached snapshot first
    pub regenerate: bool,
}

/// Parameters of a similarity report
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterReportRequest {
    pub params: ClusterParams,
}

/// Handles for one report run
pub struct ReportContext {
    store: Arc<dyn StatStore>,
    snapshots: Option<SnapshotCache>,
    max_keys: Option<usize>,
}

impl ReportContext {
    pub fn new(store: Arc<dyn StatStore>) -> Self {
        Self {
            store,
            snapshots: None,
            max_keys: None,
        }
    }

    /// Cache rolled trees in `cache`
    pub fn with_snapshots(mut self, cache: SnapshotCache) -> Self {
        self.snapshots = Some(cache);
        self
    }

    /// Refuse key spaces larger than `max_keys`
    pub fn with_max_keys(mut self, max_keys: Option<usize>) -> Self {
        self.max_keys = max_keys;
        self
    }

    pub fn store(&self) -> &Arc<dyn StatStore> {
        &self.store
    }

    /// Every stored key in sorted order, subject to the key limit
    pub async fn keys(&self) -> Result<Vec<String>> {
        let mut keys = self.store.keys().await?;
        if let Some(limit) = self.max_keys {
            if keys.len() > limit {
                return Err(Error::configuration(format!(
                    "key space of {} keys exceeds the limit of {limit}; raise max_keys to report on it",
                    keys.len()
                )));
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// The rolled tree for `name`, from the snapshot cache when possible
    pub async fn rolled_tree<R>(
        &self,
        name: &str,
        strategy: &R,
        regenerate: bool,
    ) -> Result<RolledTree<R::Stats>>
    where
        R: RollupStrategy,
    {
        let variant = strategy.variant();

        if let Some(cache) = &self.snapshots {
            if regenerate {
                cache.invalidate(name, variant)?;
            } else if let Some(rolled) = cache.load(name, variant)? {
                return Ok(rolled);
            }
        }

        let started = Instant::now();
        let keys = self.keys().await?;
        let tree = PrefixTree::build(&keys);
        let rolled = rollup(tree, self.store.as_ref(), strategy).await?;
        tracing::info!(
            keys = %keys.len(),
            nodes = %rolled.tree().len(),
            elapsed = %keylens_utils::format_duration(started.elapsed()),
            "report tree built"
        );

        if let Some(cache) = &self.snapshots {
            cache.save(name, variant, &rolled)?;
        }
        Ok(rolled)
    }

    /// Rolled tree for a tree report request
    pub async fn tree_for(&self, request: &TreeReportRequest) -> Result<RolledTree<NodeStats>> {
        if request.traffic {
            self.rolled_tree(&request.name, &TrafficRollup, request.regenerate)
                .await
        } else {
            self.rolled_tree(&request.name, &HitrateRollup, request.regenerate)
                .await
        }
    }

    /// Hitrate rows at the requested depth, lowest hitrate first
    pub async fn tree_report(&self, request: &TreeReportRequest) -> Result<Vec<ReportRow>> {
        let variant = if request.traffic { "traffic" } else { "hitrate" };
        let span = keylens_utils::report_span(&request.name, variant);

        async {
            let rolled = self.tree_for(request).await?;
            let (depth, prefix) = resolve_depth(request.levels, request.prefix.as_deref());

            let mut rows = flatten(&rolled, depth);
            if let Some(prefix) = &prefix {
                rows = filter_prefix(rows, prefix);
            }
            tracing::debug!(depth = %depth, rows = %rows.len(), "report flattened");
            Ok::<_, Error>(sort_by_hitrate(rows))
        }
        .instrument(span)
        .await
    }

    /// Memory rows at the requested depth, most keys first
    ///
    /// The key space comes from the stat store, sizes from `sizer`. The rolled
    /// tree is cached under its own snapshot variant.
    pub async fn memory_report(
        &self,
        request: &TreeReportRequest,
        sizer: Arc<dyn KeySizer>,
    ) -> Result<Vec<MemoryRow>> {
        let strategy = MemoryRollup::new(sizer);
        let span = keylens_utils::report_span(&request.name, strategy.variant());

        async {
            let rolled = self
                .rolled_tree(&request.name, &strategy, request.regenerate)
                .await?;
            let (depth, prefix) = resolve_depth(request.levels, request.prefix.as_deref());

            let mut rows = flatten_memory(&rolled, depth);
            if let Some(prefix) = &prefix {
                rows = filter_prefix(rows, prefix);
            }
            tracing::debug!(depth = %depth, rows = %rows.len(), "memory report flattened");
            Ok::<_, Error>(sort_by_leaf_count(rows))
        }
        .instrument(span)
        .await
    }

    /// Similarity groups over the whole key space
    pub async fn clusters(&self, params: &ClusterParams) -> Result<Vec<ClusterGroup>> {
        let keys = self.keys().await?;
        Ok(cluster(&keys, params))
    }

    /// Similarity groups with aggregate rows, lowest hitrate first
    pub async fn cluster_report(&self, request: &ClusterReportRequest) -> Result<Vec<GroupReport>> {
        let span = keylens_utils::report_span("cluster", "similarity");

        async {
            let groups = self.clusters(&request.params).await?;
            let mut records = HashMap::new();
            for key in groups.iter().flat_map(|group| &group.members) {
                let record = stored_record(self.store.as_ref(), key).await?;
                records.insert(key.clone(), record);
            }
            Ok::<_, Error>(group_reports(&groups, &records))
        }
        .instrument(span)
        .await
    }

    /// The stored record of a single key
    pub async fn key_stats(&self, key: &str) -> Result<Option<StatRecord>> {
        self.store.get(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keylens_store::{MemoryKeySizer, MemoryStatStore};
    use tempfile::TempDir;

    fn record(reads: u64, writes: u64) -> StatRecord {
        StatRecord {
            reads,
            writes,
            ..Default::default()
        }
    }

    fn store() -> Arc<MemoryStatStore> {
        Arc::new(MemoryStatStore::from_records([
            ("user:1:profile", record(9, 1)),
            ("user:2:profile", record(1, 1)),
            ("session:abc", record(0, 4)),
        ]))
    }

    fn request(levels: usize) -> TreeReportRequest {
        TreeReportRequest {
            name: "test".to_string(),
            levels,
            prefix: None,
            traffic: false,
            regenerate: false,
        }
    }

    #[tokio::test]
    async fn test_tree_report_levels() {
        let context = ReportContext::new(store());
        let rows = context.tree_report(&request(2)).await.unwrap();
        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        // session:* has hitrate 0, user:* 83
        assert_eq!(labels, vec!["session:*", "user:*"]);
        assert_eq!(rows[1].reads, 10);
        assert_eq!(rows[1].leaf_count, 2);
    }

    #[tokio::test]
    async fn test_tree_report_prefix_overrides_levels() {
        let context = ReportContext::new(store());
        let rows = context
            .tree_report(&TreeReportRequest {
                prefix: Some("user:*".to_string()),
                ..request(1)
            })
            .await
            .unwrap();
        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["user:2:*", "user:1:*"]);
    }

    #[tokio::test]
    async fn test_max_keys_guard() {
        let context = ReportContext::new(store()).with_max_keys(Some(2));
        assert!(matches!(
            context.tree_report(&request(2)).await,
            Err(Error::Configuration { .. })
        ));
        assert!(ReportContext::new(store())
            .with_max_keys(Some(3))
            .keys()
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_snapshot_is_reused_until_regenerated() {
        let temp = TempDir::new().unwrap();
        let backing = store();
        let context = ReportContext::new(backing.clone())
            .with_snapshots(SnapshotCache::new(temp.path()));

        let first = context.tree_report(&request(2)).await.unwrap();

        // New data is invisible while the snapshot stands
        backing.put("cart:1", &record(5, 0)).await.unwrap();
        let cached = context.tree_report(&request(2)).await.unwrap();
        assert_eq!(cached, first);

        let fresh = context
            .tree_report(&TreeReportRequest {
                regenerate: true,
                ..request(2)
            })
            .await
            .unwrap();
        assert_eq!(fresh.len(), 3);
    }

    #[tokio::test]
    async fn test_cluster_report() {
        let context = ReportContext::new(store());
        let reports = context
            .cluster_report(&ClusterReportRequest {
                params: ClusterParams::new(0.2, 0.7).unwrap(),
            })
            .await
            .unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].summary.label, "session:abc*");
        assert_eq!(reports[1].summary.label, "user:*");
        assert_eq!(reports[1].summary.leaf_count, 2);
        assert_eq!(reports[1].members.len(), 2);
    }

    #[tokio::test]
    async fn test_memory_report() {
        let sizer: Arc<dyn KeySizer> = Arc::new(MemoryKeySizer::from_sizes([
            ("user:1:profile", 512 * 1024),
            ("user:2:profile", 512 * 1024),
            ("session:abc", 3 * 512 * 1024),
        ]));
        let context = ReportContext::new(store());
        let rows = context.memory_report(&request(2), sizer).await.unwrap();

        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["user:*", "session:*"]);
        assert_eq!(rows[0].leaf_count, 2);
        assert_eq!(rows[0].size_mb, 1.0);
        assert_eq!(rows[0].size_percent, Some(40.0));
        assert_eq!(rows[1].size_mb, 1.5);
        assert_eq!(rows[1].size_percent, Some(60.0));
    }

    #[tokio::test]
    async fn test_memory_snapshot_is_kept_apart_from_hitrate() {
        let temp = TempDir::new().unwrap();
        let context =
            ReportContext::new(store()).with_snapshots(SnapshotCache::new(temp.path()));
        let sizer: Arc<dyn KeySizer> = Arc::new(MemoryKeySizer::new());

        context.tree_report(&request(2)).await.unwrap();
        let rows = context.memory_report(&request(2), sizer).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.size_percent.is_none()));
        assert!(temp.path().join("test.memory.bin").exists());
        assert!(temp.path().join("test.hitrate.bin").exists());
    }

    #[tokio::test]
    async fn test_key_stats() {
        let context = ReportContext::new(store());
        assert_eq!(
            context.key_stats("session:abc").await.unwrap(),
            Some(record(0, 4))
        );
        assert_eq!(context.key_stats("nope").await.unwrap(), None);
    }
}
