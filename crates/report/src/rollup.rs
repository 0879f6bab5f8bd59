//! Bottom-up accumulation of leaf statistics
//!
//! A [`RollupStrategy`] decides what a leaf contributes and how two
//! contributions add up. The engine fetches every leaf's contribution, then
//! folds children into parents in post-order.

use crate::tree::{NodeId, PrefixTree};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use keylens_core::{Error, Result, StatRecord};
use keylens_store::{KeySizer, StatStore};
use keylens_utils::ProgressTracker;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Concurrent leaf fetches in flight
const FETCH_CONCURRENCY: usize = 32;

/// Per-leaf extraction and per-node combination
#[async_trait]
pub trait RollupStrategy: Send + Sync {
    type Stats: Clone + Default + Serialize + DeserializeOwned + Send;

    /// Name used to tell snapshots of different variants apart
    fn variant(&self) -> &'static str;

    /// What the leaf for `key` contributes
    async fn leaf(&self, store: &dyn StatStore, key: &str) -> Result<Self::Stats>;

    /// Add `child` into `total`
    fn combine(&self, total: &mut Self::Stats, child: &Self::Stats);
}

/// The stored record of `key`, zeroed when missing
///
/// A corrupt record is logged and counts as zero; an unreachable store is an
/// error.
pub async fn stored_record(store: &dyn StatStore, key: &str) -> Result<StatRecord> {
    match store.get_or_default(key).await {
        Ok(record) => Ok(record),
        Err(e @ Error::CorruptRecord { .. }) => {
            tracing::warn!(key = %key, error = %e, "skipping corrupt record");
            Ok(StatRecord::default())
        }
        Err(e) => Err(e),
    }
}

/// Rolled-up counters for one node
///
/// Size and lifetime are carried as raw totals with sample counts so that
/// any ancestor's average is the sample-weighted mean over its leaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStats {
    pub leaf_count: u64,
    pub reads: u64,
    pub writes: u64,
    pub size_total: f64,
    pub size_samples: u64,
    pub lifetime_total: f64,
    pub lifetime_samples: u64,
    /// Bytes moved in and out; `None` unless the variant tracks traffic
    pub traffic_bytes: Option<f64>,
}

impl NodeStats {
    /// A leaf's contribution with no traffic figure
    pub fn from_record(record: &StatRecord) -> Self {
        Self {
            leaf_count: 1,
            reads: record.reads,
            writes: record.writes,
            size_total: record.avg_size,
            size_samples: u64::from(record.avg_size > 0.0),
            lifetime_total: record.lifetime,
            lifetime_samples: u64::from(record.lifetime > 0.0),
            traffic_bytes: None,
        }
    }

    pub fn add(&mut self, other: &NodeStats) {
        self.leaf_count += other.leaf_count;
        self.reads += other.reads;
        self.writes += other.writes;
        self.size_total += other.size_total;
        self.size_samples += other.size_samples;
        self.lifetime_total += other.lifetime_total;
        self.lifetime_samples += other.lifetime_samples;
        self.traffic_bytes = match (self.traffic_bytes, other.traffic_bytes) {
            (Some(a), Some(b)) => Some(a + b),
            (a, b) => a.or(b),
        };
    }

    /// Mean size in bytes across sampled leaves
    pub fn avg_size(&self) -> Option<f64> {
        (self.size_samples > 0).then(|| self.size_total / self.size_samples as f64)
    }

    /// Mean lifetime in seconds across sampled leaves
    pub fn avg_lifetime(&self) -> Option<f64> {
        (self.lifetime_samples > 0).then(|| self.lifetime_total / self.lifetime_samples as f64)
    }

    pub fn hitrate(&self) -> u32 {
        keylens_core::hitrate(self.reads, self.writes)
    }
}

/// Counts, size and lifetime
#[derive(Debug, Clone, Copy, Default)]
pub struct HitrateRollup;

#[async_trait]
impl RollupStrategy for HitrateRollup {
    type Stats = NodeStats;

    fn variant(&self) -> &'static str {
        "hitrate"
    }

    async fn leaf(&self, store: &dyn StatStore, key: &str) -> Result<NodeStats> {
        Ok(NodeStats::from_record(&stored_record(store, key).await?))
    }

    fn combine(&self, total: &mut NodeStats, child: &NodeStats) {
        total.add(child);
    }
}

/// Everything `HitrateRollup` tracks plus estimated network traffic
#[derive(Debug, Clone, Copy, Default)]
pub struct TrafficRollup;

#[async_trait]
impl RollupStrategy for TrafficRollup {
    type Stats = NodeStats;

    fn variant(&self) -> &'static str {
        "traffic"
    }

    async fn leaf(&self, store: &dyn StatStore, key: &str) -> Result<NodeStats> {
        let record = stored_record(store, key).await?;
        Ok(NodeStats {
            traffic_bytes: Some((record.reads + record.writes) as f64 * record.avg_size),
            ..NodeStats::from_record(&record)
        })
    }

    fn combine(&self, total: &mut NodeStats, child: &NodeStats) {
        total.add(child);
    }
}

/// Key count and memory footprint of a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub leaf_count: u64,
    pub size_bytes: u64,
}

/// Memory held by each key on the analysed cache server
///
/// Sizes come from the [`KeySizer`], not from the stat store. A key that has
/// since disappeared from the server counts with zero bytes.
#[derive(Clone)]
pub struct MemoryRollup {
    sizer: Arc<dyn KeySizer>,
}

impl MemoryRollup {
    pub fn new(sizer: Arc<dyn KeySizer>) -> Self {
        Self { sizer }
    }
}

#[async_trait]
impl RollupStrategy for MemoryRollup {
    type Stats = MemoryStats;

    fn variant(&self) -> &'static str {
        "memory"
    }

    async fn leaf(&self, _store: &dyn StatStore, key: &str) -> Result<MemoryStats> {
        Ok(MemoryStats {
            leaf_count: 1,
            size_bytes: self.sizer.size_of(key).await?.unwrap_or(0),
        })
    }

    fn combine(&self, total: &mut MemoryStats, child: &MemoryStats) {
        total.leaf_count += child.leaf_count;
        total.size_bytes += child.size_bytes;
    }
}

/// A prefix tree together with the rolled-up stats of every node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolledTree<S> {
    tree: PrefixTree,
    stats: Vec<S>,
}

impl<S> RolledTree<S> {
    pub fn tree(&self) -> &PrefixTree {
        &self.tree
    }

    pub fn stats(&self, id: NodeId) -> &S {
        &self.stats[id]
    }

    /// Stats of the root, i.e. of the whole key space
    pub fn total(&self) -> &S {
        &self.stats[PrefixTree::ROOT]
    }
}

/// Roll leaf contributions up through `tree`
pub async fn rollup<R>(
    tree: PrefixTree,
    store: &dyn StatStore,
    strategy: &R,
) -> Result<RolledTree<R::Stats>>
where
    R: RollupStrategy,
{
    let leaves = tree.leaves();
    let progress = ProgressTracker::new("rollup", leaves.len());

    let fetched: Vec<(NodeId, R::Stats)> = stream::iter(leaves.iter().copied())
        .map(|id| {
            let label = &tree.node(id).label;
            async move { Ok::<_, Error>((id, strategy.leaf(store, label).await?)) }
        })
        .buffered(FETCH_CONCURRENCY)
        .enumerate()
        .map(|(done, item)| {
            progress.tick(done + 1);
            item
        })
        .try_collect()
        .await?;

    let mut stats = vec![R::Stats::default(); tree.len()];
    for (id, leaf) in fetched {
        stats[id] = leaf;
    }

    for id in tree.post_order() {
        let node = tree.node(id);
        if node.is_leaf() {
            continue;
        }
        let mut total = R::Stats::default();
        for &child in node.children.values() {
            strategy.combine(&mut total, &stats[child]);
        }
        stats[id] = total;
    }

    tracing::debug!(
        nodes = %tree.len(),
        leaves = %leaves.len(),
        variant = %strategy.variant(),
        "rollup finished"
    );
    Ok(RolledTree { tree, stats })
}
