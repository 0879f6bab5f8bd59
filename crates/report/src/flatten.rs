//! Fixed-depth report rows from a rolled tree

use crate::rollup::{MemoryStats, NodeStats, RolledTree};
use crate::tree::PrefixTree;
use indexmap::IndexMap;
use keylens_core::{KEY_DELIMITER, WILDCARD_SUFFIX};
use serde::Serialize;

const BYTES_PER_KB: f64 = 1024.0;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One line of a hitrate report
///
/// `None` marks a figure with no samples behind it, or traffic on a report
/// that does not track it. A tiny but sampled figure rounds to `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub label: String,
    pub leaf_count: u64,
    pub reads: u64,
    pub writes: u64,
    pub hitrate: u32,
    pub avg_size_kb: Option<f64>,
    pub avg_lifetime_secs: Option<f64>,
    pub traffic_mb: Option<f64>,
}

impl ReportRow {
    pub fn from_stats(label: impl Into<String>, stats: &NodeStats) -> Self {
        Self {
            label: label.into(),
            leaf_count: stats.leaf_count,
            reads: stats.reads,
            writes: stats.writes,
            hitrate: stats.hitrate(),
            avg_size_kb: stats.avg_size().map(|b| round2(b / BYTES_PER_KB)),
            avg_lifetime_secs: stats.avg_lifetime().map(round2),
            traffic_mb: stats.traffic_bytes.map(|b| round2(b / BYTES_PER_MB)),
        }
    }
}

/// One line of a memory report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryRow {
    pub label: String,
    pub leaf_count: u64,
    pub size_mb: f64,
    /// Share of all measured memory; `None` when nothing was measured
    pub size_percent: Option<f64>,
}

impl MemoryRow {
    pub fn from_stats(label: impl Into<String>, stats: &MemoryStats, total: &MemoryStats) -> Self {
        Self {
            label: label.into(),
            leaf_count: stats.leaf_count,
            size_mb: round2(stats.size_bytes as f64 / BYTES_PER_MB),
            size_percent: (total.size_bytes > 0)
                .then(|| round2(stats.size_bytes as f64 / total.size_bytes as f64 * 100.0)),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rows for every node exactly `depth` edges below the root
///
/// Internal nodes get a `:*` suffix; leaves keep their key. The root is never
/// reported, so a depth of zero yields nothing.
pub fn flatten(rolled: &RolledTree<NodeStats>, depth: usize) -> IndexMap<String, ReportRow> {
    rows_at_depth(rolled, depth, |label, stats| ReportRow::from_stats(label, stats))
}

/// Memory rows for every node exactly `depth` edges below the root
pub fn flatten_memory(rolled: &RolledTree<MemoryStats>, depth: usize) -> IndexMap<String, MemoryRow> {
    let total = *rolled.total();
    rows_at_depth(rolled, depth, |label, stats| {
        MemoryRow::from_stats(label, stats, &total)
    })
}

fn rows_at_depth<S, R>(
    rolled: &RolledTree<S>,
    depth: usize,
    make: impl Fn(String, &S) -> R,
) -> IndexMap<String, R> {
    let tree = rolled.tree();
    let mut rows = IndexMap::new();
    if depth == 0 {
        return rows;
    }

    let mut stack = vec![PrefixTree::ROOT];
    while let Some(id) = stack.pop() {
        let node = tree.node(id);
        if node.depth == depth {
            let label = if node.is_leaf() {
                node.label.clone()
            } else {
                format!("{}{WILDCARD_SUFFIX}", node.label)
            };
            let row = make(label.clone(), rolled.stats(id));
            rows.insert(label, row);
            continue;
        }
        stack.extend(node.children.values().rev());
    }
    rows
}

/// Keep rows whose label starts with `prefix`
pub fn filter_prefix<R>(rows: IndexMap<String, R>, prefix: &str) -> IndexMap<String, R> {
    rows.into_iter()
        .filter(|(label, _)| label.starts_with(prefix))
        .collect()
}

/// Rows ordered by ascending hitrate; ties keep their tree order
pub fn sort_by_hitrate(rows: IndexMap<String, ReportRow>) -> Vec<ReportRow> {
    let mut rows: Vec<ReportRow> = rows.into_values().collect();
    rows.sort_by_key(|row| row.hitrate);
    rows
}

/// Memory rows with the most keys first; ties keep their tree order
pub fn sort_by_leaf_count(rows: IndexMap<String, MemoryRow>) -> Vec<MemoryRow> {
    let mut rows: Vec<MemoryRow> = rows.into_values().collect();
    rows.sort_by_key(|row| std::cmp::Reverse(row.leaf_count));
    rows
}

/// Turn a requested level count and optional prefix filter into a tree depth
///
/// A level count of `n` reports nodes `n - 1` edges below the root. A prefix
/// filter overrides the level so that its children are shown: `user:*` and
/// `user:` both report `user:<id>` rows. A trailing `*` on the filter is
/// dropped.
pub fn resolve_depth(levels: usize, prefix: Option<&str>) -> (usize, Option<String>) {
    match prefix {
        Some(raw) => {
            let prefix = raw.strip_suffix('*').unwrap_or(raw).to_string();
            let segments = prefix.split(KEY_DELIMITER).count();
            (segments, Some(prefix))
        }
        None => (levels.saturating_sub(1), None),
    }
}
