//! Grouping of lexically similar keys
//!
//! Keys are compared pairwise by edit distance, with a guard on the length of
//! their common prefix so that keys which only share a long tail (a path
//! embedded in two different URL-like prefixes, say) stay apart. The pass is
//! greedy: the first unassigned key claims every later unassigned key close
//! enough to it. Another input order can legally produce another grouping.

use crate::flatten::ReportRow;
use crate::rollup::NodeStats;
use keylens_core::{Error, Result, StatRecord};
use keylens_utils::ProgressTracker;
use serde::Serialize;
use std::collections::HashMap;

/// Thresholds for [`cluster`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterParams {
    /// Largest accepted edit distance as a fraction of the shorter key
    pub max_edit_ratio: f64,
    /// Required common prefix: more than `1 - prefix_guard` of the shorter key
    pub prefix_guard: f64,
}

impl ClusterParams {
    pub fn new(max_edit_ratio: f64, prefix_guard: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&max_edit_ratio) {
            return Err(Error::configuration(format!(
                "similarity must be between 0 and 1, got {max_edit_ratio}"
            )));
        }
        if !(prefix_guard > 0.0 && prefix_guard <= 1.0) {
            return Err(Error::configuration(format!(
                "prefix guard must be in (0, 1], got {prefix_guard}"
            )));
        }
        Ok(Self {
            max_edit_ratio,
            prefix_guard,
        })
    }

    /// Whether `a` and `b` belong in the same group
    pub fn accepts(&self, a: &str, b: &str) -> bool {
        let distance = levenshtein(a, b);
        let shorter = a.chars().count().min(b.chars().count());
        if shorter == 0 {
            return distance == 0;
        }
        let shorter = shorter as f64;
        distance as f64 <= shorter * self.max_edit_ratio
            && common_prefix_len(a, b) as f64 / shorter > 1.0 - self.prefix_guard
    }
}

/// A set of similar keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterGroup {
    /// Common prefix of the group's first two members, or the key itself
    pub label: String,
    /// The keys the anchor claimed in input order, then the anchor itself
    pub members: Vec<String>,
}

/// Character-level edit distance
pub fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != *cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// Length in characters of the longest common prefix
pub fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let end = a
        .char_indices()
        .zip(b.chars())
        .find(|((_, x), y)| x != y)
        .map(|((i, _), _)| i)
        .unwrap_or_else(|| a.len().min(b.len()));
    &a[..end]
}

/// Partition `keys` into similarity groups, in a single greedy pass
pub fn cluster(keys: &[String], params: &ClusterParams) -> Vec<ClusterGroup> {
    let mut processed = vec![false; keys.len()];
    let mut groups = Vec::new();
    let progress = ProgressTracker::new("cluster", keys.len());

    for i in 0..keys.len() {
        if processed[i] {
            continue;
        }
        processed[i] = true;
        let anchor = &keys[i];
        let mut members = Vec::new();
        let mut label: Option<String> = None;

        for j in (i + 1)..keys.len() {
            if processed[j] || !params.accepts(anchor, &keys[j]) {
                continue;
            }
            processed[j] = true;
            if label.is_none() {
                label = Some(common_prefix(anchor, &keys[j]).to_string());
            }
            members.push(keys[j].clone());
        }
        members.push(anchor.clone());

        groups.push(ClusterGroup {
            label: label.unwrap_or_else(|| anchor.clone()),
            members,
        });
        progress.tick(i + 1);
    }

    tracing::debug!(keys = %keys.len(), groups = %groups.len(), "clustering finished");
    groups
}

/// Aggregate and per-member rows of one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupReport {
    pub summary: ReportRow,
    pub members: Vec<ReportRow>,
}

/// Build per-group rows from member records, ordered by ascending hitrate
///
/// Members without a record count as zeroed keys.
pub fn group_reports(
    groups: &[ClusterGroup],
    records: &HashMap<String, StatRecord>,
) -> Vec<GroupReport> {
    let mut reports: Vec<GroupReport> = groups
        .iter()
        .map(|group| {
            let mut total = NodeStats::default();
            let members = group
                .members
                .iter()
                .map(|key| {
                    let record = records.get(key).copied().unwrap_or_default();
                    let stats = NodeStats::from_record(&record);
                    total.add(&stats);
                    ReportRow::from_stats(key.clone(), &stats)
                })
                .collect();
            GroupReport {
                summary: ReportRow::from_stats(format!("{}*", group.label), &total),
                members,
            }
        })
        .collect();

    reports.sort_by_key(|report| report.summary.hitrate);
    reports
}
