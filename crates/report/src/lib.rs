//! Reports over keylens statistics
//!
//! Two views of the key space:
//!
//! - **Prefix tree**: keys are split on `:` into a tree, leaf records are
//!   rolled up through it (`rollup`), and one depth of the result is flattened
//!   into rows (`flatten`). Leaves contribute either their stored record or
//!   their memory on the cache server. Rolled trees can be cached on disk
//!   (`snapshot`).
//! - **Similarity groups**: keys close in edit distance, with a common-prefix
//!   guard, are grouped without regard to delimiters (`cluster`).
//!
//! `ReportContext` ties a run together: one store, one optional snapshot
//! cache, one key limit.

pub mod cluster;
pub mod context;
pub mod flatten;
pub mod rollup;
pub mod snapshot;
pub mod tree;

pub use cluster::{cluster, ClusterGroup, ClusterParams, GroupReport};
pub use context::{ClusterReportRequest, ReportContext, TreeReportRequest};
pub use flatten::{flatten, flatten_memory, MemoryRow, ReportRow};
pub use rollup::{
    rollup, HitrateRollup, MemoryRollup, MemoryStats, NodeStats, RolledTree, RollupStrategy,
    TrafficRollup,
};
pub use snapshot::SnapshotCache;
pub use tree::{NodeId, PrefixTree, TreeNode};
