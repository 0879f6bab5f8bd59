//! Operation stream ingestion for keylens
//!
//! Turns a Redis `MONITOR` stream into per-key statistics:
//!
//! - `classify`: command mnemonic to read / write / delete / ignore
//! - `parser`: monitor line to `OperationRecord`
//! - `aggregator`: the per-key update applied through a `StatStore`
//! - `pipeline`: sharded workers so each key keeps a single writer

pub mod aggregator;
pub mod classify;
pub mod parser;
pub mod pipeline;

pub use aggregator::{apply, Outcome, StreamAggregator};
pub use classify::classify;
pub use parser::parse_line;
pub use pipeline::{IngestPipeline, IngestSummary};
