//! Core domain types, errors, and constants for `keylens`.
//!
//! Every other crate in the workspace builds on the items defined here:
//!
//! - **`errors`**: the `Error` enum and `Result` alias. The variants mirror the
//!   failure taxonomy of the system: per-record parse failures, an unreachable
//!   stat store, corrupt stored fields, plus the ambient configuration and
//!   file system kinds.
//! - **`types`**: `StatRecord`, the per-key statistics, together with the
//!   operation records fed into the aggregator and the `decayed_avg` rule that
//!   drives both temporal averages.
//! - **`constants`**: delimiter, sentinel labels, and environment variable names.

pub mod constants;
pub mod errors;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, Result},
    types::*,
};
