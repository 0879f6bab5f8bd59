//! Domain types shared by the aggregator, the stores, and the reports.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Running statistics for a single cache key.
///
/// A zeroed record is what an absent key looks like; `avg_size`,
/// `last_write_at` and `lifetime` all use `0.0` as "unset".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatRecord {
    /// Read-classified operations observed
    pub reads: u64,
    /// Write-classified operations observed
    pub writes: u64,
    /// Decayed average of written byte lengths
    pub avg_size: f64,
    /// Unix seconds of the most recent write, `0.0` when no write window is open
    pub last_write_at: f64,
    /// Decayed average of the time from a write to the next referencing event
    pub lifetime: f64,
}

impl StatRecord {
    /// Percentage of reads among reads and writes, truncated. Zero when nothing was seen.
    pub fn hitrate(&self) -> u32 {
        hitrate(self.reads, self.writes)
    }
}

/// Exponential smoothing with a fixed weight of one half.
///
/// The first sample seeds the average exactly; every later sample moves the
/// average halfway towards itself regardless of how many samples came before.
#[inline]
pub fn decayed_avg(previous: f64, sample: f64) -> f64 {
    if previous == 0.0 {
        sample
    } else {
        (previous + sample) / 2.0
    }
}

/// `reads / (reads + writes) * 100`, truncated to an integer, `0` for no traffic.
pub fn hitrate(reads: u64, writes: u64) -> u32 {
    let total = reads + writes;
    if total == 0 {
        return 0;
    }
    ((reads as f64 / total as f64) * 100.0) as u32
}

/// The class an operation mnemonic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationClass {
    Read,
    Write,
    Delete,
    Ignore,
}

impl fmt::Display for OperationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationClass::Read => "read",
            OperationClass::Write => "write",
            OperationClass::Delete => "delete",
            OperationClass::Ignore => "ignore",
        };
        f.write_str(name)
    }
}

/// A single parsed cache operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    /// Command mnemonic as it appeared on the wire, e.g. `GET`
    pub mnemonic: String,
    /// The key the command touched
    pub key: String,
    /// Length in bytes of the raw log line the record came from
    pub raw_byte_length: u64,
    /// Unix seconds at which the operation was observed
    pub observed_at: f64,
}

impl OperationRecord {
    pub fn new(
        mnemonic: impl Into<String>,
        key: impl Into<String>,
        raw_byte_length: u64,
        observed_at: f64,
    ) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            key: key.into(),
            raw_byte_length,
            observed_at,
        }
    }
}
