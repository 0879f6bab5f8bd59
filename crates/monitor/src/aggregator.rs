//! Per-key statistics update
//!
//! Every tracked operation is a read-modify-write of one `StatRecord`. The
//! update itself is the pure function [`apply`]; [`StreamAggregator`] wraps it
//! with the store round trip.

use crate::classify::classify;
use keylens_core::{decayed_avg, Error, OperationClass, OperationRecord, Result, StatRecord};
use keylens_store::StatStore;
use std::sync::Arc;

/// What `process` did with a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Untracked command; the store was not touched
    Ignored,
    /// The key's record was rewritten
    Updated(OperationClass),
}

/// Fold one classified operation into `stats`
///
/// - Read counts and, inside a write window, samples the lifetime.
/// - Write counts, samples the size and restarts the write window.
/// - Delete samples the lifetime and closes the window.
pub fn apply(stats: &mut StatRecord, class: OperationClass, size: u64, observed_at: f64) {
    match class {
        OperationClass::Read => {
            stats.reads += 1;
            if stats.last_write_at > 0.0 {
                stats.lifetime = decayed_avg(stats.lifetime, observed_at - stats.last_write_at);
            }
        }
        OperationClass::Write => {
            stats.writes += 1;
            stats.avg_size = decayed_avg(stats.avg_size, size as f64);
            stats.last_write_at = observed_at;
        }
        OperationClass::Delete => {
            if stats.last_write_at > 0.0 {
                stats.lifetime = decayed_avg(stats.lifetime, observed_at - stats.last_write_at);
            }
            stats.last_write_at = 0.0;
        }
        OperationClass::Ignore => {}
    }
}

/// Applies operation records to a stat store
#[derive(Clone)]
pub struct StreamAggregator {
    store: Arc<dyn StatStore>,
}

impl StreamAggregator {
    pub fn new(store: Arc<dyn StatStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn StatStore> {
        &self.store
    }

    /// Classify `record` and, when tracked, update its key's statistics
    ///
    /// A record that fails validation leaves the store untouched.
    pub async fn process(&self, record: &OperationRecord) -> Result<Outcome> {
        let class = classify(&record.mnemonic);
        if class == OperationClass::Ignore {
            return Ok(Outcome::Ignored);
        }

        if record.key.is_empty() {
            return Err(Error::invalid_record(format!(
                "{} record has an empty key",
                record.mnemonic
            )));
        }
        if !record.observed_at.is_finite() {
            return Err(Error::invalid_record(format!(
                "record for '{}' has a non-finite timestamp",
                record.key
            )));
        }

        let mut stats = self.store.get_or_default(&record.key).await?;
        apply(&mut stats, class, record.raw_byte_length, record.observed_at);
        self.store.put(&record.key, &stats).await?;

        tracing::trace!(key = %record.key, class = %class, "record applied");
        Ok(Outcome::Updated(class))
    }
}
