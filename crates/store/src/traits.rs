//! The stat store trait

use async_trait::async_trait;
use keylens_core::{Result, StatRecord};

/// Storage for per-key statistics
///
/// Read-modify-write through this trait is not atomic: two writers updating
/// the same key may lose an update. Callers keep a single writer per key.
#[async_trait]
pub trait StatStore: Send + Sync {
    /// Load the record for `key`; `None` when the key has never been stored
    async fn get(&self, key: &str) -> Result<Option<StatRecord>>;

    /// Overwrite the record for `key`
    async fn put(&self, key: &str, record: &StatRecord) -> Result<()>;

    /// Every key currently holding a record
    async fn keys(&self) -> Result<Vec<String>>;

    /// Short backend description for logs and errors
    fn describe(&self) -> String;

    /// Load the record for `key`, treating a miss as a zeroed record
    async fn get_or_default(&self, key: &str) -> Result<StatRecord> {
        Ok(self.get(key).await?.unwrap_or_default())
    }
}
