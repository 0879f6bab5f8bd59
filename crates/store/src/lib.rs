//! Stat stores for keylens
//!
//! A stat store holds one `StatRecord` per cache key. The aggregator reads and
//! overwrites records through the `StatStore` trait; reports enumerate keys and
//! read records through it. Two backends ship here:
//!
//! - `MemoryStatStore`: a process-local concurrent map, used by tests and by
//!   one-shot pipelines that ingest and report in the same process.
//! - `RedisStatStore`: one Redis hash per key, the layout the monitor has always
//!   written (`get`, `set`, `size`, `last_set`, `lifetime`).
//!
//! The memory report also needs key sizes from the analysed cache server,
//! which come through the `KeySizer` trait.

pub mod codec;
pub mod memory;
pub mod redis_store;
pub mod sizer;
pub mod traits;

pub use memory::MemoryStatStore;
pub use redis_store::{RedisKeySizer, RedisStatStore};
pub use sizer::{KeySizer, MemoryKeySizer};
pub use traits::StatStore;

use keylens_core::{Error, Result};
use std::sync::Arc;

/// URL scheme that selects the in-process store
pub const MEMORY_URL: &str = "memory";

/// Open the store named by `url`
pub async fn open(url: &str) -> Result<Arc<dyn StatStore>> {
    if url == MEMORY_URL {
        return Ok(Arc::new(MemoryStatStore::new()));
    }
    if is_redis_url(url) {
        return Ok(Arc::new(RedisStatStore::connect(url).await?));
    }
    Err(unsupported(url))
}

/// Open the key sizer for the cache server at `url`
pub async fn open_sizer(url: &str) -> Result<Arc<dyn KeySizer>> {
    if url == MEMORY_URL {
        return Ok(Arc::new(MemoryKeySizer::new()));
    }
    if is_redis_url(url) {
        return Ok(Arc::new(RedisKeySizer::connect(url).await?));
    }
    Err(unsupported(url))
}

fn is_redis_url(url: &str) -> bool {
    url.starts_with("redis://") || url.starts_with("rediss://") || url.starts_with("unix://")
}

fn unsupported(url: &str) -> Error {
    Error::configuration(format!(
        "unsupported store url '{url}', expected 'memory' or a redis:// url"
    ))
}
