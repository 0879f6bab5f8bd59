//! Key sizes on the cache server being analysed
//!
//! The stat store only knows how keys were used. How much memory a key takes
//! is asked of the cache server itself, through a [`KeySizer`].

use async_trait::async_trait;
use dashmap::DashMap;
use keylens_core::Result;

/// Reports the memory a key occupies
#[async_trait]
pub trait KeySizer: Send + Sync {
    /// Bytes held by `key`; `None` when the key does not exist
    async fn size_of(&self, key: &str) -> Result<Option<u64>>;

    /// Short backend description for logs and errors
    fn describe(&self) -> String;
}

/// Fixed key sizes held in process
#[derive(Debug, Default)]
pub struct MemoryKeySizer {
    sizes: DashMap<String, u64>,
}

impl MemoryKeySizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sizes<I, K>(sizes: I) -> Self
    where
        I: IntoIterator<Item = (K, u64)>,
        K: Into<String>,
    {
        let sizer = Self::new();
        for (key, size) in sizes {
            sizer.sizes.insert(key.into(), size);
        }
        sizer
    }
}

#[async_trait]
impl KeySizer for MemoryKeySizer {
    async fn size_of(&self, key: &str) -> Result<Option<u64>> {
        Ok(self.sizes.get(key).map(|s| *s.value()))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
