//! In-process stat store

use crate::traits::StatStore;
use async_trait::async_trait;
use dashmap::DashMap;
use keylens_core::{Result, StatRecord};

/// Concurrent in-memory store backed by a `DashMap`
#[derive(Debug, Default)]
pub struct MemoryStatStore {
    records: DashMap<String, StatRecord>,
}

impl MemoryStatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store from `(key, record)` pairs
    pub fn from_records<I, K>(records: I) -> Self
    where
        I: IntoIterator<Item = (K, StatRecord)>,
        K: Into<String>,
    {
        let store = Self::new();
        for (key, record) in records {
            store.records.insert(key.into(), record);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl StatStore for MemoryStatStore {
    async fn get(&self, key: &str) -> Result<Option<StatRecord>> {
        Ok(self.records.get(key).map(|r| *r.value()))
    }

    async fn put(&self, key: &str, record: &StatRecord) -> Result<()> {
        self.records.insert(key.to_string(), *record);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.records.iter().map(|r| r.key().clone()).collect();
        keys.sort();
        Ok(keys)
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
