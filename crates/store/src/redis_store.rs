//! Redis-backed stat store and key sizer
//!
//! Each cache key maps to a Redis hash holding the record fields. Keys are
//! enumerated with `SCAN` so a large keyspace does not block the server.
//! Key sizes come from `MEMORY USAGE` on the cache server being analysed.

use crate::codec;
use crate::sizer::KeySizer;
use crate::traits::StatStore;
use async_trait::async_trait;
use keylens_core::{Error, Result, StatRecord};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::collections::HashMap;

const SCAN_BATCH: usize = 1000;

/// Stat store that keeps one Redis hash per key
#[derive(Clone)]
pub struct RedisStatStore {
    url: String,
    connection: MultiplexedConnection,
}

impl RedisStatStore {
    /// Connect to the Redis server at `url`
    pub async fn connect(url: &str) -> Result<Self> {
        let connection = connect(url).await?;
        tracing::debug!(url = %url, "connected to redis stat store");

        Ok(Self {
            url: url.to_string(),
            connection,
        })
    }

    fn map_err(&self, key: &str, operation: &str, error: redis::RedisError) -> Error {
        if error.code() == Some("WRONGTYPE") {
            return Error::corrupt_record(key, "*", "value is not a hash");
        }
        Error::store_unavailable_with_source(
            self.url.clone(),
            format!("{operation} failed for key '{key}'"),
            error,
        )
    }
}

async fn connect(url: &str) -> Result<MultiplexedConnection> {
    let client = redis::Client::open(url)
        .map_err(|e| Error::configuration(format!("invalid redis url '{url}': {e}")))?;
    client
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| Error::store_unavailable_with_source(url, "connection failed", e))
}

#[async_trait]
impl StatStore for RedisStatStore {
    async fn get(&self, key: &str) -> Result<Option<StatRecord>> {
        let mut conn = self.connection.clone();
        let fields: HashMap<String, String> = conn
            .hgetall(key)
            .await
            .map_err(|e| self.map_err(key, "HGETALL", e))?;
        codec::decode(key, &fields)
    }

    async fn put(&self, key: &str, record: &StatRecord) -> Result<()> {
        let mut conn = self.connection.clone();
        let fields = codec::encode(record);
        conn.hset_multiple::<_, _, _, ()>(key, &fields)
            .await
            .map_err(|e| self.map_err(key, "HSET", e))
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut conn = self.connection.clone();
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|e| self.map_err("*", "SCAN", e))?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may return a key more than once
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Key sizer backed by `MEMORY USAGE`
#[derive(Clone)]
pub struct RedisKeySizer {
    url: String,
    connection: MultiplexedConnection,
}

impl RedisKeySizer {
    /// Connect to the cache server at `url`
    pub async fn connect(url: &str) -> Result<Self> {
        let connection = connect(url).await?;
        tracing::debug!(url = %url, "connected to redis source");

        Ok(Self {
            url: url.to_string(),
            connection,
        })
    }
}

#[async_trait]
impl KeySizer for RedisKeySizer {
    async fn size_of(&self, key: &str) -> Result<Option<u64>> {
        let mut conn = self.connection.clone();
        redis::cmd("MEMORY")
            .arg("USAGE")
            .arg(key)
            .arg("SAMPLES")
            .arg(0)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                Error::store_unavailable_with_source(
                    self.url.clone(),
                    format!("MEMORY USAGE failed for key '{key}'"),
                    e,
                )
            })
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}
