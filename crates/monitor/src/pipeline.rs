//! Sharded ingest pipeline
//!
//! One reader task parses lines and routes each record to a worker chosen by
//! hashing its key. A key therefore always lands on the same worker, which
//! keeps its operations in log order and gives every key a single writer.
//! Different keys are updated in parallel.

use crate::aggregator::{Outcome, StreamAggregator};
use crate::parser::parse_line;
use futures::future;
use keylens_core::{Error, OperationRecord, Result};
use keylens_store::StatStore;
use keylens_utils::tracing::record_skipped;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use xxhash_rust::xxh3::xxh3_64;

/// Counters for one ingest run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// Lines read from the source
    pub lines: u64,
    /// Lines or records with an untracked command
    pub ignored: u64,
    /// Records that rewrote a key's statistics
    pub updated: u64,
    /// Lines or records that could not be parsed
    pub parse_errors: u64,
    /// Records whose store round trip failed
    pub store_errors: u64,
}

impl IngestSummary {
    fn merge(&mut self, other: &IngestSummary) {
        self.lines += other.lines;
        self.ignored += other.ignored;
        self.updated += other.updated;
        self.parse_errors += other.parse_errors;
        self.store_errors += other.store_errors;
    }
}

/// Reads operation records and fans them out to per-key workers
pub struct IngestPipeline {
    aggregator: StreamAggregator,
    workers: usize,
    channel_capacity: usize,
}

impl IngestPipeline {
    pub fn new(store: Arc<dyn StatStore>, workers: usize, channel_capacity: usize) -> Self {
        Self {
            aggregator: StreamAggregator::new(store),
            workers: workers.max(1),
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Worker index for `key`
    pub fn shard_for(&self, key: &str) -> usize {
        (xxh3_64(key.as_bytes()) % self.workers as u64) as usize
    }

    /// Ingest monitor lines until the reader is exhausted
    pub async fn run<R>(&self, reader: R) -> Result<IngestSummary>
    where
        R: AsyncBufRead + Unpin,
    {
        self.run_until(reader, future::pending::<()>()).await
    }

    /// Ingest monitor lines until the reader is exhausted or `shutdown` resolves
    ///
    /// Records already handed to a worker are still applied after shutdown,
    /// and also when the run ends with an error. A line that is not UTF-8 is
    /// counted as a parse error and skipped.
    pub async fn run_until<R, S>(&self, mut reader: R, shutdown: S) -> Result<IngestSummary>
    where
        R: AsyncBufRead + Unpin,
        S: Future<Output = ()>,
    {
        let started = Instant::now();
        let (senders, mut join_set) = self.spawn_workers();
        let mut summary = IngestSummary::default();
        let mut failure = None;
        let mut buf = Vec::new();
        tokio::pin!(shutdown);

        loop {
            buf.clear();
            let read = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested, draining workers");
                    break;
                }
                read = reader.read_until(b'\n', &mut buf) => read,
            };
            match read {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    failure = Some(Error::file_system("<input>", "read monitor stream", e));
                    break;
                }
            }
            summary.lines += 1;

            let line = match std::str::from_utf8(trim_line_end(&buf)) {
                Ok(line) => line,
                Err(e) => {
                    summary.parse_errors += 1;
                    record_skipped("parse", &format!("line {} is not UTF-8: {e}", summary.lines));
                    continue;
                }
            };

            match parse_line(line) {
                Ok(Some(record)) => {
                    if let Err(e) = self.dispatch(&senders, record).await {
                        failure = Some(e);
                        break;
                    }
                }
                Ok(None) => summary.ignored += 1,
                Err(e) => {
                    summary.parse_errors += 1;
                    record_skipped("parse", &e.to_string());
                }
            }
        }

        drop(senders);
        self.join_workers(&mut join_set, &mut summary).await?;

        tracing::info!(
            lines = %summary.lines,
            updated = %summary.updated,
            ignored = %summary.ignored,
            parse_errors = %summary.parse_errors,
            store_errors = %summary.store_errors,
            elapsed = %keylens_utils::format_duration(started.elapsed()),
            "ingest finished"
        );
        match failure {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }

    /// Ingest already-parsed records
    pub async fn run_records<I>(&self, records: I) -> Result<IngestSummary>
    where
        I: IntoIterator<Item = OperationRecord>,
    {
        let (senders, mut join_set) = self.spawn_workers();
        let mut summary = IngestSummary::default();
        let mut failure = None;

        for record in records {
            if let Err(e) = self.dispatch(&senders, record).await {
                failure = Some(e);
                break;
            }
        }

        drop(senders);
        self.join_workers(&mut join_set, &mut summary).await?;
        match failure {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }

    async fn dispatch(
        &self,
        senders: &[mpsc::Sender<OperationRecord>],
        record: OperationRecord,
    ) -> Result<()> {
        let shard = self.shard_for(&record.key);
        senders[shard].send(record).await.map_err(|_| {
            Error::configuration(format!("ingest worker {shard} stopped unexpectedly"))
        })
    }

    fn spawn_workers(&self) -> (Vec<mpsc::Sender<OperationRecord>>, JoinSet<IngestSummary>) {
        let mut senders = Vec::with_capacity(self.workers);
        let mut join_set = JoinSet::new();

        for worker in 0..self.workers {
            let (tx, rx) = mpsc::channel(self.channel_capacity);
            senders.push(tx);
            join_set.spawn(run_worker(worker, self.aggregator.clone(), rx));
        }

        (senders, join_set)
    }

    async fn join_workers(
        &self,
        join_set: &mut JoinSet<IngestSummary>,
        summary: &mut IngestSummary,
    ) -> Result<()> {
        while let Some(result) = join_set.join_next().await {
            let tally =
                result.map_err(|e| Error::configuration(format!("ingest worker failed: {e}")))?;
            summary.merge(&tally);
        }
        Ok(())
    }
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

async fn run_worker(
    worker: usize,
    aggregator: StreamAggregator,
    mut rx: mpsc::Receiver<OperationRecord>,
) -> IngestSummary {
    let mut tally = IngestSummary::default();

    while let Some(record) = rx.recv().await {
        match aggregator.process(&record).await {
            Ok(Outcome::Updated(_)) => tally.updated += 1,
            Ok(Outcome::Ignored) => tally.ignored += 1,
            Err(e @ Error::Parse { .. }) => {
                tally.parse_errors += 1;
                record_skipped("invalid_record", &e.to_string());
            }
            Err(e) => {
                tally.store_errors += 1;
                tracing::warn!(worker = %worker, key = %record.key, error = %e, "store update failed");
            }
        }
    }

    tracing::debug!(worker = %worker, updated = %tally.updated, "ingest worker finished");
    tally
}

#[cfg(test)]
mod tests {
    use super::*;
    use keylens_store::MemoryStatStore;

    #[test]
    fn test_shard_is_stable_and_in_range() {
        let pipeline = IngestPipeline::new(Arc::new(MemoryStatStore::new()), 4, 8);
        for key in ["a", "user:1", "user:2", "session:abc"] {
            let shard = pipeline.shard_for(key);
            assert!(shard < 4);
            assert_eq!(shard, pipeline.shard_for(key));
        }
    }

    #[test]
    fn test_zero_workers_is_clamped() {
        let pipeline = IngestPipeline::new(Arc::new(MemoryStatStore::new()), 0, 0);
        assert_eq!(pipeline.shard_for("anything"), 0);
    }

    #[tokio::test]
    async fn test_shutdown_stops_reading() {
        let store = Arc::new(MemoryStatStore::new());
        let pipeline = IngestPipeline::new(store.clone(), 2, 8);
        let input: &[u8] = b"1.0 [0 h:1] \"GET\" \"a\"\n";

        let summary = pipeline
            .run_until(input, future::ready(()))
            .await
            .unwrap();
        assert_eq!(summary.lines, 0);
        assert!(store.is_empty());
    }
}
