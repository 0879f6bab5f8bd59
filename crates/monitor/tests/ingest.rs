use keylens_core::{Error, OperationRecord};
use keylens_monitor::{IngestPipeline, IngestSummary};
use keylens_store::{MemoryStatStore, StatStore};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, BufReader, ReadBuf};

/// Reader whose every read fails, as a dropped connection would
struct BrokenReader;

impl AsyncRead for BrokenReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Poll::Ready(Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset",
        )))
    }
}

fn monitor_line(ts: f64, command: &str, key: &str) -> String {
    format!(r#"{ts} [0 127.0.0.1:52044] "{command}" "{key}" "payload""#)
}

#[tokio::test]
async fn test_monitor_stream_updates_every_key() {
    let lines = [
        "OK".to_string(),
        monitor_line(100.0, "SET", "user:1:profile"),
        monitor_line(101.0, "PING", "user:1:profile"),
        monitor_line(110.0, "GET", "user:1:profile"),
        monitor_line(111.0, "GET", "user:2:profile"),
        monitor_line(112.0, "EXPIRE", "user:2:profile"),
        monitor_line(120.0, "DEL", "user:1:profile"),
        "garbage [0 h] \"GET\" \"x\"".to_string(),
    ];
    let input = lines.join("\n");

    let store = Arc::new(MemoryStatStore::new());
    let pipeline = IngestPipeline::new(store.clone(), 3, 4);
    let summary = pipeline.run(input.as_bytes()).await.unwrap();

    assert_eq!(
        summary,
        IngestSummary {
            lines: 8,
            ignored: 2,
            updated: 4,
            parse_errors: 2,
            store_errors: 0,
        }
    );

    let user1 = store.get("user:1:profile").await.unwrap().unwrap();
    assert_eq!(user1.reads, 1);
    assert_eq!(user1.writes, 1);
    assert_eq!(user1.last_write_at, 0.0);
    // Read at +10 then delete at +20
    assert_eq!(user1.lifetime, 15.0);
    assert_eq!(user1.avg_size, monitor_line(100.0, "SET", "user:1:profile").len() as f64);

    let user2 = store.get("user:2:profile").await.unwrap().unwrap();
    assert_eq!(user2.reads, 1);
    assert_eq!(user2.writes, 0);
}

#[tokio::test]
async fn test_per_key_order_is_preserved_across_workers() {
    // Each key sees SET, GET, SET, GET; out-of-order application would
    // change last_write_at or the lifetime samples
    let mut records = Vec::new();
    for round in 0..50u32 {
        for key in 0..16u32 {
            let base = f64::from(round) * 100.0 + 1.0;
            let key = format!("k:{key}");
            records.push(OperationRecord::new("SET", key.clone(), 10, base));
            records.push(OperationRecord::new("GET", key.clone(), 0, base + 4.0));
        }
    }

    let store = Arc::new(MemoryStatStore::new());
    let pipeline = IngestPipeline::new(store.clone(), 8, 2);
    let summary = pipeline.run_records(records).await.unwrap();
    assert_eq!(summary.updated, 50 * 16 * 2);

    for key in store.keys().await.unwrap() {
        let stats = store.get(&key).await.unwrap().unwrap();
        assert_eq!(stats.reads, 50);
        assert_eq!(stats.writes, 50);
        assert_eq!(stats.lifetime, 4.0);
        assert_eq!(stats.last_write_at, 4901.0);
        assert_eq!(stats.avg_size, 10.0);
    }
}

#[tokio::test]
async fn test_line_that_is_not_utf8_is_skipped() {
    let mut input = Vec::new();
    input.extend_from_slice(monitor_line(100.0, "SET", "a").as_bytes());
    input.push(b'\n');
    input.extend_from_slice(b"101 [0 127.0.0.1:52044] \"GET\" \"b\xff\xfe\"\n");
    input.extend_from_slice(monitor_line(103.0, "GET", "a").as_bytes());
    input.extend_from_slice(b"\r\n");

    let store = Arc::new(MemoryStatStore::new());
    let pipeline = IngestPipeline::new(store.clone(), 2, 1);
    let summary = pipeline.run(input.as_slice()).await.unwrap();

    assert_eq!(summary.lines, 3);
    assert_eq!(summary.parse_errors, 1);
    assert_eq!(summary.updated, 2);

    let a = store.get("a").await.unwrap().unwrap();
    assert_eq!(a.writes, 1);
    assert_eq!(a.reads, 1);
    assert_eq!(a.lifetime, 3.0);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_read_failure_still_applies_queued_records() {
    let head = [
        monitor_line(100.0, "SET", "a"),
        monitor_line(101.0, "SET", "b"),
        monitor_line(102.0, "GET", "a"),
        String::new(),
    ]
    .join("\n");
    let reader = BufReader::new(head.as_bytes().chain(BrokenReader));

    let store = Arc::new(MemoryStatStore::new());
    let pipeline = IngestPipeline::new(store.clone(), 4, 1);
    let result = pipeline.run(reader).await;

    assert!(matches!(result, Err(Error::FileSystem { .. })));
    let a = store.get("a").await.unwrap().unwrap();
    assert_eq!(a.writes, 1);
    assert_eq!(a.reads, 1);
    assert_eq!(store.get("b").await.unwrap().unwrap().writes, 1);
}
