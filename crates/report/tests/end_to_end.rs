use keylens_monitor::IngestPipeline;
use keylens_report::{
    ClusterParams, ClusterReportRequest, ReportContext, SnapshotCache, TreeReportRequest,
};
use keylens_store::{KeySizer, MemoryKeySizer, MemoryStatStore};
use std::sync::Arc;
use tempfile::TempDir;

fn line(ts: u32, command: &str, key: &str) -> String {
    format!(r#"{ts}.000000 [0 10.0.0.7:41234] "{command}" "{key}" "v""#)
}

fn monitor_log() -> String {
    let mut lines = Vec::new();
    for page in 0..4 {
        let key = format!("cache:page:{page}");
        lines.push(line(1000, "SET", &key));
        for read in 0..3 {
            lines.push(line(1010 + read, "GET", &key));
        }
    }
    for user in 0..2 {
        let key = format!("cache:user:{user}");
        lines.push(line(1000, "SET", &key));
        lines.push(line(1030, "SET", &key));
        lines.push(line(1060, "DEL", &key));
    }
    lines.push(line(1000, "CLIENT", "LIST"));
    lines.join("\n")
}

async fn ingested() -> Arc<MemoryStatStore> {
    let store = Arc::new(MemoryStatStore::new());
    let summary = IngestPipeline::new(store.clone(), 4, 16)
        .run(monitor_log().as_bytes())
        .await
        .unwrap();
    assert_eq!(summary.updated, 4 * 4 + 2 * 3);
    assert_eq!(summary.ignored, 1);
    store
}

#[tokio::test]
async fn test_tree_report_over_ingested_stream() {
    let store = ingested().await;
    let context = ReportContext::new(store);

    let rows = context
        .tree_report(&TreeReportRequest {
            name: "e2e".to_string(),
            levels: 3,
            prefix: None,
            traffic: true,
            regenerate: false,
        })
        .await
        .unwrap();

    let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["cache:user:*", "cache:page:*"]);

    let user = &rows[0];
    assert_eq!(user.leaf_count, 2);
    assert_eq!(user.reads, 0);
    assert_eq!(user.writes, 4);
    assert_eq!(user.hitrate, 0);
    // Each user key: window opened at 1030 and closed by the delete at 1060
    assert_eq!(user.avg_lifetime_secs, Some(30.0));

    let page = &rows[1];
    assert_eq!(page.leaf_count, 4);
    assert_eq!(page.hitrate, 75);
    // A few hundred bytes of traffic round to 0.00 MB but are still tracked
    assert_eq!(page.traffic_mb, Some(0.0));
}

#[tokio::test]
async fn test_cluster_report_over_ingested_stream() {
    let store = ingested().await;
    let context = ReportContext::new(store);

    let reports = context
        .cluster_report(&ClusterReportRequest {
            params: ClusterParams::new(0.2, 0.2).unwrap(),
        })
        .await
        .unwrap();

    let items: usize = reports.iter().map(|r| r.members.len()).sum();
    assert_eq!(items, 6);
    assert_eq!(reports[0].summary.label, "cache:user:*");
    assert_eq!(reports[1].summary.label, "cache:page:*");
    assert_eq!(reports[1].summary.hitrate, 75);
}

#[tokio::test]
async fn test_snapshot_round_trip_through_context() {
    let temp = TempDir::new().unwrap();
    let store = ingested().await;
    let request = TreeReportRequest {
        name: "e2e".to_string(),
        levels: 4,
        prefix: Some("cache:page:*".to_string()),
        traffic: false,
        regenerate: false,
    };

    let context = ReportContext::new(store.clone())
        .with_snapshots(SnapshotCache::new(temp.path()));
    let first = context.tree_report(&request).await.unwrap();
    assert_eq!(first.len(), 4);
    assert!(temp.path().join("e2e.hitrate.bin").exists());

    // A fresh context over an empty store still answers from the snapshot
    let context = ReportContext::new(Arc::new(MemoryStatStore::new()))
        .with_snapshots(SnapshotCache::new(temp.path()));
    assert_eq!(context.tree_report(&request).await.unwrap(), first);
}

#[tokio::test]
async fn test_memory_report_over_ingested_stream() {
    let store = ingested().await;
    let sizer: Arc<dyn KeySizer> = Arc::new(MemoryKeySizer::from_sizes(
        (0..4).map(|page| (format!("cache:page:{page}"), 256 * 1024)),
    ));
    let context = ReportContext::new(store);

    let rows = context
        .memory_report(
            &TreeReportRequest {
                name: "e2e".to_string(),
                levels: 3,
                prefix: None,
                traffic: false,
                regenerate: false,
            },
            sizer,
        )
        .await
        .unwrap();

    let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["cache:page:*", "cache:user:*"]);
    assert_eq!(rows[0].size_mb, 1.0);
    assert_eq!(rows[0].size_percent, Some(100.0));
    // Deleted keys are gone from the server
    assert_eq!(rows[1].leaf_count, 2);
    assert_eq!(rows[1].size_percent, Some(0.0));
}
