use std::io::Write;
use std::process::{Command, Output};
use tempfile::TempDir;

const CAPTURE: &str = r#"OK
1700000000.000001 [0 127.0.0.1:50000] "SET" "user:1" "alice"
1700000002.000001 [0 127.0.0.1:50000] "GET" "user:1"
1700000003.000001 [0 127.0.0.1:50000] "PING"
1700000004.000001 [0 127.0.0.1:50000] "DEL" "user:1"
"#;

fn keylens(home: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_keylens"))
        .args(args)
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env("KEYLENS_SNAPSHOT_DIR", home.path().join("snapshots"))
        .env_remove("KEYLENS_STORE_URL")
        .env_remove("KEYLENS_SOURCE_URL")
        .output()
        .expect("failed to run keylens")
}

#[test]
fn test_ingest_prints_json_summary() {
    let home = TempDir::new().unwrap();
    let capture = home.path().join("monitor.log");
    std::fs::File::create(&capture)
        .unwrap()
        .write_all(CAPTURE.as_bytes())
        .unwrap();

    let output = keylens(
        &home,
        &[
            "--store",
            "memory",
            "ingest",
            "--input",
            capture.to_str().unwrap(),
            "--format",
            "json",
        ],
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["lines"], 5);
    assert_eq!(summary["updated"], 3);
    assert_eq!(summary["ignored"], 1);
    assert_eq!(summary["parse_errors"], 1);
    assert_eq!(summary["store_errors"], 0);
}

#[test]
fn test_tree_report_on_empty_store() {
    let home = TempDir::new().unwrap();
    let output = keylens(
        &home,
        &["--store", "memory", "report", "tree", "--format", "json"],
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows, serde_json::json!([]));
}

#[test]
fn test_memory_report_needs_a_source() {
    let home = TempDir::new().unwrap();
    let output = keylens(&home, &["--store", "memory", "report", "tree", "--memory"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--source"));

    let output = keylens(
        &home,
        &[
            "--store", "memory", "--source", "memory", "report", "tree", "--memory", "--format",
            "json",
        ],
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows, serde_json::json!([]));
}

#[test]
fn test_memory_and_traffic_are_exclusive() {
    let home = TempDir::new().unwrap();
    let output = keylens(
        &home,
        &["--store", "memory", "report", "tree", "--memory", "--traffic"],
    );
    assert!(!output.status.success());
}

#[test]
fn test_invalid_similarity_is_rejected() {
    let home = TempDir::new().unwrap();
    let output = keylens(
        &home,
        &["--store", "memory", "report", "cluster", "--similarity", "1.5"],
    );
    assert!(!output.status.success());
}

#[test]
fn test_completion_script() {
    let home = TempDir::new().unwrap();
    let output = keylens(&home, &["completion", "bash"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("keylens"));
}
