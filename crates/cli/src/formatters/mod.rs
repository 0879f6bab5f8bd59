//! Report rendering for the terminal
//!
//! Tables go to stdout with fixed-width columns; JSON goes to stdout as one
//! pretty-printed document. Logs stay on stderr.

use crate::commands::OutputFormat;
use keylens_core::{Error, Result, StatRecord, NOT_APPLICABLE};
use keylens_monitor::IngestSummary;
use keylens_report::{GroupReport, MemoryRow, ReportRow};
use serde::Serialize;
use std::fmt::Write as _;

const KEY_WIDTH: usize = 90;
const KEY_TRUNCATE: usize = 80;

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| NOT_APPLICABLE.to_string(), |v| format!("{v:.2}"))
}

fn truncate_key(key: &str) -> String {
    if key.chars().count() > KEY_WIDTH {
        let head: String = key.chars().take(KEY_TRUNCATE).collect();
        format!("{head}...")
    } else {
        key.to_string()
    }
}

fn header(traffic: bool) -> String {
    let mut line = format!(
        "{:<KEY_WIDTH$} {:<10} {:<10} {:<10} {:<15} {:<15} {:<20}",
        "Key", "Nr. keys", "GET", "SET", "Hit Rate (%)", "Avg Size (KB)", "Lifetime (seconds)"
    );
    if traffic {
        let _ = write!(line, " {:<20}", "Network Traffic (MB)");
    }
    let width = line.len();
    line.push('\n');
    line.push_str(&"-".repeat(width));
    line
}

fn row_line(row: &ReportRow, traffic: bool) -> String {
    let mut line = format!(
        "{:<KEY_WIDTH$} {:<10} {:<10} {:<10} {:<15} {:<15} {:<20}",
        truncate_key(&row.label),
        row.leaf_count,
        row.reads,
        row.writes,
        row.hitrate,
        optional(row.avg_size_kb),
        optional(row.avg_lifetime_secs),
    );
    if traffic {
        let _ = write!(line, " {:<20}", optional(row.traffic_mb));
    }
    line.trim_end().to_string()
}

/// Print tree report rows
pub fn print_rows(rows: &[ReportRow], traffic: bool, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(rows),
        OutputFormat::Table => {
            println!("{}", header(traffic));
            for row in rows {
                println!("{}", row_line(row, traffic));
            }
            Ok(())
        }
    }
}

fn memory_header() -> String {
    let line = format!(
        "{:<KEY_WIDTH$} {:<10} {:<15} {:<15}",
        "Key", "Nr. keys", "Size (MB)", "Size (%)"
    );
    format!("{line}\n{}", "-".repeat(line.len()))
}

fn memory_line(row: &MemoryRow) -> String {
    format!(
        "{:<KEY_WIDTH$} {:<10} {:<15.2} {:<15}",
        truncate_key(&row.label),
        row.leaf_count,
        row.size_mb,
        optional(row.size_percent),
    )
    .trim_end()
    .to_string()
}

/// Print memory report rows
pub fn print_memory_rows(rows: &[MemoryRow], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(rows),
        OutputFormat::Table => {
            println!("{}", memory_header());
            for row in rows {
                println!("{}", memory_line(row));
            }
            Ok(())
        }
    }
}

/// Print similarity groups, with their members unless `prefix_only`
pub fn print_groups(groups: &[GroupReport], prefix_only: bool, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json if prefix_only => {
            let summaries: Vec<&ReportRow> = groups.iter().map(|g| &g.summary).collect();
            print_json(&summaries)
        }
        OutputFormat::Json => print_json(groups),
        OutputFormat::Table => {
            if prefix_only {
                println!("{}", header(false));
            }
            for group in groups {
                if !prefix_only {
                    println!("{}", header(false));
                    for member in &group.members {
                        println!("{}", row_line(member, false));
                    }
                    println!("{}", "-".repeat(KEY_WIDTH));
                }
                println!("{}", row_line(&group.summary, false));
                if !prefix_only {
                    println!();
                }
            }
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct KeyStats<'a> {
    key: &'a str,
    #[serde(flatten)]
    record: &'a StatRecord,
    hitrate: u32,
}

/// Print the stored record of one key
pub fn print_record(key: &str, record: &StatRecord, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&KeyStats {
            key,
            record,
            hitrate: record.hitrate(),
        }),
        OutputFormat::Table => {
            println!("{:<16}{key}", "Key");
            println!("{:<16}{}", "GET", record.reads);
            println!("{:<16}{}", "SET", record.writes);
            println!("{:<16}{}", "Hit Rate (%)", record.hitrate());
            println!("{:<16}{:.2}", "Avg Size (B)", record.avg_size);
            println!("{:<16}{:.2}", "Last Set", record.last_write_at);
            println!("{:<16}{:.2}", "Lifetime (s)", record.lifetime);
            Ok(())
        }
    }
}

/// Print the counters of an ingest run
pub fn print_summary(summary: &IngestSummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(summary),
        OutputFormat::Table => {
            let mut out = String::new();
            for (label, value) in [
                ("Lines", summary.lines),
                ("Updated", summary.updated),
                ("Ignored", summary.ignored),
                ("Parse errors", summary.parse_errors),
                ("Store errors", summary.store_errors),
            ] {
                writeln!(out, "{label:<16}{value}")
                    .map_err(|e| Error::configuration(format!("failed to render summary: {e}")))?;
            }
            print!("{out}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(label: &str) -> ReportRow {
        ReportRow {
            label: label.to_string(),
            leaf_count: 2,
            reads: 3,
            writes: 1,
            hitrate: 75,
            avg_size_kb: Some(1.5),
            avg_lifetime_secs: None,
            traffic_mb: None,
        }
    }

    #[test]
    fn test_not_applicable_is_distinct_from_zero() {
        assert_eq!(optional(None), "n/a");
        assert_eq!(optional(Some(0.0)), "0.00");
        assert_eq!(optional(Some(1.5)), "1.50");
    }

    #[test]
    fn test_long_keys_are_truncated() {
        let long = "k".repeat(120);
        let shown = truncate_key(&long);
        assert_eq!(shown.len(), KEY_TRUNCATE + 3);
        assert!(shown.ends_with("..."));
        assert_eq!(truncate_key("short"), "short");
    }

    #[test]
    fn test_row_line_columns() {
        let line = row_line(&row("user:*"), false);
        assert!(line.starts_with("user:*"));
        assert!(line.contains("75"));
        assert!(line.contains("1.50"));
        assert!(line.ends_with("n/a"));

        let with_traffic = row_line(&row("user:*"), true);
        assert!(with_traffic.matches("n/a").count() == 2);
    }

    #[test]
    fn test_memory_line_columns() {
        let row = MemoryRow {
            label: "user:*".to_string(),
            leaf_count: 12,
            size_mb: 3.5,
            size_percent: Some(70.0),
        };
        let line = memory_line(&row);
        assert!(line.starts_with("user:*"));
        assert!(line.contains("12"));
        assert!(line.contains("3.50"));
        assert!(line.ends_with("70.00"));
        assert!(memory_header().contains("Size (%)"));

        let unmeasured = MemoryRow {
            size_percent: None,
            ..row
        };
        assert!(memory_line(&unmeasured).ends_with("n/a"));
    }

    #[test]
    fn test_header_has_traffic_column_on_request() {
        assert!(!header(false).contains("Network Traffic"));
        assert!(header(true).contains("Network Traffic (MB)"));
    }
}
