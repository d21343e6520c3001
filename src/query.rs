// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal reports and exports of stored logs.

use crate::stats::StatsReport;
use crate::store::LogRecord;
use anyhow::{Context, Result};
use camino::Utf8Path;
use rusqlite::{Connection, types::ValueRef};
use serde_json::{Map, Value};
use std::{fs::File, io::Write};

pub enum ExportKind {
    Csv,
    Json,
}

/// Characters of the payload shown per row in `recent` output.
const PAYLOAD_PREVIEW: usize = 60;

pub fn print_stats(report: &StatsReport, previous_week: u32) {
    println!("\nUnprocessed logs from week {:02}", previous_week);
    println!("  Total:  {}", report.total_logs_count);
    println!("  Urgent: {}", report.urgent_logs_count);
    println!("  Status: {}", status_label(report.urgent_logs_count));

    if !report.logs_by_server.is_empty() {
        println!("\n{:<20} {:>8}", "Server", "Logs");
        println!("{}", "=".repeat(29));
        for entry in &report.logs_by_server {
            println!("{:<20} {:>8}", entry.server_type, entry.count);
        }
    }

    println!("\n{:<10} {:>8}", "Week", "Logs");
    println!("{}", "=".repeat(19));
    for week in &report.weekly_trend {
        println!("{:<10} {:>8}", week.week, week.count);
    }
}

/// Dashboard status derived from the urgent count.
pub fn status_label(urgent: u64) -> &'static str {
    match urgent {
        0 => "stable",
        1..=5 => "watch",
        _ => "attention",
    }
}

pub fn print_recent(logs: &[LogRecord]) {
    println!(
        "\n{:<6} {:<20} {:<12} {:<10} {:<4} Payload",
        "Id", "Created", "Server", "Severity", "Done"
    );
    println!("{}", "=".repeat(80));

    for log in logs {
        println!(
            "{:<6} {:<20} {:<12} {:<10} {:<4} {}",
            log.id,
            log.created_at.format("%Y-%m-%d %H:%M:%S"),
            log.server_type,
            log.severity,
            if log.processed { "yes" } else { "no" },
            preview(&log.raw_payload, PAYLOAD_PREVIEW),
        );
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{head}...")
    }
}

/// Write every stored log to `output`.
pub fn run_export(conn: &Connection, kind: ExportKind, output: &Utf8Path) -> Result<usize> {
    let (columns, rows) = read_all_logs(conn)?;

    let mut file = File::create(output.as_std_path())
        .with_context(|| format!("failed to create file at {}", output))?;

    match kind {
        ExportKind::Csv => {
            writeln!(file, "{}", columns.join(","))?;
            for row in &rows {
                let fields: Vec<String> = columns
                    .iter()
                    .map(|column| csv_field(row.get(column).unwrap_or(&Value::Null)))
                    .collect();
                writeln!(file, "{}", fields.join(","))?;
            }
        }
        ExportKind::Json => {
            let json = serde_json::to_string_pretty(&rows)?;
            file.write_all(json.as_bytes())?;
        }
    }

    println!("Exported {} logs to {}.", rows.len(), output);
    Ok(rows.len())
}

fn read_all_logs(conn: &Connection) -> Result<(Vec<String>, Vec<Map<String, Value>>)> {
    let mut stmt = conn
        .prepare("SELECT * FROM logs ORDER BY id")
        .context("failed to query logs")?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let rows = stmt
        .query_map([], |row| {
            let mut map = Map::new();
            for (i, name) in columns.iter().enumerate() {
                map.insert(name.clone(), sql_to_json(row.get_ref(i)?));
            }
            Ok(map)
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok((columns, rows))
}

fn sql_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::from(n),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(s) | ValueRef::Blob(s) => {
            Value::String(String::from_utf8_lossy(s).into_owned())
        }
    }
}

/// Render a value as a CSV field, quoting when needed.
fn csv_field(value: &Value) -> String {
    let text = match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    if text.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::db::SqliteStore;
    use crate::store::{LogStore, NewLogRecord};
    use camino::Utf8PathBuf;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field(&Value::from(42)), "42");
        assert_eq!(csv_field(&Value::Null), "");
        assert_eq!(csv_field(&Value::from("nas")), "nas");
        assert_eq!(
            csv_field(&Value::from(r#"{"a":1,"b":"x"}"#)),
            r#""{""a"":1,""b"":""x""}""#
        );
    }

    #[test]
    fn test_status_label() {
        assert_eq!(status_label(0), "stable");
        assert_eq!(status_label(5), "watch");
        assert_eq!(status_label(6), "attention");
    }

    #[test]
    fn test_preview_truncates_on_chars() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("ééééé", 3), "ééé...");
    }

    #[test]
    fn test_export_csv_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = Utf8PathBuf::from_path_buf(dir.path().join("logs.db")).unwrap();

        let store = SqliteStore::open(&db_path).unwrap();
        let created_at = Utc.with_ymd_and_hms(2025, 2, 10, 8, 0, 0).unwrap();
        store
            .insert(&NewLogRecord {
                server_type: "nas".to_string(),
                severity: "urgent".to_string(),
                raw_payload: r#"{"disk":"sda","temp":61}"#.to_string(),
                week_bucket: 6,
                created_at,
            })
            .unwrap();
        drop(store);

        let conn = db::init_db(&db_path).unwrap();

        let csv_path = db_path.with_file_name("logs.csv");
        assert_eq!(run_export(&conn, ExportKind::Csv, &csv_path).unwrap(), 1);
        let csv = std::fs::read_to_string(&csv_path).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,server_type,severity,raw_payload,week_bucket,created_at,processed"
        );
        assert_eq!(
            lines.next().unwrap(),
            r#"1,nas,urgent,"{""disk"":""sda"",""temp"":61}",6,2025-02-10 08:00:00,0"#
        );

        let json_path = db_path.with_file_name("logs.json");
        run_export(&conn, ExportKind::Json, &json_path).unwrap();
        let exported: Vec<Value> =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0]["server_type"], "nas");
        assert_eq!(exported[0]["week_bucket"], 6);
    }
}
