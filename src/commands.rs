// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command implementations.

use crate::store::LogStore;
use crate::{api, charts, client, config::Config, db, query, server, stats, week};
use anyhow::{Context, Result};
use camino::Utf8Path;
use chrono::Utc;
use std::net::SocketAddr;

/// Run the HTTP service.
pub async fn run_serve(config: &Config, bind: Option<SocketAddr>) -> Result<()> {
    server::init_tracing();
    server::serve(config, bind).await
}

/// Push a single record to a running server.
pub async fn run_push(url: &str, server_type: String, severity: String, payload: &str) -> Result<()> {
    let log = client::PushLog {
        server_type,
        severity,
        raw_payload: client::parse_payload(payload),
    };

    let response = client::push_log(url, &log)
        .await
        .with_context(|| format!("failed to push log to {}", url))?;
    println!("{} (id {})", response.message, response.id);
    Ok(())
}

/// Print the dashboard statistics for the current week.
pub fn run_stats(database: &Utf8Path, config: &Config) -> Result<()> {
    let store = db::SqliteStore::open(database).context("failed to open database")?;
    let now = Utc::now();

    let report = stats::collect_stats_blocking(&store, now, &config.stats.options())
        .context("failed to compute statistics")?;
    query::print_stats(&report, week::previous_week_index(now));
    Ok(())
}

/// Print the most recent records. Without a positive `limit` the configured
/// default is used.
pub fn run_recent(database: &Utf8Path, config: &Config, limit: Option<usize>) -> Result<()> {
    let limit = api::resolve_limit(limit, config.stats.recent_limit);
    let store = db::SqliteStore::open(database).context("failed to open database")?;
    let logs = store.recent(limit).context("failed to read recent logs")?;
    query::print_recent(&logs);
    Ok(())
}

/// Export every record to a file.
pub fn run_export(database: &Utf8Path, kind: query::ExportKind, output: &Utf8Path) -> Result<()> {
    let conn = db::init_db(database).context("failed to open database")?;
    query::run_export(&conn, kind, output)?;
    Ok(())
}

/// Render the dashboard charts to PNG files.
pub fn run_charts(database: &Utf8Path, config: &Config, output_dir: &Utf8Path) -> Result<()> {
    let store = db::SqliteStore::open(database).context("failed to open database")?;
    let now = Utc::now();

    let report = stats::collect_stats_blocking(&store, now, &config.stats.options())
        .context("failed to compute statistics")?;
    charts::generate_all_charts(&report, week::previous_week_index(now), output_dir)?;
    Ok(())
}
