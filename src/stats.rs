// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dashboard statistics.
//!
//! The aggregate queries are independent of each other, so they run
//! concurrently on the blocking pool and are joined before the report is
//! assembled. A failure in any of them fails the whole report.

use crate::store::{LogStore, ServerCount, StoreError, WeekCount};
use crate::week;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Severity label counted separately in the report.
pub const URGENT_SEVERITY: &str = "urgent";

#[derive(Debug, Clone)]
pub struct StatsOptions {
    pub trend_periods: usize,
    pub urgent_severity: String,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            trend_periods: week::DEFAULT_TREND_PERIODS,
            urgent_severity: URGENT_SEVERITY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub total_logs_count: u64,
    pub urgent_logs_count: u64,
    pub logs_by_server: Vec<ServerCount>,
    pub weekly_trend: Vec<WeekCount>,
}

async fn run_blocking<T, F>(store: &Arc<dyn LogStore>, query: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce(&dyn LogStore) -> Result<T, StoreError> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || query(store.as_ref()))
        .await
        .map_err(|err| StoreError::Task(err.to_string()))?
}

/// Build the stats report as seen at `now`.
///
/// Totals cover unprocessed records tagged with the previous week's bucket.
/// The trend covers every record created in the trailing weeks.
pub async fn collect_stats(
    store: &Arc<dyn LogStore>,
    now: DateTime<Utc>,
    options: &StatsOptions,
) -> Result<StatsReport, StoreError> {
    let bucket = week::previous_week_index(now);
    let since = week::window_start(now, options.trend_periods);
    let severity = options.urgent_severity.clone();

    let (total, urgent, by_server, daily, earliest) = tokio::try_join!(
        run_blocking(store, move |s| s.count_pending(bucket)),
        run_blocking(store, move |s| s.count_pending_with_severity(bucket, &severity)),
        run_blocking(store, move |s| s.pending_by_server(bucket)),
        run_blocking(store, move |s| s.daily_counts_since(since)),
        run_blocking(store, |s| s.earliest_created_at()),
    )?;

    let keys = week::trend_window_since(now, options.trend_periods, earliest);
    tracing::debug!(bucket, periods = keys.len(), "collected stats");

    Ok(StatsReport {
        total_logs_count: total,
        urgent_logs_count: urgent,
        logs_by_server: by_server,
        weekly_trend: weekly_trend(&keys, &daily),
    })
}

/// Same report for synchronous callers such as the CLI.
pub fn collect_stats_blocking(
    store: &dyn LogStore,
    now: DateTime<Utc>,
    options: &StatsOptions,
) -> Result<StatsReport, StoreError> {
    let bucket = week::previous_week_index(now);
    let daily = store.daily_counts_since(week::window_start(now, options.trend_periods))?;
    let keys = week::trend_window_since(now, options.trend_periods, store.earliest_created_at()?);

    Ok(StatsReport {
        total_logs_count: store.count_pending(bucket)?,
        urgent_logs_count: store.count_pending_with_severity(bucket, &options.urgent_severity)?,
        logs_by_server: store.pending_by_server(bucket)?,
        weekly_trend: weekly_trend(&keys, &daily),
    })
}

/// Sum daily counts into the given week keys, keeping their order. Weeks
/// without records report zero; days outside the keys are ignored.
pub fn weekly_trend(keys: &[String], daily: &[(NaiveDate, u64)]) -> Vec<WeekCount> {
    let mut totals: BTreeMap<String, u64> = BTreeMap::new();
    for (date, count) in daily {
        *totals.entry(week::year_week_key_for_date(*date)).or_insert(0) += count;
    }

    keys.iter()
        .map(|key| WeekCount {
            week: key.clone(),
            count: totals.get(key).copied().unwrap_or(0),
        })
        .collect()
}
