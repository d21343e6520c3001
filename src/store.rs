// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Log record types and the storage interface.

use crate::week::WeekError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A persisted log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub id: i64,
    pub server_type: String,
    pub severity: String,
    /// Serialized JSON as supplied by the client.
    pub raw_payload: String,
    pub week_bucket: u32,
    pub created_at: DateTime<Utc>,
    pub processed: bool,
}

/// A record about to be inserted. The week bucket is computed by the caller
/// from `created_at` and never recomputed afterwards.
#[derive(Debug, Clone)]
pub struct NewLogRecord {
    pub server_type: String,
    pub severity: String,
    pub raw_payload: String,
    pub week_bucket: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCount {
    pub server_type: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekCount {
    pub week: String,
    pub count: u64,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("database connection lock poisoned")]
    Poisoned,

    #[error("store task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Timestamp(#[from] WeekError),
}

/// Storage for log records.
///
/// Methods are blocking; async callers run them on the blocking pool.
pub trait LogStore: Send + Sync {
    /// Insert a record and return its id.
    fn insert(&self, record: &NewLogRecord) -> Result<i64, StoreError>;

    /// Set `processed` on every listed id. Returns how many records matched.
    fn mark_processed(&self, ids: &[i64]) -> Result<usize, StoreError>;

    /// Unprocessed records in `week_bucket`.
    fn count_pending(&self, week_bucket: u32) -> Result<u64, StoreError>;

    /// Unprocessed records in `week_bucket` with the given severity.
    fn count_pending_with_severity(
        &self,
        week_bucket: u32,
        severity: &str,
    ) -> Result<u64, StoreError>;

    /// Unprocessed records in `week_bucket` grouped by server type, largest
    /// group first.
    fn pending_by_server(&self, week_bucket: u32) -> Result<Vec<ServerCount>, StoreError>;

    /// Unprocessed records in `week_bucket`, ordered by server type then age.
    fn pending_logs(&self, week_bucket: u32) -> Result<Vec<LogRecord>, StoreError>;

    /// Number of records created on each day from `since` onwards.
    fn daily_counts_since(&self, since: NaiveDate) -> Result<Vec<(NaiveDate, u64)>, StoreError>;

    /// Creation time of the oldest record, if any.
    fn earliest_created_at(&self) -> Result<Option<DateTime<Utc>>, StoreError>;

    /// The `limit` newest records, newest first.
    fn recent(&self, limit: usize) -> Result<Vec<LogRecord>, StoreError>;
}
