// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite storage for log records.

use crate::store::{LogRecord, LogStore, NewLogRecord, ServerCount, StoreError};
use crate::week::{self, WeekError};
use anyhow::{Context, Result};
use camino::Utf8Path;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use std::sync::{Mutex, MutexGuard};

/// SQLite allows 32766 bound parameters; stay well below it.
const MAX_IDS_PER_STATEMENT: usize = 500;

const LOG_COLUMNS: &str =
    "id, server_type, severity, raw_payload, week_bucket, created_at, processed";

/// Open the database at `path` and make sure the schema exists.
///
/// `:memory:` opens a private in-memory database.
pub fn init_db(path: &Utf8Path) -> Result<Connection> {
    let conn = Connection::open(path.as_std_path())
        .with_context(|| format!("failed to open database at {}", path))?;
    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> Result<()> {
    // journal_mode and synchronous persist in the file; the rest are
    // per-connection.
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA cache_size = -16000;
        PRAGMA temp_store = MEMORY;
        "#,
    )
    .context("failed to set database pragmas")?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            server_type TEXT NOT NULL,
            severity TEXT NOT NULL,
            raw_payload TEXT NOT NULL,
            week_bucket INTEGER NOT NULL CHECK (week_bucket BETWEEN 0 AND 53),
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP, -- UTC, YYYY-MM-DD HH:MM:SS
            processed INTEGER NOT NULL DEFAULT 0 CHECK (processed IN (0, 1))
        );

        CREATE INDEX IF NOT EXISTS idx_logs_pending ON logs(processed, week_bucket);
        CREATE INDEX IF NOT EXISTS idx_logs_created ON logs(created_at);

        -- Records only ever move from unprocessed to processed.
        CREATE TRIGGER IF NOT EXISTS logs_processed_one_way
        BEFORE UPDATE OF processed ON logs
        WHEN OLD.processed = 1 AND NEW.processed = 0
        BEGIN
            SELECT RAISE(ABORT, 'processed flag cannot be cleared');
        END;

        -- Identity and week tagging are fixed at insert time.
        CREATE TRIGGER IF NOT EXISTS logs_frozen_columns
        BEFORE UPDATE OF id, week_bucket, created_at ON logs
        WHEN OLD.id IS NOT NEW.id
          OR OLD.week_bucket IS NOT NEW.week_bucket
          OR OLD.created_at IS NOT NEW.created_at
        BEGIN
            SELECT RAISE(ABORT, 'log identity and week bucket are immutable');
        END;
        "#,
    )
    .context("failed to initialize database schema")?;

    Ok(())
}

/// Raw column values of a `logs` row, before timestamp validation.
struct RawLogRow {
    id: i64,
    server_type: String,
    severity: String,
    raw_payload: String,
    week_bucket: u32,
    created_at: Option<String>,
    processed: bool,
}

impl RawLogRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            server_type: row.get(1)?,
            severity: row.get(2)?,
            raw_payload: row.get(3)?,
            week_bucket: row.get(4)?,
            created_at: row.get(5)?,
            processed: row.get(6)?,
        })
    }

    fn into_record(self) -> Result<LogRecord, WeekError> {
        Ok(LogRecord {
            id: self.id,
            server_type: self.server_type,
            severity: self.severity,
            raw_payload: self.raw_payload,
            week_bucket: self.week_bucket,
            created_at: week::parse_timestamp(self.created_at.as_deref())?,
            processed: self.processed,
        })
    }
}

/// [`LogStore`] backed by a single SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Open (and if needed create) the database at `path`.
    pub fn open(path: &Utf8Path) -> Result<Self> {
        Ok(Self::new(init_db(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        init_schema(&conn)?;
        Ok(Self::new(conn))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn query_logs(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<LogRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, RawLogRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|row| row.into_record().map_err(StoreError::from))
            .collect()
    }
}

impl LogStore for SqliteStore {
    fn insert(&self, record: &NewLogRecord) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO logs (server_type, severity, raw_payload, week_bucket, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.server_type,
                record.severity,
                record.raw_payload,
                record.week_bucket,
                week::format_timestamp(record.created_at),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn mark_processed(&self, ids: &[i64]) -> Result<usize, StoreError> {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let conn = self.lock()?;
        // Every chunk commits together or not at all.
        let tx = conn.unchecked_transaction()?;
        let mut updated = 0;
        for chunk in ids.chunks(MAX_IDS_PER_STATEMENT) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!("UPDATE logs SET processed = 1 WHERE id IN ({placeholders})");
            updated += tx.execute(&sql, params_from_iter(chunk))?;
        }
        tx.commit()?;
        Ok(updated)
    }

    fn count_pending(&self, week_bucket: u32) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM logs WHERE processed = 0 AND week_bucket = ?1",
            [week_bucket],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_pending_with_severity(
        &self,
        week_bucket: u32,
        severity: &str,
    ) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM logs
             WHERE processed = 0 AND week_bucket = ?1 AND severity = ?2",
            params![week_bucket, severity],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn pending_by_server(&self, week_bucket: u32) -> Result<Vec<ServerCount>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT server_type, COUNT(*) AS total
             FROM logs
             WHERE processed = 0 AND week_bucket = ?1
             GROUP BY server_type
             ORDER BY total DESC, server_type ASC",
        )?;

        let counts = stmt
            .query_map([week_bucket], |row| {
                Ok(ServerCount {
                    server_type: row.get(0)?,
                    count: row.get::<_, i64>(1)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    }

    fn pending_logs(&self, week_bucket: u32) -> Result<Vec<LogRecord>, StoreError> {
        self.query_logs(
            &format!(
                "SELECT {LOG_COLUMNS} FROM logs
                 WHERE processed = 0 AND week_bucket = ?1
                 ORDER BY server_type ASC, created_at ASC, id ASC"
            ),
            [week_bucket],
        )
    }

    fn daily_counts_since(&self, since: NaiveDate) -> Result<Vec<(NaiveDate, u64)>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT date(created_at) AS day, COUNT(*)
             FROM logs
             WHERE created_at >= ?1
             GROUP BY day
             ORDER BY day ASC",
        )?;

        let rows = stmt
            .query_map([since.to_string()], |row| {
                Ok((row.get::<_, Option<String>>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(day, count)| -> Result<(NaiveDate, u64), StoreError> {
                let day = day.ok_or_else(|| WeekError::InvalidTimestamp("null".to_string()))?;
                let date = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
                    .map_err(|_| WeekError::InvalidTimestamp(day.clone()))?;
                Ok((date, count as u64))
            })
            .collect()
    }

    fn earliest_created_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let conn = self.lock()?;
        let earliest: Option<String> = conn
            .query_row("SELECT MIN(created_at) FROM logs", [], |row| {
                row.get::<_, Option<String>>(0)
            })
            .optional()?
            .flatten();

        match earliest {
            Some(raw) => Ok(Some(week::parse_timestamp(Some(&raw))?)),
            None => Ok(None),
        }
    }

    fn recent(&self, limit: usize) -> Result<Vec<LogRecord>, StoreError> {
        self.query_logs(
            &format!(
                "SELECT {LOG_COLUMNS} FROM logs
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?1"
            ),
            [i64::try_from(limit).unwrap_or(i64::MAX)],
        )
    }
}
