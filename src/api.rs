// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP handlers.

use crate::clock::Clock;
use crate::error::ApiError;
use crate::stats::{self, StatsOptions, StatsReport};
use crate::store::{LogRecord, LogStore, NewLogRecord, StoreError};
use crate::week;
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

/// Number of records returned by the recent-logs endpoint when the requested
/// limit is missing, zero or not a number.
pub const DEFAULT_RECENT_LIMIT: usize = 20;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LogStore>,
    pub clock: Arc<dyn Clock>,
    pub stats: StatsOptions,
    pub recent_limit: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    #[serde(alias = "server_type")]
    pub server_type: Option<String>,
    pub severity: Option<String>,
    #[serde(alias = "raw_payload", alias = "raw_logs")]
    pub raw_payload: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub id: i64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct MarkProcessedRequest {
    pub ids: Option<Vec<i64>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkProcessedResponse {
    pub updated: usize,
}

fn required_label(value: Option<String>, field: &str) -> Result<String, ApiError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::Validation(format!("missing or empty {field}"))),
    }
}

impl IngestRequest {
    fn validate(self) -> Result<(String, String, String), ApiError> {
        let server_type = required_label(self.server_type, "serverType")?;
        let severity = required_label(self.severity, "severity")?;
        let raw_payload = self
            .raw_payload
            .ok_or_else(|| ApiError::Validation("missing rawPayload".to_string()))?;

        Ok((server_type, severity, raw_payload.to_string()))
    }
}

async fn blocking<T, F>(state: &AppState, query: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&dyn LogStore) -> Result<T, StoreError> + Send + 'static,
{
    let store = Arc::clone(&state.store);
    let result = tokio::task::spawn_blocking(move || query(store.as_ref()))
        .await
        .map_err(|err| StoreError::Task(err.to_string()))?;
    Ok(result?)
}

/// Parse the `limit` path segment, falling back to `default` for zero or
/// anything that is not a non-negative integer.
pub fn parse_limit(raw: &str, default: usize) -> usize {
    resolve_limit(raw.trim().parse::<usize>().ok(), default)
}

/// A requested record limit, with zero or no request meaning `default`.
pub fn resolve_limit(requested: Option<usize>, default: usize) -> usize {
    requested.filter(|&limit| limit > 0).unwrap_or(default)
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub async fn ingest_log(
    State(state): State<AppState>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    let Json(request) = payload.map_err(|err| ApiError::Validation(err.body_text()))?;
    let (server_type, severity, raw_payload) = request.validate()?;

    let now = state.clock.now();
    let record = NewLogRecord {
        server_type,
        severity,
        raw_payload,
        week_bucket: week::current_week_index(now),
        created_at: now,
    };
    let week_bucket = record.week_bucket;

    let id = blocking(&state, move |store| store.insert(&record)).await?;
    tracing::info!(id, week_bucket, "log ingested");

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            id,
            message: "Log inserted successfully".to_string(),
        }),
    ))
}

pub async fn mark_processed(
    State(state): State<AppState>,
    payload: Result<Json<MarkProcessedRequest>, JsonRejection>,
) -> Result<Json<MarkProcessedResponse>, ApiError> {
    let Json(request) = payload.map_err(|err| ApiError::Validation(err.body_text()))?;
    let ids = request
        .ids
        .ok_or_else(|| ApiError::Validation("missing ids array".to_string()))?;

    let requested = ids.len();
    let updated = blocking(&state, move |store| store.mark_processed(&ids)).await?;
    tracing::info!(requested, updated, "marked logs processed");

    Ok(Json(MarkProcessedResponse { updated }))
}

pub async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsReport>, ApiError> {
    let report = stats::collect_stats(&state.store, state.clock.now(), &state.stats).await?;
    Ok(Json(report))
}

/// Unprocessed records from the previous week.
pub async fn pending_logs(State(state): State<AppState>) -> Result<Json<Vec<LogRecord>>, ApiError> {
    let bucket = week::previous_week_index(state.clock.now());
    let logs = blocking(&state, move |store| store.pending_logs(bucket)).await?;
    Ok(Json(logs))
}

pub async fn recent_logs(
    State(state): State<AppState>,
    Path(limit): Path<String>,
) -> Result<Json<Vec<LogRecord>>, ApiError> {
    let limit = parse_limit(&limit, state.recent_limit);
    let logs = blocking(&state, move |store| store.recent(limit)).await?;
    Ok(Json(logs))
}

pub async fn recent_logs_default(
    State(state): State<AppState>,
) -> Result<Json<Vec<LogRecord>>, ApiError> {
    let limit = state.recent_limit;
    let logs = blocking(&state, move |store| store.recent(limit)).await?;
    Ok(Json(logs))
}
