// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client for pushing log records to a running server.

use crate::api::IngestResponse;
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushLog {
    pub server_type: String,
    pub severity: String,
    pub raw_payload: Value,
}

/// Push one record to the server at `base_url` and return the assigned id.
pub async fn push_log(base_url: &str, log: &PushLog) -> Result<IngestResponse> {
    let url = format!("{}/api/logs", base_url.trim_end_matches('/'));

    let client = reqwest::Client::new();
    let response = client
        .post(&url)
        .header("User-Agent", "homelab-logs-push")
        .json(log)
        .send()
        .await
        .with_context(|| format!("failed to send log to {}", url))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("server rejected log with status {}: {}", status, body);
    }

    response
        .json::<IngestResponse>()
        .await
        .context("failed to parse server response")
}

/// Interpret a command-line payload: JSON when it parses, otherwise the raw
/// text as a JSON string.
pub fn parse_payload(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AppState, DEFAULT_RECENT_LIMIT};
    use crate::clock::SystemClock;
    use crate::db::SqliteStore;
    use crate::server;
    use crate::stats::StatsOptions;
    use crate::store::LogStore;
    use std::sync::Arc;

    #[test]
    fn test_parse_payload() {
        assert_eq!(parse_payload(r#"{"a":1}"#), serde_json::json!({"a": 1}));
        assert_eq!(parse_payload("disk full"), Value::String("disk full".to_string()));
    }

    #[tokio::test]
    async fn test_push_log_round_trip() {
        let store: Arc<dyn LogStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let state = AppState {
            store: Arc::clone(&store),
            clock: Arc::new(SystemClock),
            stats: StatsOptions::default(),
            recent_limit: DEFAULT_RECENT_LIMIT,
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, server::router(state, None)).await.unwrap();
        });

        let log = PushLog {
            server_type: "nas".to_string(),
            severity: "urgent".to_string(),
            raw_payload: parse_payload(r#"{"disk":"sdb","status":"degraded"}"#),
        };
        let response = push_log(&format!("http://{address}/"), &log).await.unwrap();

        let stored = store.recent(1).unwrap();
        assert_eq!(stored[0].id, response.id);
        assert_eq!(stored[0].raw_payload, r#"{"disk":"sdb","status":"degraded"}"#);
    }

    #[tokio::test]
    async fn test_push_log_reports_rejection() {
        let store: Arc<dyn LogStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let state = AppState {
            store,
            clock: Arc::new(SystemClock),
            stats: StatsOptions::default(),
            recent_limit: DEFAULT_RECENT_LIMIT,
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, server::router(state, None)).await.unwrap();
        });

        let log = PushLog {
            server_type: String::new(),
            severity: "info".to_string(),
            raw_payload: Value::Null,
        };
        let err = push_log(&format!("http://{address}"), &log).await.unwrap_err();
        assert!(err.to_string().contains("400"), "{err}");
    }
}
