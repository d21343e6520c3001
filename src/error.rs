// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors surfaced to HTTP clients.

use crate::store::StoreError;
use crate::week::WeekError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    StoreUnavailable(String),

    #[error("{0}")]
    InvalidTimestamp(String),
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "ValidationError",
            ApiError::StoreUnavailable(_) => "StoreUnavailable",
            ApiError::InvalidTimestamp(_) => "InvalidTimestamp",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InvalidTimestamp(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timestamp(inner) => inner.into(),
            other => ApiError::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<WeekError> for ApiError {
    fn from(err: WeekError) -> Self {
        ApiError::InvalidTimestamp(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "request failed: {self}");
        } else {
            tracing::warn!(kind = self.kind(), "request rejected: {self}");
        }

        let body = Json(json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
            }
        }));
        (status, body).into_response()
    }
}
