// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Self-hosted log ingestion with a weekly statistics dashboard.

pub mod api;
pub mod charts;
pub mod client;
pub mod clock;
pub mod commands;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod query;
pub mod server;
pub mod stats;
pub mod store;
pub mod week;
