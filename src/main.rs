// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Log ingestion service and dashboard statistics.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    homelab_logs::dispatch::dispatch().await
}
