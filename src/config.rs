// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service configuration.

use crate::api::DEFAULT_RECENT_LIMIT;
use crate::stats::{StatsOptions, URGENT_SEVERITY};
use crate::week::DEFAULT_TREND_PERIODS;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub stats: StatsConfig,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Directory holding the dashboard's static files.
    pub static_dir: Option<Utf8PathBuf>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Utf8PathBuf,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct StatsConfig {
    pub trend_periods: usize,
    pub recent_limit: usize,
    pub urgent_severity: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            static_dir: Some(Utf8PathBuf::from("public")),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: Utf8PathBuf::from("logs.db"),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            trend_periods: DEFAULT_TREND_PERIODS,
            recent_limit: DEFAULT_RECENT_LIMIT,
            urgent_severity: URGENT_SEVERITY.to_string(),
        }
    }
}

impl StatsConfig {
    pub fn options(&self) -> StatsOptions {
        StatsOptions {
            trend_periods: self.trend_periods,
            urgent_severity: self.urgent_severity.clone(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let content = fs::read_to_string(path.as_std_path())
            .with_context(|| format!("failed to read config file at {}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file at {}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Utf8Path) -> Result<Self> {
        if path.as_std_path().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        if self.stats.trend_periods == 0 {
            anyhow::bail!("stats.trend_periods must be at least 1");
        }
        if self.stats.recent_limit == 0 {
            anyhow::bail!("stats.recent_limit must be at least 1");
        }
        Ok(())
    }
}
