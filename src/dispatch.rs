// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CLI argument parsing and command dispatch.

use crate::{commands, config, query};
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use std::net::SocketAddr;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the SQLite database file (overrides the configuration)
    #[arg(short, long, global = true)]
    database: Option<Utf8PathBuf>,

    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: Utf8PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Parser, Debug)]
enum Command {
    /// Run the ingestion and dashboard HTTP service
    Serve {
        /// Address to listen on (overrides the configuration)
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// Push a log record to a running server
    Push {
        /// Base URL of the server
        #[arg(short, long, default_value = "http://localhost:3000")]
        url: String,

        /// Label of the machine or service producing the log
        #[arg(short = 't', long)]
        server_type: String,

        /// Severity label; "urgent" is counted separately
        #[arg(short, long, default_value = "info")]
        severity: String,

        /// Payload, as JSON or plain text
        #[arg(short, long)]
        payload: String,
    },

    /// Show unprocessed logs from the previous week and the weekly trend
    Stats,

    /// Show the most recent logs
    Recent {
        /// Number of logs to show (defaults to stats.recent_limit)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Export all logs
    Export {
        #[command(subcommand)]
        export_type: ExportType,
    },

    /// Generate charts from stored logs
    Charts {
        /// Output directory for charts
        #[arg(short, long, default_value = "charts")]
        output: Utf8PathBuf,
    },
}

#[derive(Parser, Debug)]
enum ExportType {
    /// Export to CSV format
    Csv {
        /// Output file path
        #[arg(short, long)]
        output: Utf8PathBuf,
    },

    /// Export to JSON format
    Json {
        /// Output file path
        #[arg(short, long)]
        output: Utf8PathBuf,
    },
}

/// Parse arguments and dispatch to the appropriate command.
pub async fn dispatch() -> Result<()> {
    let args = Args::parse();
    let mut config =
        config::Config::load_or_default(&args.config).context("failed to load configuration")?;
    if let Some(database) = args.database {
        config.database.path = database;
    }
    let database = config.database.path.clone();

    match args.command {
        Command::Serve { bind } => {
            commands::run_serve(&config, bind).await?;
        }
        Command::Push {
            url,
            server_type,
            severity,
            payload,
        } => {
            commands::run_push(&url, server_type, severity, &payload).await?;
        }
        Command::Stats => {
            commands::run_stats(&database, &config)?;
        }
        Command::Recent { limit } => {
            commands::run_recent(&database, &config, limit)?;
        }
        Command::Export { export_type } => {
            let (kind, output) = match export_type {
                ExportType::Csv { output } => (query::ExportKind::Csv, output),
                ExportType::Json { output } => (query::ExportKind::Json, output),
            };
            commands::run_export(&database, kind, &output)?;
        }
        Command::Charts { output } => {
            commands::run_charts(&database, &config, &output)?;
        }
    }

    Ok(())
}
