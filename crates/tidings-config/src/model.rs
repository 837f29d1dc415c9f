// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key fails
//! at startup instead of being silently ignored.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Tidings configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TidingsConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// SQLite store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Ingest unit-of-work settings.
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Process identity and logging.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Name reported in logs and by `tidings doctor`.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "tidings".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// SQLite store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL mode. Required for readers to proceed alongside the writer.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// How long a statement waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Number of read-only connections serving feed queries.
    #[serde(default = "default_read_pool_size")]
    pub read_pool_size: usize,
}

impl StorageConfig {
    /// Defaults with an explicit database path.
    pub fn at_path(path: impl Into<String>) -> Self {
        Self {
            database_path: path.into(),
            ..Self::default()
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
            read_pool_size: default_read_pool_size(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("tidings").join("tidings.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("tidings.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_read_pool_size() -> usize {
    4
}

/// Ingest configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    /// Deadline for one ingest unit of work, including the wait for the
    /// writer connection.
    #[serde(default = "default_tx_timeout_ms")]
    pub tx_timeout_ms: u64,
}

impl IngestConfig {
    pub fn tx_timeout(&self) -> Duration {
        Duration::from_millis(self.tx_timeout_ms)
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            tx_timeout_ms: default_tx_timeout_ms(),
        }
    }
}

fn default_tx_timeout_ms() -> u64 {
    5_000
}
