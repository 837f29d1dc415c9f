// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through the writer's tokio-rusqlite background
//! thread. Reader connections are opened `query_only` and serve the feed.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tidings_config::model::StorageConfig;
use tidings_core::{BoxError, TidingsError};
use tokio_rusqlite::Connection;
use tracing::{debug, info};

use crate::migrations;

const MEMORY_PATH: &str = ":memory:";

/// Handle to the SQLite store: one writer plus a round-robin reader pool.
///
/// Cloning is cheap; clones share the same connections.
#[derive(Clone)]
pub struct Database {
    inner: Arc<Inner>,
}

struct Inner {
    path: String,
    writer: Connection,
    readers: Vec<Connection>,
    next_reader: AtomicUsize,
}

impl Database {
    /// Open (or create) the database described by `config`, apply pragmas and
    /// run pending migrations, then open the reader pool.
    pub async fn open(config: &StorageConfig) -> Result<Self, TidingsError> {
        let path = config.database_path.clone();
        let in_memory = path == MEMORY_PATH;

        if !in_memory {
            if let Some(parent) = std::path::Path::new(&path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(TidingsError::storage)?;
                }
            }
        }

        let writer = Connection::open(&path).await.map_err(TidingsError::storage)?;
        let busy_timeout = config.busy_timeout();
        let wal_mode = config.wal_mode && !in_memory;
        writer
            .call(move |conn| -> Result<(), TidingsError> {
                apply_writer_pragmas(conn, busy_timeout, wal_mode)?;
                migrations::run_migrations(conn)
            })
            .await
            .map_err(flatten_call_err)?;

        // An in-memory database is private to its connection, so readers
        // would see an empty schema. Reads go to the writer instead.
        let pool_size = if in_memory { 0 } else { config.read_pool_size };
        let mut readers = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let reader = Connection::open(&path).await.map_err(TidingsError::storage)?;
            reader
                .call(move |conn| -> Result<(), rusqlite::Error> {
                    conn.busy_timeout(busy_timeout)?;
                    conn.pragma_update(None, "query_only", "ON")?;
                    Ok(())
                })
                .await
                .map_err(map_tr_err)?;
            readers.push(reader);
        }

        info!(path = %path, wal = wal_mode, readers = readers.len(), "database opened");
        Ok(Self {
            inner: Arc::new(Inner {
                path,
                writer,
                readers,
                next_reader: AtomicUsize::new(0),
            }),
        })
    }

    /// Open with default settings at `path`.
    pub async fn open_path(path: impl Into<String>) -> Result<Self, TidingsError> {
        Self::open(&StorageConfig::at_path(path)).await
    }

    /// The writer connection. Every unit of work runs here.
    pub fn connection(&self) -> &Connection {
        &self.inner.writer
    }

    /// A reader connection, chosen round-robin. Falls back to the writer when
    /// the pool is empty.
    pub fn reader(&self) -> &Connection {
        let readers = &self.inner.readers;
        if readers.is_empty() {
            return &self.inner.writer;
        }
        let idx = self.inner.next_reader.fetch_add(1, Ordering::Relaxed) % readers.len();
        &readers[idx]
    }

    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Round-trip a trivial statement on the writer and one reader.
    pub async fn health_check(&self) -> Result<(), TidingsError> {
        self.connection()
            .call(|conn| conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)))
            .await
            .map_err(map_tr_err)?;
        self.reader()
            .call(|conn| conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)))
            .await
            .map_err(map_query_err)?;
        Ok(())
    }

    /// Checkpoint the WAL so the main database file is self-contained.
    pub async fn close(&self) -> Result<(), TidingsError> {
        self.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!(path = %self.inner.path, "WAL checkpoint complete");
        Ok(())
    }
}

fn apply_writer_pragmas(
    conn: &rusqlite::Connection,
    busy_timeout: Duration,
    wal_mode: bool,
) -> Result<(), TidingsError> {
    conn.busy_timeout(busy_timeout)
        .map_err(TidingsError::storage)?;
    if wal_mode {
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(TidingsError::storage)?;
        if !mode.eq_ignore_ascii_case("wal") {
            return Err(TidingsError::storage(format!(
                "journal_mode is `{mode}`, expected `wal`"
            )));
        }
    }
    conn.pragma_update(None, "synchronous", "NORMAL")
        .map_err(TidingsError::storage)?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(TidingsError::storage)?;
    Ok(())
}

fn unwrap_call_err<E>(e: tokio_rusqlite::Error<E>) -> BoxError
where
    E: Into<BoxError> + std::fmt::Display,
{
    match e {
        tokio_rusqlite::Error::Error(inner) => inner.into(),
        other => other.to_string().into(),
    }
}

/// Map a writer-side tokio-rusqlite error to [`TidingsError::Storage`].
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> TidingsError {
    TidingsError::Storage {
        source: unwrap_call_err(e),
    }
}

/// Map a reader-side tokio-rusqlite error to [`TidingsError::Query`].
pub(crate) fn map_query_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> TidingsError {
    TidingsError::Query {
        source: unwrap_call_err(e),
    }
}

/// Closures that already speak [`TidingsError`] keep their error; connection
/// failures become `Storage`.
pub(crate) fn flatten_call_err(e: tokio_rusqlite::Error<TidingsError>) -> TidingsError {
    match e {
        tokio_rusqlite::Error::Error(inner) => inner,
        other => TidingsError::storage(other.to_string()),
    }
}
