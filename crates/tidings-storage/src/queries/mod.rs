// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules, one per table, plus the feed and diagnostics.
//!
//! Functions taking `&rusqlite::Connection` are synchronous and run inside a
//! caller's unit of work (a `Transaction` derefs to a `Connection`). Functions
//! taking `&Database` are async and own their statement.

pub mod feed;
pub mod inbox;
pub mod outbox;
pub mod processed;
pub mod stats;

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;
use tidings_core::time::parse_timestamp;

/// Read a fixed-width RFC 3339 text column.
pub(crate) fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Read a text column holding a strum-encoded enum.
pub(crate) fn enum_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
