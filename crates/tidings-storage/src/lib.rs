// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for Tidings.
//!
//! WAL-mode SQLite with embedded migrations, a single writer connection that
//! runs every unit of work, and a pool of `query_only` readers serving the
//! feed. The ingest path reaches the store through the [`ports`] traits so
//! tests can inject faults.

pub mod database;
pub mod migrations;
pub mod ports;
pub mod queries;
pub mod tx;

pub use database::Database;
pub use ports::{DedupLedger, InboxWriter, OutboxWriter, Stores};
pub use queries::feed::SqliteFeedReader;
pub use queries::stats::TableCounts;
pub use tx::TxContext;
