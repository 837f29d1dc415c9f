// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded schema migrations using refinery.
//!
//! SQL files under `migrations/` are compiled into the binary and applied on
//! every [`crate::Database::open`].

use tidings_core::TidingsError;
use tracing::debug;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Run all pending migrations against the given connection.
///
/// Refinery tracks applied versions in `refinery_schema_history`.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), TidingsError> {
    let report = embedded::migrations::runner()
        .run(conn)
        .map_err(TidingsError::storage)?;
    for migration in report.applied_migrations() {
        debug!(version = migration.version(), name = migration.name(), "migration applied");
    }
    Ok(())
}
