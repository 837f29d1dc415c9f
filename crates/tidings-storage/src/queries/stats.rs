// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row counts for `tidings doctor` and tests.

use tidings_core::TidingsError;

use crate::database::{Database, map_query_err};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub inbox_items: i64,
    pub processed_events: i64,
    pub outbox: i64,
}

pub async fn table_counts(db: &Database) -> Result<TableCounts, TidingsError> {
    db.reader()
        .call(|conn| {
            let count = |table: &str| {
                conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get::<_, i64>(0)
                })
            };
            Ok(TableCounts {
                inbox_items: count("inbox_items")?,
                processed_events: count("processed_events")?,
                outbox: count("outbox")?,
            })
        })
        .await
        .map_err(map_query_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn fresh_database_is_empty() {
        let dir = tempdir().unwrap();
        let db = Database::open_path(dir.path().join("s.db").to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(table_counts(&db).await.unwrap(), TableCounts::default());
    }
}
