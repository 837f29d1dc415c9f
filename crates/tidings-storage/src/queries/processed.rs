// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dedup ledger: which source events have been applied, per tenant.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use tidings_core::time::format_timestamp;
use tidings_core::{EventId, ProcessedEvent, TenantId, TidingsError};

use super::timestamp_column;
use crate::database::{Database, map_query_err};
use crate::ports::DedupLedger;

pub fn already_processed(
    conn: &Connection,
    tenant_id: &TenantId,
    event_id: &EventId,
) -> Result<bool, TidingsError> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM processed_events WHERE tenant_id = ?1 AND event_id = ?2)",
        params![tenant_id.as_str(), event_id.as_str()],
        |row| row.get::<_, bool>(0),
    )
    .map_err(TidingsError::storage)
}

/// Record `event_id` as processed. A second call for the same pair is a no-op.
pub fn mark_processed(
    conn: &Connection,
    tenant_id: &TenantId,
    event_id: &EventId,
    processed_at: DateTime<Utc>,
) -> Result<(), TidingsError> {
    conn.execute(
        "INSERT INTO processed_events (tenant_id, event_id, processed_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT (tenant_id, event_id) DO NOTHING",
        params![
            tenant_id.as_str(),
            event_id.as_str(),
            format_timestamp(&processed_at)
        ],
    )
    .map_err(TidingsError::storage)?;
    Ok(())
}

pub async fn get_processed(
    db: &Database,
    tenant_id: &TenantId,
    event_id: &EventId,
) -> Result<Option<ProcessedEvent>, TidingsError> {
    let tenant_id = tenant_id.clone();
    let event_id = event_id.clone();
    db.reader()
        .call(move |conn| {
            conn.query_row(
                "SELECT tenant_id, event_id, processed_at FROM processed_events
                 WHERE tenant_id = ?1 AND event_id = ?2",
                params![tenant_id.as_str(), event_id.as_str()],
                |row| {
                    Ok(ProcessedEvent {
                        tenant_id: TenantId(row.get(0)?),
                        event_id: EventId(row.get(1)?),
                        processed_at: timestamp_column(row, 2)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_query_err)
}

/// SQLite-backed [`DedupLedger`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDedupLedger;

impl DedupLedger for SqliteDedupLedger {
    fn already_processed(
        &self,
        tx: &Transaction<'_>,
        tenant_id: &TenantId,
        event_id: &EventId,
    ) -> Result<bool, TidingsError> {
        already_processed(tx, tenant_id, event_id)
    }

    fn mark_processed(
        &self,
        tx: &Transaction<'_>,
        tenant_id: &TenantId,
        event_id: &EventId,
        processed_at: DateTime<Utc>,
    ) -> Result<(), TidingsError> {
        mark_processed(tx, tenant_id, event_id, processed_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::TxContext;
    use tempfile::tempdir;
    use tidings_core::time;

    #[tokio::test]
    async fn mark_is_idempotent_and_tenant_scoped() {
        let dir = tempdir().unwrap();
        let db = Database::open_path(dir.path().join("p.db").to_str().unwrap())
            .await
            .unwrap();
        let first_at = time::now();

        let seen = db
            .with_tx(&TxContext::new(), move |tx| {
                let t1 = TenantId::from("t1");
                let e1 = EventId::from("e1");
                let before = already_processed(tx, &t1, &e1)?;
                mark_processed(tx, &t1, &e1, first_at)?;
                mark_processed(tx, &t1, &e1, time::now())?;
                let after = already_processed(tx, &t1, &e1)?;
                let other_tenant = already_processed(tx, &TenantId::from("t2"), &e1)?;
                Ok((before, after, other_tenant))
            })
            .await
            .unwrap();
        assert_eq!(seen, (false, true, false));

        let stored = get_processed(&db, &TenantId::from("t1"), &EventId::from("e1"))
            .await
            .unwrap()
            .expect("ledger row");
        assert_eq!(stored.processed_at, first_at, "first mark wins");
    }
}
