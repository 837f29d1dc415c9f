// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transactional outbox writes.
//!
//! This module only produces rows. Draining them, retries and the SENT /
//! FAILED transitions belong to the external dispatcher; the read helpers
//! below exist for diagnostics and tests.

use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use tidings_core::time::format_timestamp;
use tidings_core::{NewOutboxEvent, OutboxEvent, OutboxEventId, OutboxStatus, TenantId, TidingsError};

use super::{enum_column, timestamp_column};
use crate::database::{Database, map_query_err};
use crate::ports::OutboxWriter;

const OUTBOX_COLUMNS: &str = "id, tenant_id, event_type, payload_json, status, attempts, \
     next_run_at, created_at, updated_at, version";

/// Write `event` as a PENDING row, attempts 0, due immediately.
pub fn enqueue(conn: &Connection, event: &NewOutboxEvent) -> Result<(), TidingsError> {
    let payload = std::str::from_utf8(&event.payload)
        .map_err(|e| TidingsError::Internal(format!("outbox payload is not UTF-8: {e}")))?;
    let created_at = format_timestamp(&event.created_at);
    conn.execute(
        "INSERT INTO outbox
            (id, tenant_id, event_type, payload_json, status, attempts,
             next_run_at, created_at, updated_at, version)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6, ?6, 1)",
        params![
            event.id.as_str(),
            event.tenant_id.as_str(),
            event.event_type.to_string(),
            payload,
            OutboxStatus::Pending.to_string(),
            created_at,
        ],
    )
    .map_err(TidingsError::storage)?;
    Ok(())
}

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<OutboxEvent> {
    Ok(OutboxEvent {
        id: OutboxEventId(row.get(0)?),
        tenant_id: TenantId(row.get(1)?),
        event_type: enum_column(row, 2)?,
        payload: row.get::<_, String>(3)?.into_bytes(),
        status: enum_column(row, 4)?,
        attempts: row.get(5)?,
        next_run_at: timestamp_column(row, 6)?,
        created_at: timestamp_column(row, 7)?,
        updated_at: timestamp_column(row, 8)?,
        version: row.get(9)?,
    })
}

pub async fn get_outbox_event(
    db: &Database,
    id: &OutboxEventId,
) -> Result<Option<OutboxEvent>, TidingsError> {
    let id = id.clone();
    let sql = format!("SELECT {OUTBOX_COLUMNS} FROM outbox WHERE id = ?1");
    db.reader()
        .call(move |conn| conn.query_row(&sql, params![id.as_str()], row_to_event).optional())
        .await
        .map_err(map_query_err)
}

/// All outbox rows for a tenant, oldest first.
pub async fn list_for_tenant(
    db: &Database,
    tenant_id: &TenantId,
) -> Result<Vec<OutboxEvent>, TidingsError> {
    let tenant_id = tenant_id.clone();
    let sql = format!(
        "SELECT {OUTBOX_COLUMNS} FROM outbox WHERE tenant_id = ?1 ORDER BY created_at, id"
    );
    db.reader()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![tenant_id.as_str()], row_to_event)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_query_err)
}

/// SQLite-backed [`OutboxWriter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteOutboxStore;

impl OutboxWriter for SqliteOutboxStore {
    fn enqueue(&self, tx: &Transaction<'_>, event: &NewOutboxEvent) -> Result<(), TidingsError> {
        enqueue(tx, event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::TxContext;
    use tempfile::tempdir;
    use tidings_core::{OutboxEventType, time};

    #[tokio::test]
    async fn enqueue_writes_pending_row_due_now() {
        let dir = tempdir().unwrap();
        let db = Database::open_path(dir.path().join("o.db").to_str().unwrap())
            .await
            .unwrap();
        let event = NewOutboxEvent {
            id: OutboxEventId::generate(),
            tenant_id: TenantId::from("t1"),
            event_type: OutboxEventType::InboxItemCreated,
            payload: br#"{"schema_version":1}"#.to_vec(),
            created_at: time::now(),
        };
        let to_write = event.clone();
        db.with_tx(&TxContext::new(), move |tx| enqueue(tx, &to_write))
            .await
            .unwrap();

        let stored = get_outbox_event(&db, &event.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OutboxStatus::Pending);
        assert_eq!(stored.attempts, 0);
        assert_eq!(stored.version, 1);
        assert_eq!(stored.next_run_at, event.created_at);
        assert_eq!(stored.updated_at, event.created_at);
        assert_eq!(stored.payload, event.payload);

        let listed = list_for_tenant(&db, &event.tenant_id).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn non_json_payload_is_rejected() {
        let dir = tempdir().unwrap();
        let db = Database::open_path(dir.path().join("o.db").to_str().unwrap())
            .await
            .unwrap();
        let event = NewOutboxEvent {
            id: OutboxEventId::generate(),
            tenant_id: TenantId::from("t1"),
            event_type: OutboxEventType::InboxItemCreated,
            payload: b"not json".to_vec(),
            created_at: time::now(),
        };
        let err = db
            .with_tx(&TxContext::new(), move |tx| enqueue(tx, &event))
            .await
            .unwrap_err();
        assert!(matches!(err, TidingsError::Storage { .. }));
    }
}
