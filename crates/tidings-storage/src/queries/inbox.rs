// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbox item persistence.

use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, Transaction, params};
use tidings_core::time::format_timestamp;
use tidings_core::{InboxItem, InboxItemId, InsertOutcome, NewInboxItem, TenantId, TidingsError};

use super::{enum_column, timestamp_column};
use crate::database::{Database, flatten_call_err, map_query_err};
use crate::ports::InboxWriter;

pub(crate) const ITEM_COLUMNS: &str = "id, tenant_id, user_id, type, status, title, body, \
     action_url, source_event_id, dedupe_key, created_at, updated_at, version";

/// Insert `item`. A `(tenant_id, dedupe_key)` collision is a successful no-op.
///
/// The collision is recognised by SQLite's extended result code: the only
/// UNIQUE constraint on `inbox_items` is the dedupe key, while the primary
/// key reports `SQLITE_CONSTRAINT_PRIMARYKEY` and stays an error.
pub fn insert(conn: &Connection, item: &NewInboxItem) -> Result<InsertOutcome, TidingsError> {
    let created_at = format_timestamp(&item.created_at);
    let result = conn.execute(
        "INSERT INTO inbox_items
            (id, tenant_id, user_id, type, status, title, body, action_url,
             source_event_id, dedupe_key, created_at, updated_at, version)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11, 1)",
        params![
            item.id.as_str(),
            item.tenant_id.as_str(),
            item.user_id.as_str(),
            item.item_type.to_string(),
            item.status.to_string(),
            item.title,
            item.body,
            item.action_url,
            item.source_event_id.as_str(),
            item.dedupe_key,
            created_at,
        ],
    );
    match result {
        Ok(_) => Ok(InsertOutcome::Inserted),
        Err(e) if is_dedupe_collision(&e) => Ok(InsertOutcome::DedupeCollision),
        Err(e) => Err(TidingsError::storage(e)),
    }
}

fn is_dedupe_collision(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        }
        _ => false,
    }
}

/// Id of the item holding `dedupe_key` for `tenant_id`, if any.
pub fn find_by_dedupe_key(
    conn: &Connection,
    tenant_id: &TenantId,
    dedupe_key: &str,
) -> Result<Option<InboxItemId>, TidingsError> {
    conn.query_row(
        "SELECT id FROM inbox_items WHERE tenant_id = ?1 AND dedupe_key = ?2",
        params![tenant_id.as_str(), dedupe_key],
        |row| row.get::<_, String>(0),
    )
    .optional()
    .map(|id| id.map(InboxItemId))
    .map_err(TidingsError::storage)
}

pub(crate) fn row_to_item(row: &Row<'_>) -> rusqlite::Result<InboxItem> {
    Ok(InboxItem {
        id: InboxItemId(row.get(0)?),
        tenant_id: TenantId(row.get(1)?),
        user_id: row.get::<_, String>(2)?.into(),
        item_type: enum_column(row, 3)?,
        status: enum_column(row, 4)?,
        title: row.get(5)?,
        body: row.get(6)?,
        action_url: row.get(7)?,
        source_event_id: row.get::<_, String>(8)?.into(),
        dedupe_key: row.get(9)?,
        created_at: timestamp_column(row, 10)?,
        updated_at: timestamp_column(row, 11)?,
        version: row.get(12)?,
    })
}

/// Insert one item in its own transaction. Used to seed data outside the
/// ingest path.
pub async fn insert_item(db: &Database, item: &NewInboxItem) -> Result<InsertOutcome, TidingsError> {
    let item = item.clone();
    db.connection()
        .call(move |conn| insert(conn, &item))
        .await
        .map_err(flatten_call_err)
}

/// Fetch one item by id, scoped to its tenant.
pub async fn get_item(
    db: &Database,
    tenant_id: &TenantId,
    id: &InboxItemId,
) -> Result<Option<InboxItem>, TidingsError> {
    let tenant_id = tenant_id.clone();
    let id = id.clone();
    let sql = format!("SELECT {ITEM_COLUMNS} FROM inbox_items WHERE tenant_id = ?1 AND id = ?2");
    db.reader()
        .call(move |conn| {
            conn.query_row(&sql, params![tenant_id.as_str(), id.as_str()], row_to_item)
                .optional()
        })
        .await
        .map_err(map_query_err)
}

/// SQLite-backed [`InboxWriter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteInboxStore;

impl InboxWriter for SqliteInboxStore {
    fn insert_item(
        &self,
        tx: &Transaction<'_>,
        item: &NewInboxItem,
    ) -> Result<InsertOutcome, TidingsError> {
        insert(tx, item)
    }

    fn find_by_dedupe_key(
        &self,
        tx: &Transaction<'_>,
        tenant_id: &TenantId,
        dedupe_key: &str,
    ) -> Result<Option<InboxItemId>, TidingsError> {
        find_by_dedupe_key(tx, tenant_id, dedupe_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::tempdir;
    use tidings_core::{EventId, ItemStatus, ItemType, UserId};

    fn new_item(id: &str, dedupe_key: &str) -> NewInboxItem {
        NewInboxItem {
            id: InboxItemId::from(id),
            tenant_id: TenantId::from("t1"),
            user_id: UserId::from("u1"),
            item_type: ItemType::TaskAssigned,
            status: ItemStatus::Unread,
            title: "Task assigned to you".into(),
            body: "You have been assigned a new task: Ship it".into(),
            action_url: "https://example.test/tasks/42".into(),
            source_event_id: EventId::from("e1"),
            dedupe_key: dedupe_key.into(),
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap()
                + Duration::microseconds(123_456),
        }
    }

    #[tokio::test]
    async fn insert_then_read_back() {
        let dir = tempdir().unwrap();
        let db = Database::open_path(dir.path().join("i.db").to_str().unwrap())
            .await
            .unwrap();
        let item = new_item("a", "TASK_ASSIGNED:42:u1");

        assert_eq!(insert_item(&db, &item).await.unwrap(), InsertOutcome::Inserted);
        let stored = get_item(&db, &item.tenant_id, &item.id)
            .await
            .unwrap()
            .expect("item should exist");
        assert_eq!(stored.created_at, item.created_at);
        assert_eq!(stored.updated_at, item.created_at);
        assert_eq!(stored.status, ItemStatus::Unread);
        assert_eq!(stored.item_type, ItemType::TaskAssigned);
        assert_eq!(stored.version, 1);

        let other_tenant = get_item(&db, &TenantId::from("t2"), &item.id).await.unwrap();
        assert!(other_tenant.is_none());
    }

    #[tokio::test]
    async fn dedupe_key_collision_is_not_an_error() {
        let dir = tempdir().unwrap();
        let db = Database::open_path(dir.path().join("i.db").to_str().unwrap())
            .await
            .unwrap();
        insert_item(&db, &new_item("a", "k")).await.unwrap();
        let outcome = insert_item(&db, &new_item("b", "k")).await.unwrap();
        assert_eq!(outcome, InsertOutcome::DedupeCollision);

        // Same key under another tenant is a different notification.
        let mut elsewhere = new_item("c", "k");
        elsewhere.tenant_id = TenantId::from("t2");
        assert_eq!(insert_item(&db, &elsewhere).await.unwrap(), InsertOutcome::Inserted);
    }

    #[tokio::test]
    async fn primary_key_collision_stays_an_error() {
        let dir = tempdir().unwrap();
        let db = Database::open_path(dir.path().join("i.db").to_str().unwrap())
            .await
            .unwrap();
        insert_item(&db, &new_item("a", "k1")).await.unwrap();
        let err = insert_item(&db, &new_item("a", "k2")).await.unwrap_err();
        assert!(matches!(err, TidingsError::Storage { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn find_by_dedupe_key_scopes_by_tenant() {
        let dir = tempdir().unwrap();
        let db = Database::open_path(dir.path().join("i.db").to_str().unwrap())
            .await
            .unwrap();
        insert_item(&db, &new_item("a", "k")).await.unwrap();
        let (hit, miss) = db
            .connection()
            .call(|conn| {
                let hit = find_by_dedupe_key(conn, &TenantId::from("t1"), "k")?;
                let miss = find_by_dedupe_key(conn, &TenantId::from("t2"), "k")?;
                Ok::<_, TidingsError>((hit, miss))
            })
            .await
            .map_err(flatten_call_err)
            .unwrap();
        assert_eq!(hit, Some(InboxItemId::from("a")));
        assert_eq!(miss, None);
    }
}
