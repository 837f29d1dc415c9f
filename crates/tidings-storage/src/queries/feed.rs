// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyset-paginated feed reads.
//!
//! Items are ordered by `(created_at DESC, id DESC)`. A cursor is the
//! `(created_at, id)` of the last item served; the next page holds rows
//! strictly below it under the same ordering, so concurrent inserts never
//! shift or repeat items the caller has already seen.

use async_trait::async_trait;
use rusqlite::params_from_iter;
use rusqlite::types::Value;
use tidings_core::time::format_timestamp;
use tidings_core::{FeedFilter, FeedPage, FeedReader, InboxItem, TenantId, TidingsError, UserId};
use tracing::debug;

use super::inbox::{ITEM_COLUMNS, row_to_item};
use crate::database::{Database, map_query_err};

/// Fetch one page of `user_id`'s inbox within `tenant_id`.
pub async fn get_feed(
    db: &Database,
    tenant_id: &TenantId,
    user_id: &UserId,
    filter: &FeedFilter,
) -> Result<FeedPage, TidingsError> {
    let limit = filter.effective_limit();

    let mut sql = format!(
        "SELECT {ITEM_COLUMNS} FROM inbox_items WHERE tenant_id = ? AND user_id = ?"
    );
    let mut args = vec![
        Value::Text(tenant_id.as_str().to_string()),
        Value::Text(user_id.as_str().to_string()),
    ];
    if let Some(status) = filter.status {
        sql.push_str(" AND status = ?");
        args.push(Value::Text(status.to_string()));
    }
    if let Some(cursor) = &filter.cursor {
        sql.push_str(" AND (created_at, id) < (?, ?)");
        args.push(Value::Text(format_timestamp(&cursor.created_at)));
        args.push(Value::Text(cursor.id.as_str().to_string()));
    }
    sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT ?");
    args.push(Value::Integer(limit));

    let items: Vec<InboxItem> = db
        .reader()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(args.iter()), row_to_item)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_query_err)?;

    let next_cursor = if items.len() as i64 == limit {
        items.last().map(InboxItem::cursor)
    } else {
        None
    };
    debug!(
        tenant_id = %tenant_id,
        user_id = %user_id,
        limit,
        returned = items.len(),
        has_more = next_cursor.is_some(),
        "feed page served"
    );
    Ok(FeedPage { items, next_cursor })
}

/// [`FeedReader`] over a [`Database`]'s reader pool.
#[derive(Clone)]
pub struct SqliteFeedReader {
    db: Database,
}

impl SqliteFeedReader {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FeedReader for SqliteFeedReader {
    async fn get_feed(
        &self,
        tenant_id: &TenantId,
        user_id: &UserId,
        filter: &FeedFilter,
    ) -> Result<FeedPage, TidingsError> {
        get_feed(&self.db, tenant_id, user_id, filter).await
    }
}
