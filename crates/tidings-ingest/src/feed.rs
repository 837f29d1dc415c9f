// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feed queries: request-parameter parsing and caller-context checks in
//! front of a [`FeedReader`].

use std::sync::Arc;

use tidings_core::{
    FeedCursor, FeedFilter, FeedPage, FeedReader, ItemStatus, TenantId, TidingsError, UserId,
};
use tidings_storage::{Database, SqliteFeedReader};

/// A validated-on-handle feed request.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedQuery {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub filter: FeedFilter,
}

impl FeedQuery {
    /// First page, default size, any status.
    pub fn new(tenant_id: impl Into<TenantId>, user_id: impl Into<UserId>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            filter: FeedFilter::default(),
        }
    }

    /// Build a query from raw request parameters.
    ///
    /// `status` is matched case-insensitively against `UNREAD` / `READ`. The
    /// two cursor parts must be given together.
    pub fn from_params(
        tenant_id: &str,
        user_id: &str,
        status: Option<&str>,
        limit: Option<i64>,
        cursor_created_at: Option<&str>,
        cursor_id: Option<&str>,
    ) -> Result<Self, TidingsError> {
        let status = status
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(parse_status)
            .transpose()?;
        Ok(Self {
            tenant_id: TenantId::from(tenant_id.trim()),
            user_id: UserId::from(user_id.trim()),
            filter: FeedFilter {
                status,
                limit,
                cursor: FeedCursor::from_parts(cursor_created_at, cursor_id)?,
            },
        })
    }

    /// Resume after an opaque cursor token from a previous page.
    pub fn with_cursor_token(mut self, token: &str) -> Result<Self, TidingsError> {
        self.filter.cursor = Some(FeedCursor::decode(token)?);
        Ok(self)
    }

    pub fn with_status(mut self, status: ItemStatus) -> Self {
        self.filter.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.filter.limit = Some(limit);
        self
    }

    fn validate(&self) -> Result<(), TidingsError> {
        if self.tenant_id.as_str().trim().is_empty() {
            return Err(TidingsError::missing("tenant_id"));
        }
        if self.user_id.as_str().trim().is_empty() {
            return Err(TidingsError::missing("user_id"));
        }
        Ok(())
    }
}

fn parse_status(raw: &str) -> Result<ItemStatus, TidingsError> {
    raw.to_ascii_uppercase()
        .parse()
        .map_err(|_| TidingsError::Validation {
            field: "status",
            message: format!("`{raw}` is not one of UNREAD, READ"),
        })
}

/// Serves [`FeedQuery`]s.
#[derive(Clone)]
pub struct FeedQueryHandler {
    reader: Arc<dyn FeedReader>,
}

impl FeedQueryHandler {
    pub fn new(reader: Arc<dyn FeedReader>) -> Self {
        Self { reader }
    }

    /// Handler over the database's reader pool.
    pub fn sqlite(db: Database) -> Self {
        Self::new(Arc::new(SqliteFeedReader::new(db)))
    }

    pub async fn handle(&self, query: &FeedQuery) -> Result<FeedPage, TidingsError> {
        query.validate()?;
        self.reader
            .get_feed(&query.tenant_id, &query.user_id, &query.filter)
            .await
    }
}
