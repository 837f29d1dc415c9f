// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the ingest path, the stores, and the feed.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::TidingsError;
use crate::time::{format_timestamp, parse_timestamp};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Tenant that owns every row it touches.
    TenantId
);
string_id!(
    /// A user inside a tenant.
    UserId
);
string_id!(
    /// Identifier of an external domain event, assigned by its producer.
    EventId
);
string_id!(
    /// Identifier of an inbox item.
    InboxItemId
);
string_id!(
    /// Identifier of an outbox row.
    OutboxEventId
);

impl InboxItemId {
    /// A fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl OutboxEventId {
    /// A fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Kind of inbox item. Closed set; one variant per ingestible event kind.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    TaskAssigned,
}

/// Read state of an inbox item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Unread,
    Read,
}

/// Delivery state of an outbox row. Only `Pending` is ever written here;
/// the other states belong to the external dispatcher.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboxStatus {
    Pending,
    Sent,
    Failed,
}

/// Discriminator of outbox rows.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum OutboxEventType {
    InboxItemCreated,
}

/// A persisted inbox item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboxItem {
    pub id: InboxItemId,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub item_type: ItemType,
    pub status: ItemStatus,
    pub title: String,
    pub body: String,
    pub action_url: String,
    pub source_event_id: EventId,
    pub dedupe_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl InboxItem {
    /// The cursor positioned at this item.
    pub fn cursor(&self) -> FeedCursor {
        FeedCursor {
            created_at: self.created_at,
            id: self.id.clone(),
        }
    }
}

/// Insert parameters for a new inbox item. `updated_at` starts equal to
/// `created_at` and `version` starts at 1.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInboxItem {
    pub id: InboxItemId,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub item_type: ItemType,
    pub status: ItemStatus,
    pub title: String,
    pub body: String,
    pub action_url: String,
    pub source_event_id: EventId,
    pub dedupe_key: String,
    pub created_at: DateTime<Utc>,
}

/// Result of inserting an inbox item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Another item already holds the same `(tenant_id, dedupe_key)`.
    DedupeCollision,
}

/// A dedup ledger entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedEvent {
    pub tenant_id: TenantId,
    pub event_id: EventId,
    pub processed_at: DateTime<Utc>,
}

/// Insert parameters for an outbox row. Status, attempts and next-run time
/// are fixed by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOutboxEvent {
    pub id: OutboxEventId,
    pub tenant_id: TenantId,
    pub event_type: OutboxEventType,
    /// Self-describing JSON body; opaque to the store.
    pub payload: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// A persisted outbox row.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxEvent {
    pub id: OutboxEventId,
    pub tenant_id: TenantId,
    pub event_type: OutboxEventType,
    pub payload: Vec<u8>,
    pub status: OutboxStatus,
    pub attempts: i64,
    pub next_run_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

/// What an ingest call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A new item, ledger entry and outbox row were committed.
    Created(InboxItemId),
    /// The event (or an equivalent one) was already applied; nothing new
    /// became visible. `existing` is the item holding the dedupe key, when
    /// one is still present.
    Duplicate { existing: Option<InboxItemId> },
}

impl IngestOutcome {
    pub fn inbox_item_id(&self) -> Option<&InboxItemId> {
        match self {
            IngestOutcome::Created(id) => Some(id),
            IngestOutcome::Duplicate { existing } => existing.as_ref(),
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, IngestOutcome::Duplicate { .. })
    }
}

/// Default feed page size, used when the caller gives none or an
/// out-of-range value.
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Largest feed page size served.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Keyset position in the `(created_at DESC, id DESC)` feed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedCursor {
    pub created_at: DateTime<Utc>,
    pub id: InboxItemId,
}

impl FeedCursor {
    pub fn new(created_at: DateTime<Utc>, id: impl Into<InboxItemId>) -> Self {
        Self {
            created_at,
            id: id.into(),
        }
    }

    /// Build a cursor from the two raw request parameters. Both absent means
    /// "first page"; exactly one present or an unparsable timestamp is a
    /// client error.
    pub fn from_parts(
        created_at: Option<&str>,
        id: Option<&str>,
    ) -> Result<Option<Self>, TidingsError> {
        let created_at = created_at.filter(|s| !s.is_empty());
        let id = id.filter(|s| !s.is_empty());
        match (created_at, id) {
            (None, None) => Ok(None),
            (Some(ts), Some(id)) => {
                let created_at = parse_timestamp(ts).map_err(|e| {
                    TidingsError::InvalidCursor(format!(
                        "cursor_created_at `{ts}` is not RFC 3339: {e}"
                    ))
                })?;
                Ok(Some(Self::new(microsecond_precision(created_at)?, id)))
            }
            _ => Err(TidingsError::InvalidCursor(
                "cursor_created_at and cursor_id must be given together".to_string(),
            )),
        }
    }

    /// Opaque token form, safe to place in a URL.
    pub fn encode(&self) -> String {
        let raw = format!("{}|{}", format_timestamp(&self.created_at), self.id);
        URL_SAFE_NO_PAD.encode(raw.as_bytes())
    }

    /// Inverse of [`FeedCursor::encode`].
    pub fn decode(token: &str) -> Result<Self, TidingsError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|e| TidingsError::InvalidCursor(format!("not base64: {e}")))?;
        let raw = String::from_utf8(bytes)
            .map_err(|_| TidingsError::InvalidCursor("not UTF-8".to_string()))?;
        let (ts, id) = raw
            .split_once('|')
            .ok_or_else(|| TidingsError::InvalidCursor("missing separator".to_string()))?;
        if id.is_empty() {
            return Err(TidingsError::InvalidCursor("empty id".to_string()));
        }
        let created_at = parse_timestamp(ts)
            .map_err(|e| TidingsError::InvalidCursor(format!("bad timestamp: {e}")))?;
        Ok(Self::new(microsecond_precision(created_at)?, id))
    }
}

/// Stored timestamps carry microseconds, so a finer cursor would compare
/// below the row it names.
fn microsecond_precision(ts: DateTime<Utc>) -> Result<DateTime<Utc>, TidingsError> {
    if ts.nanosecond() % 1_000 != 0 {
        return Err(TidingsError::InvalidCursor(format!(
            "cursor timestamp {} is finer than microseconds",
            ts.to_rfc3339()
        )));
    }
    Ok(ts)
}

/// Feed query options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedFilter {
    pub status: Option<ItemStatus>,
    /// Requested page size; clamped by [`FeedFilter::effective_limit`].
    pub limit: Option<i64>,
    pub cursor: Option<FeedCursor>,
}

impl FeedFilter {
    /// Page size actually served: values outside `1..=100` fall back to 50.
    pub fn effective_limit(&self) -> i64 {
        match self.limit {
            Some(n) if n > 0 && n <= MAX_PAGE_SIZE => n,
            _ => DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of the feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedPage {
    pub items: Vec<InboxItem>,
    /// Present when the page came back full; the next page may be empty.
    pub next_cursor: Option<FeedCursor>,
}
