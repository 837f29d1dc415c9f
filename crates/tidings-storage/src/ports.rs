// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Write-side store ports used inside a unit of work.
//!
//! Each method receives the caller's open transaction and never begins or
//! commits one itself. The SQLite implementations live next to their queries;
//! tests swap in fault-injecting doubles.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::Transaction;
use tidings_core::{
    EventId, InboxItemId, InsertOutcome, NewInboxItem, NewOutboxEvent, TenantId, TidingsError,
};

use crate::queries::inbox::SqliteInboxStore;
use crate::queries::outbox::SqliteOutboxStore;
use crate::queries::processed::SqliteDedupLedger;

/// Per-tenant record of fully processed source events.
pub trait DedupLedger: Send + Sync {
    fn already_processed(
        &self,
        tx: &Transaction<'_>,
        tenant_id: &TenantId,
        event_id: &EventId,
    ) -> Result<bool, TidingsError>;

    /// Insert-or-ignore.
    fn mark_processed(
        &self,
        tx: &Transaction<'_>,
        tenant_id: &TenantId,
        event_id: &EventId,
        processed_at: DateTime<Utc>,
    ) -> Result<(), TidingsError>;
}

/// Durable inbox items.
pub trait InboxWriter: Send + Sync {
    /// A `(tenant_id, dedupe_key)` collision is reported as
    /// [`InsertOutcome::DedupeCollision`], not as an error.
    fn insert_item(
        &self,
        tx: &Transaction<'_>,
        item: &NewInboxItem,
    ) -> Result<InsertOutcome, TidingsError>;

    fn find_by_dedupe_key(
        &self,
        tx: &Transaction<'_>,
        tenant_id: &TenantId,
        dedupe_key: &str,
    ) -> Result<Option<InboxItemId>, TidingsError>;
}

/// Pending outgoing notifications.
pub trait OutboxWriter: Send + Sync {
    fn enqueue(&self, tx: &Transaction<'_>, event: &NewOutboxEvent) -> Result<(), TidingsError>;
}

/// The three write ports an ingest unit of work touches.
#[derive(Clone)]
pub struct Stores {
    pub ledger: Arc<dyn DedupLedger>,
    pub inbox: Arc<dyn InboxWriter>,
    pub outbox: Arc<dyn OutboxWriter>,
}

impl Stores {
    /// The SQLite-backed stores.
    pub fn sqlite() -> Self {
        Self {
            ledger: Arc::new(SqliteDedupLedger),
            inbox: Arc::new(SqliteInboxStore),
            outbox: Arc::new(SqliteOutboxStore),
        }
    }

    pub fn with_ledger(mut self, ledger: Arc<dyn DedupLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn with_inbox(mut self, inbox: Arc<dyn InboxWriter>) -> Self {
        self.inbox = inbox;
        self
    }

    pub fn with_outbox(mut self, outbox: Arc<dyn OutboxWriter>) -> Self {
        self.outbox = outbox;
        self
    }
}

impl Default for Stores {
    fn default() -> Self {
        Self::sqlite()
    }
}
