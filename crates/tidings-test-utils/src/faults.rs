// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store doubles that fail or stall on demand.
//!
//! Each wraps the real SQLite store so the unit of work has genuinely written
//! rows by the time the fault fires.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::Transaction;
use tidings_core::{
    EventId, InboxItemId, InsertOutcome, NewInboxItem, NewOutboxEvent, TenantId, TidingsError,
};
use tidings_storage::ports::{DedupLedger, InboxWriter, OutboxWriter};
use tidings_storage::queries::inbox::SqliteInboxStore;
use tidings_storage::queries::outbox::SqliteOutboxStore;
use tidings_storage::queries::processed::SqliteDedupLedger;

/// Outbox whose `enqueue` always fails with a storage error.
#[derive(Debug, Default)]
pub struct FailingOutbox {
    calls: AtomicUsize,
}

impl FailingOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `enqueue` was reached.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OutboxWriter for FailingOutbox {
    fn enqueue(&self, _tx: &Transaction<'_>, _event: &NewOutboxEvent) -> Result<(), TidingsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TidingsError::storage("injected outbox failure"))
    }
}

/// Outbox that blocks the writer thread before delegating to SQLite.
#[derive(Debug)]
pub struct SlowOutbox {
    delay: Duration,
}

impl SlowOutbox {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl OutboxWriter for SlowOutbox {
    fn enqueue(&self, tx: &Transaction<'_>, event: &NewOutboxEvent) -> Result<(), TidingsError> {
        std::thread::sleep(self.delay);
        SqliteOutboxStore.enqueue(tx, event)
    }
}

/// Outbox that panics mid unit of work.
#[derive(Debug, Default)]
pub struct PanickingOutbox;

impl OutboxWriter for PanickingOutbox {
    fn enqueue(&self, _tx: &Transaction<'_>, _event: &NewOutboxEvent) -> Result<(), TidingsError> {
        panic!("injected outbox panic")
    }
}

/// Ledger that answers lookups normally but fails to record.
#[derive(Debug, Default)]
pub struct FailingLedger;

impl DedupLedger for FailingLedger {
    fn already_processed(
        &self,
        tx: &Transaction<'_>,
        tenant_id: &TenantId,
        event_id: &EventId,
    ) -> Result<bool, TidingsError> {
        SqliteDedupLedger.already_processed(tx, tenant_id, event_id)
    }

    fn mark_processed(
        &self,
        _tx: &Transaction<'_>,
        _tenant_id: &TenantId,
        _event_id: &EventId,
        _processed_at: DateTime<Utc>,
    ) -> Result<(), TidingsError> {
        Err(TidingsError::storage("injected ledger failure"))
    }
}

/// Inbox where a competing delivery of the same notification lands just
/// before this unit's insert, so the real insert hits the dedupe constraint.
#[derive(Debug, Default)]
pub struct RacingInbox {
    rival: Mutex<Option<InboxItemId>>,
}

impl RacingInbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the item the competing delivery wrote, once it has.
    pub fn rival(&self) -> Option<InboxItemId> {
        self.rival.lock().ok().and_then(|r| r.clone())
    }
}

impl InboxWriter for RacingInbox {
    fn insert_item(
        &self,
        tx: &Transaction<'_>,
        item: &NewInboxItem,
    ) -> Result<InsertOutcome, TidingsError> {
        let rival = NewInboxItem {
            id: InboxItemId::generate(),
            source_event_id: EventId::from(format!("{}-rival", item.source_event_id)),
            ..item.clone()
        };
        SqliteInboxStore.insert_item(tx, &rival)?;
        *self
            .rival
            .lock()
            .map_err(|_| TidingsError::Internal("rival lock poisoned".into()))? = Some(rival.id);
        SqliteInboxStore.insert_item(tx, item)
    }

    fn find_by_dedupe_key(
        &self,
        tx: &Transaction<'_>,
        tenant_id: &TenantId,
        dedupe_key: &str,
    ) -> Result<Option<InboxItemId>, TidingsError> {
        SqliteInboxStore.find_by_dedupe_key(tx, tenant_id, dedupe_key)
    }
}
