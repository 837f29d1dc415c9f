// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Idempotent ingestion of inbound domain events.
//!
//! One event becomes at most one inbox item, one ledger row and one outbox
//! row, all committed together. Re-deliveries of the same event, and
//! different events describing the same logical notification, collapse into
//! [`IngestOutcome::Duplicate`].

use std::time::Duration;

use tidings_config::model::IngestConfig;
use tidings_core::{
    InboundEvent, InboxItemId, IngestOutcome, InsertOutcome, NewOutboxEvent, OutboxEventId,
    OutboxEventType, TidingsError, time,
};
use tidings_storage::{Database, Stores, TxContext};
use tracing::{debug, info, warn};

/// What the unit of work found. Richer than [`IngestOutcome`] so the two
/// duplicate paths log differently.
enum Applied {
    Created(InboxItemId),
    /// The ledger already held this event id.
    AlreadyProcessed(Option<InboxItemId>),
    /// A different event id had already produced this notification.
    Collapsed(Option<InboxItemId>),
}

/// Applies inbound events to the inbox, ledger and outbox atomically.
#[derive(Clone)]
pub struct IngestHandler {
    db: Database,
    stores: Stores,
    tx_timeout: Option<Duration>,
}

impl IngestHandler {
    /// Handler over the SQLite stores with no deadline.
    pub fn new(db: Database) -> Self {
        Self {
            db,
            stores: Stores::sqlite(),
            tx_timeout: None,
        }
    }

    /// Handler using the configured unit-of-work timeout.
    pub fn from_config(db: Database, config: &IngestConfig) -> Self {
        Self::new(db).with_tx_timeout(config.tx_timeout())
    }

    /// Replace the write ports, e.g. with fault-injecting doubles.
    pub fn with_stores(mut self, stores: Stores) -> Self {
        self.stores = stores;
        self
    }

    pub fn with_tx_timeout(mut self, timeout: Duration) -> Self {
        self.tx_timeout = Some(timeout);
        self
    }

    /// A fresh context carrying this handler's default deadline.
    pub fn context(&self) -> TxContext {
        match self.tx_timeout {
            Some(timeout) => TxContext::with_timeout(timeout),
            None => TxContext::new(),
        }
    }

    /// Apply `event` once.
    ///
    /// Returns [`IngestOutcome::Created`] when this call made the item
    /// visible, [`IngestOutcome::Duplicate`] when nothing new was written.
    /// Any error leaves the store untouched and the call safe to retry.
    pub async fn ingest(
        &self,
        event: InboundEvent,
        ctx: &TxContext,
    ) -> Result<IngestOutcome, TidingsError> {
        let result = self.apply(&event, ctx).await;
        match result {
            Ok(Applied::Created(item_id)) => {
                info!(
                    tenant_id = %event.tenant_id(),
                    event_id = %event.event_id(),
                    inbox_item_id = %item_id,
                    user_id = %event.recipient(),
                    "inbox item created"
                );
                Ok(IngestOutcome::Created(item_id))
            }
            Ok(Applied::AlreadyProcessed(existing)) => {
                debug!(
                    tenant_id = %event.tenant_id(),
                    event_id = %event.event_id(),
                    "event already processed"
                );
                Ok(IngestOutcome::Duplicate { existing })
            }
            Ok(Applied::Collapsed(existing)) => {
                debug!(
                    tenant_id = %event.tenant_id(),
                    event_id = %event.event_id(),
                    dedupe_key = %event.dedupe_key(),
                    "notification already exists for dedupe key"
                );
                Ok(IngestOutcome::Duplicate { existing })
            }
            Err(err) => {
                warn!(
                    tenant_id = %event.tenant_id(),
                    event_id = %event.event_id(),
                    error = %err,
                    "ingest failed"
                );
                Err(err)
            }
        }
    }

    async fn apply(&self, event: &InboundEvent, ctx: &TxContext) -> Result<Applied, TidingsError> {
        event.validate()?;

        let now = time::now();
        let item = event.to_new_item(InboxItemId::generate(), now);
        let outbound_id = OutboxEventId::generate();
        let payload = event.item_created(&item, &outbound_id, now).to_json()?;
        let outbox_event = NewOutboxEvent {
            id: outbound_id,
            tenant_id: item.tenant_id.clone(),
            event_type: OutboxEventType::InboxItemCreated,
            payload,
            created_at: now,
        };
        let event_id = event.event_id().clone();
        let stores = self.stores.clone();

        self.db
            .with_tx(ctx, move |tx| {
                let tenant_id = &item.tenant_id;
                if stores.ledger.already_processed(tx, tenant_id, &event_id)? {
                    let existing = stores
                        .inbox
                        .find_by_dedupe_key(tx, tenant_id, &item.dedupe_key)?;
                    return Ok(Applied::AlreadyProcessed(existing));
                }

                match stores.inbox.insert_item(tx, &item)? {
                    InsertOutcome::Inserted => {
                        stores.ledger.mark_processed(tx, tenant_id, &event_id, now)?;
                        stores.outbox.enqueue(tx, &outbox_event)?;
                        Ok(Applied::Created(item.id.clone()))
                    }
                    InsertOutcome::DedupeCollision => {
                        stores.ledger.mark_processed(tx, tenant_id, &event_id, now)?;
                        let existing = stores
                            .inbox
                            .find_by_dedupe_key(tx, tenant_id, &item.dedupe_key)?;
                        Ok(Applied::Collapsed(existing))
                    }
                }
            })
            .await
    }
}
