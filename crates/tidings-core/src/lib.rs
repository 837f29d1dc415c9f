// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Tidings inbox service.
//!
//! This crate provides the domain types, the inbound event union, the error
//! taxonomy, and the read-side port traits shared by the store and the
//! application layer.

pub mod error;
pub mod event;
pub mod time;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{BoxError, TidingsError, TxStage};
pub use event::{InboundEvent, InboxItemCreated, OUTBOX_SCHEMA_VERSION, TaskAssignedToUser};
pub use traits::FeedReader;
pub use types::{
    EventId, FeedCursor, FeedFilter, FeedPage, InboxItem, InboxItemId, IngestOutcome,
    InsertOutcome, ItemStatus, ItemType, NewInboxItem, NewOutboxEvent, OutboxEvent,
    OutboxEventId, OutboxEventType, OutboxStatus, ProcessedEvent, TenantId, UserId,
};
