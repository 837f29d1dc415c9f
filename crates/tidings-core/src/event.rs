// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound domain events and the outbound payload they produce.
//!
//! Ingestible events form a closed tagged union. Every variant knows how to
//! validate itself, derive its dedupe key, and render the inbox item it
//! creates; the ingest handler never branches on string tags.

use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::{Deserialize, Serialize};

use crate::error::TidingsError;
use crate::types::{
    EventId, InboxItemId, ItemStatus, ItemType, NewInboxItem, OutboxEventId, OutboxEventType,
    TenantId, UserId,
};

/// Bytes escaped inside each dedupe key part, so the `:` separator stays
/// unambiguous.
const KEY_PART: &AsciiSet = &CONTROLS.add(b':').add(b'%');

/// Version written into every outbound payload.
pub const OUTBOX_SCHEMA_VERSION: u32 = 1;

/// "A task was assigned to a user."
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskAssignedToUser {
    pub event_id: EventId,
    pub occurred_at: Option<DateTime<Utc>>,
    pub tenant_id: TenantId,
    pub task_id: String,
    pub assignee_user_id: UserId,
    pub assigner_user_id: UserId,
    pub task_title: String,
    pub task_url: String,
    pub version: i32,
}

impl TaskAssignedToUser {
    fn validate(&self) -> Result<(), TidingsError> {
        require("event_id", self.event_id.as_str())?;
        require("tenant_id", self.tenant_id.as_str())?;
        require("task_id", &self.task_id)?;
        require("assignee_user_id", self.assignee_user_id.as_str())?;
        require("task_url", &self.task_url)?;
        Ok(())
    }
}

fn require(field: &'static str, value: &str) -> Result<(), TidingsError> {
    if value.trim().is_empty() {
        Err(TidingsError::missing(field))
    } else {
        Ok(())
    }
}

/// Every event kind Tidings can ingest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InboundEvent {
    TaskAssigned(TaskAssignedToUser),
}

impl From<TaskAssignedToUser> for InboundEvent {
    fn from(evt: TaskAssignedToUser) -> Self {
        InboundEvent::TaskAssigned(evt)
    }
}

impl InboundEvent {
    /// Reject events missing any field the ingest protocol depends on.
    pub fn validate(&self) -> Result<(), TidingsError> {
        match self {
            InboundEvent::TaskAssigned(evt) => evt.validate(),
        }
    }

    pub fn event_id(&self) -> &EventId {
        match self {
            InboundEvent::TaskAssigned(evt) => &evt.event_id,
        }
    }

    pub fn tenant_id(&self) -> &TenantId {
        match self {
            InboundEvent::TaskAssigned(evt) => &evt.tenant_id,
        }
    }

    /// The user whose inbox receives the item.
    pub fn recipient(&self) -> &UserId {
        match self {
            InboundEvent::TaskAssigned(evt) => &evt.assignee_user_id,
        }
    }

    pub fn item_type(&self) -> ItemType {
        match self {
            InboundEvent::TaskAssigned(_) => ItemType::TaskAssigned,
        }
    }

    /// Id of the business entity the event is about.
    pub fn entity_id(&self) -> &str {
        match self {
            InboundEvent::TaskAssigned(evt) => &evt.task_id,
        }
    }

    /// Deterministic key for the logical notification: item type, entity
    /// and recipient. Independent of the event id, so re-deliveries carrying
    /// a regenerated event id still collapse. Parts are percent-escaped, so
    /// ids containing `:` cannot alias another (entity, recipient) pair.
    pub fn dedupe_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.item_type(),
            utf8_percent_encode(self.entity_id(), KEY_PART),
            utf8_percent_encode(self.recipient().as_str(), KEY_PART)
        )
    }

    /// The inbox item this event creates.
    pub fn to_new_item(&self, id: InboxItemId, created_at: DateTime<Utc>) -> NewInboxItem {
        let (title, body, action_url) = match self {
            InboundEvent::TaskAssigned(evt) => (
                "Task assigned to you".to_string(),
                format!("You have been assigned a new task: {}", evt.task_title),
                evt.task_url.clone(),
            ),
        };
        NewInboxItem {
            id,
            tenant_id: self.tenant_id().clone(),
            user_id: self.recipient().clone(),
            item_type: self.item_type(),
            status: ItemStatus::Unread,
            title,
            body,
            action_url,
            source_event_id: self.event_id().clone(),
            dedupe_key: self.dedupe_key(),
            created_at,
        }
    }

    /// The outbound notification announcing `item`.
    pub fn item_created(
        &self,
        item: &NewInboxItem,
        outbound_id: &OutboxEventId,
        occurred_at: DateTime<Utc>,
    ) -> InboxItemCreated {
        let title = match self {
            InboundEvent::TaskAssigned(evt) => evt.task_title.clone(),
        };
        InboxItemCreated {
            event_id: outbound_id.clone(),
            occurred_at,
            tenant_id: item.tenant_id.clone(),
            user_id: item.user_id.clone(),
            inbox_item_id: item.id.clone(),
            kind: OutboxEventType::InboxItemCreated,
            item_type: item.item_type,
            source_event_id: item.source_event_id.clone(),
            entity_id: self.entity_id().to_string(),
            title,
            action_url: item.action_url.clone(),
            schema_version: OUTBOX_SCHEMA_VERSION,
        }
    }
}

/// Body of an `InboxItemCreated` outbox row. Carries enough context for a
/// consumer to act without reading the inbox tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboxItemCreated {
    pub event_id: OutboxEventId,
    pub occurred_at: DateTime<Utc>,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub inbox_item_id: InboxItemId,
    #[serde(rename = "type")]
    pub kind: OutboxEventType,
    pub item_type: ItemType,
    pub source_event_id: EventId,
    pub entity_id: String,
    pub title: String,
    pub action_url: String,
    pub schema_version: u32,
}

impl InboxItemCreated {
    pub fn to_json(&self) -> Result<Vec<u8>, TidingsError> {
        serde_json::to_vec(self)
            .map_err(|e| TidingsError::Internal(format!("encode outbox payload: {e}")))
    }
}
