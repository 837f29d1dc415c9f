// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound event fixtures.

use tidings_core::{InboundEvent, TaskAssignedToUser, time};

/// A complete, valid task-assignment event in tenant `t1`.
pub fn task_assigned(event_id: &str, task_id: &str, assignee: &str) -> TaskAssignedToUser {
    TaskAssignedToUser {
        event_id: event_id.into(),
        occurred_at: Some(time::now()),
        tenant_id: "t1".into(),
        task_id: task_id.to_string(),
        assignee_user_id: assignee.into(),
        assigner_user_id: "manager".into(),
        task_title: format!("Task {task_id}"),
        task_url: format!("https://tasks.example.test/{task_id}"),
        version: 1,
    }
}

/// [`task_assigned`] wrapped in the inbound union.
pub fn task_assigned_event(event_id: &str, task_id: &str, assignee: &str) -> InboundEvent {
    task_assigned(event_id, task_id, assignee).into()
}
