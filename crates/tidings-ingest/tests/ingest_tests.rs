// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end ingest tests against a temp SQLite database.

use std::sync::Arc;
use std::time::Duration;

use tidings_core::{
    FeedCursor, IngestOutcome, ItemStatus, TaskAssignedToUser, TidingsError, TxStage,
};
use tidings_ingest::FeedQuery;
use tidings_storage::TableCounts;
use tidings_storage::TxContext;
use tidings_storage::queries::{inbox, processed};
use tidings_test_utils::{
    FailingLedger, FailingOutbox, PanickingOutbox, RacingInbox, SlowOutbox, TestHarness,
    task_assigned, task_assigned_event,
};
use tokio_util::sync::CancellationToken;

fn counts(inbox_items: i64, processed_events: i64, outbox: i64) -> TableCounts {
    TableCounts {
        inbox_items,
        processed_events,
        outbox,
    }
}

#[tokio::test]
async fn first_delivery_creates_item_ledger_row_and_outbox_row() {
    let h = TestHarness::new().await.unwrap();
    let outcome = h.ingest(task_assigned_event("e1", "42", "u")).await.unwrap();
    let item_id = match outcome {
        IngestOutcome::Created(id) => id,
        other => panic!("expected Created, got {other:?}"),
    };
    assert_eq!(h.counts().await.unwrap(), counts(1, 1, 1));

    let item = inbox::get_item(&h.db, &"t1".into(), &item_id)
        .await
        .unwrap()
        .expect("item is readable after commit");
    assert_eq!(item.dedupe_key, "TASK_ASSIGNED:42:u");
    assert_eq!(item.user_id.as_str(), "u");
    assert_eq!(item.status, ItemStatus::Unread);
    assert_eq!(item.title, "Task assigned to you");
    assert_eq!(item.body, "You have been assigned a new task: Task 42");
    assert_eq!(item.action_url, "https://tasks.example.test/42");
    assert_eq!(item.source_event_id.as_str(), "e1");
    assert_eq!(item.version, 1);

    let ledger = processed::get_processed(&h.db, &"t1".into(), &"e1".into())
        .await
        .unwrap();
    assert!(ledger.is_some());

    let events = h.outbox_events("t1").await.unwrap();
    assert_eq!(events.len(), 1);
    let payload: serde_json::Value = serde_json::from_slice(&events[0].payload).unwrap();
    assert_eq!(payload["type"], "InboxItemCreated");
    assert_eq!(payload["event_id"], events[0].id.as_str());
    assert_eq!(payload["inbox_item_id"], item_id.as_str());
    assert_eq!(payload["source_event_id"], "e1");
    assert_eq!(payload["tenant_id"], "t1");
    assert_eq!(payload["user_id"], "u");
    assert_eq!(payload["item_type"], "TASK_ASSIGNED");
    assert_eq!(payload["entity_id"], "42");
    assert_eq!(payload["schema_version"], 1);
}

#[tokio::test]
async fn redelivery_is_a_duplicate_with_no_new_rows() {
    let h = TestHarness::new().await.unwrap();
    let first = h.ingest(task_assigned_event("e1", "42", "u")).await.unwrap();
    let second = h.ingest(task_assigned_event("e1", "42", "u")).await.unwrap();

    assert!(!first.is_duplicate());
    assert_eq!(
        second,
        IngestOutcome::Duplicate {
            existing: first.inbox_item_id().cloned()
        }
    );
    assert_eq!(h.counts().await.unwrap(), counts(1, 1, 1));
}

#[tokio::test]
async fn different_event_id_for_same_notification_collapses() {
    let h = TestHarness::new().await.unwrap();
    let first = h.ingest(task_assigned_event("e1", "42", "u")).await.unwrap();
    let second = h.ingest(task_assigned_event("e2", "42", "u")).await.unwrap();

    assert_eq!(
        second,
        IngestOutcome::Duplicate {
            existing: first.inbox_item_id().cloned()
        }
    );
    // Both event ids are marked so later re-deliveries short-circuit.
    assert_eq!(h.counts().await.unwrap(), counts(1, 2, 1));
}

#[tokio::test]
async fn collision_after_ledger_miss_points_at_the_racing_item() {
    let racing = Arc::new(RacingInbox::new());
    let h = TestHarness::builder()
        .with_inbox(racing.clone())
        .build()
        .await
        .unwrap();

    let outcome = h.ingest(task_assigned_event("e1", "42", "u")).await.unwrap();
    let rival = racing.rival().expect("competing item was written");
    assert_eq!(
        outcome,
        IngestOutcome::Duplicate {
            existing: Some(rival)
        }
    );
    // The event is marked processed, and the loser enqueues nothing.
    assert_eq!(h.counts().await.unwrap(), counts(1, 1, 0));
    assert!(h.outbox_events("t1").await.unwrap().is_empty());
}

#[tokio::test]
async fn other_assignee_or_task_is_a_new_notification() {
    let h = TestHarness::new().await.unwrap();
    h.ingest(task_assigned_event("e1", "42", "u")).await.unwrap();
    let other_user = h.ingest(task_assigned_event("e2", "42", "v")).await.unwrap();
    let other_task = h.ingest(task_assigned_event("e3", "43", "u")).await.unwrap();
    assert!(!other_user.is_duplicate());
    assert!(!other_task.is_duplicate());
    assert_eq!(h.counts().await.unwrap(), counts(3, 3, 3));
}

#[tokio::test]
async fn separator_inside_ids_does_not_merge_notifications() {
    let h = TestHarness::new().await.unwrap();
    let a = h.ingest(task_assigned_event("e1", "4:2", "u")).await.unwrap();
    let b = h.ingest(task_assigned_event("e2", "4", "2:u")).await.unwrap();
    assert!(matches!(a, IngestOutcome::Created(_)), "{a:?}");
    assert!(matches!(b, IngestOutcome::Created(_)), "{b:?}");
    assert_ne!(a.inbox_item_id(), b.inbox_item_id());
    assert_eq!(h.counts().await.unwrap(), counts(2, 2, 2));
}

#[tokio::test]
async fn every_required_field_is_validated_before_touching_the_store() {
    let h = TestHarness::new().await.unwrap();
    let blanks: [(&str, fn(&mut TaskAssignedToUser)); 5] = [
        ("event_id", |e| e.event_id = "".into()),
        ("tenant_id", |e| e.tenant_id = " ".into()),
        ("task_id", |e| e.task_id.clear()),
        ("assignee_user_id", |e| e.assignee_user_id = "".into()),
        ("task_url", |e| e.task_url.clear()),
    ];

    for (field, blank) in blanks {
        let mut event = task_assigned("e1", "42", "u");
        blank(&mut event);
        let err = h.ingest(event.into()).await.unwrap_err();
        match &err {
            TidingsError::Validation { field: got, .. } => assert_eq!(*got, field),
            other => panic!("{field}: expected Validation, got {other:?}"),
        }
        assert!(err.is_client_error());
        assert!(!err.is_retryable());
    }
    assert_eq!(h.counts().await.unwrap(), TableCounts::default());
}

#[tokio::test]
async fn optional_fields_may_be_empty() {
    let h = TestHarness::new().await.unwrap();
    let mut event = task_assigned("e1", "42", "u");
    event.assigner_user_id = "".into();
    event.task_title.clear();
    event.occurred_at = None;
    let outcome = h.ingest(event.into()).await.unwrap();
    assert!(!outcome.is_duplicate());
}

#[tokio::test]
async fn outbox_failure_rolls_back_item_and_ledger() {
    let outbox = Arc::new(FailingOutbox::new());
    let h = TestHarness::builder()
        .with_outbox(outbox.clone())
        .build()
        .await
        .unwrap();

    let err = h
        .ingest(task_assigned_event("e1", "42", "u"))
        .await
        .unwrap_err();
    assert!(matches!(err, TidingsError::Storage { .. }), "got {err:?}");
    assert!(err.is_retryable());
    assert_eq!(outbox.calls(), 1);
    assert_eq!(h.counts().await.unwrap(), TableCounts::default());
}

#[tokio::test]
async fn ledger_failure_rolls_back_item() {
    let h = TestHarness::builder()
        .with_ledger(Arc::new(FailingLedger))
        .build()
        .await
        .unwrap();
    let err = h
        .ingest(task_assigned_event("e1", "42", "u"))
        .await
        .unwrap_err();
    assert!(matches!(err, TidingsError::Storage { .. }));
    assert_eq!(h.counts().await.unwrap(), TableCounts::default());
}

#[tokio::test]
async fn panic_inside_unit_of_work_rolls_back() {
    let h = TestHarness::builder()
        .with_outbox(Arc::new(PanickingOutbox))
        .build()
        .await
        .unwrap();
    let err = h
        .ingest(task_assigned_event("e1", "42", "u"))
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            TidingsError::Transaction {
                stage: TxStage::Work,
                ..
            }
        ),
        "got {err:?}"
    );
    assert_eq!(h.counts().await.unwrap(), TableCounts::default());
}

#[tokio::test]
async fn expired_deadline_rolls_back_and_retry_succeeds() {
    let h = TestHarness::builder()
        .with_outbox(Arc::new(SlowOutbox::new(Duration::from_millis(300))))
        .with_tx_timeout(Duration::from_millis(50))
        .build()
        .await
        .unwrap();

    let err = h
        .ingest(task_assigned_event("e1", "42", "u"))
        .await
        .unwrap_err();
    assert!(matches!(err, TidingsError::Timeout { .. }), "got {err:?}");
    assert!(err.is_retryable());

    // Queued behind the timed-out unit on the writer, so it observes its
    // rollback.
    let retry = h
        .ingest
        .ingest(task_assigned_event("e1", "42", "u"), &TxContext::new())
        .await
        .unwrap();
    assert!(!retry.is_duplicate(), "the timed-out unit must not have committed");
    assert_eq!(h.counts().await.unwrap(), counts(1, 1, 1));
}

#[tokio::test]
async fn cancelled_context_writes_nothing() {
    let h = TestHarness::new().await.unwrap();
    let token = CancellationToken::new();
    token.cancel();
    let ctx = TxContext::new().with_cancellation(token);

    let err = h
        .ingest
        .ingest(task_assigned_event("e1", "42", "u"), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, TidingsError::Cancelled));
    assert_eq!(h.counts().await.unwrap(), TableCounts::default());
}

#[tokio::test]
async fn concurrent_identical_deliveries_create_once() {
    let h = Arc::new(TestHarness::new().await.unwrap());
    let mut tasks = Vec::new();
    for _ in 0..8 {
        let h = h.clone();
        tasks.push(tokio::spawn(async move {
            h.ingest(task_assigned_event("e1", "42", "u")).await
        }));
    }

    let mut created = 0;
    for task in tasks {
        if !task.await.unwrap().unwrap().is_duplicate() {
            created += 1;
        }
    }
    assert_eq!(created, 1);
    assert_eq!(h.counts().await.unwrap(), counts(1, 1, 1));
}

#[tokio::test]
async fn concurrent_distinct_event_ids_for_one_notification_create_once() {
    let h = Arc::new(TestHarness::new().await.unwrap());
    let mut tasks = Vec::new();
    for n in 0..6 {
        let h = h.clone();
        tasks.push(tokio::spawn(async move {
            h.ingest(task_assigned_event(&format!("e{n}"), "42", "u"))
                .await
        }));
    }

    let mut outcomes = Vec::new();
    for task in tasks {
        outcomes.push(task.await.unwrap().unwrap());
    }
    let created: Vec<_> = outcomes.iter().filter(|o| !o.is_duplicate()).collect();
    assert_eq!(created.len(), 1);
    let winner = created[0].inbox_item_id().cloned();
    assert!(
        outcomes.iter().all(|o| o.inbox_item_id().cloned() == winner),
        "every duplicate points at the surviving item"
    );
    assert_eq!(h.counts().await.unwrap(), counts(1, 6, 1));
}

#[tokio::test]
async fn ingested_items_page_newest_first() {
    let h = TestHarness::new().await.unwrap();
    let mut ids = Vec::new();
    for n in 0..5 {
        let outcome = h
            .ingest(task_assigned_event(&format!("e{n}"), &format!("task-{n}"), "u"))
            .await
            .unwrap();
        ids.push(outcome.inbox_item_id().cloned().unwrap());
        // Keep created_at strictly increasing at microsecond precision.
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    ids.reverse();

    let mut query = FeedQuery::new("t1", "u").with_limit(2);
    let mut served = Vec::new();
    loop {
        let page = h.feed(&query).await.unwrap();
        served.extend(page.items.iter().map(|i| i.id.clone()));
        match page.next_cursor {
            Some(cursor) => {
                query = query.with_cursor_token(&cursor.encode()).unwrap();
            }
            None => break,
        }
    }
    assert_eq!(served, ids);

    let read_only = h
        .feed(&FeedQuery::new("t1", "u").with_status(ItemStatus::Read))
        .await
        .unwrap();
    assert!(read_only.items.is_empty());
}

#[tokio::test]
async fn feed_requires_tenant_and_user() {
    let h = TestHarness::new().await.unwrap();
    let err = h.feed(&FeedQuery::new("t1", "")).await.unwrap_err();
    assert!(err.is_client_error());

    let err = FeedQuery::new("t1", "u")
        .with_cursor_token("not a cursor!")
        .unwrap_err();
    assert!(matches!(err, TidingsError::InvalidCursor(_)));

    let token = FeedCursor::new(tidings_core::time::now(), "x").encode();
    let page = h
        .feed(&FeedQuery::new("t1", "u").with_cursor_token(&token).unwrap())
        .await
        .unwrap();
    assert!(page.items.is_empty());
}
