// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyset pagination properties over a real SQLite file.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use tempfile::{TempDir, tempdir};
use tidings_core::{
    EventId, FeedFilter, InboxItemId, ItemStatus, ItemType, NewInboxItem, TenantId, UserId,
};
use tidings_storage::Database;
use tidings_storage::queries::feed::get_feed;
use tidings_storage::queries::inbox::insert_item;

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
}

fn item(id: &str, created_at: DateTime<Utc>) -> NewInboxItem {
    NewInboxItem {
        id: InboxItemId::from(id),
        tenant_id: TenantId::from("t"),
        user_id: UserId::from("u"),
        item_type: ItemType::TaskAssigned,
        status: ItemStatus::Unread,
        title: "Task assigned to you".into(),
        body: format!("You have been assigned a new task: {id}"),
        action_url: format!("https://example.test/tasks/{id}"),
        source_event_id: EventId::from(id),
        dedupe_key: format!("TASK_ASSIGNED:{id}:u"),
        created_at,
    }
}

async fn open() -> (Database, TempDir) {
    let dir = tempdir().unwrap();
    let db = Database::open_path(dir.path().join("feed.db").to_str().unwrap())
        .await
        .unwrap();
    (db, dir)
}

/// Walk the whole feed with `limit`, returning ids in served order.
async fn walk(db: &Database, limit: i64) -> Vec<String> {
    let tenant = TenantId::from("t");
    let user = UserId::from("u");
    let mut filter = FeedFilter {
        limit: Some(limit),
        ..FeedFilter::default()
    };
    let mut seen = Vec::new();
    loop {
        let page = get_feed(db, &tenant, &user, &filter).await.unwrap();
        assert!(page.items.len() as i64 <= limit);
        seen.extend(page.items.iter().map(|i| i.id.to_string()));
        match page.next_cursor {
            Some(cursor) => filter.cursor = Some(cursor),
            None => break,
        }
    }
    seen
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Every item is served exactly once, in `(created_at DESC, id DESC)`
    /// order, whatever the page size and however many timestamps collide.
    #[test]
    fn pages_form_a_total_order(
        offsets in prop::collection::vec(0i64..4, 1..25),
        limit in 1i64..6,
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let (served, mut expected) = rt.block_on(async {
            let (db, _dir) = open().await;
            let mut expected = Vec::new();
            for (n, offset) in offsets.iter().enumerate() {
                let id = format!("item-{n:03}");
                let created_at = base() + Duration::minutes(*offset);
                insert_item(&db, &item(&id, created_at)).await.unwrap();
                expected.push((created_at, id));
            }
            (walk(&db, limit).await, expected)
        });

        expected.sort_by(|a, b| b.cmp(a));
        let expected: Vec<String> = expected.into_iter().map(|(_, id)| id).collect();
        prop_assert_eq!(served, expected);
    }
}

#[tokio::test]
async fn page_size_one_over_identical_timestamps() {
    let (db, _dir) = open().await;
    for id in ["b", "d", "a", "c"] {
        insert_item(&db, &item(id, base())).await.unwrap();
    }
    assert_eq!(walk(&db, 1).await, ["d", "c", "b", "a"]);
}

#[tokio::test]
async fn newer_inserts_do_not_disturb_an_ongoing_walk() {
    let (db, _dir) = open().await;
    for n in 0..5 {
        let id = format!("old-{n}");
        insert_item(&db, &item(&id, base() + Duration::minutes(n)))
            .await
            .unwrap();
    }

    let tenant = TenantId::from("t");
    let user = UserId::from("u");
    let mut filter = FeedFilter {
        limit: Some(2),
        ..FeedFilter::default()
    };
    let mut seen = Vec::new();
    let mut round = 0;
    loop {
        let page = get_feed(&db, &tenant, &user, &filter).await.unwrap();
        seen.extend(page.items.iter().map(|i| i.id.to_string()));

        // Land a newer item between every page request.
        let fresh = format!("new-{round}");
        insert_item(&db, &item(&fresh, base() + Duration::hours(1 + round)))
            .await
            .unwrap();
        round += 1;

        match page.next_cursor {
            Some(cursor) => filter.cursor = Some(cursor),
            None => break,
        }
    }

    assert_eq!(seen, ["old-4", "old-3", "old-2", "old-1", "old-0"]);
}

#[tokio::test]
async fn exact_multiple_of_limit_ends_with_empty_page() {
    let (db, _dir) = open().await;
    for n in 0..4 {
        insert_item(&db, &item(&format!("i{n}"), base() + Duration::seconds(n)))
            .await
            .unwrap();
    }
    let tenant = TenantId::from("t");
    let user = UserId::from("u");
    let mut filter = FeedFilter {
        limit: Some(2),
        ..FeedFilter::default()
    };
    let mut sizes = Vec::new();
    loop {
        let page = get_feed(&db, &tenant, &user, &filter).await.unwrap();
        sizes.push(page.items.len());
        match page.next_cursor {
            Some(cursor) => filter.cursor = Some(cursor),
            None => break,
        }
    }
    assert_eq!(sizes, [2, 2, 0]);
}
