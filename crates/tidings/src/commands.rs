// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tidings migrate`, `tidings ingest` and `tidings feed`.

use std::io::Write;

use serde::{Deserialize, Serialize};
use tidings_config::model::TidingsConfig;
use tidings_core::{FeedPage, InboundEvent, InboxItem, IngestOutcome, TidingsError};
use tidings_ingest::{FeedQuery, FeedQueryHandler, IngestHandler};
use tidings_storage::Database;
use tokio::io::AsyncReadExt;
use tracing::info;

pub async fn migrate(config: &TidingsConfig) -> Result<(), TidingsError> {
    let db = Database::open(&config.storage).await?;
    db.close().await?;
    println!("database ready at {}", db.path());
    Ok(())
}

/// One event object or an array of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EventBatch {
    One(InboundEvent),
    Many(Vec<InboundEvent>),
}

pub(crate) fn parse_events(input: &str) -> Result<Vec<InboundEvent>, TidingsError> {
    let batch: EventBatch = serde_json::from_str(input).map_err(|e| TidingsError::Validation {
        field: "event",
        message: format!("not a valid inbound event: {e}"),
    })?;
    Ok(match batch {
        EventBatch::One(event) => vec![event],
        EventBatch::Many(events) => events,
    })
}

#[derive(Debug, Serialize)]
struct IngestReport<'a> {
    event_id: &'a str,
    outcome: &'static str,
    inbox_item_id: Option<&'a str>,
}

/// Apply `events` in order, writing one JSON line per event to `out`.
///
/// Stops at the first failure. Events before it stay committed, so
/// re-running the same input is safe.
pub(crate) async fn apply_events(
    handler: &IngestHandler,
    events: Vec<InboundEvent>,
    out: &mut impl Write,
) -> Result<usize, TidingsError> {
    let mut created = 0;
    for event in events {
        let event_id = event.event_id().clone();
        let outcome = handler.ingest(event, &handler.context()).await?;
        let report = IngestReport {
            event_id: event_id.as_str(),
            outcome: match outcome {
                IngestOutcome::Created(_) => "created",
                IngestOutcome::Duplicate { .. } => "duplicate",
            },
            inbox_item_id: outcome.inbox_item_id().map(|id| id.as_str()),
        };
        if !outcome.is_duplicate() {
            created += 1;
        }
        let line = serde_json::to_string(&report)
            .map_err(|e| TidingsError::Internal(format!("encode report: {e}")))?;
        writeln!(out, "{line}").map_err(|e| TidingsError::Internal(e.to_string()))?;
    }
    Ok(created)
}

pub async fn ingest(config: &TidingsConfig, input: &str) -> Result<(), TidingsError> {
    let raw = if input == "-" {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .map_err(|e| TidingsError::Internal(format!("read stdin: {e}")))?;
        buf
    } else {
        tokio::fs::read_to_string(input)
            .await
            .map_err(|e| TidingsError::Validation {
                field: "input",
                message: format!("cannot read `{input}`: {e}"),
            })?
    };
    let events = parse_events(&raw)?;
    let total = events.len();

    let db = Database::open(&config.storage).await?;
    let handler = IngestHandler::from_config(db, &config.ingest);
    let created = apply_events(&handler, events, &mut std::io::stdout().lock()).await?;
    info!(total, created, "ingest finished");
    Ok(())
}

/// Raw `tidings feed` arguments.
#[derive(Debug, Clone, Default)]
pub struct FeedArgs {
    pub tenant: String,
    pub user: String,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

impl FeedArgs {
    pub(crate) fn to_query(&self) -> Result<FeedQuery, TidingsError> {
        let query = FeedQuery::from_params(
            &self.tenant,
            &self.user,
            self.status.as_deref(),
            self.limit,
            None,
            None,
        )?;
        match self.cursor.as_deref().filter(|c| !c.is_empty()) {
            Some(token) => query.with_cursor_token(token),
            None => Ok(query),
        }
    }
}

#[derive(Debug, Serialize)]
struct FeedOutput<'a> {
    items: &'a [InboxItem],
    next_cursor: Option<String>,
}

pub(crate) fn render_page(page: &FeedPage) -> Result<String, TidingsError> {
    let output = FeedOutput {
        items: &page.items,
        next_cursor: page.next_cursor.as_ref().map(|c| c.encode()),
    };
    serde_json::to_string_pretty(&output)
        .map_err(|e| TidingsError::Internal(format!("encode feed page: {e}")))
}

pub async fn feed(config: &TidingsConfig, args: &FeedArgs) -> Result<(), TidingsError> {
    let query = args.to_query()?;
    let db = Database::open(&config.storage).await?;
    let page = FeedQueryHandler::sqlite(db).handle(&query).await?;
    println!("{}", render_page(&page)?);
    Ok(())
}
