// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end ingest and feed tests.
//!
//! `TestHarness` opens a fresh SQLite file in a temp directory and wires an
//! [`IngestHandler`] and a [`FeedQueryHandler`] over it. Store ports can be
//! replaced with the doubles in [`crate::faults`].

use std::sync::Arc;
use std::time::Duration;

use tidings_config::model::StorageConfig;
use tidings_core::{
    FeedPage, InboundEvent, IngestOutcome, OutboxEvent, TenantId, TidingsError,
};
use tidings_ingest::{FeedQuery, FeedQueryHandler, IngestHandler};
use tidings_storage::queries::{outbox, stats};
use tidings_storage::{Database, DedupLedger, InboxWriter, OutboxWriter, Stores, TableCounts};

/// Builder for [`TestHarness`].
pub struct TestHarnessBuilder {
    stores: Stores,
    tx_timeout: Option<Duration>,
    read_pool_size: usize,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            stores: Stores::sqlite(),
            tx_timeout: None,
            read_pool_size: 2,
        }
    }

    pub fn with_ledger(mut self, ledger: Arc<dyn DedupLedger>) -> Self {
        self.stores = self.stores.with_ledger(ledger);
        self
    }

    pub fn with_inbox(mut self, inbox: Arc<dyn InboxWriter>) -> Self {
        self.stores = self.stores.with_inbox(inbox);
        self
    }

    pub fn with_outbox(mut self, outbox: Arc<dyn OutboxWriter>) -> Self {
        self.stores = self.stores.with_outbox(outbox);
        self
    }

    /// Default deadline applied by [`TestHarness::ingest`].
    pub fn with_tx_timeout(mut self, timeout: Duration) -> Self {
        self.tx_timeout = Some(timeout);
        self
    }

    pub fn with_read_pool_size(mut self, size: usize) -> Self {
        self.read_pool_size = size;
        self
    }

    pub async fn build(self) -> Result<TestHarness, TidingsError> {
        let temp_dir = tempfile::TempDir::new().map_err(TidingsError::storage)?;
        let db_path = temp_dir.path().join("test.db");
        let config = StorageConfig {
            read_pool_size: self.read_pool_size,
            ..StorageConfig::at_path(db_path.to_string_lossy())
        };
        let db = Database::open(&config).await?;

        let mut ingest = IngestHandler::new(db.clone()).with_stores(self.stores);
        if let Some(timeout) = self.tx_timeout {
            ingest = ingest.with_tx_timeout(timeout);
        }
        let feed = FeedQueryHandler::sqlite(db.clone());

        Ok(TestHarness {
            db,
            ingest,
            feed,
            _temp_dir: temp_dir,
        })
    }
}

/// A temp database with handlers wired over it.
pub struct TestHarness {
    pub db: Database,
    pub ingest: IngestHandler,
    pub feed: FeedQueryHandler,
    /// Kept alive so the database file outlives the harness.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness over the real SQLite stores.
    pub async fn new() -> Result<Self, TidingsError> {
        Self::builder().build().await
    }

    /// Ingest with the handler's default context.
    pub async fn ingest(&self, event: InboundEvent) -> Result<IngestOutcome, TidingsError> {
        self.ingest.ingest(event, &self.ingest.context()).await
    }

    pub async fn feed(&self, query: &FeedQuery) -> Result<FeedPage, TidingsError> {
        self.feed.handle(query).await
    }

    pub async fn counts(&self) -> Result<TableCounts, TidingsError> {
        stats::table_counts(&self.db).await
    }

    pub async fn outbox_events(&self, tenant_id: &str) -> Result<Vec<OutboxEvent>, TidingsError> {
        outbox::list_for_tenant(&self.db, &TenantId::from(tenant_id)).await
    }
}
