// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feed reader port.

use async_trait::async_trait;

use crate::error::TidingsError;
use crate::types::{FeedFilter, FeedPage, TenantId, UserId};

/// Paginated, recency-ordered reads over one user's inbox.
#[async_trait]
pub trait FeedReader: Send + Sync {
    /// Returns items ordered by `(created_at DESC, id DESC)`, strictly after
    /// the filter's cursor when one is given.
    async fn get_feed(
        &self,
        tenant_id: &TenantId,
        user_id: &UserId,
        filter: &FeedFilter,
    ) -> Result<FeedPage, TidingsError>;
}
