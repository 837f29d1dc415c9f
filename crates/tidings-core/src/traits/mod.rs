// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Port traits implemented by store backends.
//!
//! Read-side ports are async and object-safe via `#[async_trait]`. The
//! write-side ports run inside a caller-supplied transaction and live next
//! to the store that owns the transaction type.

pub mod feed;

pub use feed::FeedReader;
