// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Application layer for Tidings.
//!
//! [`IngestHandler`] turns inbound events into inbox items exactly once;
//! [`FeedQueryHandler`] serves paginated reads of a user's inbox.

pub mod feed;
pub mod handler;

pub use feed::{FeedQuery, FeedQueryHandler};
pub use handler::IngestHandler;
