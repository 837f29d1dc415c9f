// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Tidings integration tests.
//!
//! # Components
//!
//! - [`TestHarness`] - temp database with ingest and feed handlers wired up
//! - [`faults`] - store doubles that fail, stall, race or panic inside a unit of work
//! - [`fixtures`] - valid inbound events

pub mod faults;
pub mod fixtures;
pub mod harness;

pub use faults::{FailingLedger, FailingOutbox, PanickingOutbox, RacingInbox, SlowOutbox};
pub use fixtures::{task_assigned, task_assigned_event};
pub use harness::TestHarness;
