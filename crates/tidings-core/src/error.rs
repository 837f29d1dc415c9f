// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error taxonomy shared by every Tidings crate.
//!
//! Duplicate deliveries are deliberately absent from this enum: they are
//! reported as [`crate::IngestOutcome::Duplicate`], never as failures.

use std::fmt;

use thiserror::Error;

/// Boxed source error carried by store-facing variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The point inside a unit of work at which a transaction failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStage {
    Begin,
    Work,
    Commit,
    Rollback,
}

impl fmt::Display for TxStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TxStage::Begin => "begin",
            TxStage::Work => "work",
            TxStage::Commit => "commit",
            TxStage::Rollback => "rollback",
        };
        f.write_str(s)
    }
}

/// The primary error type used across Tidings.
#[derive(Debug, Error)]
pub enum TidingsError {
    /// A required input field is missing or malformed. Raised before any
    /// store interaction.
    #[error("invalid input: {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// A feed cursor could not be parsed.
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    /// Write-path store failure (connection, unexpected constraint, SQL error).
    #[error("storage error: {source}")]
    Storage { source: BoxError },

    /// Read-path store failure while serving the feed.
    #[error("query error: {source}")]
    Query { source: BoxError },

    /// Begin, commit or rollback failed, or the work function panicked.
    #[error("transaction {stage} failed: {source}")]
    Transaction { stage: TxStage, source: BoxError },

    /// The unit of work did not reach commit before its deadline.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// The unit of work was cancelled before commit.
    #[error("operation cancelled before commit")]
    Cancelled,

    /// Configuration errors discovered at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TidingsError {
    /// Shorthand for a missing required field.
    pub fn missing(field: &'static str) -> Self {
        TidingsError::Validation {
            field,
            message: "required field is missing or empty".to_string(),
        }
    }

    pub fn storage(source: impl Into<BoxError>) -> Self {
        TidingsError::Storage {
            source: source.into(),
        }
    }

    pub fn query(source: impl Into<BoxError>) -> Self {
        TidingsError::Query {
            source: source.into(),
        }
    }

    pub fn transaction(stage: TxStage, source: impl Into<BoxError>) -> Self {
        TidingsError::Transaction {
            stage,
            source: source.into(),
        }
    }

    /// Errors caused by the caller's input. Resubmitting the same input
    /// will fail the same way.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TidingsError::Validation { .. } | TidingsError::InvalidCursor(_)
        )
    }

    /// Errors after which the whole operation may be retried as-is.
    ///
    /// Ingestion is idempotent, so a retry after an ambiguous failure
    /// (including a timeout that raced a commit) never duplicates effects.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TidingsError::Storage { .. }
                | TidingsError::Query { .. }
                | TidingsError::Transaction { .. }
                | TidingsError::Timeout { .. }
                | TidingsError::Cancelled
        )
    }
}
