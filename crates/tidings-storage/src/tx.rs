// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unit-of-work boundary over the writer connection.
//!
//! [`Database::with_tx`] runs a synchronous work function inside an
//! `IMMEDIATE` transaction on the writer thread. The transaction commits only
//! if the work succeeds and the caller's deadline and cancellation token are
//! still clear right before `COMMIT`. Every other path rolls back.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use rusqlite::{Transaction, TransactionBehavior};
use tidings_core::{TidingsError, TxStage};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::database::{Database, flatten_call_err};

/// Deadline and cancellation for one unit of work.
#[derive(Debug, Clone, Default)]
pub struct TxContext {
    deadline: Option<(Instant, Duration)>,
    cancel: CancellationToken,
}

impl TxContext {
    /// No deadline, fresh token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deadline `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some((Instant::now() + timeout, timeout)),
            cancel: CancellationToken::new(),
        }
    }

    /// Observe `token` instead of the context's own.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline.map(|(at, _)| at)
    }

    fn timeout_error(&self) -> TidingsError {
        TidingsError::Timeout {
            duration: self.deadline.map(|(_, d)| d).unwrap_or_default(),
        }
    }
}

/// The checks the writer thread runs before `BEGIN` and before `COMMIT`.
///
/// Uses `std::time::Instant` so it works off the runtime's clock.
struct Gate {
    deadline: Option<(std::time::Instant, Duration)>,
    cancel: CancellationToken,
}

impl Gate {
    fn check(&self) -> Result<(), TidingsError> {
        if self.cancel.is_cancelled() {
            return Err(TidingsError::Cancelled);
        }
        if let Some((at, duration)) = self.deadline {
            if std::time::Instant::now() >= at {
                return Err(TidingsError::Timeout { duration });
            }
        }
        Ok(())
    }
}

impl Database {
    /// Run `work` as one atomic unit of work.
    ///
    /// Commits if `work` returns `Ok` and `ctx` is neither expired nor
    /// cancelled at commit time. Rolls back if `work` fails or panics, or if
    /// the deadline or token fires. Waiting for the writer is bounded by the
    /// deadline too.
    ///
    /// A result that is already available wins over a late cancellation. If
    /// the token or deadline fires after the writer passed its pre-commit
    /// check but before the result arrives, the caller sees `Cancelled` or
    /// `Timeout` although the unit committed. Retrying an idempotent unit is
    /// safe in that case.
    pub async fn with_tx<T, F>(&self, ctx: &TxContext, work: F) -> Result<T, TidingsError>
    where
        T: Send + 'static,
        F: FnOnce(&Transaction<'_>) -> Result<T, TidingsError> + Send + 'static,
    {
        let gate = Gate {
            deadline: ctx.deadline.map(|(at, d)| (at.into_std(), d)),
            cancel: ctx.cancel.clone(),
        };
        gate.check()?;

        let call = self
            .connection()
            .call(move |conn| run_unit(conn, &gate, work));

        let bounded = async {
            match ctx.deadline {
                Some((at, _)) => match tokio::time::timeout_at(at, call).await {
                    Ok(result) => result.map_err(flatten_call_err),
                    Err(_) => Err(ctx.timeout_error()),
                },
                None => call.await.map_err(flatten_call_err),
            }
        };

        tokio::select! {
            biased;
            result = bounded => result,
            _ = ctx.cancel.cancelled() => Err(TidingsError::Cancelled),
        }
    }
}

fn run_unit<T, F>(
    conn: &mut rusqlite::Connection,
    gate: &Gate,
    work: F,
) -> Result<T, TidingsError>
where
    F: FnOnce(&Transaction<'_>) -> Result<T, TidingsError>,
{
    gate.check()?;
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| TidingsError::transaction(TxStage::Begin, e))?;

    let outcome = match catch_unwind(AssertUnwindSafe(|| work(&tx))) {
        Ok(result) => result,
        Err(payload) => Err(TidingsError::transaction(
            TxStage::Work,
            format!("work function panicked: {}", panic_message(payload.as_ref())),
        )),
    };

    let value = match outcome.and_then(|value| gate.check().map(|()| value)) {
        Ok(value) => value,
        Err(err) => return Err(rollback(tx, err)),
    };

    tx.commit()
        .map_err(|e| TidingsError::transaction(TxStage::Commit, e))?;
    Ok(value)
}

/// Roll back and return `err`, or a rollback error if that fails too.
fn rollback(tx: Transaction<'_>, err: TidingsError) -> TidingsError {
    match tx.rollback() {
        Ok(()) => err,
        Err(rollback_err) => {
            warn!(error = %err, "rollback failed after unit-of-work error");
            TidingsError::transaction(TxStage::Rollback, rollback_err)
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
