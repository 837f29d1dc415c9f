// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tidings doctor` command implementation.
//!
//! Opens the configured database, round-trips a statement on the writer and
//! a reader, and reports row counts.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use tidings_config::model::TidingsConfig;
use tidings_core::TidingsError;
use tidings_storage::Database;
use tidings_storage::queries::stats;

/// Status of a diagnostic check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: &'static str,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn finish(name: &'static str, start: Instant, result: Result<String, TidingsError>) -> Self {
        let (status, message) = match result {
            Ok(message) => (CheckStatus::Pass, message),
            Err(err) => (CheckStatus::Fail, err.to_string()),
        };
        Self {
            name,
            status,
            message,
            duration: start.elapsed(),
        }
    }
}

/// Run every check against `config`.
pub async fn collect_checks(config: &TidingsConfig) -> Vec<CheckResult> {
    let mut results = vec![CheckResult {
        name: "Configuration",
        status: CheckStatus::Pass,
        message: format!("valid (service {})", config.service.name),
        duration: Duration::ZERO,
    }];

    let start = Instant::now();
    let db = match Database::open(&config.storage).await {
        Ok(db) => {
            results.push(CheckResult::finish(
                "Database",
                start,
                Ok(format!("opened {}", db.path())),
            ));
            db
        }
        Err(err) => {
            results.push(CheckResult::finish("Database", start, Err(err)));
            return results;
        }
    };

    let start = Instant::now();
    let health = db.health_check().await.map(|()| "writer and reader respond".to_string());
    results.push(CheckResult::finish("Health", start, health));

    let start = Instant::now();
    let counts = stats::table_counts(&db).await.map(|c| {
        format!(
            "{} inbox items, {} processed events, {} outbox rows",
            c.inbox_items, c.processed_events, c.outbox
        )
    });
    results.push(CheckResult::finish("Row counts", start, counts));

    results
}

/// Run the `tidings doctor` command. Fails when any check fails.
pub async fn run_doctor(config: &TidingsConfig, plain: bool) -> Result<(), TidingsError> {
    let use_color = !plain && std::io::stdout().is_terminal();
    let results = collect_checks(config).await;

    println!();
    println!("  tidings doctor");
    println!("  {}", "-".repeat(50));

    let mut failures = 0;
    for result in &results {
        let duration_ms = result.duration.as_millis();
        let line = match (result.status, use_color) {
            (CheckStatus::Pass, true) => {
                use colored::Colorize;
                format!(
                    "    {} {:<14} {} ({duration_ms}ms)",
                    "✓".green(),
                    result.name,
                    result.message
                )
            }
            (CheckStatus::Pass, false) => format!(
                "    [OK]   {:<14} {} ({duration_ms}ms)",
                result.name, result.message
            ),
            (CheckStatus::Fail, true) => {
                use colored::Colorize;
                failures += 1;
                format!(
                    "    {} {:<14} {} ({duration_ms}ms)",
                    "✗".red(),
                    result.name,
                    result.message.red()
                )
            }
            (CheckStatus::Fail, false) => {
                failures += 1;
                format!(
                    "    [FAIL] {:<14} {} ({duration_ms}ms)",
                    result.name, result.message
                )
            }
        };
        println!("{line}");
    }
    println!();

    if failures > 0 {
        let word = if failures == 1 { "check" } else { "checks" };
        println!("  {failures} {word} failed.");
        println!();
        return Err(TidingsError::Internal(format!("{failures} doctor {word} failed")));
    }
    println!("  All checks passed.");
    println!();
    Ok(())
}
