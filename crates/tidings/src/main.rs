// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tidings - multi-tenant notification inbox.
//!
//! This is the binary entry point: configuration, tracing, and the operator
//! subcommands.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod doctor;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tidings_config::model::TidingsConfig;

/// Tidings - idempotent event ingest and a paginated inbox feed.
#[derive(Parser, Debug)]
#[command(name = "tidings", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the database if needed and apply pending migrations.
    Migrate,
    /// Ingest inbound events from a JSON file, or `-` for stdin.
    ///
    /// The input is one event object or an array of them.
    Ingest {
        #[arg(value_name = "FILE")]
        input: String,
    },
    /// Print one page of a user's inbox as JSON.
    Feed {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        user: String,
        /// UNREAD or READ.
        #[arg(long)]
        status: Option<String>,
        /// Page size, 1 to 100.
        #[arg(long)]
        limit: Option<i64>,
        /// Opaque cursor from a previous page's `next_cursor`.
        #[arg(long)]
        cursor: Option<String>,
    },
    /// Check configuration and database health.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => tidings_config::load_and_validate_path(path),
        None => tidings_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            tidings_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.service.log_level);

    if let Err(err) = run(cli.command, &config).await {
        eprintln!("tidings: {err}");
        std::process::exit(if err.is_client_error() { 2 } else { 1 });
    }
}

async fn run(command: Commands, config: &TidingsConfig) -> Result<(), tidings_core::TidingsError> {
    match command {
        Commands::Migrate => commands::migrate(config).await,
        Commands::Ingest { input } => commands::ingest(config, &input).await,
        Commands::Feed {
            tenant,
            user,
            status,
            limit,
            cursor,
        } => {
            let args = commands::FeedArgs {
                tenant,
                user,
                status,
                limit,
                cursor,
            };
            commands::feed(config, &args).await
        }
        Commands::Doctor { plain } => doctor::run_doctor(config, plain).await,
    }
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides the configured
/// level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tidings={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
