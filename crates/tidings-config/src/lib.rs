// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for Tidings.
//!
//! TOML files layered by Figment with `TIDINGS_` environment overrides,
//! strict key checking, semantic validation, and miette diagnostics.
//!
//! ```no_run
//! use tidings_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("database: {}", config.storage.database_path);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{IngestConfig, ServiceConfig, StorageConfig, TidingsConfig};

/// Load from the standard hierarchy and validate.
pub fn load_and_validate() -> Result<TidingsConfig, Vec<ConfigError>> {
    finish(loader::load_config(), || {
        loader::config_file_candidates()
            .into_iter()
            .filter_map(|path| {
                let content = std::fs::read_to_string(&path).ok()?;
                Some((path.display().to_string(), content))
            })
            .collect()
    })
}

/// Load one explicit file (plus env overrides) and validate.
pub fn load_and_validate_path(path: &Path) -> Result<TidingsConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_path(path), || {
        std::fs::read_to_string(path)
            .map(|content| vec![(path.display().to_string(), content)])
            .unwrap_or_default()
    })
}

/// Load a TOML string and validate. Used by tests and embedded setups.
pub fn load_and_validate_str(toml_content: &str) -> Result<TidingsConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

fn finish(
    loaded: Result<TidingsConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<TidingsConfig, Vec<ConfigError>> {
    match loaded {
        Ok(config) => {
            validation::validate_config(&config)?;
            tracing::debug!(database = %config.storage.database_path, "configuration loaded");
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &sources())),
    }
}

impl From<ConfigError> for tidings_core::TidingsError {
    fn from(err: ConfigError) -> Self {
        tidings_core::TidingsError::Config(err.to_string())
    }
}
