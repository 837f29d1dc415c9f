// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::TidingsConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &TidingsConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.service.name.trim().is_empty() {
        fail("service.name must not be empty".to_string());
    }

    let level = config.service.log_level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        fail(format!(
            "service.log_level `{}` is not one of {}",
            config.service.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.storage.busy_timeout_ms == 0 {
        fail("storage.busy_timeout_ms must be greater than 0".to_string());
    }

    if config.storage.read_pool_size == 0 {
        fail("storage.read_pool_size must be at least 1".to_string());
    }

    if config.ingest.tx_timeout_ms == 0 {
        fail("ingest.tx_timeout_ms must be greater than 0".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(config: &TidingsConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&TidingsConfig::default()).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = TidingsConfig::default();
        config.storage.database_path = "  ".to_string();
        let errors = messages(&config);
        assert!(errors.iter().any(|m| m.contains("database_path")));
    }

    #[test]
    fn unknown_log_level_fails_validation() {
        let mut config = TidingsConfig::default();
        config.service.log_level = "loud".to_string();
        assert!(messages(&config).iter().any(|m| m.contains("log_level")));

        config.service.log_level = "DEBUG".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = TidingsConfig::default();
        config.storage.read_pool_size = 0;
        config.storage.busy_timeout_ms = 0;
        config.ingest.tx_timeout_ms = 0;
        let errors = messages(&config);
        assert_eq!(errors.len(), 3, "got {errors:?}");
    }
}
