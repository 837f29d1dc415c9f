// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `./tidings.toml` > `~/.config/tidings/tidings.toml` >
//! `/etc/tidings/tidings.toml`, with `TIDINGS_` environment overrides on top.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::TidingsConfig;

/// Sections that env var names are split on.
const SECTIONS: &[&str] = &["service", "storage", "ingest"];

/// Candidate config files, lowest precedence first.
pub fn config_file_candidates() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/tidings/tidings.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("tidings").join("tidings.toml"));
    }
    paths.push(PathBuf::from("tidings.toml"));
    paths
}

/// Build the layered Figment: compiled defaults, then each candidate file,
/// then `TIDINGS_*` environment variables.
pub fn build_figment() -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(TidingsConfig::default()));
    for path in config_file_candidates() {
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(env_provider())
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<TidingsConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string over compiled defaults. No files,
/// no environment.
pub fn load_config_from_str(toml_content: &str) -> Result<TidingsConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TidingsConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TidingsConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TidingsConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Environment provider mapping `TIDINGS_<SECTION>_<KEY>` to `section.key`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `TIDINGS_STORAGE_DATABASE_PATH` maps to `storage.database_path`.
fn env_provider() -> Env {
    Env::prefixed("TIDINGS_").map(|key| {
        let key = key.as_str().to_ascii_lowercase();
        for section in SECTIONS {
            if let Some(rest) = key
                .strip_prefix(section)
                .and_then(|r| r.strip_prefix('_'))
            {
                return format!("{section}.{rest}").into();
            }
        }
        key.into()
    })
}
