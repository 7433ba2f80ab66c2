// SPDX-FileCopyrightText: 2026 Fila Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./fila.toml` > `~/.config/fila/fila.toml` > `/etc/fila/fila.toml`
//! with environment variable overrides via `FILA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::FilaConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/fila/fila.toml` (system-wide)
/// 3. `~/.config/fila/fila.toml` (user XDG config)
/// 4. `./fila.toml` (local directory)
/// 5. `FILA_*` environment variables
pub fn load_config() -> Result<FilaConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a specific TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<FilaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FilaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<FilaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FilaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(FilaConfig::default()))
        .merge(Toml::file("/etc/fila/fila.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("fila/fila.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("fila.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. For example, `FILA_STORAGE_DATABASE_PATH`
/// must map to `storage.database_path`, not `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("FILA_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: FILA_STORAGE_DATABASE_PATH -> "storage_database_path"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agency_", "agency.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("gateway_", "gateway.", 1)
            .replacen("display_", "display.", 1)
            .replacen("log_", "log.", 1);
        mapped.into()
    })
}
