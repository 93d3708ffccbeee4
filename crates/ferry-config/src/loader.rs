// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./ferry.toml` > `~/.config/ferry/ferry.toml` > `/etc/ferry/ferry.toml`
//! with environment variable overrides via `FERRY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::FerryConfig;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/ferry/ferry.toml";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "ferry.toml";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/ferry/ferry.toml` (system-wide)
/// 3. `~/.config/ferry/ferry.toml` (user XDG config)
/// 4. `./ferry.toml` (local directory)
/// 5. `FERRY_*` environment variables
pub fn load_config() -> Result<FerryConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<FerryConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FerryConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<FerryConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FerryConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for XDG config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(FerryConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("ferry/ferry.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `FERRY_RELAY_SOURCE_CHAT_ID` must map to `relay.source_chat_id`,
/// not `relay.source.chat.id`.
fn env_provider() -> Env {
    Env::prefixed("FERRY_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped env var name to its dotted config key.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in ["relay", "telegram", "storage"] {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_first_section_only() {
        assert_eq!(map_env_key("relay_source_chat_id"), "relay.source_chat_id");
        assert_eq!(map_env_key("telegram_api_url"), "telegram.api_url");
        assert_eq!(map_env_key("storage_wal_mode"), "storage.wal_mode");
    }

    #[test]
    fn unknown_sections_pass_through() {
        assert_eq!(map_env_key("logging_level"), "logging_level");
    }
}
