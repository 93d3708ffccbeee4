// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Ferry relay.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Top-level Ferry configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FerryConfig {
    /// Relay session and polling settings.
    #[serde(default)]
    pub relay: RelayConfig,

    /// Telegram Bot API settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// When the dedup watermark moves forward during a relay cycle.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Deserialize, Serialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WatermarkAdvance {
    /// Once, after the whole batch has been processed.
    #[default]
    Batch,
    /// After every message's forward attempt.
    Message,
}

/// Relay session and polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Bot credential. `None` requires the `FERRY_RELAY_CREDENTIAL` variable
    /// or a `--credential` flag.
    #[serde(default)]
    pub credential: Option<String>,

    /// Conversation messages are read from.
    #[serde(default)]
    pub source_chat_id: String,

    /// Conversation messages are forwarded to.
    #[serde(default)]
    pub destination_chat_id: String,

    /// Period between relay cycles, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Watermark advance policy.
    #[serde(default)]
    pub watermark_advance: WatermarkAdvance,

    /// Sort each fetched batch by message id before filtering.
    #[serde(default = "default_sort_batches")]
    pub sort_batches: bool,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            credential: None,
            source_chat_id: String::new(),
            destination_chat_id: String::new(),
            poll_interval_ms: default_poll_interval_ms(),
            watermark_advance: WatermarkAdvance::default(),
            sort_batches: default_sort_batches(),
            log_level: default_log_level(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    3000
}

fn default_sort_batches() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telegram Bot API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Base URL of the Bot API; requests go to `{api_url}/bot{credential}/{method}`.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Upper bound on every Bot API call, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("ferry").join("ferry.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("ferry.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}
