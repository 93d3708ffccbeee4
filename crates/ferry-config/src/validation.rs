// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-zero intervals, non-empty paths, and well-formed URLs.

use crate::diagnostic::ConfigError;
use crate::model::FerryConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &FerryConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut invalid = |message: String| errors.push(ConfigError::Validation { message });

    if config.relay.poll_interval_ms == 0 {
        invalid("relay.poll_interval_ms must be greater than zero".to_string());
    }

    let level = config.relay.log_level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        invalid(format!(
            "relay.log_level `{}` is not one of {}",
            config.relay.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if let Some(credential) = &config.relay.credential
        && credential.trim().is_empty()
    {
        invalid("relay.credential must not be blank when set".to_string());
    }

    let api_url = config.telegram.api_url.trim();
    if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
        invalid(format!(
            "telegram.api_url `{api_url}` must start with http:// or https://"
        ));
    }

    if config.telegram.request_timeout_secs == 0 {
        invalid("telegram.request_timeout_secs must be greater than zero".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        invalid("storage.database_path must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
