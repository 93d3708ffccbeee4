// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Ferry relay.

use thiserror::Error;

/// The primary error type used across all Ferry adapter traits and relay operations.
#[derive(Debug, Error)]
pub enum FerryError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The platform rejected the credential.
    ///
    /// Not retryable until the credential changes.
    #[error("authentication failed: {reason}")]
    Auth { reason: String },

    /// Transport failure or an undecodable platform response.
    #[error("connectivity error: {message}")]
    Connectivity {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The destination refused a forwarded message.
    #[error("forward failed: {message}")]
    Forward { message: String },

    /// A start/stop request that does not fit the current relay state.
    #[error("invalid relay state: {0}")]
    InvalidState(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FerryError {
    /// Whether the next scheduled relay cycle may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            FerryError::Auth { .. } | FerryError::Config(_) | FerryError::InvalidState(_)
        )
    }
}
