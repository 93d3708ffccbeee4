// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Ferry message relay.
//!
//! This crate provides the trait definitions, error types, and common types
//! shared by the platform client, the message store, and the relay engine.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::FerryError;
pub use types::{
    AdapterType, HealthStatus, Identity, MessageRecord, NewMessage, PlatformUpdate, RelayState,
};

pub use traits::{MessageStore, PlatformAdapter, PluginAdapter};
