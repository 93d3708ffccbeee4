// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage trait for the append-only message log.

use async_trait::async_trait;

use crate::error::FerryError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{MessageRecord, NewMessage};

/// Append-only log of observed messages.
///
/// Implementations are not required to be safe for concurrent writers; the
/// relay serializes all appends onto its single polling task.
#[async_trait]
pub trait MessageStore: PluginAdapter {
    /// Appends a message, assigning `id = existing count + 1` and the current time.
    async fn append(&self, message: NewMessage) -> Result<MessageRecord, FerryError>;

    /// Returns all records in insertion order.
    async fn list_all(&self) -> Result<Vec<MessageRecord>, FerryError>;

    /// Removes every record.
    async fn clear_all(&self) -> Result<(), FerryError>;
}
