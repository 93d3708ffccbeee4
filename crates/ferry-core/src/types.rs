// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the adapters and the relay engine.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Platform,
    Storage,
}

/// Whether the relay is currently polling.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum RelayState {
    #[default]
    Stopped,
    Running,
}

/// The identity a credential resolves to on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Human-readable name of the bot (the platform's `first_name`).
    pub resolved_name: String,
}

/// One message-bearing update fetched from the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformUpdate {
    /// Platform message identifier; the dedup watermark compares against it.
    pub remote_message_id: i64,
    /// Chat the message was posted in.
    pub chat_id: i64,
    /// Message text. Absent for stickers, photos and other non-text messages.
    pub text: Option<String>,
}

/// A message about to be appended to the log.
///
/// The store assigns `id` and `observed_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub source_credential: String,
    pub sender_chat_id: String,
    pub receiver_chat_id: String,
    pub remote_message_id: String,
    pub text: String,
}

impl NewMessage {
    /// Completes the record with a store-assigned id and timestamp.
    pub fn into_record(self, id: u64, observed_at: String) -> MessageRecord {
        MessageRecord {
            id,
            source_credential: self.source_credential,
            sender_chat_id: self.sender_chat_id,
            receiver_chat_id: self.receiver_chat_id,
            remote_message_id: self.remote_message_id,
            text: self.text,
            observed_at,
        }
    }
}

/// An observed message as persisted in the local message log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    /// Local identifier, strictly increasing in insertion order.
    pub id: u64,
    pub source_credential: String,
    pub sender_chat_id: String,
    pub receiver_chat_id: String,
    pub remote_message_id: String,
    pub text: String,
    /// RFC 3339 UTC timestamp of when the relay observed the message.
    pub observed_at: String,
}
