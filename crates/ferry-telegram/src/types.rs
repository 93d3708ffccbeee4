// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the subset of the Bot API the relay uses.

use serde::{Deserialize, Serialize};

/// Envelope every Bot API method answers with.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
}

/// `getMe` result.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: Option<i64>,
    pub first_name: String,
    pub username: Option<String>,
}

/// One entry of the `getUpdates` result.
///
/// Only `message` updates are relayed; edits, callbacks and the rest
/// deserialize with `message: None`.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: Option<i64>,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// `sendMessage` request body.
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest<'a> {
    pub chat_id: &'a str,
    pub text: &'a str,
}
