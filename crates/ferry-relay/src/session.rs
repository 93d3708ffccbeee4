// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session state: the active credential, routing, and the dedup watermark.

use std::fmt;
use std::sync::Arc;

use ferry_config::model::RelayConfig;
use ferry_core::FerryError;
use tokio::sync::Mutex;

/// Session state shared between the engine and its polling task.
pub type SharedSession = Arc<Mutex<SessionState>>;

/// Everything one relay needs to run.
///
/// Mutated only by verification (`resolved_name`) and by completed cycles
/// (`watermark`). The watermark only moves forward; use
/// [`advance_watermark`](Self::advance_watermark) rather than assigning it.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Opaque bot credential authenticating every platform call.
    pub credential: String,
    /// Bot name resolved by verification; `None` until verified.
    pub resolved_name: Option<String>,
    pub source_chat_id: String,
    pub destination_chat_id: String,
    /// Highest remote message id already processed.
    pub watermark: i64,
}

impl SessionState {
    pub fn new(
        credential: impl Into<String>,
        source_chat_id: impl Into<String>,
        destination_chat_id: impl Into<String>,
    ) -> Self {
        Self {
            credential: credential.into(),
            source_chat_id: source_chat_id.into(),
            destination_chat_id: destination_chat_id.into(),
            ..Self::default()
        }
    }

    /// Builds a session from the `[relay]` config section.
    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(
            config.credential.clone().unwrap_or_default(),
            config.source_chat_id.clone(),
            config.destination_chat_id.clone(),
        )
    }

    /// Checks the preconditions for entering `Running`.
    pub fn ensure_startable(&self) -> Result<(), FerryError> {
        if self.credential.trim().is_empty() {
            return Err(FerryError::InvalidState(
                "cannot start relay without a credential".into(),
            ));
        }
        if self.destination_chat_id.trim().is_empty() {
            return Err(FerryError::InvalidState(
                "cannot start relay without a destination chat id".into(),
            ));
        }
        Ok(())
    }

    /// Both the source and destination identifiers are present.
    pub fn has_routes(&self) -> bool {
        !self.source_chat_id.trim().is_empty() && !self.destination_chat_id.trim().is_empty()
    }

    /// Whether an update from `chat_id` belongs to this session's source.
    ///
    /// With no source configured every chat is accepted.
    pub fn accepts_chat(&self, chat_id: i64) -> bool {
        let source = self.source_chat_id.trim();
        source.is_empty() || source == chat_id.to_string()
    }

    /// Raises the watermark to `remote_message_id` if it is higher.
    ///
    /// Returns `true` if the watermark moved.
    pub fn advance_watermark(&mut self, remote_message_id: i64) -> bool {
        if remote_message_id > self.watermark {
            self.watermark = remote_message_id;
            true
        } else {
            false
        }
    }

    /// Same credential reading the same source conversation.
    ///
    /// Watermarks are only comparable between sessions in the same scope.
    pub fn same_scope(&self, other: &SessionState) -> bool {
        self.credential == other.credential && self.source_chat_id == other.source_chat_id
    }

    /// Switches to a new credential, discarding state tied to the old one.
    ///
    /// No-op when `credential` is already the active one.
    pub fn replace_credential(&mut self, credential: &str) {
        if self.credential != credential {
            self.credential = credential.to_string();
            self.resolved_name = None;
            self.watermark = 0;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let credential = if self.credential.is_empty() {
            "<unset>"
        } else {
            "<redacted>"
        };
        f.debug_struct("SessionState")
            .field("credential", &credential)
            .field("resolved_name", &self.resolved_name)
            .field("source_chat_id", &self.source_chat_id)
            .field("destination_chat_id", &self.destination_chat_id)
            .field("watermark", &self.watermark)
            .finish()
    }
}
