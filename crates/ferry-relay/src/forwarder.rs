// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-attempt delivery of one message to the destination chat.

use std::sync::Arc;

use ferry_core::PlatformAdapter;
use tracing::{debug, warn};

/// Sends message text to the destination. Never retries, never raises.
#[derive(Clone)]
pub struct Forwarder {
    platform: Arc<dyn PlatformAdapter>,
}

impl Forwarder {
    pub fn new(platform: Arc<dyn PlatformAdapter>) -> Self {
        Self { platform }
    }

    /// Returns `true` only if the platform confirmed the send.
    ///
    /// Rejections and transport failures are logged and reported as `false`.
    /// Empty text is sent as-is.
    pub async fn forward(&self, credential: &str, text: &str, destination_chat_id: &str) -> bool {
        let delivered = match self
            .platform
            .send_message(credential, destination_chat_id, text)
            .await
        {
            Ok(()) => {
                debug!(chat_id = destination_chat_id, "message forwarded");
                true
            }
            Err(e) => {
                warn!(chat_id = destination_chat_id, error = %e, "forward failed");
                false
            }
        };
        crate::recording::record_forward(delivered);
        delivered
    }
}
