// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Platform adapter trait for the chat service messages are relayed through.

use async_trait::async_trait;

use crate::error::FerryError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Identity, PlatformUpdate};

/// The three remote calls the relay needs from a chat platform.
///
/// Every call is authenticated by the opaque bot credential passed in; the
/// adapter itself holds no credential so one client serves any session.
#[async_trait]
pub trait PlatformAdapter: PluginAdapter {
    /// Resolves the credential's identity.
    ///
    /// Fails with [`FerryError::Auth`] when the platform rejects the credential
    /// and [`FerryError::Connectivity`] on transport failure.
    async fn get_me(&self, credential: &str) -> Result<Identity, FerryError>;

    /// Returns every message-bearing update currently buffered for the credential,
    /// in the order the platform returned them.
    async fn get_updates(&self, credential: &str) -> Result<Vec<PlatformUpdate>, FerryError>;

    /// Posts `text` to `chat_id`.
    ///
    /// Fails with [`FerryError::Forward`] when the platform answers with a
    /// non-success response.
    async fn send_message(
        &self,
        credential: &str,
        chat_id: &str,
        text: &str,
    ) -> Result<(), FerryError>;
}
