// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat platform for deterministic relay tests.
//!
//! `MockPlatform` implements `PlatformAdapter` over an in-memory update buffer
//! that behaves like the Bot API's: every `get_updates` call returns the whole
//! buffer, since the relay never acknowledges an offset.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use ferry_core::traits::adapter::PluginAdapter;
use ferry_core::traits::platform::PlatformAdapter;
use ferry_core::types::{AdapterType, HealthStatus, Identity, PlatformUpdate};
use ferry_core::FerryError;

/// Chat id used by [`text_update`] for the source conversation.
pub const SOURCE_CHAT: i64 = -1001;

/// Build a text update from the default source chat.
pub fn text_update(remote_message_id: i64, text: &str) -> PlatformUpdate {
    PlatformUpdate {
        remote_message_id,
        chat_id: SOURCE_CHAT,
        text: Some(text.to_string()),
    }
}

/// A message captured by `send_message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub credential: String,
    pub chat_id: String,
    pub text: String,
}

/// A scripted platform.
///
/// - **identities**: credentials registered with [`accept`](Self::accept)
///   resolve through `get_me`; anything else fails with `Auth("Unauthorized")`.
/// - **buffer**: updates returned by every `get_updates` call.
/// - **sent**: messages passed to `send_message`, retrievable via `sent_messages()`.
pub struct MockPlatform {
    identities: Arc<Mutex<HashMap<String, String>>>,
    buffer: Arc<Mutex<Vec<PlatformUpdate>>>,
    sent: Arc<Mutex<Vec<SentMessage>>>,
    rejected_texts: Arc<Mutex<HashSet<String>>>,
    fetch_failures: AtomicUsize,
    fetch_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fetch_delay: Mutex<Option<Duration>>,
}

impl MockPlatform {
    /// Create a platform with no known credentials and an empty buffer.
    pub fn new() -> Self {
        Self {
            identities: Arc::new(Mutex::new(HashMap::new())),
            buffer: Arc::new(Mutex::new(Vec::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            rejected_texts: Arc::new(Mutex::new(HashSet::new())),
            fetch_failures: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            fetch_delay: Mutex::new(None),
        }
    }

    /// Register a credential that `get_me` resolves to `name`.
    pub async fn accept(&self, credential: &str, name: &str) {
        self.identities
            .lock()
            .await
            .insert(credential.to_string(), name.to_string());
    }

    /// Append updates to the server-side buffer.
    pub async fn push_updates(&self, updates: impl IntoIterator<Item = PlatformUpdate>) {
        self.buffer.lock().await.extend(updates);
    }

    /// Replace the server-side buffer.
    pub async fn set_updates(&self, updates: Vec<PlatformUpdate>) {
        *self.buffer.lock().await = updates;
    }

    /// Make the next `count` fetches fail with a connectivity error.
    pub fn fail_next_fetches(&self, count: usize) {
        self.fetch_failures.store(count, Ordering::SeqCst);
    }

    /// Make every send of exactly `text` fail with a forward error.
    pub async fn reject_text(&self, text: &str) {
        self.rejected_texts.lock().await.insert(text.to_string());
    }

    /// Delay every fetch, to model a slow network.
    pub async fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock().await = Some(delay);
    }

    /// Messages successfully sent, in order.
    pub async fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    /// Texts successfully sent, in order.
    pub async fn sent_texts(&self) -> Vec<String> {
        self.sent.lock().await.iter().map(|m| m.text.clone()).collect()
    }

    /// Number of `get_updates` calls made, including failed ones.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Highest number of `get_updates` calls ever outstanding at once.
    pub fn max_concurrent_fetches(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockPlatform {
    fn name(&self) -> &str {
        "mock-platform"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Platform
    }

    async fn health_check(&self) -> Result<HealthStatus, FerryError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FerryError> {
        Ok(())
    }
}

#[async_trait]
impl PlatformAdapter for MockPlatform {
    async fn get_me(&self, credential: &str) -> Result<Identity, FerryError> {
        match self.identities.lock().await.get(credential) {
            Some(name) => Ok(Identity {
                resolved_name: name.clone(),
            }),
            None => Err(FerryError::Auth {
                reason: "Unauthorized".to_string(),
            }),
        }
    }

    async fn get_updates(&self, _credential: &str) -> Result<Vec<PlatformUpdate>, FerryError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.fetch_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let fail = self
            .fetch_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            return Err(FerryError::Connectivity {
                message: "mock fetch failure".to_string(),
                source: None,
            });
        }

        Ok(self.buffer.lock().await.clone())
    }

    async fn send_message(
        &self,
        credential: &str,
        chat_id: &str,
        text: &str,
    ) -> Result<(), FerryError> {
        if self.rejected_texts.lock().await.contains(text) {
            return Err(FerryError::Forward {
                message: "Bad Request: mock rejection".to_string(),
            });
        }
        self.sent.lock().await.push(SentMessage {
            credential: credential.to_string(),
            chat_id: chat_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}
