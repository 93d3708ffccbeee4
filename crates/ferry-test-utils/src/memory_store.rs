// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory message store for tests that do not need SQLite.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use ferry_core::traits::adapter::PluginAdapter;
use ferry_core::traits::storage::MessageStore;
use ferry_core::types::{AdapterType, HealthStatus, MessageRecord, NewMessage};
use ferry_core::FerryError;

/// A `MessageStore` backed by a `Vec`.
///
/// Follows the same id rule as the SQLite store: `id = count + 1`.
pub struct MemoryMessageStore {
    records: Arc<Mutex<Vec<MessageRecord>>>,
    /// Appends left before failures start; `usize::MAX` means unlimited.
    appends_allowed: AtomicUsize,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            appends_allowed: AtomicUsize::new(usize::MAX),
        }
    }

    /// Make subsequent appends fail with a storage error.
    pub fn set_fail_appends(&self, fail: bool) {
        let allowed = if fail { 0 } else { usize::MAX };
        self.appends_allowed.store(allowed, Ordering::SeqCst);
    }

    /// Let the next `count` appends succeed, then fail every one after.
    pub fn fail_after_appends(&self, count: usize) {
        self.appends_allowed.store(count, Ordering::SeqCst);
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

impl Default for MemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MemoryMessageStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, FerryError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FerryError> {
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn append(&self, message: NewMessage) -> Result<MessageRecord, FerryError> {
        let allowed = self
            .appends_allowed
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                0 => None,
                usize::MAX => Some(usize::MAX),
                n => Some(n - 1),
            });
        if allowed.is_err() {
            return Err(FerryError::Storage {
                source: "mock append failure".into(),
            });
        }
        let mut records = self.records.lock().await;
        let observed_at = chrono::Utc::now()
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string();
        let record = message.into_record(records.len() as u64 + 1, observed_at);
        records.push(record.clone());
        Ok(record)
    }

    async fn list_all(&self) -> Result<Vec<MessageRecord>, FerryError> {
        Ok(self.records.lock().await.clone())
    }

    async fn clear_all(&self) -> Result<(), FerryError> {
        self.records.lock().await.clear();
        Ok(())
    }
}
