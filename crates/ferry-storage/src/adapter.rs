// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`MessageStore`] trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use ferry_config::model::StorageConfig;
use ferry_core::{
    AdapterType, FerryError, HealthStatus, MessageRecord, MessageStore, NewMessage, PluginAdapter,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed message store.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules. The
/// database is opened on the first call to [`SqliteStorage::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`](Self::initialize) is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Create and initialize in one step.
    pub async fn open(config: StorageConfig) -> Result<Self, FerryError> {
        let storage = Self::new(config);
        storage.initialize().await?;
        Ok(storage)
    }

    /// Opens the database, applying PRAGMAs and migrations.
    pub async fn initialize(&self) -> Result<(), FerryError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| FerryError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    /// Returns the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, FerryError> {
        self.db.get().ok_or_else(|| FerryError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    async fn checkpoint(&self) -> Result<(), FerryError> {
        let Some(db) = self.db.get() else {
            return Ok(());
        };
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, FerryError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FerryError> {
        self.checkpoint().await
    }
}

#[async_trait]
impl MessageStore for SqliteStorage {
    async fn append(&self, message: NewMessage) -> Result<MessageRecord, FerryError> {
        queries::messages::append_message(self.db()?, message).await
    }

    async fn list_all(&self) -> Result<Vec<MessageRecord>, FerryError> {
        queries::messages::list_messages(self.db()?).await
    }

    async fn clear_all(&self) -> Result<(), FerryError> {
        queries::messages::clear_messages(self.db()?).await
    }
}
