// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! `Database` wraps the one connection; query modules accept `&Database` and
//! go through [`Database::connection`]. Do NOT open additional connections
//! for writes.

use ferry_core::FerryError;
use tracing::debug;

use crate::migrations;

/// Handle to the SQLite database.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path` in WAL mode and run migrations.
    pub async fn open(path: &str) -> Result<Self, FerryError> {
        Self::open_with(path, true).await
    }

    /// Open the database at `path`, choosing the journal mode.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, FerryError> {
        if let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| FerryError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| FerryError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.prepare(wal_mode).await?;
        debug!(path, wal_mode, "database opened");
        Ok(db)
    }

    /// Open a private in-memory database with the schema applied.
    pub async fn open_in_memory() -> Result<Self, FerryError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| FerryError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.prepare(false).await?;
        Ok(db)
    }

    /// Returns the single writer connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), FerryError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(|e| FerryError::Storage {
            source: Box::new(e),
        })
    }

    async fn prepare(&self, wal_mode: bool) -> Result<(), FerryError> {
        let journal = if wal_mode { "WAL" } else { "DELETE" };
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch(&format!(
                    "PRAGMA journal_mode = {journal};
                     PRAGMA synchronous = NORMAL;
                     PRAGMA busy_timeout = 5000;
                     PRAGMA foreign_keys = ON;"
                ))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        let applied = self
            .conn
            .call(|conn| migrations::run_migrations(conn))
            .await
            .map_err(|e: tokio_rusqlite::Error<refinery::Error>| FerryError::Storage {
                source: Box::new(e),
            })?;
        if applied > 0 {
            debug!(applied, "database migrations applied");
        }
        Ok(())
    }
}

/// Convert a tokio-rusqlite error into `FerryError::Storage`.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> FerryError {
    FerryError::Storage {
        source: Box::new(e),
    }
}
