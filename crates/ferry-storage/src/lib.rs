// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Ferry relay.
//!
//! Provides SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and the append-only message log
//! kept as one JSON document under a fixed key.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
pub use models::*;
