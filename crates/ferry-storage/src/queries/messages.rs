// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message log operations.
//!
//! The log is a JSON array of [`MessageRecord`]s under [`MESSAGES_KEY`]. An
//! absent key reads as an empty log.

use ferry_core::FerryError;
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::models::{MessageRecord, NewMessage};
use crate::queries::kv;

/// Storage key holding the serialized message log.
pub const MESSAGES_KEY: &str = "relay_messages";

/// Append a message, assigning `id = count + 1` and the current time.
///
/// Read, extend and write happen in one transaction.
pub async fn append_message(db: &Database, msg: NewMessage) -> Result<MessageRecord, FerryError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let mut records = read_log(&tx)?;
            let record = msg.into_record(records.len() as u64 + 1, now_timestamp());
            records.push(record.clone());
            write_log(&tx, &records)?;
            tx.commit()?;
            Ok(record)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All records in insertion order.
pub async fn list_messages(db: &Database) -> Result<Vec<MessageRecord>, FerryError> {
    db.connection()
        .call(|conn| read_log(conn))
        .await
        .map_err(crate::database::map_tr_err)
}

/// Replace the log with an empty array.
pub async fn clear_messages(db: &Database) -> Result<(), FerryError> {
    kv::put_value(db, MESSAGES_KEY, "[]").await
}

fn read_log(conn: &rusqlite::Connection) -> Result<Vec<MessageRecord>, rusqlite::Error> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM kv_store WHERE key = ?1",
            params![MESSAGES_KEY],
            |row| row.get(0),
        )
        .optional()?;

    match raw {
        None => Ok(Vec::new()),
        Some(json) => serde_json::from_str(&json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))),
    }
}

fn write_log(conn: &rusqlite::Connection, records: &[MessageRecord]) -> Result<(), rusqlite::Error> {
    let json =
        serde_json::to_string(records).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    kv::upsert(conn, MESSAGES_KEY, &json)
}

fn now_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}
