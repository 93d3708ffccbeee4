// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key/value operations on the `kv_store` table.

use ferry_core::FerryError;
use rusqlite::params;

use crate::database::Database;

/// Read the value stored under `key`, if any.
#[cfg(test)]
pub(crate) async fn get_value(db: &Database, key: &str) -> Result<Option<String>, FerryError> {
    use rusqlite::OptionalExtension;

    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert or replace the value stored under `key`.
pub async fn put_value(db: &Database, key: &str, value: &str) -> Result<(), FerryError> {
    let key = key.to_string();
    let value = value.to_string();
    db.connection()
        .call(move |conn| {
            upsert(conn, &key, &value)?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Upsert on an already-borrowed connection or transaction.
pub(crate) fn upsert(
    conn: &rusqlite::Connection,
    key: &str,
    value: &str,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO kv_store (key, value, updated_at)
         VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_reads_as_none() {
        let db = Database::open_in_memory().await.unwrap();
        assert_eq!(get_value(&db, "nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_overwrites_previous_value() {
        let db = Database::open_in_memory().await.unwrap();
        put_value(&db, "k", "one").await.unwrap();
        put_value(&db, "k", "two").await.unwrap();
        assert_eq!(get_value(&db, "k").await.unwrap().as_deref(), Some("two"));
    }
}
