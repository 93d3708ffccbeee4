// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ferry messages` command implementation.

use std::io::IsTerminal;

use ferry_config::model::FerryConfig;
use ferry_core::{FerryError, MessageRecord, MessageStore, PluginAdapter};
use ferry_storage::SqliteStorage;

/// Run the `ferry messages` command.
///
/// `--json` prints the records as a JSON array (the persisted shape).
/// Otherwise one line per record, colored when stdout is a TTY.
pub async fn run_messages(
    config: &FerryConfig,
    json: bool,
    limit: Option<usize>,
    plain: bool,
) -> Result<(), FerryError> {
    let storage = SqliteStorage::open(config.storage.clone()).await?;
    let records = storage.list_all().await?;
    storage.shutdown().await?;

    let shown = most_recent(&records, limit);
    if json {
        let out = serde_json::to_string_pretty(shown)
            .map_err(|e| FerryError::Internal(format!("failed to serialize records: {e}")))?;
        println!("{out}");
        return Ok(());
    }

    if shown.is_empty() {
        println!("no messages");
        return Ok(());
    }
    let use_color = !plain && std::io::stdout().is_terminal();
    for record in shown {
        println!("{}", format_record(record, use_color));
    }
    Ok(())
}

/// The last `limit` records, still in insertion order.
fn most_recent(records: &[MessageRecord], limit: Option<usize>) -> &[MessageRecord] {
    match limit {
        Some(n) if n < records.len() => &records[records.len() - n..],
        _ => records,
    }
}

fn format_record(record: &MessageRecord, use_color: bool) -> String {
    let route = format!("{} -> {}", record.sender_chat_id, record.receiver_chat_id);
    if use_color {
        use colored::Colorize;
        format!(
            "{:>5}  {}  {}  #{}  {}",
            record.id.to_string().bold(),
            record.observed_at.dimmed(),
            route.cyan(),
            record.remote_message_id,
            record.text
        )
    } else {
        format!(
            "{:>5}  {}  {}  #{}  {}",
            record.id, record.observed_at, route, record.remote_message_id, record.text
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::NewMessage;

    fn record(id: u64) -> MessageRecord {
        NewMessage {
            source_credential: "t".into(),
            sender_chat_id: "-1001".into(),
            receiver_chat_id: "42".into(),
            remote_message_id: (100 + id).to_string(),
            text: format!("msg {id}"),
        }
        .into_record(id, "2026-01-01T00:00:00.000Z".into())
    }

    #[test]
    fn limit_keeps_the_tail_in_order() {
        let records: Vec<_> = (1..=5).map(record).collect();
        let ids: Vec<u64> = most_recent(&records, Some(2)).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![4, 5]);
        assert_eq!(most_recent(&records, Some(10)).len(), 5);
        assert_eq!(most_recent(&records, None).len(), 5);
        assert!(most_recent(&records, Some(0)).is_empty());
    }

    #[test]
    fn plain_format_has_route_and_text() {
        let line = format_record(&record(3), false);
        assert_eq!(line, "    3  2026-01-01T00:00:00.000Z  -1001 -> 42  #103  msg 3");
    }

    #[tokio::test]
    async fn messages_command_reads_the_configured_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = FerryConfig::default();
        config.storage.database_path = dir.path().join("ferry.db").to_str().unwrap().to_string();

        run_messages(&config, true, None, true).await.unwrap();
        run_messages(&config, false, Some(1), true).await.unwrap();
    }
}
