#![allow(dead_code)]

use std::sync::Arc;

use tempfile::TempDir;

use pbot::session::{LogOptions, Message, MessageLog};

/// Log backed by JSON files in a fresh temp dir. Keep the `TempDir` alive for
/// the duration of the test.
pub async fn temp_log() -> (TempDir, Arc<MessageLog>) {
    let tmp = TempDir::new().expect("tempdir");
    let log = reopen(&tmp).await;
    (tmp, log)
}

pub async fn reopen(tmp: &TempDir) -> Arc<MessageLog> {
    let log = MessageLog::open_dir(tmp.path(), LogOptions::default())
        .await
        .expect("open message log");
    Arc::new(log)
}

/// Append `turns` user/assistant pairs whose contents are exactly `chars`
/// characters and start with the zero-padded turn number.
pub async fn seed_turns(log: &MessageLog, session_id: &str, turns: usize, chars: usize) {
    for turn in 0..turns {
        log.append(session_id, Message::user(padded(turn, 'u', chars)))
            .await;
        log.append(session_id, Message::assistant(padded(turn, 'a', chars)))
            .await;
    }
}

pub fn padded(turn: usize, fill: char, chars: usize) -> String {
    let prefix = format!("{turn:03}");
    let fill_len = chars.saturating_sub(prefix.len());
    format!("{prefix}{}", fill.to_string().repeat(fill_len))
}

pub fn contents(messages: &[Message]) -> Vec<String> {
    messages.iter().map(|m| m.content.clone()).collect()
}
