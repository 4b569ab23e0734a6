use std::collections::HashSet;
use std::sync::Arc;

use tokio::task::JoinSet;

use pbot::session::{LogOptions, Message, MessageLog};

use super::session_harness::temp_log;

const WRITERS: usize = 8;
const PER_WRITER: usize = 25;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_appends_keep_per_writer_order_without_loss() {
    let (_tmp, log) = temp_log().await;

    let mut tasks = JoinSet::new();
    for writer in 0..WRITERS {
        let log = Arc::clone(&log);
        tasks.spawn(async move {
            for seq in 0..PER_WRITER {
                log.try_append("shared", Message::user(format!("w{writer}-{seq}")))
                    .await
                    .expect("append");
            }
        });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.expect("writer task");
    }

    let messages = log.read("shared", None).await;
    assert_eq!(messages.len(), WRITERS * PER_WRITER);

    let unique: HashSet<_> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(unique.len(), messages.len(), "no duplicates");

    for writer in 0..WRITERS {
        let prefix = format!("w{writer}-");
        let sequence: Vec<usize> = messages
            .iter()
            .filter_map(|m| m.content.strip_prefix(&prefix))
            .map(|seq| seq.parse().unwrap())
            .collect();
        let expected: Vec<usize> = (0..PER_WRITER).collect();
        assert_eq!(sequence, expected, "writer {writer} out of order");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sessions_are_all_persisted() {
    let (tmp, log) = temp_log().await;

    let mut tasks = JoinSet::new();
    for index in 0..16 {
        let log = Arc::clone(&log);
        tasks.spawn(async move {
            let session_id = format!("session-{index}");
            log.append(&session_id, Message::user("hello")).await;
            log.append(&session_id, Message::assistant("hi")).await;
        });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.expect("task");
    }

    let reopened = MessageLog::open_dir(tmp.path(), LogOptions::default())
        .await
        .unwrap();
    let sessions = reopened.list_sessions().await;
    assert_eq!(sessions.len(), 16);
    assert!(sessions.iter().all(|s| s.message_count == 2));
}
