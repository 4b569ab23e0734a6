use std::fs;

use pbot::session::{Message, MessageRole};

use super::session_harness::{contents, reopen, temp_log};

#[tokio::test]
async fn sessions_survive_reopen() {
    let (tmp, log) = temp_log().await;
    log.append("s1", Message::user("Hello").with_image_ref("uploads/1.png"))
        .await;
    log.append("s1", Message::assistant("Hi there")).await;
    let before = log.get_or_create("s1").await;
    drop(log);

    let reopened = reopen(&tmp).await;
    let after = reopened.get_or_create("s1").await;

    assert_eq!(after, before);
    assert_eq!(after.messages[0].image_ref.as_deref(), Some("uploads/1.png"));
}

#[tokio::test]
async fn empty_session_is_persisted_on_first_read() {
    let (tmp, log) = temp_log().await;

    assert!(log.read("lazy", None).await.is_empty());

    let raw = fs::read_to_string(tmp.path().join("lazy.json")).unwrap();
    let record: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(record["messages"], serde_json::json!([]));
}

#[tokio::test]
async fn corrupt_record_only_loses_its_own_session() {
    let (tmp, log) = temp_log().await;
    log.append("healthy", Message::user("still here")).await;
    drop(log);
    fs::write(tmp.path().join("damaged.json"), "{\"created_at\": 42").unwrap();

    let reopened = reopen(&tmp).await;
    let listed = reopened.list_sessions().await;

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].session_id, "healthy");
    assert_eq!(
        contents(&reopened.read("healthy", None).await),
        ["still here"]
    );
}

#[tokio::test]
async fn corrupt_record_bytes_survive_reuse_of_its_id() {
    let (tmp, log) = temp_log().await;
    drop(log);
    let original = "{\"created_at\": 42, \"messages\": [{\"role\": \"user\"";
    fs::write(tmp.path().join("damaged.json"), original).unwrap();

    let reopened = reopen(&tmp).await;
    assert!(reopened.read("damaged", None).await.is_empty());
    reopened.append("damaged", Message::user("new start")).await;

    let preserved: Vec<_> = fs::read_dir(tmp.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("damaged.json.corrupt-"))
        })
        .collect();
    assert_eq!(preserved.len(), 1);
    assert_eq!(fs::read_to_string(&preserved[0]).unwrap(), original);

    drop(reopened);
    let again = reopen(&tmp).await;
    assert_eq!(contents(&again.read("damaged", None).await), ["new start"]);
}

#[tokio::test]
async fn record_on_disk_matches_documented_shape() {
    let (tmp, log) = temp_log().await;
    log.append("s1", Message::user("Hello")).await;
    log.append("s1", Message::assistant("Hi")).await;

    let raw = fs::read_to_string(tmp.path().join("s1.json")).unwrap();
    let record: serde_json::Value = serde_json::from_str(&raw).unwrap();

    let messages = record["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["role"], "assistant");
    assert!(messages[0]["timestamp"].is_string());
    assert!(record["created_at"].is_string());
    assert!(record["last_updated"].is_string());
}

#[tokio::test]
async fn hand_written_record_is_loaded() {
    let tmp = tempfile::TempDir::new().unwrap();
    fs::write(
        tmp.path().join("imported.json"),
        r#"{
  "created_at": "2025-01-01T10:00:00Z",
  "last_updated": "2025-01-01T10:05:00Z",
  "messages": [
    {"role": "user", "content": "leaky tap", "timestamp": "2025-01-01T10:00:00Z", "image_ref": "uploads/tap.jpg"},
    {"role": "assistant", "content": "Check the washer.", "timestamp": "2025-01-01T10:05:00Z"}
  ]
}"#,
    )
    .unwrap();

    let log = reopen(&tmp).await;
    let messages = log.read("imported", None).await;

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::User);
    assert_eq!(messages[0].image_ref.as_deref(), Some("uploads/tap.jpg"));
    assert_eq!(log.last_image_ref("imported", 10).await.as_deref(), Some("uploads/tap.jpg"));
}

#[tokio::test]
async fn record_with_offsetless_timestamps_is_loaded() {
    let tmp = tempfile::TempDir::new().unwrap();
    fs::write(
        tmp.path().join("legacy.json"),
        r#"{
  "created_at": "2025-01-01T10:00:00.123456",
  "last_updated": "2025-01-01T10:05:00.654321",
  "messages": [
    {"role": "user", "content": "drain is slow", "timestamp": "2025-01-01T10:00:00.123456"},
    {"role": "assistant", "content": "Try a plunger.", "timestamp": "2025-01-01T10:05:00.654321"}
  ]
}"#,
    )
    .unwrap();

    let log = reopen(&tmp).await;
    let listed = log.list_sessions().await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].message_count, 2);
    assert_eq!(
        listed[0].created_at.to_rfc3339(),
        "2025-01-01T10:00:00.123456+00:00"
    );

    log.append("legacy", Message::user("still slow")).await;
    let messages = log.read("legacy", None).await;
    assert_eq!(
        contents(&messages),
        ["drain is slow", "Try a plunger.", "still slow"]
    );
}
