use pbot::session::{Message, build_context_window, format_history};

use super::session_harness::{seed_turns, temp_log};

fn user_turns(window: &str) -> usize {
    window.lines().filter(|line| line.starts_with("User: ")).count()
}

#[tokio::test]
async fn short_conversation_is_included_in_order() {
    let (_tmp, log) = temp_log().await;
    log.append("s1", Message::user("Hello")).await;
    log.append("s1", Message::assistant("Hi there")).await;
    log.append("s1", Message::user("What now?")).await;

    let window = build_context_window(&log, "s1", "Next?", 2, 1000).await;

    let hello = window.find("User: Hello").unwrap();
    let hi = window.find("Assistant: Hi there").unwrap();
    let what = window.find("User: What now?").unwrap();
    let current = window.find("Current message: Next?").unwrap();
    assert!(hello < hi && hi < what && what < current);
    assert!(window.ends_with("Current message: Next?"));
}

#[tokio::test]
async fn turn_floor_beats_character_ceiling() {
    let (_tmp, log) = temp_log().await;
    seed_turns(&log, "long", 20, 100).await;

    let window = build_context_window(&log, "long", "next", 3, 50).await;

    assert_eq!(user_turns(&window), 3);
    for turn in 17..20 {
        let user_line = format!("User: {turn:03}{}", "u".repeat(97));
        assert!(window.contains(&user_line), "turn {turn} missing or cut");
    }
}

#[tokio::test]
async fn one_turn_floor_stays_near_the_ceiling() {
    let (_tmp, log) = temp_log().await;
    seed_turns(&log, "long", 20, 100).await;

    let window = build_context_window(&log, "long", "next", 1, 50).await;

    assert_eq!(user_turns(&window), 1);
    assert_eq!(window.lines().count(), 3);
    assert!(window.starts_with("User: 019"));
}

#[tokio::test]
async fn unknown_session_gets_bare_prompt_without_being_created() {
    let (_tmp, log) = temp_log().await;

    let window = build_context_window(&log, "ghost", "hi", 10, 2000).await;

    assert_eq!(window, "Current message: hi");
    assert!(!log.contains("ghost").await);
}

#[tokio::test]
async fn builder_and_formatter_do_not_mutate_the_log() {
    let (_tmp, log) = temp_log().await;
    seed_turns(&log, "s1", 3, 20).await;
    let before = log.get_or_create("s1").await;

    let _ = build_context_window(&log, "s1", "again", 2, 10).await;
    let _ = format_history(&log, "s1", 4).await;

    assert_eq!(log.get_or_create("s1").await, before);
}
