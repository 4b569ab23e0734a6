use super::log::MessageLog;
use super::types::{Message, MessageRole};
use crate::utils::text::char_len;

/// Assemble the bounded prompt for `new_message` from the session's recent
/// turns. Read-only; a session that cannot be read contributes no history.
pub async fn build_context_window(
    log: &MessageLog,
    session_id: &str,
    new_message: &str,
    max_turns: usize,
    max_chars: usize,
) -> String {
    let recent = match log
        .try_peek(session_id, Some(max_turns.saturating_mul(2)))
        .await
    {
        Ok(messages) => messages.unwrap_or_default(),
        Err(error) => {
            tracing::warn!(%session_id, "building context without history: {error}");
            Vec::new()
        }
    };
    compose_window(&recent, new_message, max_turns, max_chars)
}

/// Walk `recent` newest-first, keeping lines until the character ceiling is
/// hit *and* at least `max_turns` user turns are already kept. The turn floor
/// wins over the ceiling.
///
/// Only the last `2 * max_turns` entries of `recent` are considered.
pub fn compose_window(
    recent: &[Message],
    new_message: &str,
    max_turns: usize,
    max_chars: usize,
) -> String {
    let start = recent.len().saturating_sub(max_turns.saturating_mul(2));
    let mut kept: Vec<String> = Vec::new();
    let mut char_count = 0usize;
    let mut turns = 0usize;

    for message in recent[start..].iter().rev() {
        let line = message.transcript_line();
        let line_chars = char_len(&line);
        if char_count + line_chars > max_chars && turns >= max_turns {
            break;
        }
        char_count += line_chars;
        if message.role == MessageRole::User {
            turns += 1;
        }
        kept.push(line);
    }

    let mut window = String::with_capacity(char_count + new_message.len() + 17);
    for line in kept.iter().rev() {
        window.push_str(line);
    }
    window.push_str("Current message: ");
    window.push_str(new_message);
    window
}
