use super::log::MessageLog;
use super::types::Message;

pub const HISTORY_HEADER: &str = "\n--- Previous Conversation History ---\n";
pub const HISTORY_FOOTER: &str = "--- End of History ---\n\n";

/// Render the trailing `max_messages` entries of a session as a delimited
/// transcript. Empty when the session has no history or cannot be read.
pub async fn format_history(log: &MessageLog, session_id: &str, max_messages: usize) -> String {
    match log.try_peek(session_id, Some(max_messages)).await {
        Ok(Some(messages)) => render_history(&messages),
        Ok(None) => String::new(),
        Err(error) => {
            tracing::warn!(%session_id, "history unavailable: {error}");
            String::new()
        }
    }
}

pub fn render_history(messages: &[Message]) -> String {
    if messages.is_empty() {
        return String::new();
    }

    let mut out = String::from(HISTORY_HEADER);
    for message in messages {
        out.push_str(&message.transcript_line());
    }
    out.push_str(HISTORY_FOOTER);
    out
}
