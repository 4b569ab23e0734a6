use super::history::format_history;
use super::log::MessageLog;
use super::types::{Message, Session};
use super::window::build_context_window;
use crate::config::MemoryConfig;
use std::sync::Arc;
use uuid::Uuid;

/// Entry point for the routing layer: records both sides of a conversation
/// and produces the text injected into responder prompts.
pub struct ConversationManager {
    log: Arc<MessageLog>,
    config: MemoryConfig,
}

impl ConversationManager {
    pub fn new(log: Arc<MessageLog>, config: MemoryConfig) -> Self {
        Self { log, config }
    }

    /// Fresh identifier for callers that did not supply one.
    pub fn new_session_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub async fn get_or_create(&self, session_id: &str) -> Session {
        self.log.get_or_create(session_id).await
    }

    /// Record an incoming user message, with an optional attachment reference.
    pub async fn record_user(&self, session_id: &str, content: &str, image_ref: Option<&str>) {
        let mut message = Message::user(content);
        if let Some(image_ref) = image_ref {
            message = message.with_image_ref(image_ref);
        }
        self.log.append(session_id, message).await;
    }

    pub async fn record_assistant(&self, session_id: &str, content: &str) {
        self.log.append(session_id, Message::assistant(content)).await;
    }

    /// Bounded prompt for `new_message` using the configured turn and
    /// character limits.
    pub async fn context_window(&self, session_id: &str, new_message: &str) -> String {
        build_context_window(
            &self.log,
            session_id,
            new_message,
            self.config.context_turns,
            self.config.context_char_limit,
        )
        .await
    }

    pub async fn formatted_history(&self, session_id: &str) -> String {
        format_history(&self.log, session_id, self.config.history_max_messages).await
    }

    /// Recent messages, capped at `max_history` (0 means uncapped).
    pub async fn history(&self, session_id: &str) -> Vec<Message> {
        let limit = if self.config.max_history > 0 {
            Some(self.config.max_history)
        } else {
            None
        };
        self.log.read(session_id, limit).await
    }

    /// Latest attachment reference within the configured lookback.
    pub async fn last_image_ref(&self, session_id: &str) -> Option<String> {
        self.log
            .last_image_ref(session_id, self.config.image_lookback)
            .await
    }

    pub async fn clear(&self, session_id: &str) {
        self.log.clear(session_id).await;
    }
}
