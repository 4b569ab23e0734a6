use crate::error::ConfigError;
use crate::session::types::MAX_MESSAGE_CHARS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Directory holding one JSON record per session. Defaults to
    /// `~/.pbot/session_memory` when unset.
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
    /// Bounded wait for the session index lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Message content beyond this many characters is cut at ingestion
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
    /// Minimum number of user turns kept in a context window
    #[serde(default = "default_context_turns")]
    pub context_turns: usize,
    /// Character ceiling for a context window once the turn floor is met
    #[serde(default = "default_context_char_limit")]
    pub context_char_limit: usize,
    /// Messages rendered by the history formatter
    #[serde(default = "default_history_max_messages")]
    pub history_max_messages: usize,
    /// Messages returned by `ConversationManager::history`
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    /// How far back to look for the latest image attachment
    #[serde(default = "default_image_lookback")]
    pub image_lookback: usize,
}

fn default_lock_timeout_ms() -> u64 {
    2_000
}

fn default_max_message_chars() -> usize {
    MAX_MESSAGE_CHARS
}

fn default_context_turns() -> usize {
    10
}

fn default_context_char_limit() -> usize {
    2_000
}

fn default_history_max_messages() -> usize {
    3
}

fn default_max_history() -> usize {
    20
}

fn default_image_lookback() -> usize {
    10
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            storage_dir: None,
            lock_timeout_ms: default_lock_timeout_ms(),
            max_message_chars: default_max_message_chars(),
            context_turns: default_context_turns(),
            context_char_limit: default_context_char_limit(),
            history_max_messages: default_history_max_messages(),
            max_history: default_max_history(),
            image_lookback: default_image_lookback(),
        }
    }
}

impl MemoryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lock_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "memory.lock_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.max_message_chars == 0 {
            return Err(ConfigError::Validation(
                "memory.max_message_chars must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
