use super::Config;
use std::path::PathBuf;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("PBOT_STORAGE_DIR")
            && !dir.is_empty()
        {
            self.memory.storage_dir = Some(PathBuf::from(dir));
        }

        if let Ok(turns_str) =
            std::env::var("PBOT_CONTEXT_TURNS").or_else(|_| std::env::var("CONTEXT_TURNS"))
            && let Ok(turns) = turns_str.parse::<usize>()
        {
            self.memory.context_turns = turns;
        }

        if let Ok(limit_str) = std::env::var("PBOT_CONTEXT_CHAR_LIMIT")
            .or_else(|_| std::env::var("CONTEXT_CHAR_LIMIT"))
            && let Ok(limit) = limit_str.parse::<usize>()
        {
            self.memory.context_char_limit = limit;
        }

        if let Ok(timeout_str) = std::env::var("PBOT_LOCK_TIMEOUT_MS")
            && let Ok(timeout) = timeout_str.parse::<u64>()
            && timeout > 0
        {
            self.memory.lock_timeout_ms = timeout;
        }
    }
}
