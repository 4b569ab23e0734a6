use super::super::MemoryConfig;
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base directory (`~/.pbot`) - computed from home, not serialized
    #[serde(skip)]
    pub base_dir: PathBuf,
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub memory: MemoryConfig,
}

impl Default for Config {
    fn default() -> Self {
        let home =
            UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());
        let base_dir = home.join(".pbot");

        Self {
            config_path: base_dir.join("config.toml"),
            base_dir,
            memory: MemoryConfig::default(),
        }
    }
}

impl Config {
    /// Where session records live: the configured directory, or
    /// `<base_dir>/session_memory`.
    pub fn storage_dir(&self) -> PathBuf {
        self.memory
            .storage_dir
            .clone()
            .unwrap_or_else(|| self.base_dir.join("session_memory"))
    }
}
