use super::Config;
use crate::error::ConfigError;
use anyhow::{Context, Result};
use directories::UserDirs;
use std::fs;
use std::path::Path;

impl Config {
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        Self::load_or_init_in(&home.join(".pbot"))
    }

    /// Load `<base_dir>/config.toml`, writing defaults on first run.
    pub fn load_or_init_in(base_dir: &Path) -> Result<Self> {
        let config_path = base_dir.join("config.toml");

        if !base_dir.exists() {
            fs::create_dir_all(base_dir).context("Failed to create .pbot directory")?;
        }

        if config_path.exists() {
            let contents =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            let mut config: Config = toml::from_str(&contents)
                .map_err(|error| ConfigError::Load(error.to_string()))
                .context("Failed to parse config file")?;
            config.config_path.clone_from(&config_path);
            config.base_dir = base_dir.to_path_buf();
            config.memory.validate()?;
            Ok(config)
        } else {
            let config = Self {
                config_path,
                base_dir: base_dir.to_path_buf(),
                ..Self::default()
            };
            config.memory.validate()?;
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }
}
