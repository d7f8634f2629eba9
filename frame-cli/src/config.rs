use std::fs;
use std::path::{Path, PathBuf};

use frame_player::PlayerConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, Result};

const CONFIG_DIR: &str = "family-frame";
const CONFIG_FILE: &str = "framectl.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Divides every simulated delay, so `1000` turns seconds into milliseconds.
    pub time_scale: f64,

    /// Timeout for playlist probes, in seconds
    pub probe_timeout_secs: u64,

    pub user_agent: String,

    pub player: PlayerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            probe_timeout_secs: 15,
            user_agent: concat!("framectl/", env!("CARGO_PKG_VERSION")).to_string(),
            player: PlayerConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR)
            .join(CONFIG_FILE)
    }

    /// Load from `path`, or from the platform config directory. A missing
    /// file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map_or_else(Self::default_path, Path::to_path_buf);
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Overwrite the config file with the defaults.
    pub fn reset(path: Option<&Path>) -> Result<PathBuf> {
        let path = path.map_or_else(Self::default_path, Path::to_path_buf);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, Self::default().show()?)?;
        Ok(path)
    }

    pub fn show(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.time_scale.is_finite() || self.time_scale <= 0.0 {
            return Err(AppError::config(format!(
                "time_scale must be positive, got {}",
                self.time_scale
            )));
        }
        self.player.validate()?;
        Ok(())
    }

    /// Player settings with the reconnect schedule compressed by `time_scale`.
    pub fn scaled_player(&self) -> PlayerConfig {
        let mut player = self.player.clone();
        player.reconnect = player.reconnect.scaled(self.time_scale);
        player
    }
}
