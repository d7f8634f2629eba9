use serde::{Deserialize, Serialize};

use crate::PlaybackError;
use crate::reconnect::ReconnectConfig;

pub const DEFAULT_MANIFEST_SUFFIX: &str = ".m3u8";
pub const DEFAULT_DEBUG_LOG_CAPACITY: usize = 200;

/// How HLS manifests are recognised from a channel url.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HlsDetectionConfig {
    /// Path suffixes that mark a manifest, compared case-insensitively.
    /// The query string and fragment are ignored.
    pub manifest_suffixes: Vec<String>,
}

impl Default for HlsDetectionConfig {
    fn default() -> Self {
        Self {
            manifest_suffixes: vec![DEFAULT_MANIFEST_SUFFIX.to_string()],
        }
    }
}

/// Configurable options for a player instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Backoff schedule and terminal message for fatal network failures
    pub reconnect: ReconnectConfig,

    /// Manifest detection rules used by the source resolver
    pub hls: HlsDetectionConfig,

    /// Volume applied when the settings store has none, in `[0, 1]`
    pub default_volume: f32,

    /// Number of entries kept by the in-memory debug console
    pub debug_log_capacity: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            reconnect: ReconnectConfig::default(),
            hls: HlsDetectionConfig::default(),
            default_volume: 1.0,
            debug_log_capacity: DEFAULT_DEBUG_LOG_CAPACITY,
        }
    }
}

impl PlayerConfig {
    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn with_default_volume(mut self, volume: f32) -> Self {
        self.default_volume = volume;
        self
    }

    pub fn with_manifest_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.hls.manifest_suffixes.push(suffix.into());
        self
    }

    /// Reject configurations that would break the reconnect or resolver contracts.
    pub fn validate(&self) -> Result<(), PlaybackError> {
        self.reconnect.validate()?;

        if self.hls.manifest_suffixes.is_empty() {
            return Err(PlaybackError::config("no HLS manifest suffixes configured"));
        }
        if self.hls.manifest_suffixes.iter().any(|s| s.trim().is_empty()) {
            return Err(PlaybackError::config("HLS manifest suffix must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.default_volume) {
            return Err(PlaybackError::config(format!(
                "default volume {} is outside [0, 1]",
                self.default_volume
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PlayerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reconnect.schedule_ms, vec![2000, 4000, 8000, 16000]);
        assert_eq!(config.hls.manifest_suffixes, vec![".m3u8".to_string()]);
    }

    #[test]
    fn builders_extend_defaults() {
        let config = PlayerConfig::default()
            .with_reconnect(ReconnectConfig {
                schedule_ms: vec![100, 200],
                ..ReconnectConfig::default()
            })
            .with_manifest_suffix(".M3U");
        assert!(config.validate().is_ok());
        assert_eq!(config.reconnect.max_attempts(), 2);
        assert_eq!(config.hls.manifest_suffixes, vec![".m3u8", ".M3U"]);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: PlayerConfig =
            serde_json::from_str(r#"{"default_volume":0.4,"reconnect":{"schedule_ms":[500]}}"#)
                .unwrap();
        assert_eq!(config.default_volume, 0.4);
        assert_eq!(config.reconnect.schedule_ms, vec![500]);
        assert_eq!(
            config.reconnect.exhausted_message,
            ReconnectConfig::default().exhausted_message
        );
        assert_eq!(config.debug_log_capacity, DEFAULT_DEBUG_LOG_CAPACITY);
    }

    #[test]
    fn rejects_empty_suffixes_and_bad_volume() {
        let mut config = PlayerConfig::default();
        config.hls.manifest_suffixes.clear();
        assert!(matches!(
            config.validate(),
            Err(PlaybackError::Config { .. })
        ));

        let config = PlayerConfig::default().with_default_volume(1.5);
        assert!(config.validate().is_err());
    }
}
