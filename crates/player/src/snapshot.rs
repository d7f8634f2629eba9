use serde::{Deserialize, Serialize};

use crate::channel::ChannelDescriptor;
use crate::quality::{QualitySelection, QualityTier};
use crate::state::PlayerState;

/// Everything a UI surface needs to render a player.
///
/// Snapshots are immutable once published; every transition produces a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub state: PlayerState,
    pub channel: Option<ChannelDescriptor>,
    pub is_playing: bool,
    pub is_buffering: bool,
    pub error_message: Option<String>,
    pub quality_tiers: Vec<QualityTier>,
    pub active_quality: QualitySelection,
    pub is_reconnecting: bool,
    pub reconnect_attempt: u32,
    /// Length of the backoff schedule, for "attempt N/M" indicators.
    pub max_reconnect_attempts: u32,
    pub volume: f32,
}

impl PlaybackSnapshot {
    pub fn new(max_reconnect_attempts: u32, volume: f32) -> Self {
        Self {
            state: PlayerState::Idle,
            channel: None,
            is_playing: false,
            is_buffering: false,
            error_message: None,
            quality_tiers: Vec::new(),
            active_quality: QualitySelection::Auto,
            is_reconnecting: false,
            reconnect_attempt: 0,
            max_reconnect_attempts,
            volume,
        }
    }

    /// `-1` for auto, otherwise the forced level.
    pub fn active_quality_index(&self) -> i32 {
        self.active_quality.as_index()
    }

    pub fn show_quality_selector(&self) -> bool {
        self.quality_tiers.len() > 1
    }

    /// A visible banner with a retry action is only shown for terminal failures.
    pub fn shows_error_banner(&self) -> bool {
        self.error_message.is_some() && !self.is_reconnecting
    }

    /// One-line status for compact surfaces such as the header widget.
    pub fn status_line(&self) -> String {
        if self.is_reconnecting {
            return format!(
                "Reconnecting (attempt {}/{})...",
                self.reconnect_attempt, self.max_reconnect_attempts
            );
        }
        if let Some(message) = &self.error_message {
            return message.clone();
        }
        if self.is_buffering {
            return "Buffering...".to_string();
        }
        match (self.is_playing, &self.channel) {
            (true, _) => "Playing".to_string(),
            (false, Some(_)) => "Paused".to_string(),
            (false, None) => "Idle".to_string(),
        }
    }
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self::new(0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_priorities() {
        let mut snapshot = PlaybackSnapshot::new(4, 1.0);
        assert_eq!(snapshot.status_line(), "Idle");

        snapshot.channel = Some(ChannelDescriptor::new("http://a/x.m3u8", "A"));
        assert_eq!(snapshot.status_line(), "Paused");

        snapshot.is_playing = true;
        snapshot.is_buffering = true;
        assert_eq!(snapshot.status_line(), "Buffering...");

        snapshot.is_buffering = false;
        assert_eq!(snapshot.status_line(), "Playing");

        snapshot.is_playing = false;
        snapshot.is_reconnecting = true;
        snapshot.reconnect_attempt = 2;
        assert_eq!(snapshot.status_line(), "Reconnecting (attempt 2/4)...");
        assert!(!snapshot.shows_error_banner());

        snapshot.is_reconnecting = false;
        snapshot.error_message = Some("Stream unavailable.".to_string());
        assert_eq!(snapshot.status_line(), "Stream unavailable.");
        assert!(snapshot.shows_error_banner());
    }

    #[test]
    fn selector_needs_more_than_one_tier() {
        let mut snapshot = PlaybackSnapshot::default();
        assert!(!snapshot.show_quality_selector());
        snapshot.quality_tiers = vec![QualityTier::from_level(
            0,
            &crate::media::LevelInfo::new(0, 0, 64_000),
        )];
        assert!(!snapshot.show_quality_selector());
        assert_eq!(snapshot.active_quality_index(), -1);
    }

    #[test]
    fn serializes_for_ui_consumers() {
        let snapshot = PlaybackSnapshot::new(4, 0.5);
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["state"], "idle");
        assert_eq!(value["activeQuality"], -1);
        assert_eq!(value["reconnectAttempt"], 0);
    }
}
