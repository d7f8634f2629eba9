//! Adaptive quality tracking for HLS sessions.

use media_types::{Bitrate, Resolution};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::media::{HlsTransport, LevelInfo};

/// Transport level value that means "let bitrate adaptation decide".
pub const AUTO_LEVEL: i32 = -1;

/// One selectable variant of the current stream.
///
/// `index` is a handle into the transport's level table and is only valid
/// for the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityTier {
    pub index: usize,
    pub height_pixels: u32,
    pub bitrate_bps: u64,
    pub label: String,
}

impl QualityTier {
    pub fn from_level(index: usize, level: &LevelInfo) -> Self {
        let resolution = Resolution::new(level.width, level.height);
        let bitrate = Bitrate::from_bps(level.bitrate);
        let label = resolution
            .short_label()
            .or_else(|| (!bitrate.is_unknown()).then(|| format!("{} kbps", bitrate.kbps())))
            .unwrap_or_else(|| format!("Level {}", index));

        Self {
            index,
            height_pixels: level.height,
            bitrate_bps: level.bitrate,
            label,
        }
    }
}

/// Active quality: automatic adaptation or a forced level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum QualitySelection {
    #[default]
    Auto,
    Level(usize),
}

impl QualitySelection {
    /// Transport representation: `-1` for auto, otherwise the level index.
    pub fn as_index(&self) -> i32 {
        match self {
            Self::Auto => AUTO_LEVEL,
            Self::Level(level) => i32::try_from(*level).unwrap_or(i32::MAX),
        }
    }
}

impl From<i32> for QualitySelection {
    fn from(index: i32) -> Self {
        usize::try_from(index).map_or(Self::Auto, Self::Level)
    }
}

impl From<QualitySelection> for i32 {
    fn from(selection: QualitySelection) -> Self {
        selection.as_index()
    }
}

impl std::fmt::Display for QualitySelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Level(level) => write!(f, "level {}", level),
        }
    }
}

/// Tier list and active selection for the live session.
#[derive(Debug, Default)]
pub struct QualityTracker {
    tiers: Vec<QualityTier>,
    active: QualitySelection,
}

impl QualityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tiers(&self) -> &[QualityTier] {
        &self.tiers
    }

    pub fn active(&self) -> QualitySelection {
        self.active
    }

    /// The selector is only worth showing with a real choice.
    pub fn shows_selector(&self) -> bool {
        self.tiers.len() > 1
    }

    /// Replace the tier list from a freshly parsed manifest.
    ///
    /// Never merges with the previous list; the selection goes back to auto.
    pub fn rebuild(&mut self, levels: &[LevelInfo]) -> &[QualityTier] {
        self.tiers = levels
            .iter()
            .enumerate()
            .map(|(index, level)| QualityTier::from_level(index, level))
            .collect();
        self.active = QualitySelection::Auto;
        debug!(tiers = self.tiers.len(), "Rebuilt quality tiers");
        &self.tiers
    }

    /// Forget everything from the previous session.
    pub fn clear(&mut self) {
        self.tiers.clear();
        self.active = QualitySelection::Auto;
    }

    /// Record the level the transport actually switched to.
    ///
    /// Returns `None` for a level outside the current table.
    pub fn on_level_switched(&mut self, level: usize) -> Option<QualitySelection> {
        if level >= self.tiers.len() {
            warn!(
                level,
                tiers = self.tiers.len(),
                "Ignoring switch to unknown quality level"
            );
            return None;
        }
        self.active = QualitySelection::Level(level);
        Some(self.active)
    }

    /// Forward a user-requested selection to the transport.
    ///
    /// Without a transport (direct playback) this is a no-op and returns
    /// `false`, as is a level that does not exist in the current table.
    pub fn request(
        &mut self,
        selection: QualitySelection,
        transport: Option<&mut dyn HlsTransport>,
    ) -> bool {
        let Some(transport) = transport else {
            debug!(%selection, "No transport attached, ignoring quality request");
            return false;
        };
        if let QualitySelection::Level(level) = selection
            && level >= self.tiers.len()
        {
            warn!(level, "Requested quality level does not exist");
            return false;
        }

        transport.set_current_level(selection.as_index());
        self.active = selection;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct LevelRecorder {
        levels: Vec<i32>,
    }

    impl HlsTransport for LevelRecorder {
        fn load_source(&mut self, _url: &str) {}
        fn attach_media(&mut self, _sink: crate::media::SinkHandle) {}
        fn set_current_level(&mut self, level: i32) {
            self.levels.push(level);
        }
        fn destroy(&mut self) {}
    }

    fn three_levels() -> Vec<LevelInfo> {
        vec![
            LevelInfo::new(640, 360, 800_000),
            LevelInfo::new(1280, 720, 2_800_000),
            LevelInfo::new(1920, 1080, 5_000_000),
        ]
    }

    #[test]
    fn labels_prefer_height_then_bitrate() {
        assert_eq!(
            QualityTier::from_level(0, &LevelInfo::new(1280, 720, 2_800_000)).label,
            "720p"
        );
        assert_eq!(
            QualityTier::from_level(1, &LevelInfo::new(0, 0, 128_000)).label,
            "128 kbps"
        );
        assert_eq!(
            QualityTier::from_level(2, &LevelInfo::default()).label,
            "Level 2"
        );
    }

    #[test]
    fn rebuild_replaces_instead_of_merging() {
        let mut tracker = QualityTracker::new();
        tracker.rebuild(&three_levels());
        assert!(tracker.on_level_switched(2).is_some());

        tracker.rebuild(&[LevelInfo::new(0, 0, 64_000)]);
        assert_eq!(tracker.tiers().len(), 1);
        assert_eq!(tracker.tiers()[0].index, 0);
        assert_eq!(tracker.active(), QualitySelection::Auto);
        assert!(!tracker.shows_selector());
    }

    #[test]
    fn level_switch_outside_table_is_ignored() {
        let mut tracker = QualityTracker::new();
        tracker.rebuild(&three_levels());
        assert_eq!(tracker.on_level_switched(7), None);
        assert_eq!(tracker.active(), QualitySelection::Auto);
        assert_eq!(tracker.on_level_switched(1), Some(QualitySelection::Level(1)));
    }

    #[test]
    fn request_without_transport_is_a_no_op() {
        let mut tracker = QualityTracker::new();
        assert!(!tracker.request(QualitySelection::Level(0), None));
        assert!(!tracker.request(QualitySelection::Auto, None));
        assert!(tracker.tiers().is_empty());
    }

    #[test]
    fn request_forwards_to_transport() {
        let mut tracker = QualityTracker::new();
        let mut transport = LevelRecorder::default();
        tracker.rebuild(&three_levels());

        assert!(tracker.request(QualitySelection::Level(2), Some(&mut transport)));
        assert!(tracker.request(QualitySelection::Auto, Some(&mut transport)));
        assert!(!tracker.request(QualitySelection::Level(9), Some(&mut transport)));

        assert_eq!(transport.levels, vec![2, AUTO_LEVEL]);
        assert_eq!(tracker.active().as_index(), -1);
    }

    #[test]
    fn selection_round_trips_through_i32() {
        assert_eq!(QualitySelection::from(-1), QualitySelection::Auto);
        assert_eq!(QualitySelection::from(3), QualitySelection::Level(3));
        assert_eq!(serde_json::to_string(&QualitySelection::Level(1)).unwrap(), "1");
        assert_eq!(
            serde_json::from_str::<QualitySelection>("-1").unwrap(),
            QualitySelection::Auto
        );
    }
}
