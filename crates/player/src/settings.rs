//! Read-only view of persisted preferences plus "please persist" requests.

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaybackPreferences {
    pub last_channel_url: Option<String>,
    pub volume: Option<f32>,
}

/// The settings service. Persistence itself happens elsewhere; the player
/// only reads the initial values and reports user-driven changes.
pub trait SettingsStore: Send + Sync {
    fn preferences(&self) -> PlaybackPreferences;

    fn persist_channel(&self, url: &str);

    fn persist_volume(&self, volume: f32);
}

#[derive(Debug, Clone, PartialEq)]
pub enum PersistRequest {
    Channel(String),
    Volume(f32),
}

/// Keeps preferences in memory and records every persist request.
#[derive(Debug, Default)]
pub struct InMemorySettings {
    preferences: RwLock<PlaybackPreferences>,
    requests: Mutex<Vec<PersistRequest>>,
}

impl InMemorySettings {
    pub fn new(preferences: PlaybackPreferences) -> Self {
        Self {
            preferences: RwLock::new(preferences),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<PersistRequest> {
        self.requests.lock().clone()
    }
}

impl SettingsStore for InMemorySettings {
    fn preferences(&self) -> PlaybackPreferences {
        self.preferences.read().clone()
    }

    fn persist_channel(&self, url: &str) {
        self.preferences.write().last_channel_url = Some(url.to_string());
        self.requests
            .lock()
            .push(PersistRequest::Channel(url.to_string()));
    }

    fn persist_volume(&self, volume: f32) {
        self.preferences.write().volume = Some(volume);
        self.requests.lock().push(PersistRequest::Volume(volume));
    }
}
