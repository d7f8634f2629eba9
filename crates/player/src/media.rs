//! Seams to the platform media element and the HLS transport library.
//!
//! Neither collaborator decodes anything on our side. The session manager owns
//! one [`MediaSink`] for the lifetime of a player and at most one live
//! [`HlsTransport`] per session; platform adapters translate their native
//! callbacks into [`MediaEvent`] and [`TransportEvent`] values.

use serde::{Deserialize, Serialize};

use crate::PlaybackError;

/// Opaque identity of a media sink, handed to the transport on attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SinkHandle(pub u64);

/// Identity of one playback session.
///
/// Every `load_channel` call creates a new id, so callbacks tagged with an
/// older id can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// The platform media element (video or audio).
pub trait MediaSink: Send {
    fn handle(&self) -> SinkHandle;

    /// Whether the element can play HLS manifests without a transport library.
    fn supports_native_hls(&self) -> bool;

    /// Point the element directly at a resource.
    fn set_source(&mut self, url: &str);

    /// Detach whatever resource is currently loaded.
    fn clear_source(&mut self);

    /// Request playback. Rejection usually means an autoplay policy block.
    fn play(&mut self) -> Result<(), PlaybackError>;

    fn pause(&mut self);

    fn set_volume(&mut self, volume: f32);
}

/// One instance of the HLS demuxing / ABR library.
pub trait HlsTransport: Send {
    fn load_source(&mut self, url: &str);

    fn attach_media(&mut self, sink: SinkHandle);

    /// Force a level, or `-1` to hand control back to bitrate adaptation.
    fn set_current_level(&mut self, level: i32);

    /// Abort in-flight requests and detach from the media sink.
    fn destroy(&mut self);
}

/// Constructs transport instances bound to a session.
pub trait HlsTransportFactory: Send + Sync {
    /// Whether the library can run on this platform at all.
    fn is_supported(&self) -> bool;

    /// The returned instance must tag every event it emits with `session`.
    fn create(&self, session: SessionId) -> Box<dyn HlsTransport>;
}

/// Lifecycle events emitted by the media element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaEvent {
    Waiting,
    Playing,
    CanPlay,
    Play,
    Pause,
    Error { message: String },
}

impl MediaEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Playing => "playing",
            Self::CanPlay => "canplay",
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Error { .. } => "error",
        }
    }
}

/// Error classification reported by the transport library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    Network,
    Other,
}

impl TransportErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportError {
    pub fatal: bool,
    pub kind: TransportErrorKind,
    pub details: String,
}

impl TransportError {
    pub fn network(details: impl Into<String>, fatal: bool) -> Self {
        Self {
            fatal,
            kind: TransportErrorKind::Network,
            details: details.into(),
        }
    }

    pub fn other(details: impl Into<String>, fatal: bool) -> Self {
        Self {
            fatal,
            kind: TransportErrorKind::Other,
            details: details.into(),
        }
    }
}

impl From<TransportError> for PlaybackError {
    fn from(err: TransportError) -> Self {
        PlaybackError::Transport {
            kind: err.kind,
            fatal: err.fatal,
            details: err.details,
        }
    }
}

/// One variant as listed in a parsed master playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelInfo {
    pub width: u32,
    pub height: u32,
    pub bitrate: u64,
}

impl LevelInfo {
    pub fn new(width: u32, height: u32, bitrate: u64) -> Self {
        Self {
            width,
            height,
            bitrate,
        }
    }
}

/// Lifecycle events emitted by the transport library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportEvent {
    ManifestParsed { levels: Vec<LevelInfo> },
    LevelSwitched { level: usize },
    Error(TransportError),
}

impl TransportEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ManifestParsed { .. } => "manifest_parsed",
            Self::LevelSwitched { .. } => "level_switched",
            Self::Error(_) => "error",
        }
    }
}
