//! # Frame Player
//!
//! Live stream playback resilience for the Family Frame TV and radio players.
//!
//! The crate drives one adaptive HLS (or direct) playback session per player,
//! classifies media and transport failures, rebuilds the session on a bounded
//! backoff schedule after network failures, tracks buffering and quality
//! state, and publishes one observable [`PlaybackSnapshot`] to every UI
//! surface.
//!
//! ## Component Overview
//!
//! - `source`: decides how a channel url is attached to the media sink
//! - `quality`: tier list and forced level of the live session
//! - `monitor`: media and transport events to snapshot writes
//! - `reconnect`: bounded backoff after fatal network failures
//! - `session`: owns the sink, the transport instance and the timer
//! - `observable`: snapshot plus subscribe/unsubscribe
//! - `player`: async actor in front of the session manager
//! - `sim`: recording simulated collaborators

pub mod catalog;
pub mod channel;
pub mod config;
pub mod debug_log;
mod error;
pub mod media;
pub mod monitor;
pub mod observable;
pub mod player;
pub mod quality;
pub mod reconnect;
pub mod session;
pub mod settings;
pub mod sim;
mod snapshot;
pub mod source;
pub mod state;
pub mod timer;

pub use catalog::{ChannelCatalog, StaticCatalog};
pub use channel::{ChannelDescriptor, ChannelGroup};
pub use config::{HlsDetectionConfig, PlayerConfig};
pub use debug_log::{DebugLog, LogEntry, LogLevel, MemoryDebugLog, TracingDebugLog};
pub use error::PlaybackError;
pub use media::{
    HlsTransport, HlsTransportFactory, LevelInfo, MediaEvent, MediaSink, SessionId, SinkHandle,
    TransportError, TransportErrorKind, TransportEvent,
};
pub use observable::{PlaybackBroadcaster, SubscriptionId};
pub use player::{Player, PlayerBuilder, PlayerCommand, PlayerHandle, PlayerInput, PlayerOutcome};
pub use quality::{AUTO_LEVEL, QualitySelection, QualityTier, QualityTracker};
pub use reconnect::{ReconnectConfig, ReconnectController, ReconnectDecision};
pub use session::{Collaborators, SessionManager};
pub use settings::{InMemorySettings, PersistRequest, PlaybackPreferences, SettingsStore};
pub use snapshot::PlaybackSnapshot;
pub use source::{AttachmentPlan, PlatformCapabilities, StreamSourceResolver};
pub use state::{PlaybackEvent, PlayerState};
pub use timer::{PendingReconnect, ReconnectScheduler, ReconnectTicket, TokioScheduler};
