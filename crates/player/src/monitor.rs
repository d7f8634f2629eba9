//! Playback health monitor: translates media and transport events into
//! snapshot writes.
//!
//! The monitor makes no control-flow decisions of its own. For failures it
//! returns a [`Verdict`] and the session manager acts on it.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::PlaybackError;
use crate::channel::ChannelDescriptor;
use crate::debug_log::{DebugLog, LogLevel};
use crate::media::{MediaEvent, TransportError};
use crate::observable::PlaybackBroadcaster;
use crate::quality::{QualitySelection, QualityTier};
use crate::snapshot::PlaybackSnapshot;
use crate::state::PlaybackEvent;

/// What the session manager must do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Nothing beyond the snapshot update.
    Continue,
    /// Network-classified failure; hand over to the reconnect controller.
    Reconnect,
    /// Non-retryable failure; the error message is already set.
    Terminal,
}

pub struct HealthMonitor {
    broadcaster: Arc<PlaybackBroadcaster>,
    log: Arc<dyn DebugLog>,
}

impl HealthMonitor {
    pub fn new(broadcaster: Arc<PlaybackBroadcaster>, log: Arc<dyn DebugLog>) -> Self {
        Self { broadcaster, log }
    }

    /// Reset transient state for a new attach of `channel`.
    ///
    /// The reconnect indicator survives automatic reloads (`attempt > 0`).
    pub fn begin_load(&self, channel: &ChannelDescriptor, attempt: u32) {
        self.broadcaster.update(|s| {
            s.state = s.state.on(PlaybackEvent::Load);
            s.channel = Some(channel.clone());
            s.is_playing = false;
            s.error_message = None;
            s.is_buffering = true;
            s.quality_tiers.clear();
            s.active_quality = QualitySelection::Auto;
            if attempt == 0 {
                s.is_reconnecting = false;
                s.reconnect_attempt = 0;
            }
        });
    }

    /// Apply a media element event.
    ///
    /// `hls_mediated` tells whether a transport library drives the element;
    /// in that case element errors are only logged because the transport
    /// reports the classified failure itself.
    pub fn on_media_event(&self, event: &MediaEvent, hls_mediated: bool) -> Verdict {
        debug!(event = event.name(), "Media event");
        match event {
            MediaEvent::Waiting => {
                self.broadcaster.update(|s| {
                    s.state = s.state.on(PlaybackEvent::Waiting);
                    s.is_buffering = true;
                });
            }
            MediaEvent::Playing => {
                self.broadcaster.update(|s| {
                    s.state = s.state.on(PlaybackEvent::Playing);
                    s.is_buffering = false;
                    s.error_message = None;
                    s.is_reconnecting = false;
                    s.reconnect_attempt = 0;
                });
            }
            MediaEvent::CanPlay => {
                self.broadcaster.update(|s| {
                    s.state = s.state.on(PlaybackEvent::Ready {
                        playing: s.is_playing,
                    });
                    s.is_buffering = false;
                });
            }
            MediaEvent::Play => {
                self.broadcaster.update(|s| {
                    // A terminal error stays on screen until retry or a new channel.
                    if s.error_message.is_none() {
                        s.state = s.state.on(PlaybackEvent::Play);
                        s.is_playing = true;
                    }
                });
            }
            MediaEvent::Pause => {
                self.broadcaster.update(|s| {
                    s.state = s.state.on(PlaybackEvent::Pause);
                    s.is_playing = false;
                });
            }
            MediaEvent::Error { message } => {
                if hls_mediated {
                    self.log
                        .log(LogLevel::Debug, "Media element error", Some(message.as_str()));
                    return Verdict::Continue;
                }
                // The element cannot tell network from decoder failures here,
                // so every error takes the retry path.
                let error = PlaybackError::media(message.as_str());
                warn!(%error, "Media element error, treating as network failure");
                self.log.log(LogLevel::Error, "Media error", Some(message.as_str()));
                self.stop_flags();
                if error.is_retryable() {
                    return Verdict::Reconnect;
                }
                self.fail(format!("Playback failed: {message}"));
                return Verdict::Terminal;
            }
        }
        Verdict::Continue
    }

    /// Classify a transport library error.
    pub fn on_transport_error(&self, error: &TransportError) -> Verdict {
        if !error.fatal {
            debug!(kind = %error.kind, details = %error.details, "Non-fatal transport error");
            self.log.log(
                LogLevel::Warn,
                &format!("Transport error ({})", error.kind),
                Some(error.details.as_str()),
            );
            return Verdict::Continue;
        }

        self.log.log(
            LogLevel::Error,
            &format!("Fatal transport error ({})", error.kind),
            Some(error.details.as_str()),
        );
        self.stop_flags();

        if PlaybackError::from(error.clone()).is_retryable() {
            return Verdict::Reconnect;
        }

        warn!(details = %error.details, "Fatal transport error, giving up");
        self.fail(format!("Playback failed: {}", error.details));
        Verdict::Terminal
    }

    fn fail(&self, message: String) {
        self.broadcaster.update(|s| {
            s.state = s.state.on(PlaybackEvent::FatalError);
            s.error_message = Some(message);
            s.is_reconnecting = false;
            s.reconnect_attempt = 0;
        });
    }

    /// A new manifest replaced the tier list.
    pub fn on_manifest_parsed(&self, tiers: &[QualityTier]) {
        info!(tiers = tiers.len(), "Manifest parsed");
        self.log.log(
            LogLevel::Info,
            &format!("Manifest parsed, {} quality levels", tiers.len()),
            None,
        );
        self.broadcaster.update(|s| {
            s.quality_tiers = tiers.to_vec();
            s.active_quality = QualitySelection::Auto;
            s.is_buffering = false;
            s.is_reconnecting = false;
            s.reconnect_attempt = 0;
        });
    }

    /// The active quality changed, either switched by the transport or
    /// forced by the user.
    pub fn on_quality_changed(&self, selection: QualitySelection) {
        debug!(%selection, "Active quality changed");
        self.broadcaster.update(|s| s.active_quality = selection);
    }

    /// Playback start was refused, usually by an autoplay policy.
    ///
    /// Not an error: the player waits paused for a user gesture.
    pub fn on_play_rejected(&self, error: &PlaybackError) {
        info!(error = %error, "Playback start rejected, waiting for user gesture");
        self.log.log(
            LogLevel::Warn,
            "Autoplay blocked, waiting for user action",
            Some(error.to_string().as_str()),
        );
        self.broadcaster.update(|s| {
            s.state = s.state.on(PlaybackEvent::PlayRejected);
            s.is_playing = false;
        });
    }

    pub fn on_volume(&self, volume: f32) {
        self.broadcaster.update(|s| s.volume = volume);
    }

    /// The session is gone; everything except the volume goes back to idle.
    pub fn unload(&self) {
        self.broadcaster.update(|s| {
            *s = PlaybackSnapshot {
                state: s.state.on(PlaybackEvent::Unload),
                ..PlaybackSnapshot::new(s.max_reconnect_attempts, s.volume)
            };
        });
    }

    // Playback stops before any message is set so `is_playing` and
    // `error_message` are never true together.
    fn stop_flags(&self) {
        self.broadcaster.update(|s| {
            s.is_playing = false;
            s.is_buffering = false;
        });
    }
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("snapshot", &self.broadcaster.snapshot())
            .finish_non_exhaustive()
    }
}
