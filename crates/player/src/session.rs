//! Session lifecycle: one live attach per player, fully released before the
//! next one starts.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::channel::ChannelDescriptor;
use crate::config::PlayerConfig;
use crate::debug_log::{DebugLog, LogLevel};
use crate::media::{
    HlsTransport, HlsTransportFactory, MediaEvent, MediaSink, SessionId, TransportEvent,
};
use crate::monitor::{HealthMonitor, Verdict};
use crate::observable::PlaybackBroadcaster;
use crate::quality::{QualitySelection, QualityTracker};
use crate::reconnect::{ReconnectController, ReconnectDecision};
use crate::settings::SettingsStore;
use crate::snapshot::PlaybackSnapshot;
use crate::source::{AttachmentPlan, PlatformCapabilities, StreamSourceResolver};
use crate::state::PlayerState;
use crate::timer::{ReconnectScheduler, ReconnectTicket};

/// Everything a session manager talks to.
pub struct Collaborators {
    pub sink: Box<dyn MediaSink>,
    pub transports: Arc<dyn HlsTransportFactory>,
    pub scheduler: Arc<dyn ReconnectScheduler>,
    pub settings: Arc<dyn SettingsStore>,
    pub log: Arc<dyn DebugLog>,
}

/// The resources of one channel attach.
struct Session {
    id: SessionId,
    channel: ChannelDescriptor,
    plan: AttachmentPlan,
    transport: Option<Box<dyn HlsTransport>>,
    attempt: u32,
}

impl Session {
    fn transport_mut(&mut self) -> Option<&mut dyn HlsTransport> {
        self.transport
            .as_mut()
            .map(|transport| transport.as_mut() as &mut dyn HlsTransport)
    }
}

/// Owns the media sink, the transport instance and the reconnect timer.
///
/// Public operations never fail: every failure ends up in the snapshot and
/// the debug log.
pub struct SessionManager {
    resolver: StreamSourceResolver,
    sink: Box<dyn MediaSink>,
    transports: Arc<dyn HlsTransportFactory>,
    settings: Arc<dyn SettingsStore>,
    log: Arc<dyn DebugLog>,
    broadcaster: Arc<PlaybackBroadcaster>,
    monitor: HealthMonitor,
    reconnect: ReconnectController,
    quality: QualityTracker,
    session: Option<Session>,
    next_session: u64,
    default_volume: f32,
}

impl SessionManager {
    pub fn new(config: PlayerConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            sink,
            transports,
            scheduler,
            settings,
            log,
        } = collaborators;

        let default_volume = config.default_volume.clamp(0.0, 1.0);
        let broadcaster = Arc::new(PlaybackBroadcaster::new(PlaybackSnapshot::new(
            config.reconnect.max_attempts(),
            default_volume,
        )));
        let monitor = HealthMonitor::new(Arc::clone(&broadcaster), Arc::clone(&log));
        let reconnect = ReconnectController::new(
            config.reconnect.clone(),
            scheduler,
            Arc::clone(&broadcaster),
            Arc::clone(&log),
        );

        Self {
            resolver: StreamSourceResolver::new(&config.hls),
            sink,
            transports,
            settings,
            log,
            broadcaster,
            monitor,
            reconnect,
            quality: QualityTracker::new(),
            session: None,
            next_session: 1,
            default_volume,
        }
    }

    pub fn broadcaster(&self) -> Arc<PlaybackBroadcaster> {
        Arc::clone(&self.broadcaster)
    }

    pub fn snapshot(&self) -> Arc<PlaybackSnapshot> {
        self.broadcaster.snapshot()
    }

    pub fn current_session(&self) -> Option<SessionId> {
        self.session.as_ref().map(|session| session.id)
    }

    pub fn current_channel(&self) -> Option<&ChannelDescriptor> {
        self.session.as_ref().map(|session| &session.channel)
    }

    pub fn has_pending_reconnect(&self) -> bool {
        self.reconnect.has_pending()
    }

    /// Apply the stored volume and reload the last channel if it is still
    /// in `channels`. Nothing is persisted.
    pub fn restore(&mut self, channels: &[ChannelDescriptor]) -> Option<ChannelDescriptor> {
        let preferences = self.settings.preferences();
        let volume = preferences
            .volume
            .unwrap_or(self.default_volume)
            .clamp(0.0, 1.0);
        self.apply_volume(volume);

        let url = preferences.last_channel_url?;
        let Some(channel) = channels.iter().find(|channel| channel.url == url).cloned() else {
            debug!(%url, "Last channel no longer in the catalog");
            return None;
        };
        info!(channel = %channel.name, "Restoring last channel");
        self.load_channel(channel.clone(), 0);
        Some(channel)
    }

    /// User picked a channel: persist the choice and start a fresh cycle.
    pub fn select_channel(&mut self, channel: ChannelDescriptor) {
        self.settings.persist_channel(&channel.url);
        self.load_channel(channel, 0);
    }

    /// Tear down whatever is live and attach `channel`.
    ///
    /// `attempt` is 0 for user-driven loads and the reconnect attempt number
    /// for automatic reloads.
    pub fn load_channel(&mut self, channel: ChannelDescriptor, attempt: u32) {
        self.reconnect.cancel();
        if let Some(previous) = self.session.take() {
            self.release(previous);
        }

        self.quality.clear();
        self.monitor.begin_load(&channel, attempt);

        let capabilities = PlatformCapabilities {
            hls_library: self.transports.is_supported(),
            native_hls: self.sink.supports_native_hls(),
        };
        let plan = self.resolver.resolve(&channel, capabilities);

        let id = SessionId(self.next_session);
        self.next_session += 1;

        info!(
            %id,
            channel = %channel.name,
            url = %channel.url,
            attempt,
            plan = plan.kind(),
            "Loading channel"
        );
        self.log.log(
            LogLevel::Info,
            &format!("Loading {} via {}", channel.name, plan.kind()),
            (attempt > 0)
                .then(|| format!("attempt {attempt}"))
                .as_deref(),
        );

        let transport = match &plan {
            AttachmentPlan::HlsMediated { url } => {
                let mut transport = self.transports.create(id);
                transport.load_source(url);
                transport.attach_media(self.sink.handle());
                Some(transport)
            }
            AttachmentPlan::NativeHls { url } | AttachmentPlan::Progressive { url } => {
                self.sink.set_source(url);
                None
            }
        };

        self.session = Some(Session {
            id,
            channel,
            plan,
            transport,
            attempt,
        });

        // HLS playback starts once the manifest is parsed.
        if self.session.as_ref().is_some_and(|s| !s.plan.is_hls_mediated()) {
            self.start_playback();
        }
    }

    /// Manual retry: restart the bounded cycle for the current channel.
    pub fn retry(&mut self) {
        let Some(channel) = self.current_channel().cloned() else {
            debug!("Retry requested without a channel");
            return;
        };
        info!(channel = %channel.name, "Manual retry");
        self.log.log(LogLevel::Info, "Manual retry", Some(channel.name.as_str()));
        self.load_channel(channel, 0);
    }

    /// Force a quality tier, or [`QualitySelection::Auto`].
    ///
    /// No-op without a transport instance.
    pub fn set_quality(&mut self, selection: QualitySelection) {
        let transport = self.session.as_mut().and_then(Session::transport_mut);
        if self.quality.request(selection, transport) {
            self.log
                .log(LogLevel::Info, &format!("Quality set to {selection}"), None);
            self.monitor.on_quality_changed(selection);
        }
    }

    /// User volume change; clamped to `[0, 1]` and persisted.
    pub fn set_volume(&mut self, volume: f32) {
        let volume = if volume.is_nan() {
            self.default_volume
        } else {
            volume.clamp(0.0, 1.0)
        };
        self.apply_volume(volume);
        self.settings.persist_volume(volume);
    }

    pub fn pause(&mut self) {
        if self.session.is_some() {
            self.sink.pause();
        }
    }

    /// User gesture to start playback, e.g. after an autoplay block.
    ///
    /// Ignored after a terminal error; only a retry or a new channel leaves it.
    pub fn resume(&mut self) {
        if self.session.is_none() {
            return;
        }
        if self.snapshot().state == PlayerState::Error {
            debug!("Resume ignored in error state");
            return;
        }
        self.start_playback();
    }

    pub fn handle_media_event(&mut self, event: MediaEvent) {
        let Some(session) = self.session.as_mut() else {
            debug!(event = event.name(), "Media event without a session");
            return;
        };
        if event == MediaEvent::Playing {
            session.attempt = 0;
            // The element recovered on its own; a queued reload would tear it down.
            if self.reconnect.cancel() {
                debug!(id = %session.id, "Playback recovered, reconnect cancelled");
            }
        }
        let hls_mediated = session.plan.is_hls_mediated();

        match self.monitor.on_media_event(&event, hls_mediated) {
            Verdict::Reconnect => self.reconnect_after_failure(),
            Verdict::Terminal => self.drop_transport(),
            Verdict::Continue => {}
        }
    }

    /// Events from the transport created for `session`. Events from any
    /// other session are late callbacks of a torn-down instance and dropped.
    pub fn handle_transport_event(&mut self, session: SessionId, event: TransportEvent) {
        let live = self
            .session
            .as_ref()
            .is_some_and(|s| s.id == session && s.transport.is_some());
        if !live {
            debug!(%session, event = event.name(), "Dropping event from stale transport");
            return;
        }

        match event {
            TransportEvent::ManifestParsed { levels } => {
                let tiers = self.quality.rebuild(&levels).to_vec();
                self.monitor.on_manifest_parsed(&tiers);
                self.start_playback();
            }
            TransportEvent::LevelSwitched { level } => {
                if let Some(selection) = self.quality.on_level_switched(level) {
                    self.monitor.on_quality_changed(selection);
                }
            }
            TransportEvent::Error(error) => match self.monitor.on_transport_error(&error) {
                Verdict::Reconnect => self.reconnect_after_failure(),
                Verdict::Terminal => self.drop_transport(),
                Verdict::Continue => {}
            },
        }
    }

    /// A reconnect timer fired. Stale or superseded tickets are ignored.
    pub fn reconnect_due(&mut self, ticket: ReconnectTicket) {
        if !self.reconnect.take_due(ticket) {
            debug!(?ticket, "Ignoring stale reconnect timer");
            return;
        }
        let Some(channel) = self
            .session
            .as_ref()
            .filter(|session| session.id == ticket.session)
            .map(|session| session.channel.clone())
        else {
            debug!(?ticket, "Reconnect timer outlived its session");
            return;
        };
        self.load_channel(channel, ticket.attempt);
    }

    /// Release everything: timer, then transport, then the sink attachment.
    pub fn teardown(&mut self) {
        self.reconnect.cancel();
        if let Some(session) = self.session.take() {
            info!(id = %session.id, channel = %session.channel.name, "Tearing down session");
            self.release(session);
        }
        self.quality.clear();
        self.monitor.unload();
    }

    fn release(&mut self, mut session: Session) {
        if let Some(mut transport) = session.transport.take() {
            debug!(id = %session.id, "Destroying transport");
            transport.destroy();
        }
        self.sink.clear_source();
    }

    fn drop_transport(&mut self) {
        if let Some(mut transport) = self
            .session
            .as_mut()
            .and_then(|session| session.transport.take())
        {
            transport.destroy();
        }
    }

    fn start_playback(&mut self) {
        if let Err(err) = self.sink.play() {
            self.monitor.on_play_rejected(&err);
        }
    }

    fn reconnect_after_failure(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let (id, attempt) = (session.id, session.attempt);
        if self.reconnect.schedule_reconnect(id, attempt) == ReconnectDecision::Exhausted {
            warn!(%id, "Giving up on channel");
            self.drop_transport();
        }
    }

    fn apply_volume(&mut self, volume: f32) {
        self.sink.set_volume(volume);
        self.monitor.on_volume(volume);
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if self.session.is_some() || self.reconnect.has_pending() {
            self.teardown();
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("session", &self.current_session())
            .field("reconnect", &self.reconnect)
            .field("quality", &self.quality)
            .finish_non_exhaustive()
    }
}
