//! Recording stand-ins for the platform collaborators.
//!
//! Used by the unit and integration tests and by the command-line scenario
//! runner. Every simulated collaborator is a cheap clone over shared state,
//! so one clone can be handed to the player while another is kept for
//! inspection.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::PlaybackError;
use crate::media::{HlsTransport, HlsTransportFactory, MediaSink, SessionId, SinkHandle};
use crate::timer::{PendingReconnect, ReconnectScheduler, ReconnectTicket};

/// A call made on [`SimulatedSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    SetSource(String),
    ClearSource,
    Play,
    Pause,
    SetVolume(f32),
}

#[derive(Debug)]
struct SinkState {
    calls: Vec<SinkCall>,
    source: Option<String>,
    volume: f32,
    native_hls: bool,
    reject_play: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SimulatedSink {
    handle: SinkHandle,
    state: Arc<Mutex<SinkState>>,
}

impl SimulatedSink {
    pub fn new() -> Self {
        Self {
            handle: SinkHandle(1),
            state: Arc::new(Mutex::new(SinkState {
                calls: Vec::new(),
                source: None,
                volume: 1.0,
                native_hls: false,
                reject_play: None,
            })),
        }
    }

    pub fn with_native_hls(self, native_hls: bool) -> Self {
        self.state.lock().native_hls = native_hls;
        self
    }

    /// Make every following `play()` fail as an autoplay policy would.
    pub fn reject_play(&self, reason: impl Into<String>) {
        self.state.lock().reject_play = Some(reason.into());
    }

    pub fn allow_play(&self) {
        self.state.lock().reject_play = None;
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.state.lock().calls.clone()
    }

    pub fn play_calls(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| **call == SinkCall::Play)
            .count()
    }

    pub fn source(&self) -> Option<String> {
        self.state.lock().source.clone()
    }

    pub fn volume(&self) -> f32 {
        self.state.lock().volume
    }

    fn record(&self, call: SinkCall) {
        self.state.lock().calls.push(call);
    }
}

impl Default for SimulatedSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaSink for SimulatedSink {
    fn handle(&self) -> SinkHandle {
        self.handle
    }

    fn supports_native_hls(&self) -> bool {
        self.state.lock().native_hls
    }

    fn set_source(&mut self, url: &str) {
        self.record(SinkCall::SetSource(url.to_string()));
        self.state.lock().source = Some(url.to_string());
    }

    fn clear_source(&mut self) {
        self.record(SinkCall::ClearSource);
        self.state.lock().source = None;
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        self.record(SinkCall::Play);
        match &self.state.lock().reject_play {
            Some(reason) => Err(PlaybackError::play_rejected(reason.clone())),
            None => Ok(()),
        }
    }

    fn pause(&mut self) {
        self.record(SinkCall::Pause);
    }

    fn set_volume(&mut self, volume: f32) {
        self.record(SinkCall::SetVolume(volume));
        self.state.lock().volume = volume;
    }
}

/// A call made on a transport created by [`SimulatedTransportFactory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    LoadSource { session: SessionId, url: String },
    AttachMedia { session: SessionId, sink: SinkHandle },
    SetLevel { session: SessionId, level: i32 },
    Destroy { session: SessionId },
}

#[derive(Debug, Default)]
struct FactoryState {
    supported: bool,
    created: Vec<SessionId>,
    live: usize,
    peak_live: usize,
    calls: Vec<TransportCall>,
}

/// Hands out [`SimulatedTransport`]s and counts how many are alive.
#[derive(Debug, Clone)]
pub struct SimulatedTransportFactory {
    state: Arc<Mutex<FactoryState>>,
}

impl SimulatedTransportFactory {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FactoryState {
                supported: true,
                ..Default::default()
            })),
        }
    }

    /// A factory whose library does not run on this platform.
    pub fn unsupported() -> Self {
        let factory = Self::new();
        factory.state.lock().supported = false;
        factory
    }

    /// Instances created and not yet destroyed.
    pub fn live_instances(&self) -> usize {
        self.state.lock().live
    }

    /// Highest number of instances alive at the same time.
    pub fn peak_live_instances(&self) -> usize {
        self.state.lock().peak_live
    }

    pub fn created_count(&self) -> usize {
        self.state.lock().created.len()
    }

    /// Session of the most recently created instance.
    pub fn latest_session(&self) -> Option<SessionId> {
        self.state.lock().created.last().copied()
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.state.lock().calls.clone()
    }

    /// Every level forced on any instance, in order.
    pub fn levels_set(&self) -> Vec<i32> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                TransportCall::SetLevel { level, .. } => Some(*level),
                _ => None,
            })
            .collect()
    }
}

impl Default for SimulatedTransportFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl HlsTransportFactory for SimulatedTransportFactory {
    fn is_supported(&self) -> bool {
        self.state.lock().supported
    }

    fn create(&self, session: SessionId) -> Box<dyn HlsTransport> {
        let mut state = self.state.lock();
        state.created.push(session);
        state.live += 1;
        state.peak_live = state.peak_live.max(state.live);
        Box::new(SimulatedTransport {
            session,
            destroyed: false,
            state: Arc::clone(&self.state),
        })
    }
}

/// Transport instance that only records what it is asked to do.
///
/// Dropping an instance without `destroy()` leaves it counted as live, so
/// leaks show up in [`SimulatedTransportFactory::live_instances`].
#[derive(Debug)]
pub struct SimulatedTransport {
    session: SessionId,
    destroyed: bool,
    state: Arc<Mutex<FactoryState>>,
}

impl HlsTransport for SimulatedTransport {
    fn load_source(&mut self, url: &str) {
        self.state.lock().calls.push(TransportCall::LoadSource {
            session: self.session,
            url: url.to_string(),
        });
    }

    fn attach_media(&mut self, sink: SinkHandle) {
        self.state.lock().calls.push(TransportCall::AttachMedia {
            session: self.session,
            sink,
        });
    }

    fn set_current_level(&mut self, level: i32) {
        self.state.lock().calls.push(TransportCall::SetLevel {
            session: self.session,
            level,
        });
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        let mut state = self.state.lock();
        state.live = state.live.saturating_sub(1);
        state.calls.push(TransportCall::Destroy {
            session: self.session,
        });
    }
}

#[derive(Debug)]
struct ScheduledTimer {
    ticket: ReconnectTicket,
    delay: Duration,
    token: CancellationToken,
}

/// Scheduler whose timers only fire when the test says so.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    timers: Mutex<Vec<ScheduledTimer>>,
    scheduled: Mutex<Vec<Duration>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of timers ever scheduled.
    pub fn scheduled_count(&self) -> usize {
        self.scheduled.lock().len()
    }

    /// Delays of every timer ever scheduled, in order.
    pub fn history(&self) -> Vec<Duration> {
        self.scheduled.lock().clone()
    }

    /// Delays of timers neither fired nor cancelled.
    pub fn pending_delays(&self) -> Vec<Duration> {
        self.pending().into_iter().map(|(_, delay)| delay).collect()
    }

    pub fn pending(&self) -> Vec<(ReconnectTicket, Duration)> {
        self.timers
            .lock()
            .iter()
            .filter(|timer| !timer.token.is_cancelled())
            .map(|timer| (timer.ticket, timer.delay))
            .collect()
    }

    /// Expire the oldest live timer and return its ticket for delivery.
    pub fn fire_next(&self) -> Option<ReconnectTicket> {
        let mut timers = self.timers.lock();
        timers.retain(|timer| !timer.token.is_cancelled());
        if timers.is_empty() {
            return None;
        }
        Some(timers.remove(0).ticket)
    }
}

impl ReconnectScheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, ticket: ReconnectTicket) -> PendingReconnect {
        let token = CancellationToken::new();
        self.timers.lock().push(ScheduledTimer {
            ticket,
            delay,
            token: token.clone(),
        });
        self.scheduled.lock().push(delay);
        PendingReconnect::new(ticket, delay, token)
    }
}
