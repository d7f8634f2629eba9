//! Async player actor.
//!
//! The [`Player`] owns a [`SessionManager`] and processes every input from
//! one mailbox, one at a time: UI commands, media element events, transport
//! events and reconnect timer expiries. A snapshot update and its listener
//! notifications therefore always finish before the next input is handled.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::PlaybackError;
use crate::channel::ChannelDescriptor;
use crate::config::PlayerConfig;
use crate::debug_log::{DebugLog, TracingDebugLog};
use crate::media::{HlsTransportFactory, MediaEvent, MediaSink, SessionId, TransportEvent};
use crate::observable::{PlaybackBroadcaster, SubscriptionId};
use crate::quality::QualitySelection;
use crate::session::{Collaborators, SessionManager};
use crate::settings::{InMemorySettings, SettingsStore};
use crate::snapshot::PlaybackSnapshot;
use crate::timer::{ReconnectTicket, TokioScheduler};

/// User intents sent by UI surfaces.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    SelectChannel(ChannelDescriptor),
    Retry,
    SetQuality(QualitySelection),
    SetVolume(f32),
    Pause,
    Resume,
    /// Apply stored preferences against the given channel list.
    Restore(Vec<ChannelDescriptor>),
    Shutdown,
}

/// Everything the player mailbox carries.
#[derive(Debug)]
pub enum PlayerInput {
    Command(PlayerCommand),
    Media(MediaEvent),
    Transport {
        session: SessionId,
        event: TransportEvent,
    },
    ReconnectDue(ReconnectTicket),
    /// Answered once every earlier input has been processed.
    Barrier(oneshot::Sender<()>),
}

/// Why the run loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerOutcome {
    /// A `Shutdown` command was processed.
    Stopped,
    /// The cancellation token fired.
    Cancelled,
    /// Every handle was dropped.
    Detached,
}

pub struct PlayerBuilder {
    config: PlayerConfig,
    sink: Option<Box<dyn MediaSink>>,
    transports: Option<Arc<dyn HlsTransportFactory>>,
    settings: Arc<dyn SettingsStore>,
    log: Arc<dyn DebugLog>,
    cancellation_token: CancellationToken,
}

impl PlayerBuilder {
    fn new(config: PlayerConfig) -> Self {
        Self {
            config,
            sink: None,
            transports: None,
            settings: Arc::new(InMemorySettings::default()),
            log: Arc::new(TracingDebugLog),
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn sink(mut self, sink: impl MediaSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn transports(mut self, factory: Arc<dyn HlsTransportFactory>) -> Self {
        self.transports = Some(factory);
        self
    }

    pub fn settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = settings;
        self
    }

    pub fn debug_log(mut self, log: Arc<dyn DebugLog>) -> Self {
        self.log = log;
        self
    }

    /// Stop the player when `token` is cancelled.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    pub fn build(self) -> Result<(Player, PlayerHandle), PlaybackError> {
        self.config.validate()?;
        let sink = self
            .sink
            .ok_or_else(|| PlaybackError::config("player needs a media sink"))?;
        let transports = self
            .transports
            .ok_or_else(|| PlaybackError::config("player needs a transport factory"))?;

        let (tx, rx) = mpsc::unbounded_channel();

        // A weak sender keeps pending timers from holding the mailbox open.
        let timer_tx = tx.downgrade();
        let scheduler = TokioScheduler::new(move |ticket| {
            if let Some(tx) = timer_tx.upgrade() {
                let _ = tx.send(PlayerInput::ReconnectDue(ticket));
            }
        });

        let manager = SessionManager::new(
            self.config,
            Collaborators {
                sink,
                transports,
                scheduler: Arc::new(scheduler),
                settings: self.settings,
                log: self.log,
            },
        );

        let handle = PlayerHandle {
            tx,
            broadcaster: manager.broadcaster(),
            cancellation_token: self.cancellation_token.clone(),
        };
        let player = Player {
            manager,
            mailbox: rx,
            cancellation_token: self.cancellation_token,
        };
        Ok((player, handle))
    }
}

pub struct Player {
    manager: SessionManager,
    mailbox: mpsc::UnboundedReceiver<PlayerInput>,
    cancellation_token: CancellationToken,
}

impl Player {
    pub fn builder(config: PlayerConfig) -> PlayerBuilder {
        PlayerBuilder::new(config)
    }

    /// Run on a new task.
    pub fn spawn(self) -> JoinHandle<PlayerOutcome> {
        tokio::spawn(self.run())
    }

    /// Process inputs until shutdown, cancellation or every handle is gone.
    /// The session is torn down before returning.
    pub async fn run(mut self) -> PlayerOutcome {
        info!("Player starting");

        let outcome = loop {
            tokio::select! {
                biased;

                _ = self.cancellation_token.cancelled() => {
                    info!("Player cancelled");
                    break PlayerOutcome::Cancelled;
                }

                input = self.mailbox.recv() => {
                    let Some(input) = input else {
                        debug!("All player handles dropped");
                        break PlayerOutcome::Detached;
                    };
                    if !self.handle_input(input) {
                        break PlayerOutcome::Stopped;
                    }
                }
            }
        };

        self.manager.teardown();
        info!(?outcome, "Player stopped");
        outcome
    }

    /// Returns `false` when the loop should stop.
    fn handle_input(&mut self, input: PlayerInput) -> bool {
        match input {
            PlayerInput::Command(command) => return self.handle_command(command),
            PlayerInput::Media(event) => self.manager.handle_media_event(event),
            PlayerInput::Transport { session, event } => {
                self.manager.handle_transport_event(session, event)
            }
            PlayerInput::ReconnectDue(ticket) => self.manager.reconnect_due(ticket),
            PlayerInput::Barrier(done) => {
                let _ = done.send(());
            }
        }
        true
    }

    fn handle_command(&mut self, command: PlayerCommand) -> bool {
        debug!(?command, "Player command");
        match command {
            PlayerCommand::SelectChannel(channel) => self.manager.select_channel(channel),
            PlayerCommand::Retry => self.manager.retry(),
            PlayerCommand::SetQuality(selection) => self.manager.set_quality(selection),
            PlayerCommand::SetVolume(volume) => self.manager.set_volume(volume),
            PlayerCommand::Pause => self.manager.pause(),
            PlayerCommand::Resume => self.manager.resume(),
            PlayerCommand::Restore(channels) => {
                self.manager.restore(&channels);
            }
            PlayerCommand::Shutdown => return false,
        }
        true
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("manager", &self.manager)
            .finish_non_exhaustive()
    }
}

/// Cloneable front end of a running [`Player`].
///
/// Sending never blocks; inputs sent after the player stopped are dropped.
#[derive(Clone)]
pub struct PlayerHandle {
    tx: mpsc::UnboundedSender<PlayerInput>,
    broadcaster: Arc<PlaybackBroadcaster>,
    cancellation_token: CancellationToken,
}

impl PlayerHandle {
    pub fn send(&self, input: PlayerInput) {
        if self.tx.send(input).is_err() {
            debug!("Player is gone, dropping input");
        }
    }

    pub fn command(&self, command: PlayerCommand) {
        self.send(PlayerInput::Command(command));
    }

    pub fn select_channel(&self, channel: ChannelDescriptor) {
        self.command(PlayerCommand::SelectChannel(channel));
    }

    pub fn retry(&self) {
        self.command(PlayerCommand::Retry);
    }

    pub fn set_quality(&self, selection: QualitySelection) {
        self.command(PlayerCommand::SetQuality(selection));
    }

    pub fn set_volume(&self, volume: f32) {
        self.command(PlayerCommand::SetVolume(volume));
    }

    pub fn pause(&self) {
        self.command(PlayerCommand::Pause);
    }

    pub fn resume(&self) {
        self.command(PlayerCommand::Resume);
    }

    pub fn restore(&self, channels: Vec<ChannelDescriptor>) {
        self.command(PlayerCommand::Restore(channels));
    }

    pub fn media_event(&self, event: MediaEvent) {
        self.send(PlayerInput::Media(event));
    }

    pub fn transport_event(&self, session: SessionId, event: TransportEvent) {
        self.send(PlayerInput::Transport { session, event });
    }

    pub fn shutdown(&self) {
        self.command(PlayerCommand::Shutdown);
    }

    /// Stop the player without going through the mailbox.
    pub fn cancel(&self) {
        self.cancellation_token.cancel();
    }

    /// Wait until every input sent before this call has been processed.
    pub async fn settled(&self) -> Result<(), PlaybackError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(PlayerInput::Barrier(done_tx))
            .map_err(|_| PlaybackError::Cancelled)?;
        done_rx.await.map_err(|_| PlaybackError::Cancelled)
    }

    pub fn snapshot(&self) -> Arc<PlaybackSnapshot> {
        self.broadcaster.snapshot()
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&PlaybackSnapshot) + Send + Sync + 'static,
    {
        self.broadcaster.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.broadcaster.unsubscribe(id)
    }

    pub fn watch(&self) -> watch::Receiver<Arc<PlaybackSnapshot>> {
        self.broadcaster.watch()
    }
}

impl std::fmt::Debug for PlayerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerHandle")
            .field("closed", &self.tx.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::TransportError;
    use crate::sim::{SimulatedSink, SimulatedTransportFactory};
    use crate::state::PlayerState;
    use std::time::Duration;

    fn start() -> (PlayerHandle, SimulatedTransportFactory, JoinHandle<PlayerOutcome>) {
        let factory = SimulatedTransportFactory::new();
        let (player, handle) = Player::builder(PlayerConfig::default())
            .sink(SimulatedSink::new())
            .transports(Arc::new(factory.clone()))
            .build()
            .unwrap();
        (handle, factory, player.spawn())
    }

    #[test]
    fn build_requires_collaborators() {
        let err = Player::builder(PlayerConfig::default()).build().unwrap_err();
        assert!(matches!(err, PlaybackError::Config { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_timer_reloads_the_channel() {
        let (handle, factory, task) = start();
        handle.select_channel(ChannelDescriptor::new("https://tv/a/index.m3u8", "A"));
        handle.settled().await.unwrap();
        let session = factory.latest_session().unwrap();

        handle.transport_event(
            session,
            TransportEvent::Error(TransportError::network("manifestLoadError", true)),
        );
        handle.settled().await.unwrap();
        assert_eq!(handle.snapshot().state, PlayerState::Reconnecting);

        tokio::time::sleep(Duration::from_millis(1999)).await;
        handle.settled().await.unwrap();
        assert_eq!(factory.created_count(), 1);

        tokio::time::sleep(Duration::from_millis(2)).await;
        handle.settled().await.unwrap();
        assert_eq!(factory.created_count(), 2);
        assert_eq!(factory.live_instances(), 1);
        assert_eq!(handle.snapshot().reconnect_attempt, 1);

        handle.shutdown();
        assert_eq!(task.await.unwrap(), PlayerOutcome::Stopped);
        assert_eq!(factory.live_instances(), 0);
    }

    #[tokio::test]
    async fn cancellation_tears_down() {
        let (handle, factory, task) = start();
        handle.select_channel(ChannelDescriptor::new("https://tv/a/index.m3u8", "A"));
        handle.settled().await.unwrap();

        handle.cancel();
        assert_eq!(task.await.unwrap(), PlayerOutcome::Cancelled);
        assert_eq!(factory.live_instances(), 0);
        assert!(handle.settled().await.is_err());
    }

    #[tokio::test]
    async fn dropping_handles_detaches() {
        let (handle, _, task) = start();
        drop(handle);
        assert_eq!(task.await.unwrap(), PlayerOutcome::Detached);
    }
}
