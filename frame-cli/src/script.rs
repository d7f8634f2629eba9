//! Scripted playback scenarios replayed against the real player with
//! simulated collaborators.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use frame_player::sim::{SimulatedSink, SimulatedTransportFactory};
use frame_player::{
    ChannelDescriptor, InMemorySettings, LogEntry, MediaEvent, MemoryDebugLog, PlaybackPreferences,
    PlaybackSnapshot, Player, PlayerConfig, QualitySelection, TransportEvent,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};

/// Platform the scenario pretends to run on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedPlatform {
    pub hls_library: bool,
    pub native_hls: bool,
    /// Every `play()` fails like a blocked autoplay until a `resume` step.
    pub reject_autoplay: bool,
}

impl Default for SimulatedPlatform {
    fn default() -> Self {
        Self {
            hls_library: true,
            native_hls: false,
            reject_autoplay: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    SelectChannel {
        channel: ChannelDescriptor,
    },
    Media {
        event: MediaEvent,
    },
    /// Delivered to the most recently created transport.
    Transport {
        event: TransportEvent,
    },
    Retry,
    SetQuality {
        /// `-1` for auto.
        level: i32,
    },
    SetVolume {
        volume: f32,
    },
    Pause,
    Resume,
    /// Let simulated time pass; reconnect timers fire meanwhile.
    Wait {
        ms: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub platform: SimulatedPlatform,
    #[serde(default)]
    pub preferences: PlaybackPreferences,
    /// Channels offered for startup restore.
    #[serde(default)]
    pub channels: Vec<ChannelDescriptor>,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub async fn from_path(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let scenario: Self = serde_json::from_str(json)?;
        if scenario.steps.is_empty() {
            return Err(AppError::scenario("scenario has no steps"));
        }
        Ok(scenario)
    }
}

/// Everything observed while replaying a scenario.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    pub name: Option<String>,
    pub snapshots: Vec<PlaybackSnapshot>,
    pub debug_log: Vec<LogEntry>,
    pub transports_created: usize,
    pub transports_live: usize,
    pub final_snapshot: PlaybackSnapshot,
}

/// Replay `scenario`, dividing every wait and reconnect delay by `time_scale`.
pub async fn run(
    scenario: &Scenario,
    config: PlayerConfig,
    time_scale: f64,
) -> Result<ScenarioReport> {
    let sink = SimulatedSink::new().with_native_hls(scenario.platform.native_hls);
    if scenario.platform.reject_autoplay {
        sink.reject_play("NotAllowedError: play() requires a user gesture");
    }
    let factory = if scenario.platform.hls_library {
        SimulatedTransportFactory::new()
    } else {
        SimulatedTransportFactory::unsupported()
    };
    let log = Arc::new(MemoryDebugLog::new(config.debug_log_capacity).with_tracing());

    let (player, handle) = Player::builder(config)
        .sink(sink.clone())
        .transports(Arc::new(factory.clone()))
        .settings(Arc::new(InMemorySettings::new(
            scenario.preferences.clone(),
        )))
        .debug_log(log.clone())
        .build()?;

    let snapshots: Arc<Mutex<Vec<PlaybackSnapshot>>> = Arc::default();
    let recorder = Arc::clone(&snapshots);
    handle.subscribe(move |snapshot| recorder.lock().push(snapshot.clone()));

    let task = player.spawn();
    info!(name = ?scenario.name, steps = scenario.steps.len(), "Replaying scenario");

    if !scenario.channels.is_empty() {
        handle.restore(scenario.channels.clone());
    }

    for (index, step) in scenario.steps.iter().enumerate() {
        debug!(index, ?step, "Scenario step");
        match step {
            Step::SelectChannel { channel } => handle.select_channel(channel.clone()),
            Step::Media { event } => handle.media_event(event.clone()),
            Step::Transport { event } => {
                // Inputs sent so far must be applied before looking up the
                // session the event belongs to.
                handle.settled().await?;
                let session = factory.latest_session().ok_or_else(|| {
                    AppError::scenario(format!("step {index}: no transport has been created"))
                })?;
                handle.transport_event(session, event.clone());
            }
            Step::Retry => handle.retry(),
            Step::SetQuality { level } => handle.set_quality(QualitySelection::from(*level)),
            Step::SetVolume { volume } => handle.set_volume(*volume),
            Step::Pause => handle.pause(),
            Step::Resume => {
                sink.allow_play();
                handle.resume();
            }
            Step::Wait { ms } => {
                handle.settled().await?;
                tokio::time::sleep(scaled(*ms, time_scale)).await;
            }
        }
    }

    handle.settled().await?;
    let final_snapshot = PlaybackSnapshot::clone(&handle.snapshot());
    let transports_live = factory.live_instances();
    handle.shutdown();
    join_player(task).await;

    Ok(ScenarioReport {
        name: scenario.name.clone(),
        snapshots: std::mem::take(&mut *snapshots.lock()),
        debug_log: log.entries(),
        transports_created: factory.created_count(),
        transports_live,
        final_snapshot,
    })
}

/// Wait for the player task. A panicked or aborted task is logged, the
/// report is still built from what was recorded.
async fn join_player<T>(task: tokio::task::JoinHandle<T>) -> Option<T> {
    match task.await {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            warn!(error = %e, "Player task did not shut down cleanly");
            None
        }
    }
}

fn scaled(ms: u64, time_scale: f64) -> Duration {
    let scale = if time_scale.is_finite() && time_scale > 0.0 {
        time_scale
    } else {
        1.0
    };
    Duration::from_secs_f64(ms as f64 / 1000.0 / scale)
}
