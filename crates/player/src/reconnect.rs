//! Bounded reconnection after fatal network failures.
//!
//! Unlike a generic exponential policy, the schedule is an explicit list of
//! delays: attempt `n` (0-indexed) waits `schedule_ms[n]`, and an attempt
//! past the end of the list is terminal.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::PlaybackError;
use crate::debug_log::{DebugLog, LogLevel};
use crate::media::SessionId;
use crate::observable::PlaybackBroadcaster;
use crate::state::PlaybackEvent;
use crate::timer::{PendingReconnect, ReconnectScheduler, ReconnectTicket};

pub const DEFAULT_RECONNECT_SCHEDULE_MS: [u64; 4] = [2000, 4000, 8000, 16000];
pub const DEFAULT_EXHAUSTED_MESSAGE: &str = "Stream unavailable. Please try another channel.";

/// Configuration for reconnect behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Delay before each attempt in milliseconds; its length bounds the attempts.
    pub schedule_ms: Vec<u64>,
    /// Error shown once the schedule is exhausted.
    pub exhausted_message: String,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            schedule_ms: DEFAULT_RECONNECT_SCHEDULE_MS.to_vec(),
            exhausted_message: DEFAULT_EXHAUSTED_MESSAGE.to_string(),
        }
    }
}

impl ReconnectConfig {
    pub fn max_attempts(&self) -> u32 {
        u32::try_from(self.schedule_ms.len()).unwrap_or(u32::MAX)
    }

    /// Delay before attempt `attempt + 1`, or `None` once the schedule is exhausted.
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        self.schedule_ms
            .get(usize::try_from(attempt).ok()?)
            .map(|ms| Duration::from_millis(*ms))
    }

    /// Divide every delay by `factor`, keeping at least one millisecond.
    pub fn scaled(&self, factor: f64) -> Self {
        let factor = if factor.is_finite() && factor > 0.0 {
            factor
        } else {
            1.0
        };
        Self {
            schedule_ms: self
                .schedule_ms
                .iter()
                .map(|ms| ((*ms as f64 / factor) as u64).max(1))
                .collect(),
            exhausted_message: self.exhausted_message.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), PlaybackError> {
        if self.schedule_ms.is_empty() {
            return Err(PlaybackError::config("reconnect schedule is empty"));
        }
        if self.schedule_ms.contains(&0) {
            return Err(PlaybackError::config(
                "reconnect schedule contains a zero delay",
            ));
        }
        Ok(())
    }
}

/// Outcome of [`ReconnectController::schedule_reconnect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// A reload with `attempt` will run after `delay`.
    Scheduled { attempt: u32, delay: Duration },
    /// The schedule is used up; the error is terminal.
    Exhausted,
}

/// Owns the single pending reconnect timer of one player.
pub struct ReconnectController {
    config: ReconnectConfig,
    scheduler: Arc<dyn ReconnectScheduler>,
    pending: Option<PendingReconnect>,
    broadcaster: Arc<PlaybackBroadcaster>,
    log: Arc<dyn DebugLog>,
}

impl ReconnectController {
    pub fn new(
        config: ReconnectConfig,
        scheduler: Arc<dyn ReconnectScheduler>,
        broadcaster: Arc<PlaybackBroadcaster>,
        log: Arc<dyn DebugLog>,
    ) -> Self {
        Self {
            config,
            scheduler,
            pending: None,
            broadcaster,
            log,
        }
    }

    /// React to a fatal network failure of `session` that was running `attempt`.
    ///
    /// Any timer already pending is cancelled first.
    pub fn schedule_reconnect(&mut self, session: SessionId, attempt: u32) -> ReconnectDecision {
        self.cancel();

        let Some(delay) = self.config.delay_for_attempt(attempt) else {
            warn!(%session, attempt, "Reconnect attempts exhausted");
            let message = self.config.exhausted_message.clone();
            self.log.log(
                LogLevel::Error,
                "Reconnect attempts exhausted",
                Some(format!("{} attempts", self.config.max_attempts()).as_str()),
            );
            self.broadcaster.update(|s| {
                s.state = s.state.on(PlaybackEvent::RetriesExhausted);
                s.is_playing = false;
                s.is_buffering = false;
                s.error_message = Some(message);
                s.is_reconnecting = false;
                s.reconnect_attempt = 0;
            });
            return ReconnectDecision::Exhausted;
        };

        let next_attempt = attempt + 1;
        info!(
            %session,
            attempt = next_attempt,
            max = self.config.max_attempts(),
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnect"
        );
        self.log.log(
            LogLevel::Warn,
            &format!(
                "Reconnecting in {}ms (attempt {}/{})",
                delay.as_millis(),
                next_attempt,
                self.config.max_attempts()
            ),
            None,
        );
        self.broadcaster.update(|s| {
            s.state = s.state.on(PlaybackEvent::RetryScheduled);
            s.is_reconnecting = true;
            s.reconnect_attempt = next_attempt;
        });

        let ticket = ReconnectTicket {
            session,
            attempt: next_attempt,
        };
        self.pending = Some(self.scheduler.schedule(delay, ticket));

        ReconnectDecision::Scheduled {
            attempt: next_attempt,
            delay,
        }
    }

    /// Cancel the pending timer, if any. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                debug!(ticket = ?pending.ticket(), "Cancelling pending reconnect");
                pending.cancel();
                true
            }
            None => false,
        }
    }

    /// Claim a timer expiry. Returns `false` for a ticket that is not the
    /// pending one (already cancelled or superseded).
    pub fn take_due(&mut self, ticket: ReconnectTicket) -> bool {
        match &self.pending {
            Some(pending) if pending.ticket() == ticket => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_ticket(&self) -> Option<ReconnectTicket> {
        self.pending.as_ref().map(PendingReconnect::ticket)
    }
}

impl std::fmt::Debug for ReconnectController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconnectController")
            .field("config", &self.config)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug_log::MemoryDebugLog;
    use crate::sim::ManualScheduler;
    use crate::snapshot::PlaybackSnapshot;
    use crate::state::PlayerState;

    fn controller() -> (ReconnectController, Arc<ManualScheduler>, Arc<PlaybackBroadcaster>) {
        let scheduler = Arc::new(ManualScheduler::new());
        let broadcaster = Arc::new(PlaybackBroadcaster::new(PlaybackSnapshot::new(4, 1.0)));
        broadcaster.update(|s| s.state = PlayerState::Loading);
        let controller = ReconnectController::new(
            ReconnectConfig::default(),
            scheduler.clone(),
            broadcaster.clone(),
            Arc::new(MemoryDebugLog::new(16)),
        );
        (controller, scheduler, broadcaster)
    }

    #[test]
    fn test_default_schedule() {
        let config = ReconnectConfig::default();
        assert_eq!(config.max_attempts(), 4);
        assert_eq!(config.delay_for_attempt(0), Some(Duration::from_millis(2000)));
        assert_eq!(config.delay_for_attempt(3), Some(Duration::from_millis(16000)));
        assert_eq!(config.delay_for_attempt(4), None);
    }

    #[test]
    fn test_scaled_schedule_keeps_minimum() {
        let config = ReconnectConfig::default().scaled(1000.0);
        assert_eq!(config.schedule_ms, vec![2, 4, 8, 16]);
        let config = ReconnectConfig::default().scaled(100_000.0);
        assert_eq!(config.schedule_ms, vec![1, 1, 1, 1]);
        let config = ReconnectConfig::default().scaled(f64::NAN);
        assert_eq!(config.schedule_ms, DEFAULT_RECONNECT_SCHEDULE_MS.to_vec());
    }

    #[test]
    fn test_validate() {
        assert!(ReconnectConfig::default().validate().is_ok());
        let empty = ReconnectConfig {
            schedule_ms: vec![],
            ..Default::default()
        };
        assert!(empty.validate().is_err());
        let zero = ReconnectConfig {
            schedule_ms: vec![1000, 0],
            ..Default::default()
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn first_failure_schedules_two_seconds() {
        let (mut controller, scheduler, broadcaster) = controller();
        let decision = controller.schedule_reconnect(SessionId(1), 0);

        assert_eq!(
            decision,
            ReconnectDecision::Scheduled {
                attempt: 1,
                delay: Duration::from_millis(2000)
            }
        );
        let snapshot = broadcaster.snapshot();
        assert!(snapshot.is_reconnecting);
        assert_eq!(snapshot.reconnect_attempt, 1);
        assert_eq!(snapshot.state, PlayerState::Reconnecting);
        assert_eq!(scheduler.pending_delays(), vec![Duration::from_millis(2000)]);
    }

    #[test]
    fn exhaustion_sets_terminal_error() {
        let (mut controller, scheduler, broadcaster) = controller();
        let decision = controller.schedule_reconnect(SessionId(1), 4);

        assert_eq!(decision, ReconnectDecision::Exhausted);
        let snapshot = broadcaster.snapshot();
        assert!(!snapshot.is_reconnecting);
        assert_eq!(snapshot.reconnect_attempt, 0);
        assert_eq!(
            snapshot.error_message.as_deref(),
            Some(DEFAULT_EXHAUSTED_MESSAGE)
        );
        assert_eq!(snapshot.state, PlayerState::Error);
        assert!(scheduler.pending_delays().is_empty());
        assert!(!controller.has_pending());
    }

    #[test]
    fn rescheduling_cancels_the_previous_timer() {
        let (mut controller, scheduler, _) = controller();
        controller.schedule_reconnect(SessionId(1), 0);
        controller.schedule_reconnect(SessionId(2), 1);

        assert_eq!(scheduler.scheduled_count(), 2);
        assert_eq!(scheduler.pending_delays(), vec![Duration::from_millis(4000)]);
        assert_eq!(
            controller.pending_ticket(),
            Some(ReconnectTicket {
                session: SessionId(2),
                attempt: 2
            })
        );
    }

    #[test]
    fn stale_tickets_are_rejected() {
        let (mut controller, _, _) = controller();
        controller.schedule_reconnect(SessionId(1), 0);
        let stale = ReconnectTicket {
            session: SessionId(0),
            attempt: 1,
        };
        assert!(!controller.take_due(stale));
        assert!(controller.has_pending());

        let current = controller.pending_ticket().unwrap();
        assert!(controller.take_due(current));
        assert!(!controller.has_pending());
        assert!(!controller.take_due(current));
    }

    #[test]
    fn cancel_reports_whether_anything_was_pending() {
        let (mut controller, scheduler, _) = controller();
        assert!(!controller.cancel());
        controller.schedule_reconnect(SessionId(1), 0);
        assert!(controller.cancel());
        assert!(scheduler.pending_delays().is_empty());
    }
}
