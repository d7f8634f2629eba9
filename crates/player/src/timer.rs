//! Cancellable one-shot timers for reconnect scheduling.
//!
//! A pending timer is an owned resource: dropping [`PendingReconnect`]
//! cancels it, so whoever holds it decides its lifetime.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::media::SessionId;

/// Identifies which reload a timer expiry asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReconnectTicket {
    /// Session whose failure scheduled the timer.
    pub session: SessionId,
    /// Attempt number the reload will run with.
    pub attempt: u32,
}

pub struct PendingReconnect {
    ticket: ReconnectTicket,
    delay: Duration,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PendingReconnect {
    pub fn new(ticket: ReconnectTicket, delay: Duration, token: CancellationToken) -> Self {
        Self {
            ticket,
            delay,
            token,
            task: None,
        }
    }

    /// Attach the task driving the timer so cancellation also aborts it.
    pub fn with_task(mut self, task: JoinHandle<()>) -> Self {
        self.task = Some(task);
        self
    }

    pub fn ticket(&self) -> ReconnectTicket {
        self.ticket
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel explicitly. Equivalent to dropping the handle.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for PendingReconnect {
    fn drop(&mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for PendingReconnect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingReconnect")
            .field("ticket", &self.ticket)
            .field("delay", &self.delay)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Starts reconnect timers.
pub trait ReconnectScheduler: Send + Sync {
    fn schedule(&self, delay: Duration, ticket: ReconnectTicket) -> PendingReconnect;
}

/// Timers backed by `tokio::time::sleep`. Must be used inside a runtime.
pub struct TokioScheduler {
    on_fire: Arc<dyn Fn(ReconnectTicket) + Send + Sync>,
}

impl TokioScheduler {
    pub fn new<F>(on_fire: F) -> Self
    where
        F: Fn(ReconnectTicket) + Send + Sync + 'static,
    {
        Self {
            on_fire: Arc::new(on_fire),
        }
    }
}

impl ReconnectScheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, ticket: ReconnectTicket) -> PendingReconnect {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let on_fire = Arc::clone(&self.on_fire);

        let task = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancelled.cancelled() => {
                    trace!(?ticket, "Reconnect timer cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    on_fire(ticket);
                }
            }
        });

        PendingReconnect::new(ticket, delay, token).with_task(task)
    }
}

impl std::fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioScheduler").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn ticket(attempt: u32) -> ReconnectTicket {
        ReconnectTicket {
            session: SessionId(1),
            attempt,
        }
    }

    fn recording_scheduler() -> (TokioScheduler, Arc<Mutex<Vec<ReconnectTicket>>>) {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&fired);
        (
            TokioScheduler::new(move |ticket| sink.lock().push(ticket)),
            fired,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() {
        let (scheduler, fired) = recording_scheduler();
        let _pending = scheduler.schedule(Duration::from_millis(2000), ticket(1));

        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert!(fired.lock().is_empty());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(*fired.lock(), vec![ticket(1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_cancels() {
        let (scheduler, fired) = recording_scheduler();
        let pending = scheduler.schedule(Duration::from_millis(100), ticket(2));
        assert!(!pending.is_cancelled());
        pending.cancel();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(fired.lock().is_empty());
    }
}
