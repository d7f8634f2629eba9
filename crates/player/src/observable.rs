//! Observable playback state shared by every UI surface of one player.
//!
//! Listeners are called synchronously, in registration order, after the new
//! snapshot has been stored. Async consumers can use [`PlaybackBroadcaster::watch`]
//! instead and always see the latest snapshot.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tracing::trace;

use crate::snapshot::PlaybackSnapshot;

/// Callback invoked with every published snapshot.
pub type Listener = Arc<dyn Fn(&PlaybackSnapshot) + Send + Sync>;

/// Token returned by [`PlaybackBroadcaster::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct PlaybackBroadcaster {
    current: RwLock<Arc<PlaybackSnapshot>>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_id: AtomicU64,
    watch_tx: watch::Sender<Arc<PlaybackSnapshot>>,
}

impl PlaybackBroadcaster {
    pub fn new(initial: PlaybackSnapshot) -> Self {
        let initial = Arc::new(initial);
        let (watch_tx, _) = watch::channel(Arc::clone(&initial));
        Self {
            current: RwLock::new(initial),
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            watch_tx,
        }
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<PlaybackSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Register a listener for every future transition.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&PlaybackSnapshot) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        before != listeners.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Receiver that always holds the latest snapshot.
    pub fn watch(&self) -> watch::Receiver<Arc<PlaybackSnapshot>> {
        self.watch_tx.subscribe()
    }

    /// Build the next snapshot from the current one and publish it.
    ///
    /// Listeners are not called when the mutation changed nothing.
    pub(crate) fn update<F>(&self, mutate: F) -> Arc<PlaybackSnapshot>
    where
        F: FnOnce(&mut PlaybackSnapshot),
    {
        let next = {
            let mut current = self.current.write();
            let mut next = PlaybackSnapshot::clone(&current);
            mutate(&mut next);
            if next == **current {
                return Arc::clone(&current);
            }
            let next = Arc::new(next);
            *current = Arc::clone(&next);
            next
        };

        self.watch_tx.send_replace(Arc::clone(&next));

        // Copy the list so listeners may unsubscribe (or subscribe) from inside a callback.
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        trace!(
            state = %next.state,
            listeners = listeners.len(),
            "Publishing playback snapshot"
        );
        for listener in listeners {
            listener(&next);
        }
        next
    }
}

impl Default for PlaybackBroadcaster {
    fn default() -> Self {
        Self::new(PlaybackSnapshot::default())
    }
}

impl std::fmt::Debug for PlaybackBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackBroadcaster")
            .field("current", &self.current.read())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
