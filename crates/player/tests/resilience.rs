//! End-to-end resilience properties of the session manager.
//!
//! Everything runs against the simulated sink, transport factory and a
//! manual scheduler, so timers only fire when a test says so.

use std::sync::Arc;
use std::time::Duration;

use frame_player::sim::{ManualScheduler, SimulatedSink, SimulatedTransportFactory};
use frame_player::{
    ChannelDescriptor, Collaborators, InMemorySettings, LevelInfo, MemoryDebugLog, PlayerConfig,
    PlayerState, QualitySelection, SessionManager, TransportError, TransportEvent,
};
use parking_lot::Mutex;

struct Harness {
    manager: SessionManager,
    sink: SimulatedSink,
    factory: SimulatedTransportFactory,
    scheduler: Arc<ManualScheduler>,
}

fn setup() -> Harness {
    let sink = SimulatedSink::new();
    let factory = SimulatedTransportFactory::new();
    let scheduler = Arc::new(ManualScheduler::new());
    let manager = SessionManager::new(
        PlayerConfig::default(),
        Collaborators {
            sink: Box::new(sink.clone()),
            transports: Arc::new(factory.clone()),
            scheduler: scheduler.clone(),
            settings: Arc::new(InMemorySettings::default()),
            log: Arc::new(MemoryDebugLog::new(128)),
        },
    );
    Harness {
        manager,
        sink,
        factory,
        scheduler,
    }
}

fn channel(name: &str) -> ChannelDescriptor {
    ChannelDescriptor::new(format!("https://tv.example/{name}/master.m3u8"), name)
}

fn fatal_network() -> TransportEvent {
    TransportEvent::Error(TransportError::network("levelLoadError", true))
}

fn three_levels() -> TransportEvent {
    TransportEvent::ManifestParsed {
        levels: vec![
            LevelInfo::new(640, 360, 800_000),
            LevelInfo::new(1280, 720, 2_500_000),
            LevelInfo::new(1920, 1080, 5_000_000),
        ],
    }
}

impl Harness {
    fn session(&self) -> frame_player::SessionId {
        self.manager
            .current_session()
            .expect("a session should be live")
    }

    fn fail_current(&mut self) {
        let session = self.session();
        self.manager.handle_transport_event(session, fatal_network());
    }

    fn fire_timer(&mut self) {
        let ticket = self.scheduler.fire_next().expect("a timer should be pending");
        self.manager.reconnect_due(ticket);
    }
}

mod lifecycle {
    use super::*;

    #[test]
    fn channel_switches_never_leak_instances_or_timers() {
        let mut h = setup();
        for name in ["a", "b", "c", "d"] {
            h.manager.select_channel(channel(name));
            h.fail_current();
            assert_eq!(h.factory.live_instances(), 1);
            assert!(h.scheduler.pending().len() <= 1);
        }
        assert_eq!(h.factory.peak_live_instances(), 1);
        assert_eq!(h.scheduler.pending().len(), 1);
    }

    #[test]
    fn selecting_a_channel_cancels_the_pending_reload() {
        let mut h = setup();
        h.manager.select_channel(channel("a"));
        h.fail_current();
        let stale = h.scheduler.pending()[0].0;

        h.manager.select_channel(channel("b"));
        assert!(h.scheduler.pending().is_empty());

        // A late expiry of the old timer must not bring channel A back.
        h.manager.reconnect_due(stale);
        assert_eq!(
            h.manager.current_channel().map(|c| c.name.as_str()),
            Some("b")
        );
        assert_eq!(h.factory.created_count(), 2);
    }
}

mod reconnect {
    use super::*;

    #[test]
    fn first_fatal_network_error_schedules_two_seconds() {
        let mut h = setup();
        h.manager.select_channel(channel("a"));
        h.fail_current();

        let snapshot = h.manager.snapshot();
        assert!(snapshot.is_reconnecting);
        assert_eq!(snapshot.reconnect_attempt, 1);
        assert_eq!(snapshot.status_line(), "Reconnecting (attempt 1/4)...");
        assert!(!snapshot.shows_error_banner());
        assert_eq!(h.scheduler.pending_delays(), vec![Duration::from_millis(2000)]);
    }

    #[test]
    fn schedule_is_used_in_order_then_exhausted() {
        let mut h = setup();
        h.manager.select_channel(channel("a"));

        // Attempts 0 through 3 each consume one delay.
        for expected in 1..=4u32 {
            h.fail_current();
            assert_eq!(h.manager.snapshot().reconnect_attempt, expected);
            h.fire_timer();
        }
        assert_eq!(
            h.scheduler.history(),
            [2000, 4000, 8000, 16000]
                .into_iter()
                .map(Duration::from_millis)
                .collect::<Vec<_>>()
        );

        // The reload running attempt 4 has nothing left to fall back on.
        h.fail_current();
        let snapshot = h.manager.snapshot();
        assert!(!snapshot.is_reconnecting);
        assert_eq!(snapshot.reconnect_attempt, 0);
        assert_eq!(
            snapshot.error_message.as_deref(),
            Some("Stream unavailable. Please try another channel.")
        );
        assert_eq!(snapshot.state, PlayerState::Error);
        assert!(snapshot.shows_error_banner());
        assert!(h.scheduler.pending().is_empty());
        assert_eq!(h.factory.live_instances(), 0);
    }

    #[test]
    fn manifest_parsed_resets_the_attempt_counter() {
        let mut h = setup();
        h.manager.select_channel(channel("a"));
        h.fail_current();
        h.fire_timer();
        h.fail_current();
        h.fire_timer();
        assert_eq!(h.manager.snapshot().reconnect_attempt, 2);

        let session = h.session();
        h.manager.handle_transport_event(session, three_levels());
        let snapshot = h.manager.snapshot();
        assert_eq!(snapshot.reconnect_attempt, 0);
        assert!(!snapshot.is_reconnecting);
    }

    #[test]
    fn manual_retry_restarts_the_cycle() {
        let mut h = setup();
        h.manager.select_channel(channel("a"));
        for _ in 0..4 {
            h.fail_current();
            h.fire_timer();
        }
        h.fail_current();
        assert!(h.manager.snapshot().shows_error_banner());

        h.manager.retry();
        assert!(h.manager.snapshot().error_message.is_none());
        h.fail_current();
        assert_eq!(h.manager.snapshot().reconnect_attempt, 1);
        assert_eq!(
            h.scheduler.pending_delays(),
            vec![Duration::from_millis(2000)]
        );
    }

    #[test]
    fn playing_restores_the_full_retry_budget() {
        let mut h = setup();
        h.manager.select_channel(channel("a"));
        h.fail_current();
        h.fire_timer();
        h.fail_current();
        h.fire_timer();

        h.manager
            .handle_media_event(frame_player::MediaEvent::Playing);
        h.fail_current();
        assert_eq!(
            h.scheduler.pending_delays(),
            vec![Duration::from_millis(2000)]
        );
    }

    #[test]
    fn self_recovery_cancels_the_queued_reload() {
        let mut h = setup();
        h.manager.select_channel(channel("a"));
        let session = h.session();
        h.fail_current();
        assert!(h.manager.has_pending_reconnect());

        h.manager
            .handle_media_event(frame_player::MediaEvent::Playing);
        assert!(!h.manager.has_pending_reconnect());
        assert!(h.scheduler.fire_next().is_none());
        assert_eq!(h.session(), session);
        assert_eq!(h.factory.live_instances(), 1);

        let snapshot = h.manager.snapshot();
        assert!(!snapshot.is_reconnecting);
        assert_eq!(snapshot.state, PlayerState::Playing);
    }
}

mod quality {
    use super::*;

    #[test]
    fn level_switch_sets_the_active_tier() {
        let mut h = setup();
        h.manager.select_channel(channel("a"));
        let session = h.session();
        h.manager.handle_transport_event(session, three_levels());

        let snapshot = h.manager.snapshot();
        assert_eq!(snapshot.quality_tiers.len(), 3);
        assert_eq!(snapshot.active_quality_index(), -1);

        h.manager
            .handle_transport_event(session, TransportEvent::LevelSwitched { level: 1 });
        assert_eq!(h.manager.snapshot().active_quality_index(), 1);
    }

    #[test]
    fn auto_after_tiers_exist() {
        let mut h = setup();
        h.manager.select_channel(channel("a"));
        let session = h.session();
        h.manager.handle_transport_event(session, three_levels());
        h.manager.set_quality(QualitySelection::Level(2));
        h.manager.set_quality(QualitySelection::Auto);

        assert_eq!(h.manager.snapshot().active_quality_index(), -1);
        assert_eq!(h.factory.levels_set(), vec![2, -1]);
    }

    #[test]
    fn progressive_stream_has_no_tiers() {
        let mut h = setup();
        h.manager
            .select_channel(ChannelDescriptor::new("http://radio.example/jazz.aac", "Jazz"));
        h.manager.set_quality(QualitySelection::Level(0));

        let snapshot = h.manager.snapshot();
        assert!(snapshot.quality_tiers.is_empty());
        assert!(!snapshot.show_quality_selector());
        assert!(h.factory.levels_set().is_empty());
        assert_eq!(h.sink.play_calls(), 1);
    }

    #[test]
    fn tiers_are_rebuilt_per_channel() {
        let mut h = setup();
        h.manager.select_channel(channel("a"));
        let session = h.session();
        h.manager.handle_transport_event(session, three_levels());
        h.manager.select_channel(channel("b"));

        assert!(h.manager.snapshot().quality_tiers.is_empty());
        h.manager.set_quality(QualitySelection::Level(2));
        assert!(h.factory.levels_set().is_empty());
    }
}

mod observers {
    use super::*;

    #[test]
    fn unsubscribed_listener_stops_while_others_continue() {
        let mut h = setup();
        let broadcaster = h.manager.broadcaster();
        let header: Arc<Mutex<Vec<i32>>> = Arc::default();
        let console: Arc<Mutex<Vec<i32>>> = Arc::default();

        let sink = header.clone();
        let header_id =
            broadcaster.subscribe(move |s| sink.lock().push(s.active_quality_index()));
        let sink = console.clone();
        broadcaster.subscribe(move |s| sink.lock().push(s.active_quality_index()));

        h.manager.select_channel(channel("a"));
        let session = h.session();
        h.manager.handle_transport_event(session, three_levels());
        let seen_before = header.lock().len();

        assert!(broadcaster.unsubscribe(header_id));
        assert!(!broadcaster.unsubscribe(header_id));
        h.manager
            .handle_transport_event(session, TransportEvent::LevelSwitched { level: 1 });

        assert_eq!(header.lock().len(), seen_before);
        assert_eq!(console.lock().last(), Some(&1));
        assert_eq!(console.lock().len(), seen_before + 1);
    }

    #[test]
    fn playing_and_error_are_never_published_together() {
        let mut h = setup();
        let violations = Arc::new(Mutex::new(0usize));
        let counter = violations.clone();
        h.manager.broadcaster().subscribe(move |s| {
            if s.is_playing && s.error_message.is_some() {
                *counter.lock() += 1;
            }
        });

        h.manager.select_channel(channel("a"));
        h.manager.handle_media_event(frame_player::MediaEvent::Play);
        let session = h.session();
        h.manager.handle_transport_event(
            session,
            TransportEvent::Error(TransportError::other("bufferAppendError", true)),
        );
        assert_eq!(*violations.lock(), 0);
        assert!(h.manager.snapshot().error_message.is_some());
    }
}
