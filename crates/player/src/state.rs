//! Explicit playback state machine.
//!
//! The snapshot flags (`is_playing`, `is_buffering`, ...) are what the UI
//! binds to; [`PlayerState`] is the coarse phase derived from the same
//! events through a single transition table, so the reconnect and error
//! paths can be audited in one place.
//!
//! | from \ event        | Load    | Waiting   | Ready{playing}      | Playing | Pause  | Play    | PlayRejected | RetryScheduled | Fatal / Exhausted | Unload |
//! |---------------------|---------|-----------|---------------------|---------|--------|---------|--------------|----------------|-------------------|--------|
//! | Idle                | Loading | -         | -                   | -       | -      | -       | -            | -              | -                 | Idle   |
//! | Loading             | Loading | Buffering | Playing / Paused    | Playing | Paused | -       | Paused       | Reconnecting   | Error             | Idle   |
//! | Playing             | Loading | Buffering | -                   | -       | Paused | -       | -            | Reconnecting   | Error             | Idle   |
//! | Buffering           | Loading | -         | Playing / Paused    | Playing | Paused | -       | Paused       | Reconnecting   | Error             | Idle   |
//! | Paused              | Loading | Buffering | -                   | Playing | -      | Playing | -            | Reconnecting   | Error             | Idle   |
//! | Reconnecting        | Loading | -         | -                   | Playing | -      | -       | -            | Reconnecting   | Error             | Idle   |
//! | Error               | Loading | -         | -                   | Playing | -      | -       | -            | -              | Error             | Idle   |
//!
//! `-` keeps the current state.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    /// No session.
    #[default]
    Idle,
    /// Session attached, no media data yet.
    Loading,
    Playing,
    /// Stalled waiting for data.
    Buffering,
    /// Ready but not playing: user pause or blocked autoplay.
    Paused,
    /// Waiting for a backoff timer before rebuilding the session.
    Reconnecting,
    /// Terminal until a new channel selection, a manual retry, or the
    /// element reporting real playback.
    Error,
}

/// Inputs of the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackEvent {
    Load,
    Waiting,
    /// Enough data to play (`canplay`); `playing` is the current play intent.
    Ready { playing: bool },
    Playing,
    Play,
    Pause,
    PlayRejected,
    RetryScheduled,
    FatalError,
    RetriesExhausted,
    Unload,
}

impl PlayerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Playing => "playing",
            Self::Buffering => "buffering",
            Self::Paused => "paused",
            Self::Reconnecting => "reconnecting",
            Self::Error => "error",
        }
    }

    /// Apply one event. Pairs missing from the table leave the state unchanged.
    pub fn on(self, event: PlaybackEvent) -> PlayerState {
        use PlaybackEvent as E;
        use PlayerState as S;

        match (self, event) {
            (_, E::Unload) => S::Idle,
            (_, E::Load) => S::Loading,
            (S::Idle, _) => S::Idle,

            (_, E::FatalError | E::RetriesExhausted) => S::Error,
            (S::Error, E::Playing) => S::Playing,
            (S::Error, _) => S::Error,

            (_, E::RetryScheduled) => S::Reconnecting,
            (S::Reconnecting, E::Playing) => S::Playing,
            (S::Reconnecting, _) => S::Reconnecting,

            (_, E::Playing) => S::Playing,

            (S::Loading | S::Playing | S::Paused, E::Waiting) => S::Buffering,

            (S::Loading | S::Buffering, E::Ready { playing: true }) => S::Playing,
            (S::Loading | S::Buffering, E::Ready { playing: false }) => S::Paused,

            (S::Loading | S::Playing | S::Buffering, E::Pause) => S::Paused,
            (S::Paused, E::Play) => S::Playing,

            (S::Loading | S::Buffering, E::PlayRejected) => S::Paused,

            (state, _) => state,
        }
    }
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PlaybackEvent as E;
    use PlayerState as S;

    fn run(events: &[PlaybackEvent]) -> PlayerState {
        events.iter().fold(S::Idle, |state, event| state.on(*event))
    }

    #[test]
    fn idle_ignores_everything_but_load() {
        for event in [E::Waiting, E::Playing, E::Pause, E::FatalError, E::RetryScheduled] {
            assert_eq!(S::Idle.on(event), S::Idle);
        }
        assert_eq!(S::Idle.on(E::Load), S::Loading);
    }

    #[test]
    fn normal_startup() {
        assert_eq!(run(&[E::Load, E::Waiting, E::Playing]), S::Playing);
        assert_eq!(run(&[E::Load, E::Ready { playing: true }]), S::Playing);
    }

    #[test]
    fn autoplay_rejection_parks_in_paused_until_play() {
        let state = run(&[E::Load, E::PlayRejected]);
        assert_eq!(state, S::Paused);
        assert_eq!(state.on(E::Play), S::Playing);
    }

    #[test]
    fn stall_and_recover() {
        let state = run(&[E::Load, E::Playing, E::Waiting]);
        assert_eq!(state, S::Buffering);
        assert_eq!(state.on(E::Ready { playing: true }), S::Playing);
        assert_eq!(state.on(E::Ready { playing: false }), S::Paused);
    }

    #[test]
    fn reconnecting_only_leaves_on_playing_or_terminal_events() {
        let state = run(&[E::Load, E::Playing, E::RetryScheduled]);
        assert_eq!(state, S::Reconnecting);
        assert_eq!(state.on(E::Waiting), S::Reconnecting);
        assert_eq!(state.on(E::Pause), S::Reconnecting);
        assert_eq!(state.on(E::Playing), S::Playing);
        assert_eq!(state.on(E::RetriesExhausted), S::Error);
        assert_eq!(state.on(E::Unload), S::Idle);
    }

    #[test]
    fn reload_during_reconnect_goes_back_to_loading() {
        let state = run(&[E::Load, E::RetryScheduled, E::Load]);
        assert_eq!(state, S::Loading);
    }

    #[test]
    fn error_is_sticky_until_load_or_real_playback() {
        let state = run(&[E::Load, E::FatalError]);
        assert_eq!(state, S::Error);
        for event in [E::Waiting, E::Play, E::Pause, E::RetryScheduled] {
            assert_eq!(state.on(event), S::Error);
        }
        assert_eq!(state.on(E::Load), S::Loading);
        assert_eq!(state.on(E::Playing), S::Playing);
    }

    #[test]
    fn serializes_as_snake_case() {
        assert_eq!(
            serde_json::to_string(&S::Reconnecting).unwrap(),
            "\"reconnecting\""
        );
        assert_eq!(S::Buffering.to_string(), "buffering");
    }
}
