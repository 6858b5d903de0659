// Playback state machine

use crate::error::{PlayerError, Result};
use serde::Serialize;

/// Canonical playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// No source loaded
    Idle,
    /// A source was handed to the backend, readiness pending
    Loading,
    /// Source is loaded; also the resting state after stop
    Ready,
    /// Media is playing
    Playing,
    /// Media is paused
    Paused,
    /// Reached end of stream with looping disabled
    Ended,
    /// Backend reported a failure; terminal until the next load
    Errored,
}

impl PlaybackState {
    /// True once the current source has reached readiness and has not failed.
    pub fn has_ready_source(self) -> bool {
        matches!(
            self,
            PlaybackState::Ready | PlaybackState::Playing | PlaybackState::Paused | PlaybackState::Ended
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Loading => "loading",
            PlaybackState::Ready => "ready",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Ended => "ended",
            PlaybackState::Errored => "errored",
        }
    }
}

/// A state change that actually happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub old: PlaybackState,
    pub new: PlaybackState,
}

/// Check a transition against the lifecycle table.
pub fn validate_transition(from: PlaybackState, to: PlaybackState) -> Result<()> {
    use PlaybackState::*;

    match (from, to) {
        // A new load re-arms from any state
        (_, Loading) => Ok(()),
        // Backend errors win from anywhere
        (_, Errored) => Ok(()),

        (Loading, Ready) => Ok(()),

        (Ready, Playing) => Ok(()),
        (Paused, Playing) => Ok(()),
        (Ended, Playing) => Ok(()),

        (Playing, Paused) => Ok(()),

        // Stop rests in Ready
        (Playing | Paused | Ended, Ready) => Ok(()),

        // End of stream, possibly racing a pause or stop
        (Playing | Paused | Ready, Ended) => Ok(()),

        _ => Err(PlayerError::NotReady(format!(
            "Invalid state transition from {:?} to {:?}",
            from, to
        ))),
    }
}

/// Owner of the playback state and the loop flag.
///
/// Only the engine thread holds one of these, so every mutation is
/// serialized through it.
#[derive(Debug)]
pub struct StateMachine {
    state: PlaybackState,
    looping: bool,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: PlaybackState::Idle,
            looping: false,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Consulted only at end of stream.
    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Move to `to`. Returns `None` when already there.
    pub fn transition(&mut self, to: PlaybackState) -> Result<Option<Transition>> {
        let from = self.state;
        if from == to && to != PlaybackState::Loading {
            return Ok(None);
        }
        validate_transition(from, to)?;
        self.state = to;
        log::debug!("[state] {:?} -> {:?}", from, to);
        Ok(Some(Transition { old: from, new: to }))
    }

    /// Fails with `NotReady` unless the current source has reached readiness.
    pub fn require_ready_source(&self, operation: &str) -> Result<()> {
        if self.state.has_ready_source() {
            Ok(())
        } else {
            Err(PlayerError::not_ready(format!(
                "{} requires a ready source (state: {})",
                operation,
                self.state.as_str()
            )))
        }
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut sm = StateMachine::new();
        for next in [
            PlaybackState::Loading,
            PlaybackState::Ready,
            PlaybackState::Playing,
            PlaybackState::Paused,
            PlaybackState::Playing,
            PlaybackState::Ended,
            PlaybackState::Playing,
            PlaybackState::Ready,
        ] {
            assert!(sm.transition(next).unwrap().is_some(), "to {:?}", next);
        }
        assert_eq!(sm.state(), PlaybackState::Ready);
    }

    #[test]
    fn test_same_state_is_not_a_transition() {
        let mut sm = StateMachine::new();
        sm.transition(PlaybackState::Loading).unwrap();
        sm.transition(PlaybackState::Ready).unwrap();
        assert_eq!(sm.transition(PlaybackState::Ready).unwrap(), None);
    }

    #[test]
    fn test_reload_is_always_a_transition() {
        let mut sm = StateMachine::new();
        sm.transition(PlaybackState::Loading).unwrap();
        let t = sm.transition(PlaybackState::Loading).unwrap().unwrap();
        assert_eq!(t.old, PlaybackState::Loading);
    }

    #[test]
    fn test_errored_only_leaves_through_load() {
        let mut sm = StateMachine::new();
        sm.transition(PlaybackState::Loading).unwrap();
        sm.transition(PlaybackState::Errored).unwrap();
        assert!(sm.transition(PlaybackState::Playing).is_err());
        assert!(sm.transition(PlaybackState::Ready).is_err());
        assert!(sm.transition(PlaybackState::Loading).is_ok());
    }

    #[test]
    fn test_idle_cannot_play() {
        let mut sm = StateMachine::new();
        assert!(sm.transition(PlaybackState::Playing).is_err());
        assert!(sm.transition(PlaybackState::Ended).is_err());
        assert_eq!(sm.state(), PlaybackState::Idle);
        assert!(sm.transition(PlaybackState::Errored).is_ok());
    }

    #[test]
    fn test_require_ready_source() {
        let mut sm = StateMachine::new();
        assert!(matches!(
            sm.require_ready_source("getPlaybackPosition"),
            Err(PlayerError::NotReady(_))
        ));
        sm.transition(PlaybackState::Loading).unwrap();
        assert!(sm.require_ready_source("isPlaying").is_err());
        sm.transition(PlaybackState::Ready).unwrap();
        assert!(sm.require_ready_source("isPlaying").is_ok());
    }

    #[test]
    fn test_loop_flag_is_independent_of_state() {
        let mut sm = StateMachine::new();
        sm.set_looping(true);
        sm.transition(PlaybackState::Loading).unwrap();
        assert!(sm.is_looping());
        assert_eq!(sm.state(), PlaybackState::Loading);
    }
}
