// Caller-issued commands and their results

use crate::backend::VideoInfo;
use crate::error::{PlayerError, Result};
use crate::source::VideoSource;
use crate::state::PlaybackState;

/// One atomic request against the engine
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Load(VideoSource),
    Play,
    Pause,
    /// Pause and rewind; completes after the backend acknowledges the rewind
    Stop,
    /// Completes after the backend acknowledges the seek
    Seek(i64),
    SetSpeed(f64),
    SetVolume(f64),
    SetLoop(bool),
    GetInfo,
    GetPosition,
    IsPlaying,
    /// Current engine state
    GetState,
}

impl Command {
    /// Command name on the method channel
    pub fn name(&self) -> &'static str {
        match self {
            Command::Load(_) => "loadVideoSource",
            Command::Play => "play",
            Command::Pause => "pause",
            Command::Stop => "stop",
            Command::Seek(_) => "seekTo",
            Command::SetSpeed(_) => "setPlaybackSpeed",
            Command::SetVolume(_) => "setVolume",
            Command::SetLoop(_) => "setLoop",
            Command::GetInfo => "getVideoInfo",
            Command::GetPosition => "getPlaybackPosition",
            Command::IsPlaying => "isPlaying",
            Command::GetState => "getState",
        }
    }

    /// True for commands whose result waits on a backend acknowledgement.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Command::Stop | Command::Seek(_))
    }
}

/// Successful command result
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Done,
    Info(VideoInfo),
    Position(i64),
    Playing(bool),
    State(PlaybackState),
}

impl Response {
    pub fn into_info(self) -> Result<VideoInfo> {
        match self {
            Response::Info(info) => Ok(info),
            other => Err(unexpected("video info", other)),
        }
    }

    pub fn into_position(self) -> Result<i64> {
        match self {
            Response::Position(position) => Ok(position),
            other => Err(unexpected("position", other)),
        }
    }

    pub fn into_playing(self) -> Result<bool> {
        match self {
            Response::Playing(playing) => Ok(playing),
            other => Err(unexpected("playing flag", other)),
        }
    }

    pub fn into_state(self) -> Result<PlaybackState> {
        match self {
            Response::State(state) => Ok(state),
            other => Err(unexpected("state", other)),
        }
    }
}

fn unexpected(wanted: &str, got: Response) -> PlayerError {
    PlayerError::Backend(format!("Expected {} response, got {:?}", wanted, got))
}

/// Numeric argument check shared by speed and volume
pub fn require_finite(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PlayerError::invalid_argument(format!("{} must be a finite number, got {}", name, value)))
    }
}
