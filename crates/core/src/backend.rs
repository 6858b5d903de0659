// Capability interface over the native decode/render engine

use crate::error::Result;
use crate::source::LoadRequest;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Snapshot of the loaded item's dimensions and length
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VideoInfo {
    pub height: u32,
    pub width: u32,
    /// Duration in milliseconds
    pub duration: i64,
}

/// Identifies one outstanding seek at the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeekToken(u64);

impl SeekToken {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for SeekToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "seek#{}", self.0)
    }
}

/// Callbacks a backend reports about its current item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    /// Item is ready to play
    Ready,
    /// Item played to its end
    Ended,
    /// Item failed. `cause` is the backend's own description, if any.
    Error { cause: Option<String> },
    /// The seek identified by `token` has landed
    SeekCompleted { token: SeekToken },
}

/// Engine-side receiver of backend callbacks
pub trait BackendListener: Send + Sync {
    fn on_backend_event(&self, generation: u64, event: BackendEvent);
}

/// Subscription handed to the backend with every load.
///
/// Each sink is tagged with the load generation it was issued for, so
/// callbacks about a superseded item are recognized and dropped. Cloning
/// is cheap and sinks may be used from any thread, including inline from
/// inside a backend method.
#[derive(Clone)]
pub struct BackendSink {
    generation: u64,
    listener: Arc<dyn BackendListener>,
}

impl BackendSink {
    pub fn new(generation: u64, listener: Arc<dyn BackendListener>) -> Self {
        Self {
            generation,
            listener,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn notify(&self, event: BackendEvent) {
        self.listener.on_backend_event(self.generation, event);
    }

    pub fn ready(&self) {
        self.notify(BackendEvent::Ready);
    }

    pub fn ended(&self) {
        self.notify(BackendEvent::Ended);
    }

    pub fn error(&self, cause: Option<String>) {
        self.notify(BackendEvent::Error { cause });
    }

    pub fn seek_completed(&self, token: SeekToken) {
        self.notify(BackendEvent::SeekCompleted { token });
    }
}

impl fmt::Debug for BackendSink {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BackendSink")
            .field("generation", &self.generation)
            .finish()
    }
}

/// Native player capability.
///
/// All methods are called from the engine thread. Callbacks go through the
/// [`BackendSink`] received in `load`; a backend keeps only the most recent
/// sink and drops it on `detach`. Every `seek` must eventually be answered
/// with `SeekCompleted` or an `Error`.
pub trait NativePlayerBackend: Send {
    /// Replace the current item. Readiness is reported through `sink`.
    fn load(&mut self, request: &LoadRequest, sink: BackendSink) -> Result<()>;

    fn play(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    /// Start an asynchronous seek. Out-of-range positions are the
    /// backend's to clamp.
    fn seek(&mut self, position_ms: i64, token: SeekToken) -> Result<()>;

    fn set_playback_speed(&mut self, speed: f64) -> Result<()>;

    /// Volume in 0.0..=1.0
    fn set_volume(&mut self, volume: f64) -> Result<()>;

    /// Current position in milliseconds
    fn position_ms(&self) -> i64;

    fn video_info(&self) -> VideoInfo;

    fn is_playing(&self) -> bool;

    /// Drop the callback subscription
    fn detach(&mut self);

    /// Release the native player
    fn release(&mut self);
}
