// Simulated native player backend
// Deterministic stand-in for the platform decoder, driven by a controller handle

use nvp_core::{
    BackendSink, LoadRequest, NativePlayerBackend, PlayerError, Result, SeekToken, VideoInfo,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// How a loaded item turns out.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Becomes ready (inline or on `signal_ready`, see [`ReadyMode`])
    Ready,
    /// Accepted, then reported as an asynchronous error
    Fail(Option<String>),
    /// Refused synchronously by `load`
    Reject(String),
}

/// Media description for one location in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct SimMedia {
    pub duration_ms: i64,
    pub width: u32,
    pub height: u32,
    pub outcome: LoadOutcome,
}

impl SimMedia {
    pub fn new(duration_ms: i64, width: u32, height: u32) -> Self {
        Self {
            duration_ms,
            width,
            height,
            outcome: LoadOutcome::Ready,
        }
    }

    pub fn failing(mut self, cause: Option<&str>) -> Self {
        self.outcome = LoadOutcome::Fail(cause.map(str::to_string));
        self
    }

    pub fn rejecting(mut self, message: &str) -> Self {
        self.outcome = LoadOutcome::Reject(message.to_string());
        self
    }
}

impl Default for SimMedia {
    fn default() -> Self {
        Self::new(10_000, 1920, 1080)
    }
}

/// When readiness is reported after `load`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyMode {
    /// From inside `load`, the way a locally available item behaves
    Inline,
    /// Only when the controller calls `signal_ready`
    Manual,
}

/// When seeks are acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckMode {
    /// From inside `seek`
    Inline,
    /// Only when the controller calls `complete_seeks`
    Manual,
}

struct SimState {
    catalog: HashMap<String, SimMedia>,
    current: Option<SimMedia>,
    sink: Option<BackendSink>,
    position_ms: i64,
    playing: bool,
    speed: f64,
    volume: f64,
    ready_mode: ReadyMode,
    ack_mode: AckMode,
    ready_pending: bool,
    pending_seeks: VecDeque<(SeekToken, i64)>,
    reject_next: Option<String>,
    seeks_received: Vec<i64>,
    released: bool,
}

impl SimState {
    fn new() -> Self {
        Self {
            catalog: HashMap::new(),
            current: None,
            sink: None,
            position_ms: 0,
            playing: false,
            speed: 1.0,
            volume: 1.0,
            ready_mode: ReadyMode::Inline,
            ack_mode: AckMode::Inline,
            ready_pending: false,
            pending_seeks: VecDeque::new(),
            reject_next: None,
            seeks_received: Vec::new(),
            released: false,
        }
    }

    fn duration(&self) -> i64 {
        self.current.as_ref().map(|m| m.duration_ms).unwrap_or(0)
    }

    fn clamp(&self, position_ms: i64) -> i64 {
        position_ms.clamp(0, self.duration().max(0))
    }

    fn take_rejection(&mut self) -> Result<()> {
        match self.reject_next.take() {
            Some(message) => Err(PlayerError::Backend(message)),
            None => Ok(()),
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.released {
            return Err(PlayerError::Backend("player released".into()));
        }
        Ok(())
    }
}

/// Simulated [`NativePlayerBackend`]. Position only moves when the
/// controller advances it or a clock thread is running.
pub struct SimulatedBackend {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState::new())),
        }
    }

    /// Handle for driving this backend from a test or a host loop.
    pub fn controller(&self) -> SimController {
        SimController {
            state: self.state.clone(),
        }
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl NativePlayerBackend for SimulatedBackend {
    fn load(&mut self, request: &LoadRequest, sink: BackendSink) -> Result<()> {
        let location = request.location();
        let mut state = self.state.lock();
        state.ensure_live()?;
        state.take_rejection()?;

        let media = state
            .catalog
            .get(&location)
            .cloned()
            .unwrap_or_default();
        log::info!("[sim] load {} ({} ms)", location, media.duration_ms);

        if let LoadOutcome::Reject(message) = &media.outcome {
            return Err(PlayerError::Backend(message.clone()));
        }

        state.position_ms = 0;
        state.playing = false;
        state.pending_seeks.clear();
        state.ready_pending = false;
        state.sink = Some(sink.clone());
        let outcome = media.outcome.clone();
        state.current = Some(media);

        let ready_mode = state.ready_mode;
        match outcome {
            LoadOutcome::Fail(cause) => {
                drop(state);
                sink.error(cause);
            }
            _ if ready_mode == ReadyMode::Inline => {
                drop(state);
                sink.ready();
            }
            _ => state.ready_pending = true,
        }
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_live()?;
        state.take_rejection()?;
        state.playing = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_live()?;
        state.take_rejection()?;
        state.playing = false;
        Ok(())
    }

    fn seek(&mut self, position_ms: i64, token: SeekToken) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_live()?;
        state.take_rejection()?;
        state.seeks_received.push(position_ms);

        let ack_mode = state.ack_mode;
        match ack_mode {
            AckMode::Inline => {
                state.position_ms = state.clamp(position_ms);
                let sink = state.sink.clone();
                drop(state);
                if let Some(sink) = sink {
                    sink.seek_completed(token);
                }
            }
            AckMode::Manual => state.pending_seeks.push_back((token, position_ms)),
        }
        Ok(())
    }

    fn set_playback_speed(&mut self, speed: f64) -> Result<()> {
        let mut state = self.state.lock();
        state.take_rejection()?;
        state.speed = speed;
        Ok(())
    }

    fn set_volume(&mut self, volume: f64) -> Result<()> {
        let mut state = self.state.lock();
        state.take_rejection()?;
        state.volume = volume;
        Ok(())
    }

    fn position_ms(&self) -> i64 {
        self.state.lock().position_ms
    }

    fn video_info(&self) -> VideoInfo {
        let state = self.state.lock();
        match &state.current {
            Some(media) => VideoInfo {
                height: media.height,
                width: media.width,
                duration: media.duration_ms,
            },
            None => VideoInfo::default(),
        }
    }

    fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    fn detach(&mut self) {
        log::debug!("[sim] detach");
        self.state.lock().sink = None;
    }

    fn release(&mut self) {
        log::info!("[sim] release");
        let mut state = self.state.lock();
        state.released = true;
        state.playing = false;
        state.current = None;
        state.pending_seeks.clear();
    }
}

/// Drives a [`SimulatedBackend`] from outside the engine.
///
/// Callbacks fire from the calling thread, the way a platform player
/// calls back on its own queue.
#[derive(Clone)]
pub struct SimController {
    state: Arc<Mutex<SimState>>,
}

impl SimController {
    pub fn insert_media(&self, location: impl Into<String>, media: SimMedia) {
        self.state.lock().catalog.insert(location.into(), media);
    }

    pub fn set_ready_mode(&self, mode: ReadyMode) {
        self.state.lock().ready_mode = mode;
    }

    pub fn set_ack_mode(&self, mode: AckMode) {
        self.state.lock().ack_mode = mode;
    }

    /// Make the next backend call fail synchronously with `message`.
    pub fn reject_next_call(&self, message: &str) {
        self.state.lock().reject_next = Some(message.to_string());
    }

    /// Report readiness for an item loaded in manual mode. Returns false
    /// if nothing was waiting.
    pub fn signal_ready(&self) -> bool {
        let mut state = self.state.lock();
        if !state.ready_pending {
            return false;
        }
        state.ready_pending = false;
        let sink = state.sink.clone();
        drop(state);
        match sink {
            Some(sink) => {
                sink.ready();
                true
            }
            None => false,
        }
    }

    /// Report readiness again regardless of state, as some platform
    /// players do on every status change.
    pub fn repeat_ready(&self) {
        if let Some(sink) = self.current_sink() {
            sink.ready();
        }
    }

    /// Apply and acknowledge every seek received so far, oldest first.
    /// Returns how many were acknowledged.
    pub fn complete_seeks(&self) -> usize {
        let mut state = self.state.lock();
        let pending: Vec<_> = state.pending_seeks.drain(..).collect();
        let mut acks = Vec::with_capacity(pending.len());
        for (token, position_ms) in pending {
            state.position_ms = state.clamp(position_ms);
            acks.push(token);
        }
        let sink = state.sink.clone();
        drop(state);

        if let Some(sink) = sink {
            for token in &acks {
                sink.seek_completed(*token);
            }
        }
        acks.len()
    }

    pub fn pending_seek_tokens(&self) -> Vec<SeekToken> {
        self.state.lock().pending_seeks.iter().map(|(t, _)| *t).collect()
    }

    /// Every position passed to `seek`, in call order
    pub fn seeks_received(&self) -> Vec<i64> {
        self.state.lock().seeks_received.clone()
    }

    /// Sink for the current item. Keeping one across a reload gives a
    /// stale subscription.
    pub fn current_sink(&self) -> Option<BackendSink> {
        self.state.lock().sink.clone()
    }

    /// Move the playhead forward while playing. Reaching the duration
    /// stops playback and reports end of stream.
    pub fn advance(&self, elapsed_ms: i64) {
        let mut state = self.state.lock();
        if !state.playing || state.current.is_none() {
            return;
        }
        let step = (elapsed_ms as f64 * state.speed) as i64;
        let duration = state.duration();
        state.position_ms = (state.position_ms + step).min(duration);
        if state.position_ms < duration {
            return;
        }

        state.playing = false;
        let sink = state.sink.clone();
        drop(state);
        log::debug!("[sim] end of stream at {} ms", duration);
        if let Some(sink) = sink {
            sink.ended();
        }
    }

    /// Report an asynchronous failure of the current item.
    pub fn fail(&self, cause: Option<&str>) {
        let mut state = self.state.lock();
        state.playing = false;
        let sink = state.sink.clone();
        drop(state);
        if let Some(sink) = sink {
            sink.error(cause.map(str::to_string));
        }
    }

    /// Report end of stream without moving the playhead.
    pub fn emit_end(&self) {
        if let Some(sink) = self.current_sink() {
            sink.ended();
        }
    }

    pub fn speed(&self) -> f64 {
        self.state.lock().speed
    }

    pub fn volume(&self) -> f64 {
        self.state.lock().volume
    }

    pub fn is_released(&self) -> bool {
        self.state.lock().released
    }

    pub fn is_attached(&self) -> bool {
        self.state.lock().sink.is_some()
    }

    /// Advance the playhead in real time until the returned handle drops.
    pub fn spawn_clock(&self, tick: Duration) -> ClockHandle {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let controller = self.clone();

        let handle = thread::spawn(move || {
            let mut last = Instant::now();
            while !stop_flag.load(Ordering::SeqCst) {
                thread::sleep(tick);
                let now = Instant::now();
                let elapsed = now.duration_since(last).as_millis() as i64;
                if elapsed > 0 {
                    controller.advance(elapsed);
                    last = now;
                }
            }
        });

        ClockHandle {
            stop,
            handle: Some(handle),
        }
    }
}

/// Running playhead clock. Stops and joins on drop.
pub struct ClockHandle {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Drop for ClockHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
