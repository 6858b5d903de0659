// Shared fixtures for engine tests

#![allow(dead_code)]

use nvp_backend_sim::{SimController, SimMedia, SimulatedBackend};
use nvp_core::{EngineConfig, EventSink, PlaybackState, PlayerEvent, VideoSource};
use nvp_engine::Player;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const TIMEOUT: Duration = Duration::from_secs(5);

pub const CLIP_URL: &str = "https://x/y.mp4";
pub const CLIP_DURATION_MS: i64 = 4_000;

/// Collects events and lets a test wait for them without sleeping.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<PlayerEvent>>,
    changed: Condvar,
}

impl EventSink for RecordingSink {
    fn on_event(&self, event: PlayerEvent) {
        self.events.lock().push(event);
        self.changed.notify_all();
    }
}

impl RecordingSink {
    /// Wait until `done` holds for the recorded events.
    pub fn wait_for(&self, done: impl Fn(&[PlayerEvent]) -> bool) -> bool {
        let deadline = Instant::now() + TIMEOUT;
        let mut events = self.events.lock();
        while !done(&events) {
            if self.changed.wait_until(&mut events, deadline).timed_out() {
                return done(&events);
            }
        }
        true
    }

    pub fn wait_for_count(&self, wanted: &PlayerEvent, count: usize) -> bool {
        self.wait_for(|events| events.iter().filter(|e| *e == wanted).count() >= count)
    }

    pub fn count(&self, wanted: &PlayerEvent) -> usize {
        self.events.lock().iter().filter(|e| *e == wanted).count()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn snapshot(&self) -> Vec<PlayerEvent> {
        self.events.lock().clone()
    }

    pub fn positions(&self) -> Vec<i64> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                PlayerEvent::PositionChanged { position_ms } => Some(*position_ms),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                PlayerEvent::Error { message } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn state_changes(&self) -> Vec<PlaybackState> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                PlayerEvent::StateChanged { new_state, .. } => Some(*new_state),
                _ => None,
            })
            .collect()
    }
}

pub struct Fixture {
    pub player: Player,
    pub controller: SimController,
    pub sink: Arc<RecordingSink>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let backend = SimulatedBackend::new();
        let controller = backend.controller();
        controller.insert_media(CLIP_URL, SimMedia::new(CLIP_DURATION_MS, 1280, 720));

        let player = Player::with_config(Box::new(backend), config).unwrap();
        let sink = Arc::new(RecordingSink::default());
        player.add_event_sink(sink.clone());
        Self {
            player,
            controller,
            sink,
        }
    }

    /// Load the default clip and wait until it is ready.
    pub fn loaded() -> Self {
        let fixture = Self::new();
        fixture.load_clip();
        fixture
    }

    pub fn load_clip(&self) {
        let readies = self.sink.count(&PlayerEvent::Ready);
        self.player.load(VideoSource::network(CLIP_URL)).unwrap();
        assert!(self.sink.wait_for_count(&PlayerEvent::Ready, readies + 1));
    }

    /// Round-trip through the engine queue. Everything the backend
    /// reported before this call has been handled when it returns.
    pub fn settle(&self) -> PlaybackState {
        self.player.state().unwrap()
    }
}
