// Engine-to-caller event delivery

use crate::state::PlaybackState;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Asynchronous notifications pushed to the caller
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// The current source is ready to play (once per load)
    Ready,

    /// Playback reached the end with looping disabled
    Ended,

    /// The backend failed; already translated into a readable message
    Error { message: String },

    /// Sampled playback position differs from the previous sample
    PositionChanged { position_ms: i64 },

    /// The canonical playback state changed
    StateChanged {
        old_state: PlaybackState,
        new_state: PlaybackState,
    },
}

/// Receiver of player events.
///
/// Events are delivered on the engine thread. Implementations must return
/// quickly and must not call blocking `Player` methods from inside
/// `on_event`. Disposing the player from a sink is allowed.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: PlayerEvent);
}

impl<F> EventSink for F
where
    F: Fn(PlayerEvent) + Send + Sync,
{
    fn on_event(&self, event: PlayerEvent) {
        self(event)
    }
}

/// Fans events out to every registered sink.
///
/// Once [`EventEmitter::close`] returns, no sink is ever called again.
pub struct EventEmitter {
    closed: AtomicBool,
    sinks: Mutex<Vec<Arc<dyn EventSink>>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self {
            closed: AtomicBool::new(false),
            sinks: Mutex::new(Vec::new()),
        }
    }

    pub fn add_sink(&self, sink: Arc<dyn EventSink>) {
        let mut sinks = self.sinks.lock();
        if self.is_closed() {
            log::warn!("[events] sink added after close, ignoring");
            return;
        }
        sinks.push(sink);
    }

    /// Stop all delivery. Waits for an in-progress emission to finish, so
    /// it must not be called from inside a sink.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.sinks.lock().clear();
    }

    /// Stop delivery from inside a sink. Sinks after the calling one are
    /// skipped for the current event and nothing is emitted afterwards.
    pub fn close_from_sink(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn emit(&self, event: PlayerEvent) {
        if self.is_closed() {
            return;
        }
        // Held across delivery so close() cannot return mid-emission
        let sinks = self.sinks.lock();
        for sink in sinks.iter() {
            if self.is_closed() {
                return;
            }
            sink.on_event(event.clone());
        }
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Collect {
        events: Mutex<Vec<PlayerEvent>>,
    }

    impl EventSink for Collect {
        fn on_event(&self, event: PlayerEvent) {
            self.events.lock().push(event);
        }
    }

    #[test]
    fn test_emit_to_all_sinks() {
        let emitter = EventEmitter::new();
        let a = Arc::new(Collect::default());
        let b = Arc::new(Collect::default());
        emitter.add_sink(a.clone());
        emitter.add_sink(b.clone());

        emitter.emit(PlayerEvent::Ready);
        emitter.emit(PlayerEvent::PositionChanged { position_ms: 40 });

        assert_eq!(a.events.lock().len(), 2);
        assert_eq!(*b.events.lock(), *a.events.lock());
    }

    #[test]
    fn test_no_events_after_close() {
        let emitter = EventEmitter::new();
        let sink = Arc::new(Collect::default());
        emitter.add_sink(sink.clone());
        emitter.close();

        emitter.emit(PlayerEvent::Ended);
        emitter.add_sink(sink.clone());
        emitter.emit(PlayerEvent::Ended);

        assert!(emitter.is_closed());
        assert!(sink.events.lock().is_empty());
    }

    #[test]
    fn test_closure_sink() {
        let emitter = EventEmitter::new();
        let seen = Arc::new(Mutex::new(0));
        let counter = seen.clone();
        emitter.add_sink(Arc::new(move |_event: PlayerEvent| *counter.lock() += 1));
        emitter.emit(PlayerEvent::Ready);
        assert_eq!(*seen.lock(), 1);
    }

    #[test]
    fn test_close_from_inside_a_sink() {
        let emitter = Arc::new(EventEmitter::new());
        let closer = emitter.clone();
        emitter.add_sink(Arc::new(move |event: PlayerEvent| {
            if event == PlayerEvent::Ready {
                closer.close_from_sink();
            }
        }));
        let after = Arc::new(Collect::default());
        emitter.add_sink(after.clone());

        emitter.emit(PlayerEvent::Ended);
        emitter.emit(PlayerEvent::Ready);
        emitter.emit(PlayerEvent::Ended);

        assert!(emitter.is_closed());
        assert_eq!(*after.events.lock(), vec![PlayerEvent::Ended]);

        // A later close still completes once emission has stopped
        emitter.close();
    }
}
