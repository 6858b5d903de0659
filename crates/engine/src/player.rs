// Caller-facing player handle and the engine thread

use crate::completion::{self, Completion, Responder};
use crate::dispatcher::Engine;
use nvp_core::{
    BackendEvent, BackendListener, Command, EngineConfig, EventEmitter, EventSink,
    NativePlayerBackend, PlaybackState, PlayerError, Response, Result, VideoInfo, VideoSource,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

enum Message {
    Command(Command, Responder),
    Backend { generation: u64, event: BackendEvent },
    Dispose,
}

/// Forwards backend callbacks onto the engine queue, from any thread.
struct QueueListener {
    tx: Sender<Message>,
}

impl BackendListener for QueueListener {
    fn on_backend_event(&self, generation: u64, event: BackendEvent) {
        if self.tx.send(Message::Backend { generation, event }).is_err() {
            log::debug!("[engine] backend callback after shutdown dropped");
        }
    }
}

/// Handle on one playback engine.
///
/// Commands are processed one at a time on a dedicated engine thread, in
/// the order they are issued. Backend callbacks and the position sampler
/// share that thread, so state never changes under a running command.
pub struct Player {
    tx: Sender<Message>,
    emitter: Arc<EventEmitter>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
    disposed: AtomicBool,
}

impl Player {
    pub fn new(backend: Box<dyn NativePlayerBackend>) -> Result<Self> {
        Self::with_config(backend, EngineConfig::default())
    }

    pub fn with_config(backend: Box<dyn NativePlayerBackend>, config: EngineConfig) -> Result<Self> {
        crate::init_logging();

        let (tx, rx) = mpsc::channel();
        let emitter = Arc::new(EventEmitter::new());
        let listener: Arc<dyn BackendListener> = Arc::new(QueueListener { tx: tx.clone() });

        let thread_name = config.thread_name.clone();
        let engine = Engine::new(backend, emitter.clone(), listener, config);
        let handle = thread::Builder::new()
            .name(thread_name)
            .spawn(move || run(engine, rx))
            .map_err(|e| PlayerError::Backend(format!("Failed to start engine thread: {}", e)))?;

        log::info!("[engine] player created");
        Ok(Self {
            tx,
            emitter,
            worker: Mutex::new(Some(handle)),
            disposed: AtomicBool::new(false),
        })
    }

    /// Register an event receiver. Sinks run on the engine thread.
    pub fn add_event_sink(&self, sink: Arc<dyn EventSink>) {
        self.emitter.add_sink(sink);
    }

    /// Submit a command without blocking. `responder` is called exactly
    /// once, on the engine thread, or right away if the engine is gone.
    pub fn dispatch(&self, command: Command, responder: Responder) {
        if self.is_disposed() {
            responder(Err(PlayerError::Disposed));
            return;
        }
        if let Err(mpsc::SendError(message)) = self.tx.send(Message::Command(command, responder)) {
            if let Message::Command(_, responder) = message {
                responder(Err(PlayerError::Disposed));
            }
        }
    }

    fn request(&self, command: Command) -> Result<Response> {
        let (responder, reply) = completion::response_channel();
        self.dispatch(command, responder);
        reply.wait()
    }

    fn deferred(&self, command: Command) -> Completion {
        let (responder, reply) = completion::response_channel();
        self.dispatch(command, responder);
        Completion::new(reply)
    }

    /// Start loading a source. Readiness arrives later as `PlayerEvent::Ready`.
    pub fn load(&self, source: VideoSource) -> Result<()> {
        self.request(Command::Load(source)).map(|_| ())
    }

    pub fn play(&self) -> Result<()> {
        self.request(Command::Play).map(|_| ())
    }

    pub fn pause(&self) -> Result<()> {
        self.request(Command::Pause).map(|_| ())
    }

    /// Pause and rewind to zero. Resolves once the rewind is acknowledged.
    pub fn stop(&self) -> Completion {
        self.deferred(Command::Stop)
    }

    /// Resolves once the backend acknowledges the seek.
    pub fn seek_to(&self, position_ms: i64) -> Completion {
        self.deferred(Command::Seek(position_ms))
    }

    pub fn set_playback_speed(&self, speed: f64) -> Result<()> {
        self.request(Command::SetSpeed(speed)).map(|_| ())
    }

    pub fn set_volume(&self, volume: f64) -> Result<()> {
        self.request(Command::SetVolume(volume)).map(|_| ())
    }

    pub fn set_loop(&self, looping: bool) -> Result<()> {
        self.request(Command::SetLoop(looping)).map(|_| ())
    }

    pub fn video_info(&self) -> Result<VideoInfo> {
        self.request(Command::GetInfo)?.into_info()
    }

    pub fn position(&self) -> Result<i64> {
        self.request(Command::GetPosition)?.into_position()
    }

    pub fn is_playing(&self) -> Result<bool> {
        self.request(Command::IsPlaying)?.into_playing()
    }

    pub fn state(&self) -> Result<PlaybackState> {
        self.request(Command::GetState)?.into_state()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Tear the engine down. No event is delivered once this starts
    /// returning; pending stop/seek requests resolve as cancelled.
    ///
    /// May be called from inside an [`EventSink`]. In that case the
    /// remaining sinks of the current event are skipped and the engine
    /// thread winds down after the sink returns instead of being joined.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        log::info!("[engine] dispose requested");

        let mut worker = self.worker.lock();
        let on_engine_thread = worker
            .as_ref()
            .map_or(false, |handle| handle.thread().id() == thread::current().id());

        if on_engine_thread {
            // The emitter is mid-emission on this very thread
            self.emitter.close_from_sink();
            let _ = self.tx.send(Message::Dispose);
            log::debug!("[engine] dispose called from a sink, not joining");
            return;
        }

        self.emitter.close();
        let _ = self.tx.send(Message::Dispose);
        if let Some(handle) = worker.take() {
            if handle.join().is_err() {
                log::error!("[engine] engine thread panicked");
            }
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn run(mut engine: Engine, rx: Receiver<Message>) {
    log::debug!("[engine] thread started");
    loop {
        let message = match engine.time_until_tick(Instant::now()) {
            Some(wait) => match rx.recv_timeout(wait) {
                Ok(message) => Some(message),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match rx.recv() {
                Ok(message) => Some(message),
                Err(_) => break,
            },
        };

        match message {
            Some(Message::Command(command, responder)) => engine.handle_command(command, responder),
            Some(Message::Backend { generation, event }) => {
                engine.handle_backend_event(generation, event)
            }
            Some(Message::Dispose) => break,
            None => {}
        }

        engine.tick(Instant::now());
    }

    engine.dispose();
    log::debug!("[engine] thread exited");
}
