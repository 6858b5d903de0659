// Command dispatch and backend callback handling on the engine thread

use crate::completion::{Responder, SeekTracker, Submitted};
use crate::sampler::PositionSampler;
use crate::translate;
use nvp_core::command::require_finite;
use nvp_core::{
    source, BackendEvent, BackendListener, BackendSink, Command, EngineConfig, EventEmitter,
    NativePlayerBackend, PlaybackState, PlayerError, PlayerEvent, Response, Result, SeekToken,
    StateMachine, VideoInfo,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Everything the engine thread owns.
///
/// Callers and backend callbacks reach it only through the engine's
/// message queue, which is the single serialization point for state.
pub(crate) struct Engine {
    backend: Box<dyn NativePlayerBackend>,
    machine: StateMachine,
    seeks: SeekTracker,
    sampler: PositionSampler,
    emitter: Arc<EventEmitter>,
    listener: Arc<dyn BackendListener>,
    generation: u64,
    config: EngineConfig,
    /// A loop restart is in flight; further end-of-stream reports are echoes
    loop_restart_pending: bool,
    disposed: bool,
}

impl Engine {
    pub fn new(
        backend: Box<dyn NativePlayerBackend>,
        emitter: Arc<EventEmitter>,
        listener: Arc<dyn BackendListener>,
        config: EngineConfig,
    ) -> Self {
        Self {
            backend,
            machine: StateMachine::new(),
            seeks: SeekTracker::new(),
            sampler: PositionSampler::new(config.sample_interval()),
            emitter,
            listener,
            generation: 0,
            config,
            loop_restart_pending: false,
            disposed: false,
        }
    }

    pub fn time_until_tick(&self, now: Instant) -> Option<Duration> {
        self.sampler.time_until_tick(now)
    }

    // -------------------------------------------------------------------------
    // Commands
    // -------------------------------------------------------------------------

    pub fn handle_command(&mut self, command: Command, responder: Responder) {
        if self.disposed {
            responder(Err(PlayerError::Disposed));
            return;
        }
        log::debug!("[engine] command {:?} in {:?}", command, self.machine.state());

        match command {
            Command::Stop => self.stop(responder),
            Command::Seek(position_ms) => self.seek(position_ms, responder),
            other => {
                let name = other.name();
                let result = self.execute(other);
                if let Err(err) = &result {
                    log::warn!("[engine] {} rejected: {}", name, err);
                }
                responder(result);
            }
        }
    }

    fn execute(&mut self, command: Command) -> Result<Response> {
        match command {
            Command::Load(video_source) => {
                let request = source::resolve(&video_source)?;
                self.load(request)?;
            }
            Command::Play => self.play()?,
            Command::Pause => self.pause()?,
            Command::SetSpeed(speed) => {
                let speed = require_finite("Playback speed", speed)?;
                if speed <= 0.0 || speed > self.config.max_playback_speed {
                    return Err(PlayerError::invalid_argument(format!(
                        "Playback speed must be in (0, {}], got {}",
                        self.config.max_playback_speed, speed
                    )));
                }
                self.backend
                    .set_playback_speed(speed)
                    .map_err(|e| self.reject(&e))?;
            }
            Command::SetVolume(volume) => {
                let volume = require_finite("Volume", volume)?;
                if !(0.0..=1.0).contains(&volume) {
                    return Err(PlayerError::invalid_argument(format!(
                        "Volume must be in [0, 1], got {}",
                        volume
                    )));
                }
                self.backend.set_volume(volume).map_err(|e| self.reject(&e))?;
            }
            Command::SetLoop(looping) => {
                log::info!("[engine] loop {}", if looping { "on" } else { "off" });
                self.machine.set_looping(looping);
            }
            Command::GetInfo => {
                self.machine.require_ready_source("getVideoInfo")?;
                return Ok(Response::Info(self.video_info()));
            }
            Command::GetPosition => {
                self.machine.require_ready_source("getPlaybackPosition")?;
                return Ok(Response::Position(self.backend.position_ms()));
            }
            Command::IsPlaying => {
                self.machine.require_ready_source("isPlaying")?;
                return Ok(Response::Playing(self.backend.is_playing()));
            }
            Command::GetState => return Ok(Response::State(self.machine.state())),
            Command::Stop | Command::Seek(_) => {
                return Err(PlayerError::invalid_argument("stop/seek need a deferred responder"))
            }
        }
        Ok(Response::Done)
    }

    fn load(&mut self, request: source::LoadRequest) -> Result<()> {
        // Old sampler and pending seeks belong to the superseded source
        self.sampler.cancel();
        self.loop_restart_pending = false;
        for responder in self.seeks.drain() {
            responder(Err(PlayerError::Cancelled("video source replaced".into())));
        }

        self.generation += 1;
        self.set_state(PlaybackState::Loading);
        log::info!(
            "[engine] loading {} (generation {})",
            request.location(),
            self.generation
        );

        let sink = BackendSink::new(self.generation, self.listener.clone());
        self.backend.load(&request, sink).map_err(|e| self.reject(&e))
    }

    fn play(&mut self) -> Result<()> {
        let state = self.machine.state();
        match state {
            PlaybackState::Playing => return Ok(()),
            PlaybackState::Ready | PlaybackState::Paused | PlaybackState::Ended => {}
            _ => {
                return Err(PlayerError::not_ready(format!(
                    "Cannot play from state {}",
                    state.as_str()
                )))
            }
        }

        // Replaying after Ended only rewinds if nothing moved the position
        let duration = self.video_info().duration;
        let at_end = duration > 0 && self.backend.position_ms() >= duration;
        if at_end {
            log::info!("[engine] replay from start");
            self.request_seek(0, None);
            if self.machine.state() == PlaybackState::Errored {
                return Err(PlayerError::Backend("rewind before replay failed".into()));
            }
        }

        self.backend.play().map_err(|e| self.reject(&e))?;
        self.set_state(PlaybackState::Playing);
        Ok(())
    }

    /// Backend metadata with an unknown duration reported as zero.
    fn video_info(&self) -> VideoInfo {
        let mut info = self.backend.video_info();
        info.duration = info.duration.max(0);
        info
    }

    fn pause(&mut self) -> Result<()> {
        if self.machine.state() != PlaybackState::Playing {
            return Ok(());
        }
        self.backend.pause().map_err(|e| self.reject(&e))?;
        self.set_state(PlaybackState::Paused);
        Ok(())
    }

    fn stop(&mut self, responder: Responder) {
        let state = self.machine.state();
        if let Err(err) = self.require_seekable(state, "stop") {
            responder(Err(err));
            return;
        }

        if let Err(e) = self.backend.pause() {
            let err = self.reject(&e);
            responder(Err(err));
            return;
        }
        if matches!(
            state,
            PlaybackState::Playing | PlaybackState::Paused | PlaybackState::Ended
        ) {
            self.set_state(PlaybackState::Ready);
        }
        log::info!("[engine] stop: rewinding");
        self.request_seek(0, Some(responder));
    }

    fn seek(&mut self, position_ms: i64, responder: Responder) {
        let state = self.machine.state();
        if let Err(err) = self.require_seekable(state, "seekTo") {
            responder(Err(err));
            return;
        }
        log::info!("[engine] seek to {} ms", position_ms);
        self.request_seek(position_ms, Some(responder));
    }

    fn require_seekable(&self, state: PlaybackState, operation: &str) -> Result<()> {
        match state {
            PlaybackState::Idle | PlaybackState::Errored => Err(PlayerError::not_ready(format!(
                "{} needs a loaded source (state: {})",
                operation,
                state.as_str()
            ))),
            _ => Ok(()),
        }
    }

    /// Send a seek to the backend, or queue it behind the outstanding one.
    fn request_seek(&mut self, position_ms: i64, responder: Option<Responder>) {
        match self.seeks.submit(position_ms, responder) {
            Submitted::Dispatch { token, position_ms } => self.dispatch_seek(token, position_ms),
            Submitted::Queued { superseded } => {
                log::debug!(
                    "[engine] seek to {} ms queued, {} request(s) superseded",
                    position_ms,
                    superseded.len()
                );
                for responder in superseded {
                    responder(Ok(Response::Done));
                }
            }
        }
    }

    fn dispatch_seek(&mut self, token: SeekToken, position_ms: i64) {
        if let Err(e) = self.backend.seek(position_ms, token) {
            // Resolves the waiting request along with everything else
            self.reject(&e);
        }
    }

    // -------------------------------------------------------------------------
    // Backend callbacks
    // -------------------------------------------------------------------------

    pub fn handle_backend_event(&mut self, generation: u64, event: BackendEvent) {
        if self.disposed || generation != self.generation {
            log::debug!(
                "[engine] dropping {:?} from generation {} (current {})",
                event,
                generation,
                self.generation
            );
            return;
        }

        match event {
            BackendEvent::Ready => self.on_ready(),
            BackendEvent::Ended => self.on_end_of_stream(),
            BackendEvent::Error { cause } => {
                self.fail(translate::failure_message(cause.as_deref()));
            }
            BackendEvent::SeekCompleted { token } => self.on_seek_completed(token),
        }
    }

    fn on_ready(&mut self) {
        if self.machine.state() != PlaybackState::Loading {
            log::debug!("[engine] repeated ready in {:?} ignored", self.machine.state());
            return;
        }
        self.set_state(PlaybackState::Ready);
        log::info!("[engine] source ready: {:?}", self.video_info());
        self.emitter.emit(PlayerEvent::Ready);
        self.sampler.start(Instant::now());
    }

    fn on_end_of_stream(&mut self) {
        match self.machine.state() {
            PlaybackState::Playing if self.machine.is_looping() => {
                if self.loop_restart_pending {
                    log::debug!("[engine] end of stream while restarting loop ignored");
                    return;
                }
                log::info!("[engine] end of stream, looping");
                self.loop_restart_pending = true;
                self.request_seek(0, None);
                if self.machine.state() == PlaybackState::Errored {
                    return;
                }
                if let Err(e) = self.backend.play() {
                    self.reject(&e);
                }
            }
            PlaybackState::Playing | PlaybackState::Paused | PlaybackState::Ready => {
                log::info!("[engine] end of stream");
                self.set_state(PlaybackState::Ended);
                self.emitter.emit(PlayerEvent::Ended);
            }
            other => log::debug!("[engine] end of stream in {:?} ignored", other),
        }
    }

    fn on_seek_completed(&mut self, token: SeekToken) {
        match self.seeks.acknowledge(token) {
            Some(ack) => {
                log::debug!("[engine] {} acknowledged", token);
                if let Some(responder) = ack.responder {
                    responder(Ok(Response::Done));
                }
                match ack.next {
                    Some((next_token, position_ms)) => self.dispatch_seek(next_token, position_ms),
                    None => self.loop_restart_pending = false,
                }
            }
            None => log::debug!("[engine] stale acknowledgement {} dropped", token),
        }
    }

    // -------------------------------------------------------------------------
    // Sampling, failure, teardown
    // -------------------------------------------------------------------------

    /// Run the position sampler if a tick is due.
    pub fn tick(&mut self, now: Instant) {
        if self.disposed {
            return;
        }
        let backend = &self.backend;
        if let Some(position_ms) = self.sampler.poll(now, || backend.position_ms()) {
            log::trace!("[sampler] position {} ms", position_ms);
            self.emitter.emit(PlayerEvent::PositionChanged { position_ms });
        }
    }

    /// Synchronous backend rejection: same handling as an asynchronous error.
    fn reject(&mut self, err: &PlayerError) -> PlayerError {
        let message = translate::rejection_message(err);
        self.fail(message.clone());
        PlayerError::Backend(message)
    }

    fn fail(&mut self, message: String) {
        log::error!("[engine] backend failure: {}", message);
        self.sampler.cancel();
        self.loop_restart_pending = false;
        for responder in self.seeks.drain() {
            responder(Err(PlayerError::Backend(message.clone())));
        }
        self.set_state(PlaybackState::Errored);
        self.emitter.emit(PlayerEvent::Error { message });
    }

    fn set_state(&mut self, to: PlaybackState) {
        match self.machine.transition(to) {
            Ok(Some(t)) => self.emitter.emit(PlayerEvent::StateChanged {
                old_state: t.old,
                new_state: t.new,
            }),
            Ok(None) => {}
            Err(err) => log::warn!("[engine] {}", err),
        }
    }

    /// Tear down in order: sampler, backend subscription, backend.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        log::info!("[engine] disposing");
        self.disposed = true;
        self.emitter.close();

        self.sampler.cancel();
        // Sinks still held anywhere now carry a stale generation
        self.generation += 1;
        self.backend.detach();
        self.backend.release();

        for responder in self.seeks.drain() {
            responder(Err(PlayerError::Cancelled("player disposed".into())));
        }
        log::info!("[engine] disposed");
    }
}
