// Core types and traits for the native video player engine

pub mod backend;
pub mod callback;
pub mod command;
pub mod config;
pub mod error;
pub mod source;
pub mod state;

// Re-export commonly used types
pub use backend::{BackendEvent, BackendListener, BackendSink, NativePlayerBackend, SeekToken, VideoInfo};
pub use callback::{EventEmitter, EventSink, PlayerEvent};
pub use command::{Command, Response};
pub use config::EngineConfig;
pub use error::{PlayerError, Result};
pub use source::{LoadRequest, SourceType, VideoSource};
pub use state::{PlaybackState, StateMachine, Transition};
