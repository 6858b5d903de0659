// Error taxonomy for the playback engine

use thiserror::Error;

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Player error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlayerError {
    /// Bad or missing command parameters, rejected before any state change
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A read or transport command was issued before a source became ready
    #[error("Not ready: {0}")]
    NotReady(String),

    /// The native player reported a failure
    #[error("Playback error: {0}")]
    Backend(String),

    /// Method name not understood by the command surface
    #[error("Not implemented: {0}")]
    UnknownCommand(String),

    /// A pending stop/seek was abandoned because its source went away
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// The engine has been disposed
    #[error("Player disposed")]
    Disposed,
}

impl PlayerError {
    /// Stable code reported across the host boundary.
    pub fn code(&self) -> &'static str {
        match self {
            PlayerError::InvalidArgument(_) => "invalid_argument",
            PlayerError::NotReady(_) => "not_ready",
            PlayerError::Backend(_) => "playback_error",
            PlayerError::UnknownCommand(_) => "not_implemented",
            PlayerError::Cancelled(_) => "cancelled",
            PlayerError::Disposed => "disposed",
        }
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        PlayerError::InvalidArgument(msg.into())
    }

    pub fn not_ready(msg: impl Into<String>) -> Self {
        PlayerError::NotReady(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(PlayerError::invalid_argument("x").code(), "invalid_argument");
        assert_eq!(PlayerError::not_ready("x").code(), "not_ready");
        assert_eq!(PlayerError::Backend("x".into()).code(), "playback_error");
        assert_eq!(PlayerError::UnknownCommand("x".into()).code(), "not_implemented");
        assert_eq!(PlayerError::Disposed.code(), "disposed");
    }

    #[test]
    fn test_display_keeps_message() {
        let err = PlayerError::Backend("decoder crashed".into());
        assert_eq!(err.to_string(), "Playback error: decoder crashed");
    }
}
