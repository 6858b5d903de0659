// Engine events to host channel messages

use nvp_core::{EventSink, PlayerEvent};
use serde_json::{json, Value};
use std::sync::Arc;

/// Host side of the channels. Implemented by the embedding transport.
pub trait HostMessenger: Send + Sync {
    /// Invoke `method` on the view's method channel
    fn invoke_method(&self, channel: &str, method: &str, arguments: Value);

    /// Push a value onto the view's status stream
    fn emit_status(&self, channel: &str, status: Value);
}

/// Where an event goes and what it carries
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Method { method: &'static str, arguments: Value },
    Status(Value),
}

pub fn encode_event(event: &PlayerEvent) -> Outbound {
    match event {
        PlayerEvent::Ready => Outbound::Method {
            method: "onPlaybackReady",
            arguments: Value::Null,
        },
        PlayerEvent::Ended => Outbound::Method {
            method: "onPlaybackEnded",
            arguments: Value::Null,
        },
        PlayerEvent::Error { message } => Outbound::Method {
            method: "onError",
            arguments: json!(message),
        },
        PlayerEvent::PositionChanged { position_ms } => Outbound::Method {
            method: "onPlaybackPositionChanged",
            arguments: json!(position_ms),
        },
        PlayerEvent::StateChanged { new_state, .. } => Outbound::Status(json!(new_state.as_str())),
    }
}

/// Event sink that forwards one view's events to the host.
pub(crate) struct ViewEventForwarder {
    api_channel: String,
    event_channel: String,
    messenger: Arc<dyn HostMessenger>,
}

impl ViewEventForwarder {
    pub fn new(view_id: i64, messenger: Arc<dyn HostMessenger>) -> Self {
        Self {
            api_channel: crate::channel_name(view_id),
            event_channel: crate::event_channel_name(view_id),
            messenger,
        }
    }
}

impl EventSink for ViewEventForwarder {
    fn on_event(&self, event: PlayerEvent) {
        match encode_event(&event) {
            Outbound::Method { method, arguments } => {
                self.messenger.invoke_method(&self.api_channel, method, arguments)
            }
            Outbound::Status(status) => self.messenger.emit_status(&self.event_channel, status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nvp_core::PlaybackState;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Captured {
        messages: Mutex<Vec<(String, String, Value)>>,
    }

    impl HostMessenger for Captured {
        fn invoke_method(&self, channel: &str, method: &str, arguments: Value) {
            self.messages
                .lock()
                .push((channel.to_string(), method.to_string(), arguments));
        }

        fn emit_status(&self, channel: &str, status: Value) {
            self.messages
                .lock()
                .push((channel.to_string(), "status".to_string(), status));
        }
    }

    #[test]
    fn test_encode_events() {
        assert_eq!(
            encode_event(&PlayerEvent::PositionChanged { position_ms: 1234 }),
            Outbound::Method {
                method: "onPlaybackPositionChanged",
                arguments: json!(1234)
            }
        );
        assert_eq!(
            encode_event(&PlayerEvent::Error {
                message: "Unknown playback error occurred".into()
            }),
            Outbound::Method {
                method: "onError",
                arguments: json!("Unknown playback error occurred")
            }
        );
    }

    #[test]
    fn test_forwarder_routes_by_channel() {
        let captured = Arc::new(Captured::default());
        let forwarder = ViewEventForwarder::new(7, captured.clone());

        forwarder.on_event(PlayerEvent::Ready);
        forwarder.on_event(PlayerEvent::StateChanged {
            old_state: PlaybackState::Ready,
            new_state: PlaybackState::Playing,
        });

        let messages = captured.messages.lock();
        assert_eq!(
            messages[0],
            (
                "native_video_player/api/7".to_string(),
                "onPlaybackReady".to_string(),
                Value::Null
            )
        );
        assert_eq!(
            messages[1],
            (
                "native_video_player/api/7/event".to_string(),
                "status".to_string(),
                json!("playing")
            )
        );
    }
}
