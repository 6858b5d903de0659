// Method-channel surface for embedded video views
// Decodes host calls into engine commands and forwards engine events back to the host

pub mod codec;
pub mod events;
pub mod registry;

// Re-exports
pub use codec::{decode_call, encode_response, MethodCall, Reply};
pub use events::{encode_event, HostMessenger, Outbound};
pub use registry::ViewRegistry;

const CHANNEL_PREFIX: &str = "native_video_player/api";

/// Method channel of one view
pub fn channel_name(view_id: i64) -> String {
    format!("{}/{}", CHANNEL_PREFIX, view_id)
}

/// Status stream of one view
pub fn event_channel_name(view_id: i64) -> String {
    format!("{}/event", channel_name(view_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_names() {
        assert_eq!(channel_name(42), "native_video_player/api/42");
        assert_eq!(event_channel_name(42), "native_video_player/api/42/event");
    }
}
