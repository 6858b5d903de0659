// Method-channel wire format

use nvp_core::{Command, PlayerError, Response, Result, VideoSource};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One inbound call on a view's method channel
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

/// Result of a call, as sent back over the channel
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Reply {
    Success { result: Value },
    Error { code: String, message: String },
}

impl Reply {
    pub fn from_result(result: Result<Response>) -> Self {
        match result {
            Ok(response) => Reply::Success {
                result: encode_response(response),
            },
            Err(err) => Reply::from_error(&err),
        }
    }

    pub fn from_error(err: &PlayerError) -> Self {
        Reply::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Reply::Success { .. })
    }
}

fn invalid(method: &str, detail: impl std::fmt::Display) -> PlayerError {
    PlayerError::invalid_argument(format!("Invalid arguments for {}: {}", method, detail))
}

/// Turn a method call into an engine command. Argument shape is checked
/// here, before anything reaches the engine.
pub fn decode_call(call: &MethodCall) -> Result<Command> {
    let method = call.method.as_str();
    let args = &call.arguments;

    let command = match method {
        "loadVideoSource" => {
            if !args.is_object() {
                return Err(invalid(method, "expected a video source map"));
            }
            let source: VideoSource =
                serde_json::from_value(args.clone()).map_err(|e| invalid(method, e))?;
            Command::Load(source)
        }
        "getVideoInfo" => Command::GetInfo,
        "getPlaybackPosition" => Command::GetPosition,
        "getState" => Command::GetState,
        "play" => Command::Play,
        "pause" => Command::Pause,
        "stop" => Command::Stop,
        "isPlaying" => Command::IsPlaying,
        "seekTo" => {
            let position = args
                .as_i64()
                .ok_or_else(|| invalid(method, format!("expected an integer position, got {}", args)))?;
            Command::Seek(position)
        }
        "setPlaybackSpeed" => {
            let speed = args
                .as_f64()
                .ok_or_else(|| invalid(method, format!("expected a number, got {}", args)))?;
            Command::SetSpeed(speed)
        }
        "setVolume" => {
            let volume = args
                .as_f64()
                .ok_or_else(|| invalid(method, format!("expected a number, got {}", args)))?;
            Command::SetVolume(volume)
        }
        "setLoop" => {
            let looping = args
                .as_bool()
                .ok_or_else(|| invalid(method, format!("expected a boolean, got {}", args)))?;
            Command::SetLoop(looping)
        }
        other => return Err(PlayerError::UnknownCommand(other.to_string())),
    };
    Ok(command)
}

pub fn encode_response(response: Response) -> Value {
    match response {
        Response::Done => Value::Null,
        Response::Info(info) => json!({
            "height": info.height,
            "width": info.width,
            "duration": info.duration,
        }),
        Response::Position(position_ms) => json!(position_ms),
        Response::Playing(playing) => json!(playing),
        Response::State(state) => json!(state.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nvp_core::{PlaybackState, SourceType, VideoInfo};

    fn decode(method: &str, arguments: Value) -> Result<Command> {
        decode_call(&MethodCall::new(method, arguments))
    }

    #[test]
    fn test_decode_load() {
        let command = decode(
            "loadVideoSource",
            json!({
                "type": "network",
                "path": "https://example.com/v.mp4",
                "headers": {"Authorization": "Bearer t"}
            }),
        )
        .unwrap();
        match command {
            Command::Load(source) => {
                assert_eq!(source.source_type(), SourceType::Network);
                assert_eq!(source.headers().get("Authorization").map(String::as_str), Some("Bearer t"));
            }
            other => panic!("unexpected {:?}", other),
        }

        let command = decode("loadVideoSource", json!({"type": "asset", "path": "clips/a.mp4"})).unwrap();
        assert_eq!(command, Command::Load(VideoSource::asset("clips/a.mp4")));
    }

    #[test]
    fn test_decode_load_rejects_bad_maps() {
        for args in [
            json!(null),
            json!("https://example.com/v.mp4"),
            json!({"path": "a.mp4"}),
            json!({"type": "stream", "path": "a.mp4"}),
            json!({"type": "file", "path": 7}),
        ] {
            let err = decode("loadVideoSource", args.clone()).unwrap_err();
            assert_eq!(err.code(), "invalid_argument", "args {}", args);
        }
    }

    #[test]
    fn test_decode_scalars() {
        assert_eq!(decode("seekTo", json!(1500)).unwrap(), Command::Seek(1500));
        assert_eq!(decode("setPlaybackSpeed", json!(1.5)).unwrap(), Command::SetSpeed(1.5));
        assert_eq!(decode("setPlaybackSpeed", json!(2)).unwrap(), Command::SetSpeed(2.0));
        assert_eq!(decode("setVolume", json!(0.25)).unwrap(), Command::SetVolume(0.25));
        assert_eq!(decode("setLoop", json!(true)).unwrap(), Command::SetLoop(true));
        assert_eq!(decode("play", Value::Null).unwrap(), Command::Play);
    }

    #[test]
    fn test_decode_wrong_types() {
        for (method, args) in [
            ("seekTo", json!("10")),
            ("seekTo", json!(1.5)),
            ("seekTo", Value::Null),
            ("setPlaybackSpeed", json!("fast")),
            ("setVolume", json!(true)),
            ("setLoop", json!(1)),
        ] {
            let err = decode(method, args).unwrap_err();
            assert!(matches!(err, PlayerError::InvalidArgument(_)), "{} -> {:?}", method, err);
        }
    }

    #[test]
    fn test_unknown_method() {
        let err = decode("enterPictureInPicture", Value::Null).unwrap_err();
        assert_eq!(err.code(), "not_implemented");
    }

    #[test]
    fn test_method_call_from_json() {
        let call: MethodCall = serde_json::from_str(r#"{"method":"pause"}"#).unwrap();
        assert_eq!(call.arguments, Value::Null);
        assert_eq!(decode_call(&call).unwrap(), Command::Pause);
    }

    #[test]
    fn test_encode_replies() {
        let info = VideoInfo {
            height: 720,
            width: 1280,
            duration: 9000,
        };
        assert_eq!(
            Reply::from_result(Ok(Response::Info(info))),
            Reply::Success {
                result: json!({"height": 720, "width": 1280, "duration": 9000})
            }
        );
        assert_eq!(
            encode_response(Response::State(PlaybackState::Paused)),
            json!("paused")
        );

        let reply = Reply::from_result(Err(PlayerError::not_ready("no source")));
        let wire = serde_json::to_value(&reply).unwrap();
        assert_eq!(wire["status"], "error");
        assert_eq!(wire["code"], "not_ready");
        assert!(!reply.is_success());
    }
}
