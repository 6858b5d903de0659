// Backend failure to caller-visible message

use nvp_core::PlayerError;

/// Reported when the backend gives no cause
pub const UNKNOWN_PLAYBACK_ERROR: &str = "Unknown playback error occurred";

/// Message for an asynchronous backend failure.
pub fn failure_message(cause: Option<&str>) -> String {
    match cause.map(str::trim) {
        Some(cause) if !cause.is_empty() => cause.to_string(),
        _ => UNKNOWN_PLAYBACK_ERROR.to_string(),
    }
}

/// Message for a backend method that returned an error synchronously.
pub fn rejection_message(err: &PlayerError) -> String {
    match err {
        PlayerError::Backend(cause) => failure_message(Some(cause)),
        other => failure_message(Some(&other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_cause() {
        assert_eq!(failure_message(None), UNKNOWN_PLAYBACK_ERROR);
        assert_eq!(failure_message(Some("  ")), UNKNOWN_PLAYBACK_ERROR);
    }

    #[test]
    fn test_cause_is_kept() {
        assert_eq!(failure_message(Some("HTTP 404")), "HTTP 404");
    }

    #[test]
    fn test_rejection_unwraps_backend_message() {
        let err = PlayerError::Backend("codec unsupported".into());
        assert_eq!(rejection_message(&err), "codec unsupported");
        let err = PlayerError::Backend(String::new());
        assert_eq!(rejection_message(&err), UNKNOWN_PLAYBACK_ERROR);
    }
}
