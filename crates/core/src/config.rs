// Engine configuration

use serde::Deserialize;
use std::time::Duration;

/// Position sampling period (milliseconds)
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 8;

/// Fastest playback rate accepted by `setPlaybackSpeed`
pub const DEFAULT_MAX_PLAYBACK_SPEED: f64 = 16.0;

pub const DEFAULT_THREAD_NAME: &str = "nvp-engine";

/// Tunables for one engine instance
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Period of the position sampler in milliseconds
    pub sample_interval_ms: u64,
    /// Upper bound for playback speed; the lower bound is exclusive zero
    pub max_playback_speed: f64,
    /// Name of the engine thread
    pub thread_name: String,
}

impl EngineConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms.max(1))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            max_playback_speed: DEFAULT_MAX_PLAYBACK_SPEED,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.sample_interval(), Duration::from_millis(8));
        assert_eq!(config.max_playback_speed, 16.0);
    }

    #[test]
    fn test_zero_interval_is_floored() {
        let config = EngineConfig {
            sample_interval_ms: 0,
            ..EngineConfig::default()
        };
        assert_eq!(config.sample_interval(), Duration::from_millis(1));
    }
}
