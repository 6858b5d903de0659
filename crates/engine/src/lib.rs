// Playback control engine
// Serializes caller commands, backend callbacks and position sampling on one engine thread

mod completion;
mod dispatcher;
pub mod player;
mod sampler;
pub mod translate;

// Re-exports
pub use completion::{Completion, Responder};
pub use player::Player;

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Install the platform logger. Safe to call more than once.
pub fn init_logging() {
    INIT_LOGGER.call_once(|| {
        #[cfg(target_os = "android")]
        {
            android_logger::init_once(
                android_logger::Config::default()
                    .with_max_level(log::LevelFilter::Debug)
                    .with_tag("NativeVideoPlayer"),
            );
        }

        #[cfg(not(target_os = "android"))]
        {
            // RUST_LOG overrides the default level
            let _ = env_logger::builder()
                .is_test(false)
                .filter_level(log::LevelFilter::Info)
                .parse_default_env()
                .try_init();
        }
    });
}
