//! Haptic clip playback core
//!
//! Loads versioned `.haptic` clips, processes their amplitude and frequency
//! envelopes and plays them back through pluggable player backends,
//! independent of the platform attached. The C and JNI interfaces in `ffi`
//! expose the `HapticsController` façade to the platform SDK layers.

pub mod config;
pub mod controller;
pub mod datamodel;
pub mod error;
pub mod ffi;
pub mod players;
pub mod utils;

pub use controller::HapticsController;
pub use datamodel::VersionSupport;
pub use error::{ErrorCode, HapticsError};

use std::sync::Once;

static LOGGING_ONCE: Once = Once::new();

/// Initializes logging when called for the first time, later calls are
/// no-ops.
///
/// This makes sure all calls to log::error!() and tracing events end up
/// visible to the developer. Note that stdout and stderr are not captured on
/// all platforms, which is why this goes through the logging stack instead
/// of println!() or eprintln!(): on Android the events are forwarded to
/// logcat.
pub fn init_logging() {
    LOGGING_ONCE.call_once(|| {
        #[cfg(not(target_os = "android"))]
        {
            // A host application may have installed a subscriber already, in
            // which case this fails and its subscriber stays active
            let _ = tracing_subscriber::fmt().try_init();
        }

        #[cfg(target_os = "android")]
        {
            use tracing_subscriber::layer::SubscriberExt;
            match tracing_android::layer("haptics-core") {
                Ok(layer) => {
                    let subscriber = tracing_subscriber::registry().with(layer);
                    if tracing::subscriber::set_global_default(subscriber).is_err() {
                        log::warn!("Logging was already initialized");
                    }
                }
                Err(err) => eprintln!("haptics-core: initializing logging failed: {}", err),
            }
        }
    });
}
