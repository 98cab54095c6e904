// Error types for the haptics playback core
//
// This module defines the error type shared by the datamodel, the players
// and the controller, providing structured error handling with stable error
// codes suitable for FFI communication.

use log::error;
use std::fmt;

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from error types, enabling consistent error handling across the FFI
/// boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

/// Error code constants exposed through the C API
///
/// Error code range: 2001-2006
pub struct HapticsErrorCodes {}

impl HapticsErrorCodes {
    /// Clip JSON failed to deserialize or validate
    pub const INVALID_CLIP: i32 = 2001;

    /// Clip major version is not known to this library
    pub const UNSUPPORTED_VERSION: i32 = 2002;

    /// A transport operation was called without a loaded clip
    pub const NO_CLIP_LOADED: i32 = 2003;

    /// A playback parameter was out of range
    pub const INVALID_PARAMETER: i32 = 2004;

    /// A driver callback reported a failure
    pub const CALLBACK_FAILED: i32 = 2005;

    /// The playback thread could not be started or reached
    pub const THREAD_FAILURE: i32 = 2006;
}

/// Errors reported by clip loading and playback
#[derive(Debug, Clone, PartialEq)]
pub enum HapticsError {
    /// Clip JSON failed to deserialize or validate
    InvalidClip { reason: String },

    /// Clip major version is not known to this library
    UnsupportedVersion,

    /// A transport operation was called without a loaded clip
    NoClipLoaded { operation: String },

    /// A playback parameter was out of range
    InvalidParameter { name: String, value: f32 },

    /// A driver callback reported a failure
    CallbackFailed { reason: String },

    /// The playback thread could not be started or reached
    ThreadFailure { reason: String },
}

impl HapticsError {
    /// Shorthand for the "operation without a loaded clip" case, with the
    /// message format the player backends use.
    pub fn no_clip(operation: &str) -> Self {
        HapticsError::NoClipLoaded {
            operation: operation.to_string(),
        }
    }
}

impl ErrorCode for HapticsError {
    fn code(&self) -> i32 {
        match self {
            HapticsError::InvalidClip { .. } => HapticsErrorCodes::INVALID_CLIP,
            HapticsError::UnsupportedVersion => HapticsErrorCodes::UNSUPPORTED_VERSION,
            HapticsError::NoClipLoaded { .. } => HapticsErrorCodes::NO_CLIP_LOADED,
            HapticsError::InvalidParameter { .. } => HapticsErrorCodes::INVALID_PARAMETER,
            HapticsError::CallbackFailed { .. } => HapticsErrorCodes::CALLBACK_FAILED,
            HapticsError::ThreadFailure { .. } => HapticsErrorCodes::THREAD_FAILURE,
        }
    }

    fn message(&self) -> String {
        match self {
            HapticsError::InvalidClip { reason } => reason.clone(),
            HapticsError::UnsupportedVersion => "Unsupported version".to_string(),
            HapticsError::NoClipLoaded { operation } => {
                format!("Player {}: no clip loaded", operation)
            }
            HapticsError::InvalidParameter { name, value } => {
                format!("Invalid value for {}: {}", name, value)
            }
            HapticsError::CallbackFailed { reason } => {
                format!("Driver callback failed: {}", reason)
            }
            HapticsError::ThreadFailure { reason } => {
                format!("Playback thread failure: {}", reason)
            }
        }
    }
}

impl fmt::Display for HapticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for HapticsError {}

impl From<String> for HapticsError {
    fn from(reason: String) -> Self {
        if reason == "Unsupported version" {
            HapticsError::UnsupportedVersion
        } else {
            HapticsError::InvalidClip { reason }
        }
    }
}

impl From<serde_json::Error> for HapticsError {
    fn from(err: serde_json::Error) -> Self {
        HapticsError::InvalidClip {
            reason: err.to_string(),
        }
    }
}

#[cfg(target_os = "android")]
impl From<jni::errors::Error> for HapticsError {
    fn from(err: jni::errors::Error) -> Self {
        HapticsError::CallbackFailed {
            reason: err.to_string(),
        }
    }
}

/// Log an error with structured context
///
/// Includes the numeric error code so that platform logs can be correlated
/// with the codes reported over FFI.
pub fn log_haptics_error(err: &HapticsError, context: &str) {
    error!(
        "Haptics error in {}: code={}, message={}",
        context,
        err.code(),
        err.message()
    );
}
