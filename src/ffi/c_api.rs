#![cfg(not(target_os = "android"))]

//! The C ABI of the library
//!
//! # Safety
//! All functions taking a `*mut HapticsCoreController` as an argument are unsafe. To be safe,
//! the argument needs to be a valid pointer to a `HapticsController`, created with
//! `haptics_controller_create()`.
//!
//! # Error Handling
//! All public functions return a `c_int` to indicate the error status. This is equal to
//! `ERROR` if the operation failed. In that case, `haptics_get_error_message()` can be
//! called to get additional information about the error, and
//! `haptics_get_last_error_code()` for the structured error code.

use crate::controller::HapticsController;
use crate::datamodel::VersionSupport;
use crate::ffi::errors::{
    get_error_message, get_error_message_length, get_last_error_code, set_error,
    set_haptics_error, PARTIAL_VERSION_SUPPORT, SUCCESS,
};
use crate::players::streaming::{self, AmplitudeEvent, FrequencyEvent};
use std::{
    ffi::c_void,
    os::raw::{c_char, c_float, c_int},
    slice,
};

struct CVoidPtr(*mut c_void);
unsafe impl Send for CVoidPtr {}
unsafe impl Sync for CVoidPtr {}

// Publicly-facing struct wrapping `HapticsController`.
// This allows client code of the C API to maintain a handle to an instance of
// `HapticsController` without gaining access to its implementation.
pub struct HapticsCoreController(HapticsController);

/// A collection of callbacks that the core uses to call back into native driver code
#[repr(C)]
pub struct Callbacks {
    /// Will be called for amplitude events streamed during pre-authored clip playback
    play_streaming_amplitude_event: extern "C" fn(*mut c_void, AmplitudeEvent),

    /// Will be called for frequency events streamed during pre-authored clip playback
    play_streaming_frequency_event: extern "C" fn(*mut c_void, FrequencyEvent),

    /// Will be called once when initializing the streaming thread, should increase the
    /// thread priority
    init_thread: extern "C" fn(),
}

/// Creates and returns a `HapticsCoreController`
///
/// Returns a null pointer on error, and `haptics_get_error_message` can be called to get
/// additional information about the error.
///
/// # Arguments
/// * `native_driver` - a C void pointer to a native driver object that will be passed
///   to all callbacks.
/// * `callbacks` - the function pointers for the callbacks
#[no_mangle]
pub extern "C" fn haptics_controller_create(
    native_driver: *mut c_void,
    callbacks: Callbacks,
) -> *mut HapticsCoreController {
    crate::init_logging();

    let native_driver_for_callback = CVoidPtr(native_driver);
    let play_streaming_amplitude_event_for_callback = callbacks.play_streaming_amplitude_event;
    let play_streaming_amplitude_event = move |event: AmplitudeEvent| {
        // Capture the whole `CVoidPtr` wrapper, not just its `*mut c_void` field,
        // so the closure stays `Send` under edition-2021 disjoint closure capture.
        let native_driver = &native_driver_for_callback;
        play_streaming_amplitude_event_for_callback(native_driver.0, event);
    };

    let native_driver_for_callback = CVoidPtr(native_driver);
    let play_streaming_frequency_event_for_callback = callbacks.play_streaming_frequency_event;
    let play_streaming_frequency_event = move |event: FrequencyEvent| {
        let native_driver = &native_driver_for_callback;
        play_streaming_frequency_event_for_callback(native_driver.0, event);
    };

    let init_thread_for_callback = callbacks.init_thread;
    let init_thread = move || {
        init_thread_for_callback();
    };

    let player = streaming::Player::new(streaming::Callbacks {
        amplitude_event: Box::new(play_streaming_amplitude_event),
        frequency_event: Box::new(play_streaming_frequency_event),
        init_thread: Box::new(init_thread),
    });
    let player = match player {
        Ok(player) => player,
        Err(err) => {
            set_haptics_error("Unable to create clip player", &err);
            return std::ptr::null_mut();
        }
    };

    let haptics_controller = HapticsController::new(Box::new(player));
    Box::into_raw(Box::new(HapticsCoreController(haptics_controller)))
}

/// Deallocates a `HapticsCoreController`.
#[no_mangle]
pub unsafe extern "C" fn haptics_controller_destroy(
    controller: *mut HapticsCoreController,
) -> c_int {
    if !controller.is_null() {
        drop(Box::from_raw(controller));
        SUCCESS
    } else {
        set_error("Error destroying controller: \nController is null".to_string())
    }
}

/// Loads a haptic clip.
///
/// In addition to `ERROR`, `PARTIAL_VERSION_SUPPORT` can be returned.
///
/// The caller keeps ownership of `data` and is responsible for freeing the buffer.
///
/// # Arguments
/// * `data` - The JSON of the .haptic file, encoded as UTF-8, without a null terminator
/// * `data_size_bytes` - The amount of bytes in `data`
///
/// # Safety
/// - `data` needs to be a valid pointer to an array of bytes at least `data_size_bytes`
///   bytes large
#[no_mangle]
pub unsafe extern "C" fn haptics_controller_load(
    controller: &mut HapticsCoreController,
    data: *const c_char,
    data_size_bytes: usize,
) -> c_int {
    let data = slice::from_raw_parts(data as *const u8, data_size_bytes);
    let data = match std::str::from_utf8(data) {
        Ok(data) => data,
        Err(err) => return set_error(format!("Haptic data is not valid UTF-8: {}", err)),
    };

    match controller.0.load(data) {
        Ok(VersionSupport::Full) => SUCCESS,
        Ok(VersionSupport::Partial) => PARTIAL_VERSION_SUPPORT,
        Err(error) => set_haptics_error("Error loading haptic data", &error),
    }
}

/// Plays a haptic clip.
#[no_mangle]
pub unsafe extern "C" fn haptics_controller_play(controller: &mut HapticsCoreController) -> c_int {
    match controller.0.play() {
        Ok(_) => SUCCESS,
        Err(error) => set_haptics_error("Error playing haptic clip", &error),
    }
}

/// Stops a previously played haptic clip.
#[no_mangle]
pub unsafe extern "C" fn haptics_controller_stop(controller: &mut HapticsCoreController) -> c_int {
    match controller.0.stop() {
        Ok(_) => SUCCESS,
        Err(error) => set_haptics_error("Error stopping haptic clip", &error),
    }
}

/// Jumps to a position in the haptic clip.
///
/// # Arguments
/// * `time` - the new position within the clip, as seconds from the beginning of the clip
#[no_mangle]
pub unsafe extern "C" fn haptics_controller_seek(
    controller: &mut HapticsCoreController,
    time: f32,
) -> c_int {
    match controller.0.seek(time) {
        Ok(_) => SUCCESS,
        Err(error) => set_haptics_error(
            &format!("Error seeking to position {:.3}s in haptic clip", time),
            &error,
        ),
    }
}

/// Sets the amplitude multiplication for a haptic clip.
///
/// # Arguments
/// * `amplitude_multiplication` - the new multiplication factor
#[no_mangle]
pub unsafe extern "C" fn haptics_controller_set_amplitude_multiplication(
    controller: &mut HapticsCoreController,
    amplitude_multiplication: f32,
) -> c_int {
    match controller
        .0
        .set_amplitude_multiplication(amplitude_multiplication)
    {
        Ok(_) => SUCCESS,
        Err(error) => set_haptics_error(
            &format!(
                "Error setting amplitude multiplication to {:.2}",
                amplitude_multiplication
            ),
            &error,
        ),
    }
}

/// Sets the frequency shift for a haptic clip.
///
/// # Arguments
/// * `shift` - the new frequency shift
#[no_mangle]
pub unsafe extern "C" fn haptics_controller_set_frequency_shift(
    controller: &mut HapticsCoreController,
    shift: f32,
) -> c_int {
    match controller.0.set_frequency_shift(shift) {
        Ok(_) => SUCCESS,
        Err(error) => set_haptics_error(
            &format!("Error setting frequency shift to {:.2}", shift),
            &error,
        ),
    }
}

/// Sets the playback to repeat from the start when it reaches the end of a clip.
///
/// # Arguments
/// * `enabled` - Setting `enabled` to true enables looping; `false` sets the clip to be
///   played only once
#[no_mangle]
pub unsafe extern "C" fn haptics_controller_loop(
    controller: &mut HapticsCoreController,
    enabled: bool,
) -> c_int {
    match controller.0.set_looping(enabled) {
        Ok(_) => SUCCESS,
        Err(error) => set_haptics_error("Error enabling loop for haptic clip", &error),
    }
}

/// Returns the duration of the loaded clip
///
/// It will return 0.0 in case the clip is not loaded
#[no_mangle]
pub unsafe extern "C" fn haptics_controller_get_clip_duration(
    controller: &mut HapticsCoreController,
) -> c_float {
    controller.0.get_clip_duration()
}

/// Returns the structured error code of the last error, or 0 if there was no
/// error yet.
#[no_mangle]
pub extern "C" fn haptics_get_last_error_code() -> c_int {
    get_last_error_code()
}

/// Returns the length of the last error message in bytes, or 0 if there is no last
/// error message.
///
/// `haptics_get_error_message` expects to receive a pre-allocated buffer of adequate size
/// for the error message; this function provides the expected size.
///
/// The calculated length includes a null-terminator.
#[no_mangle]
pub extern "C" fn haptics_get_error_message_length() -> c_int {
    get_error_message_length()
}

/// Writes the error message to the buffer that the client passes in.
///
/// An error will cause ERROR to be returned.
///
/// # Safety
/// The client can ensure that the `buffer` is large enough by calling
/// haptics_get_error_message_length(). The string data returned will be null-terminated
/// and in UTF-8 format.
#[no_mangle]
pub unsafe extern "C" fn haptics_get_error_message(buffer: *mut c_char, length: c_int) -> c_int {
    get_error_message(buffer, length)
}
