//! Thread-local error storage for the C API
//!
//! C callers can not receive a Rust error value, so the functions of the C
//! API return a status code and cache the details of the last error here.
//! A C-string conversion of the last error's message can be retrieved via
//! get_error_message(), the structured error code via get_last_error_code().

use crate::error::{log_haptics_error, ErrorCode, HapticsError};
use std::{
    cell::RefCell,
    os::raw::{c_char, c_int},
    ptr, slice,
};

pub const SUCCESS: c_int = 0;
pub const ERROR: c_int = -1;

/// The clip version is newer than this library, and therefore some playback
/// features may not work.
pub const PARTIAL_VERSION_SUPPORT: c_int = 1;

struct LastError {
    code: c_int,
    message: String,
}

thread_local! {
    // The last error that was passed into set_error() or set_haptics_error().
    //
    // It's a thread local, so errors on one thread won't be accessible from
    // another: if the error message is important and needs to be logged, it
    // should be accessed on the same thread as it was set.
    static LAST_ERROR: RefCell<Option<LastError>> = const { RefCell::new(None) };
}

// Caches an error message encountered by the C API so that it can be
// inspected further. Used for errors that happen before a HapticsError
// exists, like invalid UTF-8 input.
pub fn set_error(message: String) -> c_int {
    LAST_ERROR.with(|last_error| {
        *last_error.borrow_mut() = Some(LastError { code: 0, message });
    });
    ERROR
}

// Caches a HapticsError together with its structured error code
pub fn set_haptics_error(context: &str, error: &HapticsError) -> c_int {
    log_haptics_error(error, context);
    LAST_ERROR.with(|last_error| {
        *last_error.borrow_mut() = Some(LastError {
            code: error.code(),
            message: format!("{}: \n{}", context, error),
        });
    });
    ERROR
}

// Returns the structured code of the last error, or 0 if there was none
pub fn get_last_error_code() -> c_int {
    LAST_ERROR.with(|last_error| match last_error.borrow().as_ref() {
        Some(error) => error.code,
        None => 0,
    })
}

// Returns the size of the buffer required by get_error_message().
pub fn get_error_message_length() -> c_int {
    LAST_ERROR.with(|last_error| match last_error.borrow().as_ref() {
        // Rust strings aren't null-terminated, so +1 here for the null
        // terminator. String::len() is in bytes, which is correct for UTF-8.
        Some(error) => error.message.len() as c_int + 1,
        None => 0,
    })
}

// Writes a C-string conversion of the last error message to the provided
// buffer.
//
// To ensure that the buffer is large enough, the client can call
// get_error_message_length().
pub unsafe fn get_error_message(buffer: *mut c_char, length: c_int) -> c_int {
    if buffer.is_null() || length <= 0 {
        return ERROR;
    }

    LAST_ERROR.with(|last_error| match last_error.borrow().as_ref() {
        Some(error) => {
            let buffer = slice::from_raw_parts_mut(buffer as *mut u8, length as usize);

            if error.message.len() >= buffer.len() {
                return ERROR;
            }

            ptr::copy_nonoverlapping(
                error.message.as_ptr(),
                buffer.as_mut_ptr(),
                error.message.len(),
            );

            // Rust strings aren't null-terminated, so append a null
            // terminator now
            buffer[error.message.len()] = 0;

            SUCCESS
        }
        None => {
            // There was no error message, return an empty string
            let buffer = slice::from_raw_parts_mut(buffer as *mut u8, length as usize);
            buffer[0] = 0;

            SUCCESS
        }
    })
}
