#![cfg(target_os = "android")]

//! JNI bindings for the Android SDK layer
//!
//! # `xyz_inner()` methods
//!
//! This file contains some `xyz_inner()` methods. The purpose of these is to simplify
//! error handling. Within the `xyz_inner()` methods, the questionmark operator can be
//! used, as the `xyz_inner()` methods all return `Result<_, HapticsError>`. Using the
//! questionmark operator is not possible in the outer methods, as the JNI method
//! signatures can not contain `Result`.
//!
//! # Controller handle
//!
//! Every function uses a `HapticsController`. It is created by
//! `Java_com_haptics_core_HapticsCore_create()`, and then returned to the Java layer as
//! a pointer casted to a `jlong`. The Java layer keeps hold of that handle and passes it
//! to every function as a parameter. The functions then cast the `jlong` back to a
//! `HapticsController` and use it.
//!
//! # Error handling
//!
//! ## Errors when Java called into Rust
//!
//! When an error occurs, the inner functions return it as a `Result<_, HapticsError>`
//! to the outer functions. The outer functions then raise a `java.lang.RuntimeException`
//! that is thrown as soon as the Rust function returns back to Java.
//!
//! ## Errors when Rust called into Java, for the callbacks
//!
//! The Java callbacks called from Rust can raise exceptions. After each call into Java,
//! we check if there is an exception, clear the exception and convert it to a
//! `Result<(), HapticsError>`. That `Result` is then returned to the caller. Because the
//! caller is the haptic thread, it has nowhere to further return it to, and logs the
//! error.

use crate::controller::HapticsController;
use crate::error::HapticsError;
use crate::players::waveform::{Callbacks, Player};
use jni::{
    objects::{JByteArray, JObject, JString, JValue, JValueOwned},
    sys::{jboolean, jfloat, jlong},
    JNIEnv,
};

// Throws an exception created from `error`
//
// throw_exception() doesn't actually throw an exception in Rust, as Rust doesn't have
// exceptions. It sets a flag to tell Java that an exception should be raised, but JNI
// Rust functions with calls to throw_exception() still need to return the appropriate
// declared JNI return type. The Java exception is thrown by the JVM as soon as the Rust
// layer returns to the Java layer.
fn throw_exception(env: &mut JNIEnv, error: HapticsError) {
    // If there is already an active exception, don't throw a new one, as invoking
    // JNI functions is not allowed while an exception is active
    if let Ok(exception_occurred) = env.exception_check() {
        if exception_occurred {
            log::error!("Unable to throw an exception, as there already is an active exception.");
            return;
        }
    }

    let throw_result = env.throw_new("java/lang/RuntimeException", error.to_string());
    match throw_result {
        Ok(()) => log::error!("Error in core, thrown to Java: {}", error),
        Err(err) => log::error!("Throwing exception failed: {}. Error: {}", err, error),
    }
}

// Converts a java/lang/String object into a Rust String
fn java_string_to_rust(env: &mut JNIEnv, value: JValueOwned) -> Result<String, HapticsError> {
    let string = value.l()?;
    let string = JString::from(string);
    let string = env.get_string(&string)?;
    Ok(string.into())
}

// Checks if a Java exception has occurred and returns it as `Err` if that's the case
//
// This is intended to be used after a call into Java. `call_result` is the result
// of the Java call, and is returned back if the call had an error.
fn handle_exception_from_call(
    env: &mut JNIEnv,
    call_result: jni::errors::Result<JValueOwned>,
) -> Result<(), HapticsError> {
    let throwable = env.exception_occurred()?;
    if throwable.is_null() {
        // No exception occurred, just convert and return `call_result`
        call_result?;
        return Ok(());
    }

    // The first thing we need to do, before calling into any other JNI function, is to
    // clear the exception. Otherwise Android would terminate the process.
    env.exception_clear()?;

    // Get the message text of the exception by calling Throwable::getMessage(), so that
    // the Result's error message has more detail than just "An exception occurred".
    let get_message_result = env.call_method(&throwable, "getMessage", "()Ljava/lang/String;", &[]);

    // Trying to call getMessage() might have thrown an exception itself. Just ignore
    // that exception here.
    if env.exception_check()? {
        env.exception_clear()?
    }

    let exception_message = java_string_to_rust(env, get_message_result?)?;
    Err(HapticsError::CallbackFailed {
        reason: format!("An exception occurred: {}", exception_message),
    })
}

fn get_controller<'a>(controller_handle: jlong) -> Result<&'a mut HapticsController, HapticsError> {
    if controller_handle == 0 {
        return Err(HapticsError::ThreadFailure {
            reason: "Controller is null".to_string(),
        });
    }
    let controller = unsafe { &mut *(controller_handle as *mut HapticsController) };
    Ok(controller)
}

fn create_inner(env: &mut JNIEnv, callback_object: &JObject) -> Result<jlong, HapticsError> {
    let load_callback = {
        // The callback captures a JavaVM from which it can get a JNIEnv again.
        // This is needed because the callback can not capture the JNIEnv directly,
        // as it has a lifetime.
        let jvm = env.get_java_vm()?;

        // The callback captures a reference to callback_object. Because callback_object
        // has a lifetime and is only valid until the Rust code returns back to Java, a
        // global reference is created and captured instead.
        let callback_object_global_ref = env.new_global_ref(callback_object)?;

        move |timings: &[i64], amplitudes: &[i32], enabled: bool| -> Result<(), HapticsError> {
            // Get back the JNIEnv (or rather, a wrapper around it) from the JavaVM
            let mut env = jvm.attach_current_thread()?;

            // Convert the timings and amplitudes arrays to Java arrays
            let timings_java = env.new_long_array(timings.len() as i32)?;
            let amplitudes_java = env.new_int_array(amplitudes.len() as i32)?;
            env.set_long_array_region(&timings_java, 0, timings)?;
            env.set_int_array_region(&amplitudes_java, 0, amplitudes)?;

            let result = env.call_method(
                &callback_object_global_ref,
                "loadCallback",
                "([J[IZ)V",
                &[
                    JValue::Object(&timings_java),
                    JValue::Object(&amplitudes_java),
                    JValue::Bool(enabled as jboolean),
                ],
            );
            handle_exception_from_call(&mut env, result)
        }
    };
    let play_callback = {
        let jvm = env.get_java_vm()?;
        let callback_object_global_ref = env.new_global_ref(callback_object)?;
        move || -> Result<(), HapticsError> {
            let mut env = jvm.attach_current_thread()?;
            let result = env.call_method(&callback_object_global_ref, "playCallback", "()V", &[]);
            handle_exception_from_call(&mut env, result)
        }
    };
    let stop_callback = {
        let jvm = env.get_java_vm()?;
        let callback_object_global_ref = env.new_global_ref(callback_object)?;
        move || -> Result<(), HapticsError> {
            let mut env = jvm.attach_current_thread()?;
            let result = env.call_method(&callback_object_global_ref, "stopCallback", "()V", &[]);
            handle_exception_from_call(&mut env, result)
        }
    };
    let unload_callback = {
        let jvm = env.get_java_vm()?;
        let callback_object_global_ref = env.new_global_ref(callback_object)?;
        move || -> Result<(), HapticsError> {
            let mut env = jvm.attach_current_thread()?;
            let result = env.call_method(&callback_object_global_ref, "unloadCallback", "()V", &[]);
            handle_exception_from_call(&mut env, result)
        }
    };
    let seek_callback = {
        let jvm = env.get_java_vm()?;
        let callback_object_global_ref = env.new_global_ref(callback_object)?;
        move |timings: &[i64], amplitudes: &[i32]| -> Result<(), HapticsError> {
            let mut env = jvm.attach_current_thread()?;

            let timings_java = env.new_long_array(timings.len() as i32)?;
            let amplitudes_java = env.new_int_array(amplitudes.len() as i32)?;
            env.set_long_array_region(&timings_java, 0, timings)?;
            env.set_int_array_region(&amplitudes_java, 0, amplitudes)?;

            let result = env.call_method(
                &callback_object_global_ref,
                "seekCallback",
                "([J[I)V",
                &[
                    JValue::Object(&timings_java),
                    JValue::Object(&amplitudes_java),
                ],
            );
            handle_exception_from_call(&mut env, result)
        }
    };

    let player = Player::new(Callbacks::new(
        load_callback,
        play_callback,
        stop_callback,
        unload_callback,
        seek_callback,
    ))?;
    let controller = HapticsController::new(Box::new(player));
    let raw_controller_handle = Box::into_raw(Box::new(controller));
    Ok(raw_controller_handle as jlong)
}

/// Creates a `HapticsController` and returns an opaque handle to it.
///
/// Logging is also initialized in the first call to this.
///
/// The load, play, stop, unload and seek callbacks will be invoked on
/// `callback_object`. For this, a global reference to that object is kept, which means
/// that the object will not be garbage-collected until the global reference is released
/// in `Java_com_haptics_core_HapticsCore_destroy()`.
#[no_mangle]
pub extern "system" fn Java_com_haptics_core_HapticsCore_create<'local>(
    mut env: JNIEnv<'local>,
    _caller: JObject<'local>,
    callback_object: JObject<'local>,
) -> jlong {
    crate::init_logging();

    match create_inner(&mut env, &callback_object) {
        Ok(controller_handle) => controller_handle,
        Err(err) => {
            throw_exception(&mut env, err);
            -1
        }
    }
}

fn destroy_inner(controller_handle: jlong) -> Result<(), HapticsError> {
    let controller = get_controller(controller_handle)?;
    unsafe {
        drop(Box::from_raw(controller));
    }
    Ok(())
}

/// Destroys the `HapticsController` represented by `controller_handle`.
///
/// This also releases the reference to the callback object passed to
/// `Java_com_haptics_core_HapticsCore_create()`.
#[no_mangle]
pub extern "system" fn Java_com_haptics_core_HapticsCore_destroy<'local>(
    mut env: JNIEnv<'local>,
    _caller: JObject<'local>,
    controller_handle: jlong,
) {
    if let Err(err) = destroy_inner(controller_handle) {
        throw_exception(&mut env, err);
    }
}

fn load_inner(
    env: &mut JNIEnv,
    controller_handle: jlong,
    clip: &JByteArray,
) -> Result<(), HapticsError> {
    let controller = get_controller(controller_handle)?;
    let clip = env.convert_byte_array(clip)?;
    let clip = std::str::from_utf8(&clip).map_err(|err| HapticsError::InvalidClip {
        reason: format!("Reading clip data as UTF-8 failed: {}", err),
    })?;
    controller.load(clip)?;
    Ok(())
}

/// Loads a .haptic clip from its UTF-8 encoded JSON string.
///
/// `clip` must not contain a null terminator.
///
/// The caller keeps ownership of `clip` and is responsible for freeing the buffer.
#[no_mangle]
pub extern "system" fn Java_com_haptics_core_HapticsCore_load<'local>(
    mut env: JNIEnv<'local>,
    _caller: JObject<'local>,
    controller_handle: jlong,
    clip: JByteArray<'local>,
) {
    if let Err(err) = load_inner(&mut env, controller_handle, &clip) {
        throw_exception(&mut env, err);
    }
}

fn play_inner(controller_handle: jlong) -> Result<(), HapticsError> {
    get_controller(controller_handle)?.play()
}

/// Plays a haptic clip previously loaded with `Java_com_haptics_core_HapticsCore_load()`.
#[no_mangle]
pub extern "system" fn Java_com_haptics_core_HapticsCore_play<'local>(
    mut env: JNIEnv<'local>,
    _caller: JObject<'local>,
    controller_handle: jlong,
) {
    if let Err(err) = play_inner(controller_handle) {
        throw_exception(&mut env, err);
    }
}

fn stop_inner(controller_handle: jlong) -> Result<(), HapticsError> {
    get_controller(controller_handle)?.stop()
}

/// Stops a haptic clip previously played with `Java_com_haptics_core_HapticsCore_play()`.
#[no_mangle]
pub extern "system" fn Java_com_haptics_core_HapticsCore_stop<'local>(
    mut env: JNIEnv<'local>,
    _caller: JObject<'local>,
    controller_handle: jlong,
) {
    if let Err(err) = stop_inner(controller_handle) {
        throw_exception(&mut env, err);
    }
}

fn seek_inner(controller_handle: jlong, seek_time: jfloat) -> Result<(), HapticsError> {
    get_controller(controller_handle)?.seek(seek_time)
}

/// Seeks to a position in the clip
#[no_mangle]
pub extern "system" fn Java_com_haptics_core_HapticsCore_seek<'local>(
    mut env: JNIEnv<'local>,
    _caller: JObject<'local>,
    controller_handle: jlong,
    seek_time: jfloat,
) {
    if let Err(err) = seek_inner(controller_handle, seek_time) {
        throw_exception(&mut env, err);
    }
}

fn set_amplitude_multiplication_inner(
    controller_handle: jlong,
    amplitude_multiplication: jfloat,
) -> Result<(), HapticsError> {
    get_controller(controller_handle)?.set_amplitude_multiplication(amplitude_multiplication)
}

/// Sets the amplitude multiplication of the loaded clip
#[no_mangle]
pub extern "system" fn Java_com_haptics_core_HapticsCore_setAmplitudeMultiplication<'local>(
    mut env: JNIEnv<'local>,
    _caller: JObject<'local>,
    controller_handle: jlong,
    amplitude_multiplication: jfloat,
) {
    if let Err(err) = set_amplitude_multiplication_inner(controller_handle, amplitude_multiplication)
    {
        throw_exception(&mut env, err);
    }
}

fn set_frequency_shift_inner(
    controller_handle: jlong,
    shift: jfloat,
) -> Result<(), HapticsError> {
    get_controller(controller_handle)?.set_frequency_shift(shift)
}

/// Sets the frequency shift of the loaded clip
#[no_mangle]
pub extern "system" fn Java_com_haptics_core_HapticsCore_setFrequencyShift<'local>(
    mut env: JNIEnv<'local>,
    _caller: JObject<'local>,
    controller_handle: jlong,
    shift: jfloat,
) {
    if let Err(err) = set_frequency_shift_inner(controller_handle, shift) {
        throw_exception(&mut env, err);
    }
}

fn loop_inner(controller_handle: jlong, enabled: jboolean) -> Result<(), HapticsError> {
    get_controller(controller_handle)?.set_looping(enabled != 0)
}

/// Sets the playback to repeat from the start at the end of the clip
#[no_mangle]
pub extern "system" fn Java_com_haptics_core_HapticsCore_loop<'local>(
    mut env: JNIEnv<'local>,
    _caller: JObject<'local>,
    controller_handle: jlong,
    enabled: jboolean,
) {
    if let Err(err) = loop_inner(controller_handle, enabled) {
        throw_exception(&mut env, err);
    }
}

fn get_clip_duration_inner(controller_handle: jlong) -> Result<f32, HapticsError> {
    Ok(get_controller(controller_handle)?.get_clip_duration())
}

/// Returns the duration of a loaded clip
#[no_mangle]
pub extern "system" fn Java_com_haptics_core_HapticsCore_getClipDuration<'local>(
    mut env: JNIEnv<'local>,
    _caller: JObject<'local>,
    controller_handle: jlong,
) -> jfloat {
    match get_clip_duration_inner(controller_handle) {
        Ok(duration) => duration as jfloat,
        Err(err) => {
            throw_exception(&mut env, err);
            0.0_f32
        }
    }
}
