//! Foreign interfaces of the library
//!
//! The C ABI is used by the iOS and desktop SDK layers, the JNI bindings by
//! the Android SDK layer. Both wrap `HapticsController` behind an opaque
//! handle and report errors through the mechanisms native to each side:
//! status codes plus a retrievable error message for C, exceptions for Java.

pub mod c_api;
pub mod errors;
pub mod jni;
