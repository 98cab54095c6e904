//! Clip player backends
//!
//! A player backend takes a loaded clip and turns it into driver commands.
//! The streaming player schedules amplitude and frequency events on its own
//! thread, the waveform player pre-renders the clip into a vibrator
//! waveform, and the null player discards everything and is used when no
//! haptic hardware is available.

pub mod null;
pub mod streaming;
pub mod waveform;

pub mod provider;

#[cfg(test)]
pub mod test_utils;

use crate::datamodel::latest;
use crate::error::HapticsError;

/// Plays back a pre-authored haptic clip.
pub trait PreAuthoredClipPlayback {
    /// Loads the clip and prepares it for playback.
    fn load(&mut self, data_model: latest::DataModel) -> Result<(), HapticsError>;

    /// Unloads the clip, freeing any memory or resources taken in load().
    fn unload(&mut self) -> Result<(), HapticsError>;

    /// Plays the clip.
    ///
    /// For optimal audio/haptic sync, the implementation of this function
    /// should be quick. Any expensive work should happen in load().
    ///
    /// play() has no effect if the clip is already playing.
    fn play(&mut self) -> Result<(), HapticsError>;

    /// Seeks to the given position, which is specified in seconds since the
    /// beginning of the clip.
    ///
    /// Seeking beyond the end of the clip stops playback, unless looping is
    /// enabled on a backend that supports seeking while looping, in which
    /// case playback continues from the beginning.
    ///
    /// Clips are always defined to have a start time of 0, so negative seek
    /// times result in a delay before playback starts.
    ///
    /// The waveform backend can not keep a clip playing across a seek, its
    /// driver restarts playback from the sought position.
    fn seek(&mut self, seek_offset: f32) -> Result<(), HapticsError>;

    /// Sets the playback to repeat from the beginning at the end of the
    /// clip.
    ///
    /// On the waveform backend, the change only applies when `play()` is
    /// called, and `seek()` has no effect while looping is enabled.
    fn set_looping(&mut self, enabled: bool) -> Result<(), HapticsError>;

    /// Stops a clip that is playing.
    ///
    /// `stop()` has no effect if a clip is not playing.
    fn stop(&mut self) -> Result<(), HapticsError>;

    /// Multiplies the amplitude of every breakpoint of the clip with the
    /// given multiplication factor before playing it.
    ///
    /// A clip needs to be loaded for this method to take effect. Unloading
    /// a clip resets the multiplication factor to the default of 1.0.
    ///
    /// The multiplication factor needs to be 0 or greater.
    ///
    /// If the resulting amplitude of a breakpoint is greater than 1.0, it is
    /// clipped to 1.0. The amplitude is clipped hard, no limiter is used.
    fn set_amplitude_multiplication(
        &mut self,
        multiplication_factor: f32,
    ) -> Result<(), HapticsError>;

    /// Adds the given shift to the frequency of every frequency breakpoint
    /// and to the frequency of every emphasis before playing the breakpoint.
    ///
    /// A clip needs to be loaded for this method to take effect. Unloading a
    /// clip resets the shift to the default of 0.0.
    ///
    /// The shift needs to be between -1.0 and 1.0.
    ///
    /// If the resulting frequency of a breakpoint is smaller than 0.0 or
    /// larger than 1.0, it is clipped to the valid range. The frequency is
    /// clipped hard, no limiter is used.
    fn set_frequency_shift(&mut self, shift: f32) -> Result<(), HapticsError>;
}
