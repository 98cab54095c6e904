//! Playback controller that ties clip loading to a player backend
//!
//! The controller owns a player backend and delegates all playback to it.
//! It is also the place where clip JSON is parsed and upgraded, and where
//! playback parameters are range-checked before reaching the backend.

use crate::datamodel::{self, VersionSupport};
use crate::error::HapticsError;
use crate::players::PreAuthoredClipPlayback;

/// Plays back pre-authored haptic clips with a player backend
pub struct HapticsController {
    /// Player to which all playback of pre-authored clips is delegated
    pub pre_authored_clip_player: Box<dyn PreAuthoredClipPlayback>,

    /// Duration of the loaded haptic clip, in seconds
    clip_duration: f32,
}

impl HapticsController {
    pub fn new(pre_authored_clip_player: Box<dyn PreAuthoredClipPlayback>) -> HapticsController {
        HapticsController {
            pre_authored_clip_player,
            clip_duration: 0.0,
        }
    }

    /// Loads a pre-authored clip from its JSON representation.
    ///
    /// Any previously loaded clip is unloaded first, so that a failed load
    /// doesn't leave a stale clip playable. The clip duration is taken from
    /// the last amplitude envelope breakpoint.
    pub fn load(&mut self, data: &str) -> Result<VersionSupport, HapticsError> {
        self.pre_authored_clip_player.unload()?;
        self.clip_duration = 0.0;

        let (version_support, haptic_data) =
            datamodel::latest_from_json(data).map_err(HapticsError::from)?;

        self.clip_duration = haptic_data
            .signals
            .continuous
            .envelopes
            .amplitude
            .last()
            .map_or(0.0, |amp| amp.time);

        self.pre_authored_clip_player.load(haptic_data)?;
        Ok(version_support)
    }

    /// Plays back the pre-authored clip previously loaded with load()
    pub fn play(&mut self) -> Result<(), HapticsError> {
        self.pre_authored_clip_player.play()
    }

    /// Stops playing back the pre-authored clip previously started with play()
    pub fn stop(&mut self) -> Result<(), HapticsError> {
        self.pre_authored_clip_player.stop()
    }

    /// Unloads the clip previously loaded with load()
    pub fn unload(&mut self) -> Result<(), HapticsError> {
        self.clip_duration = 0.0;
        self.pre_authored_clip_player.unload()
    }

    /// Seeks to the position specified with `time`
    pub fn seek(&mut self, time: f32) -> Result<(), HapticsError> {
        self.pre_authored_clip_player.seek(time)
    }

    /// Sets the playback to repeat from the start at the end of the clip
    pub fn set_looping(&mut self, enabled: bool) -> Result<(), HapticsError> {
        self.pre_authored_clip_player.set_looping(enabled)
    }

    /// Returns the duration of the loaded clip, or 0.0 if no clip is loaded
    pub fn get_clip_duration(&self) -> f32 {
        self.clip_duration
    }

    /// Sets the amplitude multiplication of the loaded clip.
    ///
    /// The factor needs to be a finite number that is 0 or greater.
    pub fn set_amplitude_multiplication(
        &mut self,
        multiplication_factor: f32,
    ) -> Result<(), HapticsError> {
        if multiplication_factor.is_nan()
            || multiplication_factor.is_infinite()
            || multiplication_factor < 0.0
        {
            return Err(HapticsError::InvalidParameter {
                name: "amplitude multiplication".to_string(),
                value: multiplication_factor,
            });
        }

        self.pre_authored_clip_player
            .set_amplitude_multiplication(multiplication_factor)
    }

    /// Sets the frequency shift of the loaded clip.
    ///
    /// The shift needs to be a finite number between -1 and 1.
    pub fn set_frequency_shift(&mut self, shift: f32) -> Result<(), HapticsError> {
        if shift.is_nan() || shift.is_infinite() || !(-1.0..=1.0).contains(&shift) {
            return Err(HapticsError::InvalidParameter {
                name: "frequency shift".to_string(),
                value: shift,
            });
        }

        self.pre_authored_clip_player.set_frequency_shift(shift)
    }
}
