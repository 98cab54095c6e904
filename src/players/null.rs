//! A player backend without any haptic output
//!
//! Used when no haptic hardware or driver is available, so that the rest of
//! the playback stack behaves normally. Operations succeed whenever a clip
//! is loaded and fail otherwise, without any side effects.

use crate::datamodel::latest;
use crate::error::HapticsError;

pub struct Player {
    haptic_clip: Option<latest::DataModel>,
}

impl Player {
    pub fn new() -> Result<Player, HapticsError> {
        Ok(Player { haptic_clip: None })
    }
}

impl crate::players::PreAuthoredClipPlayback for Player {
    fn load(&mut self, data_model: latest::DataModel) -> Result<(), HapticsError> {
        self.haptic_clip = Some(data_model);
        Ok(())
    }

    fn play(&mut self) -> Result<(), HapticsError> {
        match &self.haptic_clip {
            Some(_) => Ok(()),
            None => Err(HapticsError::no_clip("play")),
        }
    }

    fn stop(&mut self) -> Result<(), HapticsError> {
        match &self.haptic_clip {
            Some(_) => Ok(()),
            None => Err(HapticsError::no_clip("stop")),
        }
    }

    fn unload(&mut self) -> Result<(), HapticsError> {
        self.haptic_clip = None;
        Ok(())
    }

    fn seek(&mut self, _seek_time: f32) -> Result<(), HapticsError> {
        match &self.haptic_clip {
            Some(_) => Ok(()),
            None => Err(HapticsError::no_clip("seek")),
        }
    }

    fn set_amplitude_multiplication(
        &mut self,
        _multiplication_factor: f32,
    ) -> Result<(), HapticsError> {
        match &self.haptic_clip {
            Some(_) => Ok(()),
            None => Err(HapticsError::no_clip("set_amplitude_multiplication")),
        }
    }

    fn set_frequency_shift(&mut self, _shift: f32) -> Result<(), HapticsError> {
        match &self.haptic_clip {
            Some(_) => Ok(()),
            None => Err(HapticsError::no_clip("set_frequency_shift")),
        }
    }

    fn set_looping(&mut self, _enabled: bool) -> Result<(), HapticsError> {
        match &self.haptic_clip {
            Some(_) => Ok(()),
            None => Err(HapticsError::no_clip("set_looping")),
        }
    }
}
