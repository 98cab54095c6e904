//! Runtime configuration for playback parameter tuning
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling playback tuning without recompilation. The emphasis,
//! interpolation and waveform conversion parameters used by the waveform
//! player can be adjusted via the config file.

use crate::datamodel::{
    emphasis::EmphasisParameters,
    interpolation::InterpolationParameters,
    waveform::WaveformConversionParameters,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Complete playback configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PlaybackConfig {
    pub emphasis: EmphasisConfig,
    pub interpolation: InterpolationConfig,
    pub waveform: WaveformConfig,
}

/// Emphasis rendering parameters, see datamodel::emphasis
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmphasisConfig {
    /// Length of the ducking area before an emphasis, in milliseconds
    pub ducking_before_ms: u64,
    /// Length of the emphasis area itself, in milliseconds
    pub emphasis_ms: u64,
    /// Length of the ducking area after an emphasis, in milliseconds
    pub ducking_after_ms: u64,
    /// Amplitude used in the ducking areas, in [0, 1]
    pub ducking_amplitude: f32,
}

impl Default for EmphasisConfig {
    fn default() -> Self {
        Self {
            ducking_before_ms: 30,
            emphasis_ms: 30,
            ducking_after_ms: 30,
            // Amplitude 0 turns the motor off completely, and turning it back
            // on takes long enough to ruin waveform timings. 1.1 instead of
            // 1.0 so the value doesn't round down to 0 at 8 bit resolution.
            ducking_amplitude: 1.1 / 255.0,
        }
    }
}

/// Interpolation parameters, see datamodel::interpolation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationConfig {
    /// Amplitude resolution of the target driver, in bits
    pub q_bits: u32,
    /// Minimum time between interpolated breakpoints, in seconds
    pub min_time_step: f32,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            q_bits: 8,
            // Steps below 25ms only add breakpoints that the motor can't
            // resolve
            min_time_step: 0.025,
        }
    }
}

/// Waveform conversion parameters, see datamodel::waveform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformConfig {
    /// Largest amplitude value the driver accepts
    pub max_amplitude: i32,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self { max_amplitude: 255 }
    }
}

impl PlaybackConfig {
    /// Load configuration from a JSON file.
    ///
    /// If the file doesn't exist or the JSON is invalid, the default
    /// configuration is returned and a warning is logged.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded playback configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "Failed to parse playback configuration {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "Failed to read playback configuration {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default location.
    ///
    /// On Android the library has no filesystem location of its own, so the
    /// defaults are used there.
    #[cfg(not(target_os = "android"))]
    pub fn load() -> Self {
        Self::load_from_file("playback_config.json")
    }

    #[cfg(target_os = "android")]
    pub fn load() -> Self {
        Self::default()
    }

    pub fn emphasis_parameters(&self) -> EmphasisParameters {
        EmphasisParameters {
            ducking_before_length: Duration::from_millis(self.emphasis.ducking_before_ms),
            emphasis_length: Duration::from_millis(self.emphasis.emphasis_ms),
            ducking_after_length: Duration::from_millis(self.emphasis.ducking_after_ms),
            ducking_amplitude: self.emphasis.ducking_amplitude,
        }
    }

    pub fn interpolation_parameters(&self) -> InterpolationParameters {
        InterpolationParameters::new(self.interpolation.q_bits, self.interpolation.min_time_step)
    }

    pub fn waveform_conversion_parameters(&self) -> WaveformConversionParameters {
        WaveformConversionParameters {
            max_amplitude: self.waveform.max_amplitude,
        }
    }
}
