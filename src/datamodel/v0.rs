//! Version 0.2.0 of the clip format, the legacy "vij" layout
//!
//! V0 clips carry parallel breakpoint lists under `voices`: the first
//! envelope is amplitude, the optional second one frequency. Transients are
//! stored as two paired lists (amplitude and frequency at the same
//! timestamps) and become emphasis breakpoints when upgrading to V1.

use crate::datamodel::version::{DataModelVersion, Version};
use crate::datamodel::Validation;
use crate::datamodel::{MAX_ENVELOPE_AMPLITUDE, MIN_ENVELOPE_AMPLITUDE};
use serde::{Deserialize, Serialize};

impl DataModelVersion for DataModel {
    const CURRENT: Version = Version {
        major: 0,
        minor: 2,
        patch: 0,
    };

    fn version(&self) -> &Version {
        &Self::CURRENT
    }
}

/// Root structure of a V0 clip
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataModel {
    #[serde(default)]
    pub version: Version,
    #[serde(default)]
    pub metadata: MetaData,
    pub voices: Voices,
}

impl Default for DataModel {
    fn default() -> Self {
        Self {
            version: Self::CURRENT,
            metadata: Default::default(),
            voices: Default::default(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Debug)]
pub struct MetaData {
    #[serde(default)]
    pub editor: String,
    #[serde(default)]
    pub duration: f32,
}

/// Envelope and transient breakpoint lists of a V0 clip
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Debug)]
pub struct Voices {
    pub envelopes: Vec<Envelope>,
    pub transients: Vec<Envelope>,
}

pub type Envelope = Vec<Breakpoint>;

/// A single point of an envelope curve or a transient list
#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
pub struct Breakpoint {
    pub time: f32,
    pub amplitude: f32,
}

/// Validation trait implementation
///
/// An invalid V0 clip is one that:
/// - has no breakpoints at all, or no amplitude breakpoints;
/// - has breakpoint or transient amplitudes outside [0, 1];
/// - has non-consecutive breakpoint or transient times;
/// - has transient amplitude/frequency lists of different lengths or with
///   mismatching timestamps.
impl Validation for DataModel {
    fn validate(self) -> Result<Self, String> {
        if self.voices.envelopes.is_empty() {
            return Err(String::from("V0 Validation Error: Envelopes are empty"));
        }

        if self.voices.envelopes[0].is_empty() {
            return Err(String::from(
                "V0 Validation Error: Amplitude envelope is empty",
            ));
        }

        let mut last_time: f32;

        for envelope in self.voices.envelopes.iter() {
            last_time = 0.0;
            for breakpoint in envelope.iter() {
                if breakpoint.time.is_nan() {
                    return Err(
                        "V0 Validation Error: Timestamp of amplitude breakpoint is NaN".into(),
                    );
                }

                if breakpoint.amplitude > MAX_ENVELOPE_AMPLITUDE
                    || breakpoint.amplitude < MIN_ENVELOPE_AMPLITUDE
                {
                    return Err(format!(
                        "V0 Validation Error: Breakpoint amplitude out of range: {}",
                        breakpoint.amplitude,
                    ));
                }

                if last_time > breakpoint.time {
                    return Err(format!(
                        "V0 Validation Error: Breakpoint times not consecutive: {} after {}",
                        breakpoint.time, last_time,
                    ));
                }

                last_time = breakpoint.time;
            }

            if last_time > self.metadata.duration {
                return Err(format!(
                    "V0 Validation Error: event time: {} is greater than the file duration: {}",
                    last_time, self.metadata.duration
                ));
            }
        }

        if !self.voices.transients.is_empty() {
            if self.voices.transients.len() != 2 {
                return Err(String::from(
                    "V0 Validation Error: Transients missing frequency points",
                ));
            }

            if self.voices.transients[0].len() != self.voices.transients[1].len() {
                return Err(String::from("V0 Validation Error: Transients missing pair"));
            }

            let transients = &self.voices.transients;

            for pair in transients[0].iter().zip(transients[1].iter()) {
                if pair.0.time.is_nan() || pair.1.time.is_nan() {
                    return Err("V0 Validation Error: Transient timestamp is NaN".into());
                }

                if (pair.0.time - pair.1.time).abs() > 0.0 {
                    return Err(format!(
                        "V0 Validation Error: Mismatch in Transient timestamp: {} {}",
                        pair.0.time, pair.1.time
                    ));
                }

                if pair.0.amplitude > MAX_ENVELOPE_AMPLITUDE
                    || pair.1.amplitude > MAX_ENVELOPE_AMPLITUDE
                    || pair.0.amplitude < MIN_ENVELOPE_AMPLITUDE
                    || pair.1.amplitude < MIN_ENVELOPE_AMPLITUDE
                {
                    return Err(format!(
                        "V0 Validation Error: Transient amplitude out of range: {}",
                        pair.0.time,
                    ));
                }
            }
        }

        Ok(self)
    }
}
