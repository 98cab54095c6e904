//! Version 1 of the haptic clip format
//!
//! V1 describes a clip as a continuous signal with an amplitude envelope,
//! an optional frequency envelope and optional per-breakpoint emphasis.

use crate::datamodel::version::{DataModelVersion, Version};
use crate::datamodel::Validation;
use crate::datamodel::{MAX_ENVELOPE_AMPLITUDE, MIN_ENVELOPE_AMPLITUDE};
use crate::utils;
use serde::{Deserialize, Serialize};

impl DataModelVersion for DataModel {
    const CURRENT: Version = Version {
        major: 1,
        minor: 0,
        patch: 0,
    };

    fn version(&self) -> &Version {
        &self.version
    }
}

/// Root structure of a V1 clip
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataModel {
    pub version: Version,
    #[serde(default)]
    pub metadata: MetaData,
    pub signals: Signals,
}

impl Default for DataModel {
    fn default() -> Self {
        Self {
            version: Self::CURRENT,
            metadata: Default::default(),
            signals: Default::default(),
        }
    }
}

/// Optional authoring metadata, not used for playback
#[derive(Default, Clone, Serialize, Deserialize, PartialEq, Debug)]
pub struct MetaData {
    #[serde(default)]
    pub editor: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: String,
}

/// Signals of a clip. Currently only a continuous signal is defined.
#[derive(Default, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Signals {
    pub continuous: SignalContinuous,
}

/// A decomposed haptic signal over a period of time
#[derive(Default, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct SignalContinuous {
    pub envelopes: Envelopes,
}

/// Envelopes of a continuous signal, changing amplitude and frequency
/// over time
#[derive(Default, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Envelopes {
    pub amplitude: Vec<AmplitudeBreakpoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Vec<FrequencyBreakpoint>>,
}

/// A breakpoint of the amplitude envelope, with optional emphasis
#[derive(Default, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct AmplitudeBreakpoint {
    pub time: f32,
    pub amplitude: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emphasis: Option<Emphasis>,
}

impl AmplitudeBreakpoint {
    /// Creates a breakpoint at `time`, with the amplitude interpolated
    /// between `breakpoint_a` and `breakpoint_b`
    pub fn from_interpolated_breakpoints(
        breakpoint_a: &AmplitudeBreakpoint,
        breakpoint_b: &AmplitudeBreakpoint,
        time: f32,
    ) -> Self {
        AmplitudeBreakpoint {
            time,
            amplitude: utils::interpolate(
                breakpoint_a.time,
                breakpoint_b.time,
                breakpoint_a.amplitude,
                breakpoint_b.amplitude,
                time,
            ),
            emphasis: None,
        }
    }
}

/// Emphasis attached to an amplitude breakpoint, a "haptic highlight"
/// of that point in time
#[derive(Clone, Copy, Default, PartialEq, Debug, Serialize, Deserialize)]
#[repr(C)]
pub struct Emphasis {
    pub amplitude: f32,
    pub frequency: f32,
}

/// A breakpoint of the frequency envelope
#[derive(Clone, Copy, Default, PartialEq, Debug, Serialize, Deserialize)]
pub struct FrequencyBreakpoint {
    pub time: f32,
    pub frequency: f32,
}

impl FrequencyBreakpoint {
    /// Creates a breakpoint at `time`, with the frequency interpolated
    /// between `breakpoint_a` and `breakpoint_b`
    pub fn from_interpolated_breakpoints(
        breakpoint_a: &FrequencyBreakpoint,
        breakpoint_b: &FrequencyBreakpoint,
        time: f32,
    ) -> Self {
        FrequencyBreakpoint {
            time,
            frequency: utils::interpolate(
                breakpoint_a.time,
                breakpoint_b.time,
                breakpoint_a.frequency,
                breakpoint_b.frequency,
                time,
            ),
        }
    }
}

impl DataModel {
    /// Removes all breakpoints before the specified `time` (in seconds) from
    /// the clip.
    ///
    /// The time of all remaining breakpoints is shifted so that the new first
    /// breakpoint starts at 0.0. That means the total duration is reduced by
    /// `time`.
    ///
    /// Unless truncation happens at exactly the time of an existing
    /// breakpoint, a new initial breakpoint is inserted at time 0.0, as
    /// otherwise playback wouldn't begin at 0.0. The amplitude and frequency
    /// of this new first breakpoint is an interpolation of its neighboring
    /// breakpoints.
    pub fn truncate_before(&mut self, time: f32) -> Result<(), String> {
        //
        // Truncate amplitude
        //
        let amplitudes = &mut self.signals.continuous.envelopes.amplitude;
        let index_of_first_breakpoint_in_range = amplitudes
            .iter()
            .position(|breakpoint| breakpoint.time >= time)
            .ok_or_else(|| {
                "No amplitude breakpoint before the specified starting time".to_string()
            })?;

        if index_of_first_breakpoint_in_range > 0 {
            let breakpoint_before = &amplitudes[index_of_first_breakpoint_in_range - 1];
            let breakpoint_after = &amplitudes[index_of_first_breakpoint_in_range];
            let new_first_breakpoint =
                if breakpoint_after.time - breakpoint_before.time > f32::EPSILON {
                    Some(AmplitudeBreakpoint {
                        time: 0.0,
                        amplitude: utils::interpolate(
                            breakpoint_before.time,
                            breakpoint_after.time,
                            breakpoint_before.amplitude,
                            breakpoint_after.amplitude,
                            time,
                        ),
                        emphasis: None,
                    })
                } else {
                    None
                };

            // Remove breakpoints before `time`
            amplitudes.retain(|breakpoint| breakpoint.time >= time);

            // Shift the time of all breakpoints by `time`
            for breakpoint in amplitudes.iter_mut() {
                breakpoint.time -= time;
            }

            // Insert a new first breakpoint
            if let Some(new_first_breakpoint) = new_first_breakpoint {
                amplitudes.insert(0, new_first_breakpoint);
            }
        }

        //
        // Truncate frequency
        // Same algorithm as for the amplitude, except that the frequency
        // envelope is optional.
        //
        let frequencies = &mut self.signals.continuous.envelopes.frequency;
        if let Some(frequencies) = frequencies {
            let index_of_first_breakpoint_in_range = frequencies
                .iter()
                .position(|breakpoint| breakpoint.time >= time);

            if let Some(index_of_first_breakpoint_in_range) = index_of_first_breakpoint_in_range {
                if index_of_first_breakpoint_in_range > 0 {
                    let breakpoint_before = &frequencies[index_of_first_breakpoint_in_range - 1];
                    let breakpoint_after = &frequencies[index_of_first_breakpoint_in_range];
                    let new_first_breakpoint =
                        if breakpoint_after.time - breakpoint_before.time > f32::EPSILON {
                            Some(FrequencyBreakpoint {
                                time: 0.0,
                                frequency: utils::interpolate(
                                    breakpoint_before.time,
                                    breakpoint_after.time,
                                    breakpoint_before.frequency,
                                    breakpoint_after.frequency,
                                    time,
                                ),
                            })
                        } else {
                            None
                        };
                    frequencies.retain(|breakpoint| breakpoint.time >= time);
                    for breakpoint in frequencies.iter_mut() {
                        breakpoint.time -= time;
                    }
                    if let Some(new_first_breakpoint) = new_first_breakpoint {
                        frequencies.insert(0, new_first_breakpoint);
                    }
                }
            } else {
                self.signals.continuous.envelopes.frequency = None;
            }
        }

        Ok(())
    }
}

/// Validation trait implementation
///
/// An invalid clip is one in which:
/// - breakpoint or emphasis values are < 0.0 or > 1.0;
/// - breakpoint time values are not consecutive;
/// - an emphasis amplitude is smaller than its breakpoint amplitude.
impl Validation for DataModel {
    fn validate(self) -> Result<Self, String> {
        let mut last_time: f32 = 0.0;

        if self.signals.continuous.envelopes.amplitude.is_empty() {
            return Err(String::from(
                "V1 Validation Error: Amplitude envelope is empty",
            ));
        }

        for amplitude_breakpoint in self.signals.continuous.envelopes.amplitude.iter() {
            if amplitude_breakpoint.amplitude < MIN_ENVELOPE_AMPLITUDE
                || amplitude_breakpoint.amplitude > MAX_ENVELOPE_AMPLITUDE
            {
                return Err(format!(
                    "V1 Validation Error: Breakpoint amplitude out of range: {}",
                    amplitude_breakpoint.time,
                ));
            }

            if last_time > amplitude_breakpoint.time {
                return Err(format!(
                    "V1 Validation Error: Breakpoint times not consecutive: {} after {}",
                    amplitude_breakpoint.time, last_time,
                ));
            }

            last_time = amplitude_breakpoint.time;

            if let Some(emphasis) = &amplitude_breakpoint.emphasis {
                if emphasis.amplitude > MAX_ENVELOPE_AMPLITUDE
                    || emphasis.amplitude < MIN_ENVELOPE_AMPLITUDE
                {
                    return Err(format!(
                        "V1 Validation Error: Emphasis amplitude out of range: {}",
                        emphasis.amplitude,
                    ));
                }

                if emphasis.frequency > MAX_ENVELOPE_AMPLITUDE
                    || emphasis.frequency < MIN_ENVELOPE_AMPLITUDE
                {
                    return Err(format!(
                        "V1 Validation Error: Emphasis frequency out of range: {}",
                        emphasis.frequency,
                    ));
                }

                if emphasis.amplitude < amplitude_breakpoint.amplitude {
                    return Err(format!(
                        "V1 Validation: Emphasis amplitude can't be lower than Envelope amplitude: \
                         {} smaller than {} at {}",
                        emphasis.amplitude,
                        amplitude_breakpoint.amplitude,
                        amplitude_breakpoint.time
                    ));
                }
            }
        }

        if let Some(frequency_breakpoints) = &self.signals.continuous.envelopes.frequency {
            last_time = 0.0;
            for frequency_breakpoint in frequency_breakpoints.iter() {
                if frequency_breakpoint.frequency < MIN_ENVELOPE_AMPLITUDE
                    || frequency_breakpoint.frequency > MAX_ENVELOPE_AMPLITUDE
                {
                    return Err(format!(
                        "V1 Validation Error: Breakpoint frequency out of range: {}",
                        frequency_breakpoint.time,
                    ));
                }

                if last_time > frequency_breakpoint.time {
                    return Err(format!(
                        "V1 Validation Error: Breakpoint frequency times not consecutive: {} after {}",
                        frequency_breakpoint.time, last_time,
                    ));
                }

                last_time = frequency_breakpoint.time;
            }
        }

        Ok(self)
    }
}

fn add_v0_transients_to_v1_breakpoints(
    mut v0_transients: Vec<crate::datamodel::v0::Envelope>,
    v1_amplitude_breakpoints: &mut [AmplitudeBreakpoint],
) {
    if v0_transients.len() != 2 || v0_transients[0].len() != v0_transients[1].len() {
        return;
    }

    // Iterate over all amplitude breakpoints and check if there is a transient
    // at the same timestamp. If that's the case, convert the transient to
    // emphasis and add it to the amplitude breakpoint.
    // Transients without a matching amplitude breakpoint at the same timestamp
    // are silently ignored; inserting breakpoints for them isn't worth the
    // effort for a legacy format.
    v1_amplitude_breakpoints
        .iter_mut()
        .for_each(|v1_amplitude_breakpoint| {
            if let Ok(v0_transient_index) = v0_transients[0].binary_search_by(|v0_transient| {
                v0_transient
                    .time
                    .partial_cmp(&v1_amplitude_breakpoint.time)
                    .unwrap()
            }) {
                let v0_transient_amplitude = v0_transients[0][v0_transient_index].amplitude;
                let v0_transient_frequency = v0_transients[1][v0_transient_index].amplitude;
                v1_amplitude_breakpoint.emphasis = Some(Emphasis {
                    amplitude: v0_transient_amplitude,
                    frequency: v0_transient_frequency,
                });

                v0_transients[0].remove(v0_transient_index);
                v0_transients[1].remove(v0_transient_index);
            }
        });
}

/// Upgrade from the legacy V0 format
impl From<crate::datamodel::v0::DataModel> for DataModel {
    fn from(v0: crate::datamodel::v0::DataModel) -> Self {
        let version: Version = DataModel::CURRENT;
        let mut signals = Signals::default();

        // The first array of breakpoints is mapped to amplitude.
        let mut amplitude_breakpoints: Vec<AmplitudeBreakpoint> = v0.voices.envelopes[0]
            .iter()
            .map(|breakpoint| AmplitudeBreakpoint {
                time: breakpoint.time,
                amplitude: breakpoint.amplitude,
                emphasis: None,
            })
            .collect();

        // Add a last point to the continuous amplitude envelope, corresponding
        // to the duration of the signal
        let amplitude_to_append = match amplitude_breakpoints.last() {
            Some(last_breakpoint) => {
                if v0.metadata.duration > last_breakpoint.time {
                    Some(last_breakpoint.amplitude)
                } else {
                    None
                }
            }
            None => Some(0.0),
        };

        if let Some(amplitude) = amplitude_to_append {
            amplitude_breakpoints.push(AmplitudeBreakpoint {
                time: v0.metadata.duration,
                amplitude,
                emphasis: None,
            });
        }

        // The second array of breakpoints is mapped to frequency.
        let frequency_breakpoints: Vec<FrequencyBreakpoint> = if v0.voices.envelopes.len() == 2 {
            v0.voices.envelopes[1]
                .iter()
                .map(|breakpoint| FrequencyBreakpoint {
                    time: breakpoint.time,
                    frequency: breakpoint.amplitude,
                })
                .collect()
        } else {
            vec![]
        };

        add_v0_transients_to_v1_breakpoints(v0.voices.transients, &mut amplitude_breakpoints);

        // The only metadata field V0 and V1 have in common is the editor.
        let metadata = MetaData {
            editor: v0.metadata.editor,
            ..Default::default()
        };

        signals.continuous.envelopes.amplitude = amplitude_breakpoints;
        signals.continuous.envelopes.frequency = if !frequency_breakpoints.is_empty() {
            Some(frequency_breakpoints)
        } else {
            None
        };

        DataModel {
            version,
            metadata,
            signals,
        }
    }
}
