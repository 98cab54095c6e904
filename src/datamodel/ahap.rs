//! Export of V1 clips to Apple's Core Haptics AHAP format
//!
//! The amplitude envelope becomes HapticIntensityControl parameter curves,
//! the frequency envelope becomes HapticSharpnessControl parameter curves,
//! and emphasis breakpoints become HapticTransient events. The continuous
//! signal itself is played by HapticContinuous events with constant
//! parameters, modulated by the curves.

use crate::datamodel::v1::{self, AmplitudeBreakpoint};
use serde::{Deserialize, Serialize};

const DELTA_ERR: f32 = 0.000_000_1;

// The intensity of a breakpoint with emphasis is reduced, so that the
// HapticTransient event played at the same time stands out.
const AMPLITUDE_DUCKING: f32 = 0.2;

// Core Haptics limits events of type HapticContinuous to 30 seconds.
const MAX_CONTINUOUS_EVENT_DURATION: f32 = 30.0;

/// Core Haptics AHAP root structure
#[derive(Default, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Ahap {
    pub version: f32,
    pub metadata: MetaData,
    pub pattern: Vec<Pattern>,
}

impl Ahap {
    /// Serializes AHAP data into a compact JSON string
    pub fn to_string(ahap_data: &Ahap) -> Result<String, String> {
        match serde_json::to_string::<Ahap>(ahap_data) {
            Ok(ahap_string) => Ok(ahap_string),
            Err(e) => Err(e.to_string()),
        }
    }

    /// Serializes AHAP data into a pretty-printed JSON string
    pub fn to_string_pretty(ahap_data: &Ahap) -> Result<String, String> {
        match serde_json::to_string_pretty::<Ahap>(ahap_data) {
            Ok(ahap_string) => Ok(ahap_string),
            Err(e) => Err(e.to_string()),
        }
    }

    /// Splits AHAP data into two AHAPs with continuous and transient events
    /// respectively
    pub fn into_continuous_and_transients_ahaps(self) -> (Ahap, Option<Ahap>) {
        let mut ahap_transients = Ahap::default();
        let mut ahap_continuous = Ahap::default();

        for pattern in self.pattern {
            match pattern {
                Pattern::Event(event) => match event {
                    Event::HapticContinuous {
                        time,
                        event_duration,
                        event_parameters,
                    } => ahap_continuous
                        .pattern
                        .push(Pattern::Event(Event::HapticContinuous {
                            time,
                            event_duration,
                            event_parameters,
                        })),
                    Event::HapticTransient {
                        time,
                        event_parameters,
                    } => ahap_transients
                        .pattern
                        .push(Pattern::Event(Event::HapticTransient {
                            time,
                            event_parameters,
                        })),
                },
                Pattern::ParameterCurve(parameter_curve) => {
                    ahap_continuous
                        .pattern
                        .push(Pattern::ParameterCurve(parameter_curve));
                }
            }
        }

        // Without transients in the AHAP, return None so they are not played
        if ahap_transients.pattern.is_empty() {
            (ahap_continuous, None)
        } else {
            (ahap_continuous, Some(ahap_transients))
        }
    }
}

fn ahap_transient_events_from_breakpoints(breakpoints: &[AmplitudeBreakpoint]) -> Vec<Pattern> {
    breakpoints
        .iter()
        .filter(|&x| x.emphasis.is_some())
        .map(|x| {
            Pattern::Event(Event::HapticTransient {
                time: x.time,
                event_parameters: vec![
                    EventParameter {
                        parameter_id: ParameterId::HapticIntensity,
                        parameter_value: x.emphasis.as_ref().map_or(0.0, |x| x.amplitude.sqrt()),
                    },
                    EventParameter {
                        parameter_id: ParameterId::HapticSharpness,
                        parameter_value: x.emphasis.as_ref().map_or(0.0, |x| x.frequency),
                    },
                ],
            })
        })
        .collect::<Vec<Pattern>>()
}

/// Creates events of type HapticContinuous for a haptic clip.
///
/// Each event has a constant intensity of 1 and a constant sharpness of 0.
/// The intensity and sharpness change during playback because parameter
/// curves that modulate these constant values are added to the AHAP
/// elsewhere.
///
/// Multiple events are only needed because Core Haptics limits events of
/// type HapticContinuous to 30 seconds.
fn ahap_continuous_events_from_v1(clip: &v1::DataModel) -> Vec<Pattern> {
    let mut total_remaining_duration = match clip.signals.continuous.envelopes.amplitude.last() {
        None => 0.0,
        Some(last) => last.time,
    };
    let event_count = (total_remaining_duration / MAX_CONTINUOUS_EVENT_DURATION).ceil() as u32;
    let mut result = Vec::new();
    for i in 0..event_count {
        let time = i as f32 * MAX_CONTINUOUS_EVENT_DURATION;
        let event_duration = if total_remaining_duration > MAX_CONTINUOUS_EVENT_DURATION {
            MAX_CONTINUOUS_EVENT_DURATION
        } else {
            total_remaining_duration
        };
        total_remaining_duration -= event_duration;

        let ahap_pattern_continuous_event = Pattern::Event(Event::HapticContinuous {
            time,
            event_duration,
            event_parameters: vec![
                EventParameter {
                    parameter_id: ParameterId::HapticIntensity,
                    parameter_value: 1.0,
                },
                EventParameter {
                    parameter_id: ParameterId::HapticSharpness,
                    parameter_value: 0.0,
                },
            ],
        });

        result.push(ahap_pattern_continuous_event);
    }
    result
}

/// Creates an AHAP data structure from a V1 clip
impl From<v1::DataModel> for Ahap {
    fn from(v1: v1::DataModel) -> Self {
        let ahap_version = 1.0;

        let v1_signals = &v1.signals;

        // ----------------------------------------------------------------
        // CHParameterCurve Intensity from Continuous Amplitude Envelope
        // ----------------------------------------------------------------

        let default_control_point = v1::AmplitudeBreakpoint::default();
        let mut control_point = match v1_signals.continuous.envelopes.amplitude.first() {
            None => &default_control_point,
            Some(first) => first,
        };

        let mut ahap_data = Self::default();
        let mut transient_events_data = Vec::new();

        // The first breakpoint is already in control_point
        let continue_envelope_amplitude_vec = &v1_signals.continuous.envelopes.amplitude[1..];

        // A ParameterCurve can hold at most 16 control points, so the
        // envelope is split into chunks of 15 plus the last point of the
        // previous chunk.
        for amplitude_breakpoint_chunks in continue_envelope_amplitude_vec.chunks(15) {
            let mut parameter_curve_control_points = vec![ParameterCurveControlPoint {
                time: control_point.time,
                parameter_value: get_intensity_from_amplitude_bp(control_point),
            }];

            parameter_curve_control_points.extend(
                &amplitude_breakpoint_chunks
                    .iter()
                    .map(|point| ParameterCurveControlPoint {
                        time: point.time,
                        parameter_value: get_intensity_from_amplitude_bp(point),
                    })
                    .collect::<Vec<ParameterCurveControlPoint>>(),
            );

            let parameter_curve_intensity = Pattern::ParameterCurve(ParameterCurve {
                parameter_id: DynamicParameterId::HapticIntensityControl,
                time: control_point.time,
                parameter_curve_control_points,
            });

            // The last control point gets repeated as the first point of the
            // next CHParameterCurve
            control_point = match amplitude_breakpoint_chunks.last() {
                Some(last) => last,
                None => &default_control_point,
            };

            ahap_data.pattern.push(parameter_curve_intensity);

            // CHTransient events for amplitude breakpoints with emphasis
            transient_events_data.extend(ahap_transient_events_from_breakpoints(
                amplitude_breakpoint_chunks,
            ));
        }

        // ----------------------------------------------------------------
        // CHParameterCurve Sharpness from Continuous Frequency Envelope
        // ----------------------------------------------------------------

        match &v1_signals.continuous.envelopes.frequency {
            None => {}
            Some(frequency_breakpoint_vec) => {
                let default_control_point = v1::FrequencyBreakpoint::default();
                let mut control_point = match frequency_breakpoint_vec.first() {
                    None => &default_control_point,
                    Some(first) => first,
                };
                let frequency_breakpoint_sliced = &frequency_breakpoint_vec[1..];

                for time_frequency_chunks in frequency_breakpoint_sliced.chunks(15) {
                    let mut parameter_curve_control_points = vec![ParameterCurveControlPoint {
                        time: control_point.time,
                        parameter_value: control_point.frequency.sqrt(),
                    }];

                    parameter_curve_control_points.extend(
                        time_frequency_chunks
                            .iter()
                            .map(|point| ParameterCurveControlPoint {
                                time: point.time,
                                parameter_value: point.frequency.sqrt(),
                            })
                            .collect::<Vec<ParameterCurveControlPoint>>(),
                    );

                    let parameter_curve_sharpness = Pattern::ParameterCurve(ParameterCurve {
                        parameter_id: DynamicParameterId::HapticSharpnessControl,
                        time: control_point.time,
                        parameter_curve_control_points,
                    });

                    control_point = match time_frequency_chunks.last() {
                        Some(last) => last,
                        None => &default_control_point,
                    };

                    ahap_data.pattern.push(parameter_curve_sharpness);
                }
            }
        };

        ahap_data
            .pattern
            .append(&mut ahap_continuous_events_from_v1(&v1));

        // Transients go at the end of the AHAP to keep the file organized
        ahap_data.pattern.append(&mut transient_events_data);

        ahap_data.metadata = MetaData {
            project: v1.metadata.project,
            created: v1.metadata.author,
            description: v1.metadata.description,
        };
        ahap_data.version = ahap_version;

        ahap_data
    }
}

fn get_intensity_from_amplitude_bp(breakpoint: &AmplitudeBreakpoint) -> f32 {
    if breakpoint.emphasis.is_some() {
        breakpoint.amplitude.sqrt() * (1.0 - AMPLITUDE_DUCKING)
    } else {
        breakpoint.amplitude.sqrt()
    }
}

/// Core Haptics AHAP Metadata structure
#[derive(Debug, PartialEq, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetaData {
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub description: String,
}

/// Core Haptics AHAP Pattern types
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Pattern {
    Event(Event),
    ParameterCurve(ParameterCurve),
}

/// Core Haptics AHAP Event structures for `HapticContinuous` and
/// `HapticTransient` events
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
#[serde(tag = "EventType")]
pub enum Event {
    #[serde(rename_all = "PascalCase")]
    HapticContinuous {
        time: f32,
        event_duration: f32,
        event_parameters: Vec<EventParameter>,
    },
    #[serde(rename_all = "PascalCase")]
    HapticTransient {
        time: f32,
        event_parameters: Vec<EventParameter>,
    },
}

/// Core Haptics AHAP EventParameter data structure
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventParameter {
    #[serde(rename = "ParameterID")]
    pub parameter_id: ParameterId,
    pub parameter_value: f32,
}

impl PartialEq for EventParameter {
    fn eq(&self, other: &Self) -> bool {
        if self.parameter_id == other.parameter_id {
            (self.parameter_value - other.parameter_value).abs() <= DELTA_ERR
        } else {
            false
        }
    }
}

/// Core Haptics AHAP ParameterCurve data structure
#[derive(Default, PartialEq, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParameterCurve {
    #[serde(rename = "ParameterID")]
    pub parameter_id: DynamicParameterId,
    pub time: f32,
    pub parameter_curve_control_points: Vec<ParameterCurveControlPoint>,
}

/// Core Haptics AHAP DynamicParameter id used in ParameterCurves
#[derive(Default, Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum DynamicParameterId {
    #[default]
    HapticIntensityControl,
    HapticSharpnessControl,
}

/// Core Haptics AHAP ParameterId used to describe the Event type
#[derive(Debug, PartialEq, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ParameterId {
    HapticIntensity,
    HapticSharpness,
}

/// Core Haptics AHAP ParameterCurve control point structure
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParameterCurveControlPoint {
    pub time: f32,
    pub parameter_value: f32,
}

impl PartialEq for ParameterCurveControlPoint {
    fn eq(&self, other: &Self) -> bool {
        if (self.time - other.time).abs() <= DELTA_ERR {
            (self.parameter_value - other.parameter_value).abs() <= DELTA_ERR
        } else {
            false
        }
    }
}
