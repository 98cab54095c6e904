//! Conversion of amplitude breakpoints into vibrator waveform entries
//!
//! A Waveform is the representation vibrator-style drivers consume: a list
//! of durations in milliseconds, each played at a constant integer
//! amplitude.

use crate::datamodel::v1::AmplitudeBreakpoint;

/// A vibration pattern of constant-amplitude segments
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Waveform {
    /// Segment durations, in milliseconds
    pub timings: Vec<i64>,

    /// Amplitude per segment, from 0 to
    /// `WaveformConversionParameters::max_amplitude`
    pub amplitudes: Vec<i32>,
}

pub struct WaveformConversionParameters {
    pub max_amplitude: i32,
}

impl Waveform {
    /// Creates a Waveform from amplitude breakpoints.
    ///
    /// Each pair of consecutive breakpoints becomes one waveform entry: the
    /// duration is the time between the two breakpoints, and the amplitude
    /// is the amplitude of the first breakpoint.
    pub fn from_breakpoints(
        breakpoints: &[AmplitudeBreakpoint],
        parameters: WaveformConversionParameters,
    ) -> Self {
        let mut timings = Vec::<i64>::new();
        let mut amplitudes = Vec::<i32>::new();
        let mut accumulated_duration: f32 = 0.0;

        for breakpoint_pair in breakpoints.windows(2) {
            let breakpoint_a = &breakpoint_pair[0];
            let breakpoint_b = &breakpoint_pair[1];
            let duration = breakpoint_b.time - breakpoint_a.time;

            if duration > 0.0 {
                // Breakpoint timestamps are offsets in seconds, while
                // waveform timings are durations in milliseconds. Rounding
                // down to milliseconds accumulates an error over the clip, so
                // once the error (timing_error_ms) exceeds 1ms it is folded
                // back into the next entry's duration.
                let timing_error_ms = (breakpoint_a.time - accumulated_duration / 1000.0) * 1000.0;
                let duration_ms = ((duration * 1000.0) + timing_error_ms).round() as i64;

                if duration_ms > 0 {
                    timings.push(duration_ms);
                    accumulated_duration += duration_ms as f32;

                    // Envelope amplitudes go from 0 to 1, convert to
                    // 0..=max_amplitude
                    let amplitude =
                        (breakpoint_a.amplitude * parameters.max_amplitude as f32) as i32;
                    amplitudes.push(amplitude);
                }
            }
        }

        Self {
            timings,
            amplitudes,
        }
    }
}
