// Shared test helpers for datamodel tests

use crate::datamodel::v1::{AmplitudeBreakpoint, Emphasis};
use crate::datamodel::waveform::Waveform;
use crate::utils::test_utils::rounded_f32;

/// Helper to create an AmplitudeBreakpoint with rounded values
pub fn amp(time: f32, amplitude: f32) -> AmplitudeBreakpoint {
    AmplitudeBreakpoint {
        time: rounded_f32(time, 5),
        amplitude: rounded_f32(amplitude, 5),
        emphasis: None,
    }
}

/// Helper to create an AmplitudeBreakpoint with emphasis
pub fn emp(
    time: f32,
    amplitude: f32,
    emphasis_amplitude: f32,
    emphasis_frequency: f32,
) -> AmplitudeBreakpoint {
    AmplitudeBreakpoint {
        time,
        amplitude,
        emphasis: Some(Emphasis {
            amplitude: emphasis_amplitude,
            frequency: emphasis_frequency,
        }),
    }
}

/// Creates a Waveform from an array of (timing, amplitude) tuples
pub fn create_waveform(entries: &[(i64, i32)]) -> Waveform {
    let timings = entries.iter().map(|entry| entry.0).collect();
    let amplitudes = entries.iter().map(|entry| entry.1).collect();
    Waveform {
        timings,
        amplitudes,
    }
}

/// Rounds time and amplitude of every breakpoint, to avoid floating-point
/// precision problems when comparing breakpoint lists
pub fn rounded_amplitude_breakpoints(
    amplitude_breakpoints: &[AmplitudeBreakpoint],
) -> Vec<AmplitudeBreakpoint> {
    amplitude_breakpoints
        .iter()
        .map(|x| AmplitudeBreakpoint {
            time: rounded_f32(x.time, 5),
            amplitude: rounded_f32(x.amplitude, 5),
            emphasis: x.emphasis,
        })
        .collect::<Vec<AmplitudeBreakpoint>>()
}
