//! Breakpoint interpolation for players without envelope interpolation of
//! their own
//!
//! Players like vibrator-based actuators play each waveform entry at a
//! constant amplitude. To still get smooth ramps, the amplitude envelope is
//! densified here before waveform conversion, and breakpoints that the
//! target's amplitude resolution can't distinguish are removed again.

use crate::datamodel::v1::AmplitudeBreakpoint;
use crate::utils;

/// Parameters used by `Interpolator`
#[derive(Debug, PartialEq)]
pub struct InterpolationParameters {
    /// Quantization depth, the number of values available to represent an
    /// amplitude in a Waveform. E.g. for 8 bits there are 256 values of
    /// amplitude resolution.
    q_depth: u32,

    /// Minimum space between interpolated breakpoints
    min_time_step: f32,

    /// Sampling frequency of the interpolation linear space, based on
    /// min_time_step
    sampling_freq: f32,
}

impl InterpolationParameters {
    pub fn new(q_bits: u32, mut min_time_step: f32) -> Self {
        let q_depth = 2u32.pow(q_bits);

        let mut sampling_freq = 0.0;
        if min_time_step > 0.0 {
            sampling_freq = 1.0 / min_time_step;
        } else {
            min_time_step = 0.0;
        }

        Self {
            q_depth,
            min_time_step,
            sampling_freq,
        }
    }
}

/// Returns `total_points` evenly spaced values between `start` and `end`,
/// both included
fn linspace(start: f32, end: f32, total_points: usize) -> Vec<f32> {
    debug_assert!(total_points >= 2);
    let step = (end - start) / (total_points - 1) as f32;
    (0..total_points)
        .map(|i| start + step * i as f32)
        .collect()
}

pub struct Interpolator {
    parameters: InterpolationParameters,
}

impl Interpolator {
    pub fn new(parameters: InterpolationParameters) -> Self {
        Self { parameters }
    }

    /// Interpolates an array of amplitude breakpoints based on
    /// InterpolationParameters.
    ///
    /// Each pair of adjacent breakpoints is resampled into a denser segment,
    /// and redundant amplitude values that the player doesn't have the
    /// resolution to play are removed again.
    pub fn process(
        &self,
        amplitude_breakpoints: &[AmplitudeBreakpoint],
    ) -> Vec<AmplitudeBreakpoint> {
        let mut previous_breakpoint: Option<&AmplitudeBreakpoint> = None;
        let mut amplitude_breakpoints_interpolated = Vec::new();

        for breakpoint in amplitude_breakpoints {
            if let Some(previous) = previous_breakpoint {
                let (segment_times, segment_amplitudes) = self.linear_space_interpolation(
                    previous.time,
                    breakpoint.time,
                    previous.amplitude,
                    breakpoint.amplitude,
                );

                amplitude_breakpoints_interpolated
                    .extend(self.remove_redundant_amplitudes(segment_times, segment_amplitudes));
            }

            previous_breakpoint = Some(breakpoint);
        }
        amplitude_breakpoints_interpolated
    }

    /// Creates an array of linearly interpolated values between time_a and
    /// time_b, spaced by 1/sampling_freq.
    /// Always includes the original amplitude values for time_a and time_b.
    fn linear_space_interpolation(
        &self,
        time_a: f32,
        time_b: f32,
        amp_a: f32,
        amp_b: f32,
    ) -> (Vec<f32>, Vec<f32>) {
        debug_assert!(time_b >= time_a, "time_b needs to be after time_a");
        let interval = time_b - time_a;
        let total_points = ((self.parameters.sampling_freq * interval) + 1.0) as usize;

        let mut time_result: Vec<f32> = Vec::new();
        let mut amplitude_result: Vec<f32> = Vec::new();

        // With fewer than 3 points in the linear space there is nothing to
        // interpolate
        if interval > self.parameters.min_time_step && total_points >= 3 {
            let interp_time = linspace(time_a, time_b, total_points);

            // Clamp the time values to [time_a, time_b], as the linear space
            // borders can fall slightly outside of the range due to floating
            // point precision.
            for (time, amplitude) in interp_time.iter().zip(
                interp_time
                    .iter()
                    .map(|x| utils::interpolate(time_a, time_b, amp_a, amp_b, x.clamp(time_a, time_b))),
            ) {
                time_result.push(*time);
                amplitude_result.push(amplitude);
            }
        } else {
            // Return the original breakpoints if there's no interpolation to
            // be added
            time_result.push(time_a);
            time_result.push(time_b);

            amplitude_result.push(amp_a);
            amplitude_result.push(amp_b);
        }

        (time_result, amplitude_result)
    }

    /// Returns an AmplitudeBreakpoint array without amplitude points that
    /// belong to the same "quantization bin".
    ///
    /// A quantization bin is, with Q_DEPTH=256:
    ///     `bin = round(value * 256)/256`
    /// For example, 0.002, 0.003, 0.004 and 0.005 belong to the same bin,
    /// while 0.002 and 0.006 belong to different bins. Values in the same bin
    /// are played back with the same amplitude, so one breakpoint is enough
    /// to represent all of them.
    ///
    /// Always includes the original amplitude values for the first and last
    /// position.
    fn remove_redundant_amplitudes(
        &self,
        interp_time: Vec<f32>,
        interp_amp: Vec<f32>,
    ) -> Vec<AmplitudeBreakpoint> {
        let mut result = Vec::new();

        let time_first = *interp_time.first().unwrap_or(&0.0);
        let time_last = *interp_time.last().unwrap_or(&0.0);

        let mut current_quantization_bin = 0.0;
        let error_margin = f32::EPSILON;

        for (time, amp) in interp_time.iter().zip(interp_amp.iter()) {
            let amp_quantized =
                (amp * (self.parameters.q_depth as f32)).round() / (self.parameters.q_depth as f32);

            // Skip values in the current quantization bin, but always keep
            // the original first and last breakpoint
            if (amp_quantized - current_quantization_bin).abs() < error_margin
                && ((time - time_first).abs() > error_margin
                    && (time - time_last).abs() > error_margin)
            {
                continue;
            } else {
                result.push(AmplitudeBreakpoint {
                    time: *time,
                    amplitude: *amp,
                    emphasis: None,
                });
                current_quantization_bin = amp_quantized;
            }
        }

        result
    }
}
