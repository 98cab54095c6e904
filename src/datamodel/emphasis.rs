//! Emphasis rendering for players without transient support
//!
//! Vibrator-style drivers can only play a continuous amplitude envelope, so
//! emphasis breakpoints are simulated by reshaping that envelope with short
//! ducking and peak areas around each emphasized breakpoint.

use crate::datamodel::v1::{AmplitudeBreakpoint, Emphasis};
use std::time::Duration;

pub struct EmphasisParameters {
    pub ducking_before_length: Duration,
    pub ducking_after_length: Duration,
    pub emphasis_length: Duration,
    pub ducking_amplitude: f32,
}

// The amplitude of the emphasis itself is ignored and the highest possible
// amplitude, 1.0, is used instead. That keeps the emulated emphasis distinct
// even when the surrounding continuous envelope is already loud.
const EMPHASIS_AMPLITUDE: f32 = 1.0;

impl Default for EmphasisParameters {
    fn default() -> Self {
        Self {
            ducking_before_length: Duration::from_millis(30),
            emphasis_length: Duration::from_millis(30),
            ducking_after_length: Duration::from_millis(30),
            ducking_amplitude: 0.0,
        }
    }
}

/// Renders the emphasis of breakpoints into the continuous amplitude signal.
///
/// A wrapper around Emphasizer, see Emphasizer for the algorithm.
pub fn emphasize(
    amplitude_breakpoints: &[AmplitudeBreakpoint],
    parameters: EmphasisParameters,
) -> Vec<AmplitudeBreakpoint> {
    let mut emphasizer = Emphasizer::new(parameters, amplitude_breakpoints);
    emphasizer.process();
    emphasizer.result()
}

/// Renders the emphasis of breakpoints into the continuous amplitude signal.
///
/// To render a breakpoint with emphasis, the following is done:
/// 1. The amplitude of the continuous signal is set to 0 for a short time
///    _before_ the breakpoint with emphasis.
///    This is called "ducking before" here. It creates a bigger and more
///    sudden change of amplitude at the breakpoint with emphasis, which more
///    closely resembles a transient. The length is controlled with
///    EmphasisParameters::ducking_before_length.
/// 2. The amplitude of the continuous signal is set to 1.0 for a short time
///    after the breakpoint with emphasis.
///    Without this, the emphasis would have a duration of zero, which a
///    Waveform can't represent. The length is controlled with
///    EmphasisParameters::emphasis_length.
/// 3. The amplitude of the continuous signal is set to 0 for a short time
///    _after_ the emphasis.
///    This is called "ducking after" here, and makes the emphasis feel
///    distinct from the rest of the continuous signal. The length is
///    controlled with EmphasisParameters::ducking_after_length.
///
/// The above algorithm is implemented in process().
struct Emphasizer<'bps> {
    parameters: EmphasisParameters,
    amplitude_breakpoints: &'bps [AmplitudeBreakpoint],
    result: Vec<AmplitudeBreakpoint>,
}

impl<'bps> Emphasizer<'bps> {
    pub fn new(
        parameters: EmphasisParameters,
        amplitude_breakpoints: &'bps [AmplitudeBreakpoint],
    ) -> Self {
        Self {
            parameters,
            amplitude_breakpoints,
            result: Vec::new(),
        }
    }

    pub fn result(self) -> Vec<AmplitudeBreakpoint> {
        self.result
    }

    // Iterates over all breakpoints and renders the emphasis by appending new
    // and transformed breakpoints to self.result.
    pub fn process(&mut self) {
        let mut next_emphasis = self
            .amplitude_breakpoints
            .iter()
            .find(|breakpoint| breakpoint.emphasis.is_some());
        let mut prev_emphasis: Option<&AmplitudeBreakpoint> = None;
        for (index, breakpoint) in self.amplitude_breakpoints.iter().enumerate() {
            match breakpoint.emphasis {
                None => {
                    self.process_normal_breakpoint(breakpoint, prev_emphasis, next_emphasis);
                }
                Some(emphasis) => {
                    self.process_emphasis_breakpoint(breakpoint, index, emphasis);
                    prev_emphasis = next_emphasis;
                    next_emphasis = self.amplitude_breakpoints[index + 1..]
                        .iter()
                        .find(|breakpoint| breakpoint.emphasis.is_some());
                }
            }
        }
    }

    // A normal breakpoint is either appended to self.result or skipped.
    // It is skipped if it falls within a ducking area or an emphasis area,
    // i.e. if it is closely before or closely after a breakpoint with
    // emphasis.
    fn process_normal_breakpoint(
        &mut self,
        breakpoint: &AmplitudeBreakpoint,
        prev_emphasis: Option<&AmplitudeBreakpoint>,
        next_emphasis: Option<&AmplitudeBreakpoint>,
    ) {
        let skip_due_to_ducking_before = match next_emphasis {
            None => false,
            Some(next_emphasis) => {
                let ducking_before_start = (next_emphasis.time
                    - self.parameters.ducking_before_length.as_secs_f32())
                .max(0.0);
                let ducking_before_range = ducking_before_start..=next_emphasis.time;
                ducking_before_range.contains(&breakpoint.time)
            }
        };
        let skip_due_to_emphasis_and_ducking_after = match prev_emphasis {
            None => false,
            Some(prev_emphasis) => {
                let emphasis_end =
                    prev_emphasis.time + self.parameters.emphasis_length.as_secs_f32();
                let ducking_after_end =
                    emphasis_end + self.parameters.ducking_after_length.as_secs_f32();
                let range = prev_emphasis.time..=ducking_after_end;
                range.contains(&breakpoint.time)
            }
        };
        let skip = skip_due_to_ducking_before || skip_due_to_emphasis_and_ducking_after;
        if !skip {
            self.result.push(breakpoint.clone());
        }
    }

    // For a breakpoint with emphasis, new breakpoints for the ducking areas
    // (before and after) and for the emphasis area are appended to
    // self.result.
    fn process_emphasis_breakpoint(
        &mut self,
        emphasis_breakpoint: &AmplitudeBreakpoint,
        emphasis_index: usize,
        emphasis: Emphasis,
    ) {
        self.process_ducking_before_area(emphasis_breakpoint, emphasis_index);
        self.process_emphasis_and_ducking_after_area(emphasis_breakpoint, emphasis_index, emphasis);
    }

    // Appends the breakpoints of the ducking before area to self.result.
    //
    // The ducking before area has up to 3 breakpoints:
    // 1. A breakpoint at the start of ducking before, with the amplitude the
    //    continuous amplitude signal would have had normally
    // 2. A breakpoint at the start of ducking before, with amplitude 0
    // 3. A breakpoint at the end of ducking before, with amplitude 0
    fn process_ducking_before_area(
        &mut self,
        emphasis_breakpoint: &AmplitudeBreakpoint,
        emphasis_index: usize,
    ) {
        let last_time = match self.result.last() {
            Some(last) => last.time,
            None => 0.0,
        };
        if emphasis_breakpoint.time <= last_time {
            return;
        }
        let ducking_before_start = (emphasis_breakpoint.time
            - self.parameters.ducking_before_length.as_secs_f32())
        .max(0.0)
        .max(last_time);
        let index_before_ducking_before = self.amplitude_breakpoints[..emphasis_index]
            .iter()
            .rposition(|breakpoint| breakpoint.time < ducking_before_start);

        // Breakpoint 1: Start of ducking before
        // The amplitude is interpolated from the breakpoints surrounding that
        // point.
        if let Some(index_before_ducking_before) = index_before_ducking_before {
            debug_assert!(index_before_ducking_before + 1 < self.amplitude_breakpoints.len());
            let breakpoint_before_ducking_before =
                &self.amplitude_breakpoints[index_before_ducking_before];
            let breakpoint_in_ducking_before =
                &self.amplitude_breakpoints[index_before_ducking_before + 1];
            debug_assert!((breakpoint_before_ducking_before.time
                ..=breakpoint_in_ducking_before.time)
                .contains(&ducking_before_start));
            let breakpoint_at_ducking_before_start =
                AmplitudeBreakpoint::from_interpolated_breakpoints(
                    breakpoint_before_ducking_before,
                    breakpoint_in_ducking_before,
                    ducking_before_start,
                );

            self.result.push(breakpoint_at_ducking_before_start);
        }

        // Breakpoint 2: Start of ducking before, amplitude 0
        self.result.push(AmplitudeBreakpoint {
            time: ducking_before_start,
            amplitude: self.parameters.ducking_amplitude,
            emphasis: None,
        });

        // Breakpoint 3: End of ducking before, amplitude 0
        self.result.push(AmplitudeBreakpoint {
            time: emphasis_breakpoint.time,
            amplitude: self.parameters.ducking_amplitude,
            emphasis: None,
        });
    }

    // Appends the breakpoints of the emphasis area and the ducking after area
    // to self.result.
    //
    // The emphasis and ducking after areas have up to 5 breakpoints:
    // 1. A breakpoint at the start of emphasis, with amplitude 1.0
    // 2. A breakpoint at the end of emphasis, with amplitude 1.0
    // 3. A breakpoint at the start of ducking after, with amplitude 0.0
    // 4. A breakpoint at the end of ducking after, with amplitude 0.0
    // 5. A breakpoint at the end of ducking after, with the amplitude the
    //    continuous amplitude signal would have had normally
    fn process_emphasis_and_ducking_after_area(
        &mut self,
        emphasis_breakpoint: &AmplitudeBreakpoint,
        emphasis_index: usize,
        _emphasis: Emphasis,
    ) {
        let last_time = match self.result.last() {
            Some(last) => last.time,
            None => 0.0,
        };

        let emphasis_start = emphasis_breakpoint.time.max(last_time);
        let emphasis_end = (emphasis_breakpoint.time
            + self.parameters.emphasis_length.as_secs_f32())
        .max(last_time);

        // An emphasis of 0ms duration happens when it falls completely into
        // the ducking after range of the previous emphasis breakpoint. There
        // is no space to render it, so it is skipped.
        if emphasis_end - emphasis_start <= f32::EPSILON {
            return;
        }

        // Breakpoint 1: Start of emphasis, amplitude 1.0
        self.result.push(AmplitudeBreakpoint {
            time: emphasis_start,
            amplitude: EMPHASIS_AMPLITUDE,
            emphasis: None,
        });

        // Breakpoint 2: End of emphasis, amplitude 1.0
        self.result.push(AmplitudeBreakpoint {
            time: emphasis_end,
            amplitude: EMPHASIS_AMPLITUDE,
            emphasis: None,
        });

        // No ducking after if this emphasis breakpoint is the last breakpoint
        // of the clip, the motor gets turned off after the clip ends anyway.
        if emphasis_index == self.amplitude_breakpoints.len() - 1 {
            return;
        }

        // Breakpoint 3: Start of ducking after, amplitude 0
        let ducking_after_start = emphasis_end;
        self.result.push(AmplitudeBreakpoint {
            time: ducking_after_start,
            amplitude: self.parameters.ducking_amplitude,
            emphasis: None,
        });

        // Breakpoint 4: End of ducking after, amplitude 0
        let ducking_after_end =
            ducking_after_start + self.parameters.ducking_after_length.as_secs_f32();
        self.result.push(AmplitudeBreakpoint {
            time: ducking_after_end,
            amplitude: self.parameters.ducking_amplitude,
            emphasis: None,
        });

        // Breakpoint 5: End of ducking after
        // The amplitude is interpolated from the breakpoints surrounding that
        // point.
        if emphasis_index < self.amplitude_breakpoints.len() - 1 {
            let start_index = emphasis_index + 1;
            let index_after_ducking_after = self.amplitude_breakpoints[start_index..]
                .iter()
                .position(|breakpoint| breakpoint.time > ducking_after_end)
                .map(|index| index + start_index);
            if let Some(index_after_ducking_after) = index_after_ducking_after {
                debug_assert!(index_after_ducking_after > emphasis_index);
                let breakpoint_after_ducking_after =
                    &self.amplitude_breakpoints[index_after_ducking_after];
                let breakpoint_in_emphasis_or_ducking_after =
                    &self.amplitude_breakpoints[index_after_ducking_after - 1];
                debug_assert!((breakpoint_in_emphasis_or_ducking_after.time
                    ..=breakpoint_after_ducking_after.time)
                    .contains(&ducking_after_end));
                let breakpoint_at_ducking_after_end =
                    AmplitudeBreakpoint::from_interpolated_breakpoints(
                        breakpoint_in_emphasis_or_ducking_after,
                        breakpoint_after_ducking_after,
                        ducking_after_end,
                    );
                self.result.push(breakpoint_at_ducking_after_end);
            }
        }
    }
}
