//! Small numeric helpers shared across the crate

/// Returns a value that is linearly interpolated between value_a and value_b.
///
/// The weight is calculated from the position of `time` in the interval
/// `[time_a, time_b]`.
pub fn interpolate(time_a: f32, time_b: f32, value_a: f32, value_b: f32, time: f32) -> f32 {
    debug_assert!(time_b >= time_a, "time_b needs to be after time_a");
    debug_assert!(
        time >= time_a && time <= time_b,
        "The time value needs to be within the interval [time_a, time_b]"
    );
    let time_diff = time_b - time_a;
    if time_diff == 0.0 {
        return value_b;
    }
    let value_diff = value_b - value_a;
    let factor = (time - time_a) / time_diff;
    value_a + value_diff * factor
}


/// A macro that asserts that two values are near enough to each other to be
/// considered equal
#[macro_export]
macro_rules! assert_near {
    ($a:expr, $b:expr, $allowed_difference:expr) => {{
        let a = $a;
        let b = $b;
        assert!(
            $crate::utils::test_utils::is_near(a, b, $allowed_difference),
            "assert_near: The difference between '{}' and '{}' \
             is greater than the allowed difference of {}",
            a,
            b,
            $allowed_difference
        );
    }};
}
