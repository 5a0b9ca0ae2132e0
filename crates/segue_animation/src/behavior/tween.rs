//! Eased interpolation over a fixed duration

use segue_core::{time_to_frames, FRAME_DURATION_MS};

use crate::easing::Easing;
use crate::frame::Frame;

/// Tween between two numbers with an easing curve
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TweenBehavior {
    easing: Easing,
}

impl TweenBehavior {
    pub fn new(easing: Easing) -> Self {
        Self { easing }
    }

    pub fn linear() -> Self {
        Self::new(Easing::Linear)
    }

    pub fn easing(&self) -> Easing {
        self.easing
    }

    /// Tweens hold their final value
    pub fn fill(&self) -> bool {
        true
    }

    /// Generate `delay` frames holding `from`, then `duration` frames plus
    /// one landing exactly on `to`
    pub fn frames(&self, from: f64, to: f64, duration_ms: f64, delay_ms: f64) -> Vec<Frame> {
        let delay_frames = time_to_frames(delay_ms);
        let motion_frames = time_to_frames(duration_ms);

        let values: Vec<f64> = (0..=motion_frames)
            .map(|i| {
                let t = if motion_frames == 0 {
                    1.0
                } else {
                    i as f64 / motion_frames as f64
                };
                from + (to - from) * self.easing.apply(t)
            })
            .collect();

        let mut frames = Vec::with_capacity(delay_frames + values.len());
        frames.extend(std::iter::repeat(Frame::at_rest(from)).take(delay_frames));
        frames.extend(
            values
                .iter()
                .enumerate()
                .map(|(i, value)| Frame::new(*value, central_difference(&values, i))),
        );
        frames
    }
}

/// Velocity at `time_ms` into an already generated frame sequence
///
/// Used to hand a realistic starting velocity to whatever motion replaces an
/// interrupted tween. `time_ms` is clamped to `duration_ms` and to the frame
/// range.
pub fn instantaneous_velocity(time_ms: f64, duration_ms: f64, frames: &[Frame]) -> f64 {
    if frames.len() < 2 {
        return 0.0;
    }
    let index = time_to_frames(time_ms.min(duration_ms)).min(frames.len() - 1);
    let values: Vec<f64> = frames.iter().map(|frame| frame.value).collect();
    central_difference(&values, index)
}

/// Symmetric finite difference, one-sided at the ends (units per ms)
fn central_difference(values: &[f64], index: usize) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let previous = index.saturating_sub(1);
    let next = (index + 1).min(values.len() - 1);
    let span = (next - previous) as f64 * FRAME_DURATION_MS;
    (values[next] - values[previous]) / span
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_frame_tween_has_four_frames() {
        let frames = TweenBehavior::linear().frames(10.0, 20.0, 3.0 * FRAME_DURATION_MS, 0.0);
        let values: Vec<f64> = frames.iter().map(|f| f.value).collect();
        assert_eq!(values, vec![10.0, 13.333333333333332, 16.666666666666664, 20.0]);
    }

    #[test]
    fn test_delay_frames_hold_from() {
        let frames = TweenBehavior::linear().frames(0.0, 1.0, 100.0, 50.0);
        assert_eq!(frames.len(), 3 + 6 + 1);
        assert!(frames[..3].iter().all(|f| *f == Frame::at_rest(0.0)));
        assert_eq!(frames.last().unwrap().value, 1.0);
    }

    #[test]
    fn test_zero_duration_jumps_to_target() {
        let frames = TweenBehavior::linear().frames(0.0, 5.0, 0.0, 0.0);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].value, 5.0);
    }

    #[test]
    fn test_eased_tween_lands_on_endpoints() {
        let frames = TweenBehavior::new(Easing::EaseInOut).frames(-50.0, 50.0, 500.0, 0.0);
        assert_eq!(frames.first().unwrap().value, -50.0);
        assert_eq!(frames.last().unwrap().value, 50.0);
    }

    #[test]
    fn test_linear_velocity_is_slope() {
        let frames = TweenBehavior::linear().frames(0.0, 100.0, 1000.0, 0.0);
        let slope = 100.0 / 1000.0;

        for time in [0.0, 250.0, 500.0, 1000.0] {
            let velocity = instantaneous_velocity(time, 1000.0, &frames);
            assert!((velocity - slope).abs() < 1e-9, "at {time}ms: {velocity}");
        }
        assert!((frames[30].velocity - slope).abs() < 1e-9);
    }

    #[test]
    fn test_velocity_of_eased_tween_peaks_mid_flight() {
        let frames = TweenBehavior::new(Easing::InOutCubic).frames(0.0, 100.0, 1000.0, 0.0);
        let start = instantaneous_velocity(0.0, 1000.0, &frames);
        let middle = instantaneous_velocity(500.0, 1000.0, &frames);
        assert!(middle > start);
    }

    #[test]
    fn test_velocity_of_short_sequences() {
        assert_eq!(instantaneous_velocity(0.0, 0.0, &[]), 0.0);
        assert_eq!(instantaneous_velocity(0.0, 0.0, &[Frame::at_rest(3.0)]), 0.0);
    }
}
