//! Motion behaviors
//!
//! A behavior turns `(from, to, timing)` into a sequence of 60 Hz frames:
//!
//! - [`SpringBehavior`]: physically modeled, duration emerges from the physics
//! - [`TweenBehavior`]: eased interpolation over a fixed duration
//! - [`StaticBehavior`]: holds one value for a duration
//! - [`WaitBehavior`]: empty placeholder frames
//!
//! `fill` declares whether the last value persists in later timeline columns.
//! The per-behavior `frames` methods trust their times; [`Behavior::interpolate`]
//! and frame generation bound them with [`checked_frames`] first.

mod spring;
mod static_hold;
mod tween;
mod wait;

pub use spring::{SpringBehavior, SpringOptions, MAX_SPRING_FRAMES};
pub use static_hold::StaticBehavior;
pub use tween::{instantaneous_velocity, TweenBehavior};
pub use wait::WaitBehavior;

use segue_core::{time_to_frames, Result, SegueError};

use crate::easing::Easing;
use crate::frame::Frame;

/// Longest duration or delay, in frames, any behavior may span
pub const MAX_FRAMES: usize = MAX_SPRING_FRAMES;

/// Frame count of `time_ms`, rejecting times no behavior can sample
pub fn checked_frames(what: &str, time_ms: f64) -> Result<usize> {
    if !time_ms.is_finite() || time_ms < 0.0 {
        return Err(SegueError::InvalidBehavior(format!(
            "{what} must be a finite, non-negative number of milliseconds, got {time_ms}"
        )));
    }
    let frames = time_to_frames(time_ms);
    if frames > MAX_FRAMES {
        return Err(SegueError::InvalidBehavior(format!(
            "{what} of {time_ms}ms spans {frames} frames, more than {MAX_FRAMES}"
        )));
    }
    Ok(frames)
}

/// Any motion behavior
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Behavior {
    Spring(SpringBehavior),
    Tween(TweenBehavior),
    Static(StaticBehavior),
    Wait(WaitBehavior),
}

impl Default for Behavior {
    fn default() -> Self {
        Behavior::Spring(SpringBehavior::default())
    }
}

impl Behavior {
    pub fn spring(options: SpringOptions) -> Result<Self> {
        SpringBehavior::new(options).map(Behavior::Spring)
    }

    pub fn tween(easing: Easing) -> Self {
        Behavior::Tween(TweenBehavior::new(easing))
    }

    pub fn linear() -> Self {
        Behavior::Tween(TweenBehavior::linear())
    }

    pub fn hold() -> Self {
        Behavior::Static(StaticBehavior::new())
    }

    pub fn wait() -> Self {
        Behavior::Wait(WaitBehavior)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Behavior::Spring(_) => "spring",
            Behavior::Tween(_) => "tween",
            Behavior::Static(_) => "static",
            Behavior::Wait(_) => "wait",
        }
    }

    pub fn fill(&self) -> bool {
        match self {
            Behavior::Spring(spring) => spring.fill(),
            Behavior::Tween(tween) => tween.fill(),
            Behavior::Static(hold) => hold.fill(),
            Behavior::Wait(wait) => wait.fill(),
        }
    }

    /// Scalar frames for the interpolating behaviors
    ///
    /// Springs ignore `duration_ms`; tweens require it. Static and wait
    /// behaviors do not interpolate and are rejected.
    pub fn interpolate(
        &self,
        from: f64,
        to: f64,
        velocity: f64,
        duration_ms: Option<f64>,
        delay_ms: f64,
    ) -> Result<Vec<Frame>> {
        checked_frames("Delay", delay_ms)?;
        match self {
            Behavior::Spring(spring) => spring.frames(from, to, velocity, delay_ms),
            Behavior::Tween(tween) => {
                let duration = duration_ms.ok_or_else(|| {
                    SegueError::InvalidBehavior("Tween behavior requires a duration".to_string())
                })?;
                checked_frames("Duration", duration)?;
                Ok(tween.frames(from, to, duration, delay_ms))
            }
            Behavior::Static(_) | Behavior::Wait(_) => Err(SegueError::InvalidBehavior(format!(
                "{} behavior cannot interpolate between values",
                self.name()
            ))),
        }
    }
}

impl From<SpringBehavior> for Behavior {
    fn from(spring: SpringBehavior) -> Self {
        Behavior::Spring(spring)
    }
}

impl From<TweenBehavior> for Behavior {
    fn from(tween: TweenBehavior) -> Self {
        Behavior::Tween(tween)
    }
}

impl From<StaticBehavior> for Behavior {
    fn from(hold: StaticBehavior) -> Self {
        Behavior::Static(hold)
    }
}

impl From<WaitBehavior> for Behavior {
    fn from(wait: WaitBehavior) -> Self {
        Behavior::Wait(wait)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use segue_core::FRAME_DURATION_MS;

    #[test]
    fn test_checked_frames_bounds() {
        assert_eq!(checked_frames("Duration", 100.0).unwrap(), 6);
        assert_eq!(
            checked_frames("Duration", MAX_FRAMES as f64 * FRAME_DURATION_MS).unwrap(),
            MAX_FRAMES
        );
        for bad in [f64::NAN, f64::INFINITY, -1.0, 1e12] {
            assert!(matches!(
                checked_frames("Duration", bad),
                Err(SegueError::InvalidBehavior(_))
            ));
        }
    }

    #[test]
    fn test_interpolate_rejects_huge_durations() {
        let result = Behavior::linear().interpolate(0.0, 1.0, 0.0, Some(1e12), 0.0);
        assert!(matches!(result, Err(SegueError::InvalidBehavior(_))));
        let result = Behavior::linear().interpolate(0.0, 1.0, 0.0, Some(100.0), f64::INFINITY);
        assert!(matches!(result, Err(SegueError::InvalidBehavior(_))));
    }

    #[test]
    fn test_fill_per_behavior() {
        assert!(Behavior::default().fill());
        assert!(Behavior::linear().fill());
        assert!(Behavior::hold().fill());
        assert!(!Behavior::Static(StaticBehavior::transient()).fill());
        assert!(!Behavior::wait().fill());
    }

    #[test]
    fn test_tween_requires_duration() {
        let err = Behavior::linear().interpolate(0.0, 1.0, 0.0, None, 0.0);
        assert!(matches!(err, Err(SegueError::InvalidBehavior(_))));
    }

    #[test]
    fn test_static_does_not_interpolate() {
        assert!(Behavior::hold()
            .interpolate(0.0, 1.0, 0.0, Some(100.0), 0.0)
            .is_err());
        assert!(Behavior::wait()
            .interpolate(0.0, 1.0, 0.0, Some(100.0), 0.0)
            .is_err());
    }

    #[test]
    fn test_spring_ignores_duration() {
        let frames = Behavior::default()
            .interpolate(0.0, 1.0, 0.0, Some(1.0), 0.0)
            .unwrap();
        assert!(frames.len() > 2);
    }
}
