//! Spring physics behavior
//!
//! Closed-form damped harmonic oscillator, sampled at 60 Hz. The damping
//! ratio picks one of three solutions:
//!
//! - underdamped (`zeta < 1`): decaying oscillation
//! - critically damped (`zeta == 1`): fastest settle without overshoot
//! - overdamped (`zeta > 1`): slow settle, only when `allows_overdamping`
//!   is set; otherwise the ratio is clamped to 1
//!
//! Time is in milliseconds and velocity in units per millisecond.

use serde::{Deserialize, Serialize};
use tracing::trace;

use segue_core::{Result, SegueError, FRAME_DURATION_MS};

use super::checked_frames;
use crate::frame::Frame;

/// Runaway guard for pathological configurations
pub const MAX_SPRING_FRAMES: usize = 10_000;

/// Configuration for a spring
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringOptions {
    pub stiffness: f64,
    pub damping: f64,
    pub mass: f64,
    /// Stop as soon as the value crosses the target
    pub overshoot_clamping: bool,
    pub allows_overdamping: bool,
    pub rest_velocity_threshold: f64,
    pub rest_displacement_threshold: f64,
}

impl Default for SpringOptions {
    fn default() -> Self {
        Self {
            stiffness: 100.0,
            damping: 10.0,
            mass: 1.0,
            overshoot_clamping: false,
            allows_overdamping: false,
            rest_velocity_threshold: 0.001,
            rest_displacement_threshold: 0.001,
        }
    }
}

impl SpringOptions {
    pub fn new(stiffness: f64, damping: f64, mass: f64) -> Self {
        Self {
            stiffness,
            damping,
            mass,
            ..Self::default()
        }
    }

    /// A gentle, slow spring (good for page transitions)
    pub fn gentle() -> Self {
        Self::new(120.0, 14.0, 1.0)
    }

    /// A wobbly spring with overshoot (good for playful UI)
    pub fn wobbly() -> Self {
        Self::new(180.0, 12.0, 1.0)
    }

    /// A stiff spring (good for buttons)
    pub fn stiff() -> Self {
        Self::new(400.0, 30.0, 1.0)
    }

    /// A very stiff spring with minimal oscillation
    pub fn snappy() -> Self {
        Self::new(600.0, 40.0, 1.0)
    }

    /// A slow spring with no overshoot (critically damped)
    pub fn molasses() -> Self {
        Self::new(100.0, 20.0, 1.0)
    }

    pub fn with_overshoot_clamping(mut self, clamp: bool) -> Self {
        self.overshoot_clamping = clamp;
        self
    }

    pub fn with_overdamping(mut self, allow: bool) -> Self {
        self.allows_overdamping = allow;
        self
    }

    /// Damping that makes this spring critically damped
    pub fn critical_damping(&self) -> f64 {
        2.0 * (self.stiffness * self.mass).sqrt()
    }

    /// Dimensionless damping ratio
    pub fn damping_ratio(&self) -> f64 {
        self.damping / self.critical_damping()
    }

    /// Check if the spring is underdamped (will oscillate)
    pub fn is_underdamped(&self) -> bool {
        self.damping_ratio() < 1.0
    }

    pub fn is_critically_damped(&self) -> bool {
        (self.damping_ratio() - 1.0).abs() < 1e-6
    }

    pub fn is_overdamped(&self) -> bool {
        self.damping_ratio() > 1.0
    }
}

/// Spring-driven motion between two numbers
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpringBehavior {
    options: SpringOptions,
}

impl Default for SpringBehavior {
    fn default() -> Self {
        Self {
            options: SpringOptions::default(),
        }
    }
}

impl SpringBehavior {
    /// Validate and wrap spring options
    pub fn new(options: SpringOptions) -> Result<Self> {
        let positive = |name: &str, value: f64| {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(SegueError::InvalidBehavior(format!(
                    "{name} value must be greater than 0, got {value}"
                )))
            }
        };
        positive("Mass", options.mass)?;
        positive("Stiffness", options.stiffness)?;
        positive("Damping", options.damping)?;

        Ok(Self { options })
    }

    pub fn options(&self) -> &SpringOptions {
        &self.options
    }

    /// Springs hold their final value once settled
    pub fn fill(&self) -> bool {
        true
    }

    /// Generate frames from `from` to `to`
    ///
    /// `velocity` is the initial velocity in units per millisecond, signed
    /// along the value axis (`y'(0) = velocity`): positive moves toward larger
    /// values, so a handed-off velocity is passed through without negation.
    /// Delay frames hold `from`. No motion (`from == to` with zero velocity)
    /// yields no frames at all, delay included.
    pub fn frames(&self, from: f64, to: f64, velocity: f64, delay_ms: f64) -> Result<Vec<Frame>> {
        if from.is_nan() || to.is_nan() {
            return Err(SegueError::InvalidBehavior(format!(
                "cannot calculate spring for non-numerical values: {from} -> {to}"
            )));
        }

        if from == to && velocity == 0.0 {
            return Ok(Vec::new());
        }

        let delay_frames = checked_frames("Delay", delay_ms)?;
        let mut frames = Vec::with_capacity(delay_frames + 64);
        frames.extend(std::iter::repeat(Frame::at_rest(from)).take(delay_frames));

        let solution = Oscillator::new(&self.options, from - to, velocity);

        let mut time = 0.0;
        let mut value = from;
        let mut current_velocity = velocity;
        let mut steps = 0;
        while !self.is_at_rest(to, value, current_velocity) && steps < MAX_SPRING_FRAMES {
            steps += 1;
            let (displacement, slope) = solution.at(time);
            let frame = self.finalize(Frame::new(to + displacement, slope), from, to);
            time += FRAME_DURATION_MS;
            value = frame.value;
            current_velocity = frame.velocity;
            frames.push(frame);
        }

        if steps == MAX_SPRING_FRAMES {
            trace!(
                from,
                to,
                stiffness = self.options.stiffness,
                damping = self.options.damping,
                "spring did not settle, truncated at {MAX_SPRING_FRAMES} frames"
            );
        }

        Ok(frames)
    }

    /// Both displacement and velocity are below their thresholds
    pub fn is_at_rest(&self, to: f64, value: f64, velocity: f64) -> bool {
        velocity.abs() <= self.options.rest_velocity_threshold
            && (to - value).abs() <= self.options.rest_displacement_threshold
    }

    /// With clamping on, the value has crossed `to` in the direction of travel
    pub fn is_overshooting(&self, from: f64, to: f64, value: f64) -> bool {
        if !self.options.overshoot_clamping {
            return false;
        }
        if from < to {
            value > to
        } else {
            value < to
        }
    }

    /// Snap to the exact target once the motion is over
    fn finalize(&self, frame: Frame, from: f64, to: f64) -> Frame {
        if self.is_overshooting(from, to, frame.value)
            || self.is_at_rest(to, frame.value, frame.velocity)
        {
            Frame::at_rest(to)
        } else {
            frame
        }
    }
}

// =============================================================================
// Closed-form solutions
// =============================================================================

/// Displacement `y = x - to` of a damped oscillator with `y(0) = y0` and
/// `y'(0) = v0`
#[derive(Clone, Copy, Debug)]
enum Oscillator {
    Underdamped {
        decay: f64,
        omega_d: f64,
        omega0: f64,
        zeta: f64,
        y0: f64,
        v0: f64,
    },
    Critical {
        omega0: f64,
        y0: f64,
        v0: f64,
    },
    /// Sum of two real exponentials `c1 e^(r1 t) + c2 e^(r2 t)`
    Overdamped { r1: f64, r2: f64, c1: f64, c2: f64 },
}

impl Oscillator {
    fn new(options: &SpringOptions, y0: f64, v0: f64) -> Self {
        let SpringOptions {
            stiffness: k,
            damping: c,
            mass: m,
            ..
        } = *options;

        let mut zeta = c / (2.0 * (k * m).sqrt());
        // rad/ms
        let omega0 = (k / m).sqrt() / 1000.0;

        if zeta > 1.0 && !options.allows_overdamping {
            zeta = 1.0;
        }

        if (zeta - 1.0).abs() < 1e-9 {
            Oscillator::Critical { omega0, y0, v0 }
        } else if zeta < 1.0 {
            Oscillator::Underdamped {
                decay: zeta * omega0,
                omega_d: omega0 * (1.0 - zeta * zeta).sqrt(),
                omega0,
                zeta,
                y0,
                v0,
            }
        } else {
            let root = omega0 * (zeta * zeta - 1.0).sqrt();
            let r1 = -zeta * omega0 + root;
            let r2 = -zeta * omega0 - root;
            let c1 = (v0 - r2 * y0) / (r1 - r2);
            Oscillator::Overdamped {
                r1,
                r2,
                c1,
                c2: y0 - c1,
            }
        }
    }

    /// Displacement and velocity at `t` milliseconds
    fn at(&self, t: f64) -> (f64, f64) {
        match *self {
            Oscillator::Underdamped {
                decay,
                omega_d,
                omega0,
                zeta,
                y0,
                v0,
            } => {
                let envelope = (-decay * t).exp();
                let (sin, cos) = (omega_d * t).sin_cos();
                let b = (v0 + decay * y0) / omega_d;
                let displacement = envelope * (y0 * cos + b * sin);
                let velocity = envelope
                    * (v0 * cos - ((zeta * omega0 * v0 + omega0 * omega0 * y0) / omega_d) * sin);
                (displacement, velocity)
            }
            Oscillator::Critical { omega0, y0, v0 } => {
                let envelope = (-omega0 * t).exp();
                let b = v0 + omega0 * y0;
                let displacement = envelope * (y0 + b * t);
                let velocity = envelope * (v0 - omega0 * t * b);
                (displacement, velocity)
            }
            Oscillator::Overdamped { r1, r2, c1, c2 } => {
                let e1 = (r1 * t).exp();
                let e2 = (r2 * t).exp();
                (c1 * e1 + c2 * e2, c1 * r1 * e1 + c2 * r2 * e2)
            }
        }
    }
}
