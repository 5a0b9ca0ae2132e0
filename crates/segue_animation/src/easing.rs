//! Easing functions
//!
//! CSS-compatible timing curves plus the polynomial family. Every curve maps
//! `0.0 -> 0.0` and `1.0 -> 1.0` exactly, so tweens always land on their
//! endpoints.

use std::fmt;
use std::str::FromStr;

use nom::{
    bytes::complete::tag_no_case,
    character::complete::{char, multispace0},
    combinator::all_consuming,
    number::complete::double,
    sequence::delimited,
    Finish, IResult,
};
use serde::{Deserialize, Serialize};

use segue_core::SegueError;

/// Easing curve applied to tween progress
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    #[default]
    Linear,
    /// `cubic-bezier(0.25, 0.1, 0.25, 1)`
    Ease,
    /// `cubic-bezier(0.42, 0, 1, 1)`
    EaseIn,
    /// `cubic-bezier(0, 0, 0.58, 1)`
    EaseOut,
    /// `cubic-bezier(0.42, 0, 0.58, 1)`
    EaseInOut,
    InQuad,
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
    CubicBezier { x1: f64, y1: f64, x2: f64, y2: f64 },
}

impl Easing {
    /// Map linear progress to eased progress
    pub fn apply(&self, t: f64) -> f64 {
        if t <= 0.0 {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }

        match *self {
            Easing::Linear => t,
            Easing::Ease => cubic_bezier(0.25, 0.1, 0.25, 1.0, t),
            Easing::EaseIn => cubic_bezier(0.42, 0.0, 1.0, 1.0, t),
            Easing::EaseOut => cubic_bezier(0.0, 0.0, 0.58, 1.0, t),
            Easing::EaseInOut => cubic_bezier(0.42, 0.0, 0.58, 1.0, t),
            Easing::InQuad => t * t,
            Easing::OutQuad => t * (2.0 - t),
            Easing::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Easing::InCubic => t * t * t,
            Easing::OutCubic => {
                let t1 = t - 1.0;
                t1 * t1 * t1 + 1.0
            }
            Easing::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let t1 = 2.0 * t - 2.0;
                    0.5 * t1 * t1 * t1 + 1.0
                }
            }
            Easing::CubicBezier { x1, y1, x2, y2 } => cubic_bezier(x1, y1, x2, y2, t),
        }
    }

    /// Custom cubic bezier, `None` when an x control point leaves `[0, 1]`
    pub fn cubic_bezier(x1: f64, y1: f64, x2: f64, y2: f64) -> Option<Self> {
        ((0.0..=1.0).contains(&x1) && (0.0..=1.0).contains(&x2))
            .then_some(Easing::CubicBezier { x1, y1, x2, y2 })
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Easing::Linear => f.write_str("linear"),
            Easing::Ease => f.write_str("ease"),
            Easing::EaseIn => f.write_str("ease-in"),
            Easing::EaseOut => f.write_str("ease-out"),
            Easing::EaseInOut => f.write_str("ease-in-out"),
            Easing::InQuad => f.write_str("in-quad"),
            Easing::OutQuad => f.write_str("out-quad"),
            Easing::InOutQuad => f.write_str("in-out-quad"),
            Easing::InCubic => f.write_str("in-cubic"),
            Easing::OutCubic => f.write_str("out-cubic"),
            Easing::InOutCubic => f.write_str("in-out-cubic"),
            Easing::CubicBezier { x1, y1, x2, y2 } => {
                write!(f, "cubic-bezier({x1}, {y1}, {x2}, {y2})")
            }
        }
    }
}

impl FromStr for Easing {
    type Err = SegueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        let easing = match name.to_ascii_lowercase().as_str() {
            "linear" => Easing::Linear,
            "ease" => Easing::Ease,
            "ease-in" => Easing::EaseIn,
            "ease-out" => Easing::EaseOut,
            "ease-in-out" => Easing::EaseInOut,
            "in-quad" => Easing::InQuad,
            "out-quad" => Easing::OutQuad,
            "in-out-quad" => Easing::InOutQuad,
            "in-cubic" => Easing::InCubic,
            "out-cubic" => Easing::OutCubic,
            "in-out-cubic" => Easing::InOutCubic,
            _ => return parse_cubic_bezier(name),
        };
        Ok(easing)
    }
}

fn bezier_arg(input: &str) -> IResult<&str, f64> {
    delimited(multispace0, double, multispace0)(input)
}

fn bezier_args(input: &str) -> IResult<&str, (f64, f64, f64, f64)> {
    let (input, _) = tag_no_case("cubic-bezier")(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = char('(')(input)?;
    let (input, x1) = bezier_arg(input)?;
    let (input, _) = char(',')(input)?;
    let (input, y1) = bezier_arg(input)?;
    let (input, _) = char(',')(input)?;
    let (input, x2) = bezier_arg(input)?;
    let (input, _) = char(',')(input)?;
    let (input, y2) = bezier_arg(input)?;
    let (input, _) = char(')')(input)?;
    Ok((input, (x1, y1, x2, y2)))
}

fn parse_cubic_bezier(input: &str) -> Result<Easing, SegueError> {
    match all_consuming(bezier_args)(input).finish() {
        Ok((_, (x1, y1, x2, y2))) => Easing::cubic_bezier(x1, y1, x2, y2)
            .ok_or_else(|| SegueError::Parse(format!("bezier x out of range: {input}"))),
        Err(_) => Err(SegueError::Parse(format!("unknown easing: {input}"))),
    }
}

// ============================================================================
// Cubic bezier solver
// ============================================================================

fn cubic_bezier(x1: f64, y1: f64, x2: f64, y2: f64, progress: f64) -> f64 {
    let t = solve_bezier_x(x1, x2, progress);
    bezier_component(y1, y2, t)
}

/// Newton-Raphson for the curve parameter, bisection when the slope vanishes
fn solve_bezier_x(x1: f64, x2: f64, target_x: f64) -> f64 {
    let mut t = target_x;
    for _ in 0..8 {
        let x = bezier_component(x1, x2, t) - target_x;
        if x.abs() < 1e-7 {
            return t;
        }
        let dx = bezier_derivative(x1, x2, t);
        if dx.abs() < 1e-7 {
            break;
        }
        t = (t - x / dx).clamp(0.0, 1.0);
    }

    let (mut lo, mut hi) = (0.0, 1.0);
    t = target_x;
    for _ in 0..32 {
        let x = bezier_component(x1, x2, t);
        if (x - target_x).abs() < 1e-7 {
            break;
        }
        if x < target_x {
            lo = t;
        } else {
            hi = t;
        }
        t = (lo + hi) / 2.0;
    }
    t
}

/// One axis of the curve: `3(1-t)^2 t p1 + 3(1-t) t^2 p2 + t^3`
#[inline]
fn bezier_component(p1: f64, p2: f64, t: f64) -> f64 {
    let mt = 1.0 - t;
    3.0 * mt * mt * t * p1 + 3.0 * mt * t * t * p2 + t * t * t
}

#[inline]
fn bezier_derivative(p1: f64, p2: f64, t: f64) -> f64 {
    let mt = 1.0 - t;
    3.0 * mt * mt * p1 + 6.0 * mt * t * (p2 - p1) + 3.0 * t * t * (1.0 - p2)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 0.001;

    const ALL: [Easing; 11] = [
        Easing::Linear,
        Easing::Ease,
        Easing::EaseIn,
        Easing::EaseOut,
        Easing::EaseInOut,
        Easing::InQuad,
        Easing::OutQuad,
        Easing::InOutQuad,
        Easing::InCubic,
        Easing::OutCubic,
        Easing::InOutCubic,
    ];

    #[test]
    fn test_endpoints_are_exact() {
        for easing in ALL {
            assert_eq!(easing.apply(0.0), 0.0, "{easing}");
            assert_eq!(easing.apply(1.0), 1.0, "{easing}");
        }
    }

    #[test]
    fn test_curves_are_monotonic() {
        for easing in ALL {
            let mut previous = 0.0;
            for i in 1..=20 {
                let value = easing.apply(i as f64 / 20.0);
                assert!(value + EPSILON >= previous, "{easing} at step {i}");
                previous = value;
            }
        }
    }

    #[test]
    fn test_ease_shapes() {
        let mid = Easing::Ease.apply(0.5);
        assert!(mid > 0.7 && mid < 0.9, "ease mid-point was {mid}");
        assert!(Easing::EaseIn.apply(0.25) < 0.25);
        assert!(Easing::EaseOut.apply(0.25) > 0.25);
        assert!((Easing::EaseInOut.apply(0.5) - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_linear_bezier_matches_linear() {
        let linear = Easing::cubic_bezier(0.0, 0.0, 1.0, 1.0).unwrap();
        for i in 0..=10 {
            let t = i as f64 / 10.0;
            assert!((linear.apply(t) - t).abs() < EPSILON);
        }
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("ease-in-out".parse::<Easing>().unwrap(), Easing::EaseInOut);
        assert_eq!(" Linear ".parse::<Easing>().unwrap(), Easing::Linear);
        assert_eq!(
            "cubic-bezier(0.4, 0, 0.2, 1)".parse::<Easing>().unwrap(),
            Easing::CubicBezier {
                x1: 0.4,
                y1: 0.0,
                x2: 0.2,
                y2: 1.0
            }
        );
        assert!("cubic-bezier(2, 0, 0.2, 1)".parse::<Easing>().is_err());
        assert!("bouncy".parse::<Easing>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for easing in ALL {
            assert_eq!(easing.to_string().parse::<Easing>().unwrap(), easing);
        }
    }
}
