//! Frame generation
//!
//! Turns one property motion on one target into a sequence of matrix frames.
//! The value shape picks the interpolation strategy:
//!
//! - numbers and dimensions go straight through the behavior (unit kept)
//! - colors run the behavior once per channel
//! - multi-part values run the behavior once per part and re-serialize;
//!   parts that do not change are held with a static behavior whatever was
//!   requested
//!
//! Missing endpoints are read from the target's initial/final values under
//! the dasherized property name (`translateX` -> `translate-x`).

use std::borrow::Cow;

use tracing::warn;

use segue_core::{Color, ComplexPart, ComplexValue, Result, SegueError, Value};

use crate::behavior::{checked_frames, Behavior, StaticBehavior};
use crate::frame::{Frame, MatrixFrame, PropertyFrame};
use crate::timeline::{MotionOptions, PropertyMotion};

/// Something whose style values can be animated
pub trait MotionTarget {
    /// Value before the transition, keyed by dasherized property name
    fn initial_value(&self, property: &str) -> Option<Value>;

    /// Value after the transition, keyed by dasherized property name
    fn final_value(&self, property: &str) -> Option<Value>;
}

impl<T: MotionTarget + ?Sized> MotionTarget for &T {
    fn initial_value(&self, property: &str) -> Option<Value> {
        (**self).initial_value(property)
    }

    fn final_value(&self, property: &str) -> Option<Value> {
        (**self).final_value(property)
    }
}

/// Timing of a single property once durations are resolved
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTiming<'a> {
    pub behavior: &'a Behavior,
    pub duration_ms: Option<f64>,
    pub delay_ms: f64,
}

impl FrameTiming<'_> {
    /// Reject durations and delays too long or malformed to sample
    pub fn validate(&self) -> Result<()> {
        if let Some(duration) = self.duration_ms {
            checked_frames("Duration", duration)?;
        }
        checked_frames("Delay", self.delay_ms)?;
        Ok(())
    }
}

/// Map shorthand axis names to transform functions
pub fn normalize_property(property: &str) -> &str {
    match property {
        "x" => "translateX",
        "y" => "translateY",
        "z" => "translateZ",
        other => other,
    }
}

/// `backgroundColor` -> `background-color`
pub fn dasherize(property: &str) -> Cow<'_, str> {
    if !property.chars().any(|c| c.is_ascii_uppercase()) {
        return Cow::Borrowed(property);
    }
    let mut out = String::with_capacity(property.len() + 4);
    for c in property.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Generate the frames of one property of one target
pub fn generate_frames<T: MotionTarget + ?Sized>(
    target: &T,
    property: &str,
    motion: &PropertyMotion,
    timing: FrameTiming<'_>,
) -> Result<Vec<MatrixFrame>> {
    let property = normalize_property(property);
    timing.validate()?;

    if let Behavior::Wait(wait) = timing.behavior {
        let duration = timing.duration_ms.ok_or_else(|| {
            SegueError::InvalidBehavior("Wait behavior requires a duration".to_string())
        })?;
        return Ok(wait.frames(duration));
    }

    match motion {
        PropertyMotion::Hold(value) => {
            let Behavior::Static(hold) = timing.behavior else {
                return Err(SegueError::InvalidBehavior(
                    "Behavior must be static when holding a value".to_string(),
                ));
            };
            let duration = timing.duration_ms.ok_or_else(|| {
                SegueError::InvalidBehavior("Static behavior requires a duration".to_string())
            })?;
            let frame = PropertyFrame::new(property, value.clone());
            Ok(hold
                .frames(&frame, duration, timing.delay_ms)
                .into_iter()
                .map(Some)
                .collect())
        }
        PropertyMotion::Animate(options) => interpolate_property(target, property, options, timing),
    }
}

fn interpolate_property<T: MotionTarget + ?Sized>(
    target: &T,
    property: &str,
    options: &MotionOptions,
    timing: FrameTiming<'_>,
) -> Result<Vec<MatrixFrame>> {
    let key = dasherize(property);
    let from = options
        .from
        .clone()
        .or_else(|| target.initial_value(&key));
    let to = options.to.clone().or_else(|| target.final_value(&key));

    let (from, to) = match (from, to) {
        (Some(from), Some(to)) => (from, to),
        (None, None) => return Ok(Vec::new()),
        (from, to) => {
            warn!(property, ?from, ?to, "missing endpoint, property not animated");
            return Ok(Vec::new());
        }
    };

    if from == to {
        return Ok(Vec::new());
    }

    let frames: Vec<(Value, f64)> = match (&from, &to) {
        (
            Value::Number(_) | Value::Dimension { .. },
            Value::Number(_) | Value::Dimension { .. },
        ) => interpolate_numeric(property, &from, &to, options.velocity, timing)?,
        (Value::Color(a), Value::Color(b)) => interpolate_color(a, b, timing)?
            .into_iter()
            .map(|color| (Value::Color(color), 0.0))
            .collect(),
        (Value::Color(_), _) => {
            return Err(SegueError::IncompatibleValues(format!(
                "{property}: from is a color, but to is not ({from} -> {to})"
            )))
        }
        (Value::Complex(a), Value::Complex(b)) => interpolate_complex(property, a, b, timing)?
            .into_iter()
            .map(|complex| (Value::Complex(complex), 0.0))
            .collect(),
        (Value::Keyword(_), _) | (_, Value::Keyword(_)) => {
            warn!(property, %from, %to, "value is not animatable");
            return Ok(Vec::new());
        }
        _ => {
            return Err(SegueError::IncompatibleValues(format!(
                "{property}: cannot interpolate {from} -> {to}"
            )))
        }
    };

    Ok(frames
        .into_iter()
        .map(|(value, velocity)| {
            Some(PropertyFrame::new(property, value).with_velocity(velocity))
        })
        .collect())
}

fn interpolate_numeric(
    property: &str,
    from: &Value,
    to: &Value,
    velocity: f64,
    timing: FrameTiming<'_>,
) -> Result<Vec<(Value, f64)>> {
    let unit = match (from.unit(), to.unit()) {
        (Some(a), Some(b)) if a != b => {
            return Err(SegueError::IncompatibleValues(format!(
                "{property}: unit mismatch ({from} -> {to})"
            )))
        }
        (a, b) => a.or(b).map(str::to_string),
    };

    let (Some(start), Some(end)) = (from.as_number(), to.as_number()) else {
        return Ok(Vec::new());
    };

    let frames = timing.behavior.interpolate(
        start,
        end,
        velocity,
        timing.duration_ms,
        timing.delay_ms,
    )?;

    Ok(frames
        .into_iter()
        .map(|Frame { value, velocity }| {
            let value = match &unit {
                Some(unit) => Value::Dimension {
                    value,
                    unit: unit.clone(),
                },
                None => Value::Number(value),
            };
            (value, velocity)
        })
        .collect())
}

/// Interpolate RGB in 0-255 space and alpha in 0-1, one behavior run per
/// channel
fn interpolate_color(from: &Color, to: &Color, timing: FrameTiming<'_>) -> Result<Vec<Color>> {
    const SCALE: [f64; 4] = [255.0, 255.0, 255.0, 1.0];

    let from = from.to_array();
    let to = to.to_array();
    let mut channels: Vec<Vec<f64>> = Vec::with_capacity(4);
    for i in 0..4 {
        let (a, b) = (from[i] * SCALE[i], to[i] * SCALE[i]);
        let frames = if a == b {
            Vec::new()
        } else {
            timing
                .behavior
                .interpolate(a, b, 0.0, timing.duration_ms, timing.delay_ms)?
        };
        channels.push(frames.into_iter().map(|f| f.value / SCALE[i]).collect());
    }

    // Channels settle at different times under a spring; hold each at its
    // target once it is done
    let len = channels.iter().map(Vec::len).max().unwrap_or(0);
    Ok((0..len)
        .map(|index| {
            let mut rgba = [0.0; 4];
            for (i, channel) in channels.iter().enumerate() {
                rgba[i] = channel.get(index).copied().unwrap_or(to[i]);
            }
            Color::from_array(rgba)
        })
        .collect())
}

fn interpolate_complex(
    property: &str,
    from: &ComplexValue,
    to: &ComplexValue,
    timing: FrameTiming<'_>,
) -> Result<Vec<ComplexValue>> {
    if !from.is_compatible(to) {
        return Err(SegueError::IncompatibleValues(format!(
            "{property}: {from} and {to} do not share a structure"
        )));
    }
    if matches!(timing.behavior, Behavior::Spring(_)) {
        return Err(SegueError::InvalidBehavior(
            "Spring behavior is not currently supported for complex values".to_string(),
        ));
    }

    let hold = StaticBehavior::new();
    let mut part_frames: Vec<Vec<ComplexPart>> = Vec::new();
    for (a, b) in from.animatable_parts().zip(to.animatable_parts()) {
        let frames = if a == b {
            let duration = timing.duration_ms.ok_or_else(|| {
                SegueError::InvalidBehavior("Static behavior requires a duration".to_string())
            })?;
            hold.frames(a, duration, timing.delay_ms)
        } else {
            match (a, b) {
                (ComplexPart::Number(x), ComplexPart::Number(y)) => timing
                    .behavior
                    .interpolate(*x, *y, 0.0, timing.duration_ms, timing.delay_ms)?
                    .into_iter()
                    .map(|frame| ComplexPart::Number(frame.value))
                    .collect(),
                (ComplexPart::Color(x), ComplexPart::Color(y)) => interpolate_color(x, y, timing)?
                    .into_iter()
                    .map(ComplexPart::Color)
                    .collect(),
                _ => {
                    return Err(SegueError::IncompatibleValues(format!(
                        "{property}: mismatched parts in {from} -> {to}"
                    )))
                }
            }
        };
        part_frames.push(frames);
    }

    let len = part_frames.iter().map(Vec::len).max().unwrap_or(0);
    let targets: Vec<&ComplexPart> = to.animatable_parts().collect();
    let mut result = Vec::with_capacity(len);
    for index in 0..len {
        let parts: Vec<ComplexPart> = part_frames
            .iter()
            .zip(targets.iter())
            .map(|(frames, target)| frames.get(index).unwrap_or(*target).clone())
            .collect();
        if let Some(value) = from.with_parts(&parts) {
            result.push(value);
        }
    }
    Ok(result)
}
