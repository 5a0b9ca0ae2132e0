//! Frame types
//!
//! Behaviors emit scalar [`Frame`]s; the frame generator lifts them into
//! [`PropertyFrame`]s carrying a style property and a full [`Value`].

use segue_core::Value;

/// One 60 Hz sample of a scalar motion
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    pub value: f64,
    /// Units per millisecond
    pub velocity: f64,
}

impl Frame {
    pub const fn new(value: f64, velocity: f64) -> Self {
        Self { value, velocity }
    }

    /// A frame that holds `value` without moving
    pub const fn at_rest(value: f64) -> Self {
        Self {
            value,
            velocity: 0.0,
        }
    }
}

/// One 60 Hz sample of a style property
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyFrame {
    pub property: String,
    pub value: Value,
    pub velocity: f64,
}

impl PropertyFrame {
    pub fn new(property: impl Into<String>, value: Value) -> Self {
        Self {
            property: property.into(),
            value,
            velocity: 0.0,
        }
    }

    pub fn with_velocity(mut self, velocity: f64) -> Self {
        self.velocity = velocity;
        self
    }
}

/// A column slot in the orchestration matrix
///
/// `None` is a wait placeholder: it occupies a column without contributing
/// any property.
pub type MatrixFrame = Option<PropertyFrame>;
