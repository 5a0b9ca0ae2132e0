//! Segue Core
//!
//! Foundational types shared by the Segue transition engine:
//!
//! - **Element handles**: opaque ids supplied by the host's visual tree
//! - **Element provider**: measurement and keyframe playback contract
//! - **Snapshots**: immutable geometry + computed style captures
//! - **Style values**: numbers, dimensions, colors and multi-part values,
//!   parsed from and serialized back to CSS-like text
//! - **Keyframes**: per-column property maps handed to playback
//!
//! # Example
//!
//! ```rust
//! use segue_core::{Value, Color};
//!
//! let width: Value = "120px".parse().unwrap();
//! assert_eq!(width.to_string(), "120px");
//!
//! let red: Value = "#ff0000".parse().unwrap();
//! assert_eq!(red, Value::Color(Color::rgb(1.0, 0.0, 0.0)));
//! ```

pub mod color;
pub mod element;
pub mod error;
pub mod geometry;
pub mod keyframe;
pub mod snapshot;
pub mod value;

pub use color::Color;
pub use element::{
    AnimationHandle, AnimationOptions, Completion, ElementId, ElementProvider, FillMode,
    MeasureOptions, PlayState, SharedAnimation,
};
pub use error::{Result, SegueError};
pub use geometry::Rect;
pub use keyframe::Keyframe;
pub use snapshot::{Snapshot, StyleMap};
pub use value::{ComplexPart, ComplexValue, Value};

/// Sampling rate of every generated frame sequence
pub const FPS: f64 = 60.0;

/// Duration of one frame in milliseconds
pub const FRAME_DURATION_MS: f64 = 1000.0 / FPS;

/// Convert a time in milliseconds to a whole number of frames
pub fn time_to_frames(time_ms: f64) -> usize {
    if time_ms.is_finite() && time_ms > 0.0 {
        (time_ms * FPS / 1000.0).round() as usize
    } else {
        0
    }
}

/// Convert a frame count back to milliseconds
pub fn frames_to_time(frames: usize) -> f64 {
    frames as f64 * FRAME_DURATION_MS
}
