//! Keyframes handed to native playback

use indexmap::IndexMap;

use crate::value::Value;

/// One column of a generated animation: property name to value
///
/// Property names use the camelCase form the frame generator emits
/// (`translateX`, `backgroundColor`).
pub type Keyframe = IndexMap<String, Value>;
