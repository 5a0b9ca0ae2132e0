//! Element snapshots

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::geometry::Rect;
use crate::value::Value;

/// Copied computed styles, in the order the provider reported them
pub type StyleMap = IndexMap<String, String>;

/// Geometry and computed style of one element at one instant
///
/// Snapshots are never mutated once taken; participants replace them
/// wholesale every render cycle.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub bounds: Rect,
    pub styles: StyleMap,
}

impl Snapshot {
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            styles: StyleMap::new(),
        }
    }

    /// Builder-style helper to attach one computed style
    pub fn with_style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.styles.insert(property.into(), value.into());
        self
    }

    /// Raw computed style text
    pub fn style(&self, property: &str) -> Option<&str> {
        self.styles.get(property).map(String::as_str)
    }

    /// Computed style parsed into a [`Value`]
    pub fn value(&self, property: &str) -> Option<Value> {
        self.style(property).map(Value::parse_lossy)
    }
}
