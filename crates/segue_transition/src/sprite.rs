//! Sprites and animators
//!
//! Both are rebuilt from participant state on every render and never mutated
//! afterwards. A [`Sprite`] is one animatable leaf element; an [`Animator`]
//! wraps a stable scope and owns the sprites whose innermost stable scope it
//! is.

use std::hash::{Hash, Hasher};

use segue_animation::MotionTarget;
use segue_core::{ElementId, Rect, Snapshot, Value};

use crate::participant::Half;
use crate::registration::{NodeId, ParticipantId, ScopeId};

/// Index of a sprite within one render
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpriteId(pub usize);

/// Index of an animator within one render
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimatorId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpriteKind {
    Inserted,
    Removed,
    Kept,
}

/// Refinement of a kept counterpart pair split across animators
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Transfer {
    #[default]
    None,
    /// The half leaving its animator
    Sent,
    /// The half arriving in a new animator
    Received,
}

/// Registration metadata copied onto the sprite
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpriteIdentifier {
    pub id: String,
    pub role: Option<String>,
}

/// Before/after snapshots of a related element
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SnapshotPair {
    pub initial: Option<Snapshot>,
    pub final_snapshot: Option<Snapshot>,
}

impl SnapshotPair {
    pub fn new(initial: Option<Snapshot>, final_snapshot: Option<Snapshot>) -> Self {
        Self {
            initial,
            final_snapshot,
        }
    }
}

/// An animatable leaf element for one render
#[derive(Clone, Debug)]
pub struct Sprite {
    pub id: SpriteId,
    pub participant: ParticipantId,
    pub node: NodeId,
    pub element: ElementId,
    pub identifier: SpriteIdentifier,
    pub initial: Option<Snapshot>,
    pub final_snapshot: Option<Snapshot>,
    pub kind: SpriteKind,
    pub counterpart: Option<SpriteId>,
    /// Which participant half this sprite animates
    pub half: Half,
    pub(crate) transfer: Transfer,
    /// Stable scopes above this sprite, innermost last
    pub animator_ancestors: Vec<AnimatorId>,
    /// Prefix of `animator_ancestors` shared with the counterpart
    pub common_animators: Vec<AnimatorId>,
    pub default_animator: Option<AnimatorId>,
    /// Snapshots of the parent element, for parent-relative bounds
    pub parent_state: SnapshotPair,
    /// Snapshots of the sprite's own scope when it is also an animator
    pub scope_state: Option<SnapshotPair>,
}

impl PartialEq for Sprite {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Sprite {}

impl Hash for Sprite {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Sprite {
    pub(crate) fn new(
        id: SpriteId,
        participant: ParticipantId,
        node: NodeId,
        element: ElementId,
        identifier: SpriteIdentifier,
        kind: SpriteKind,
        half: Half,
    ) -> Self {
        Self {
            id,
            participant,
            node,
            element,
            identifier,
            initial: None,
            final_snapshot: None,
            kind,
            counterpart: None,
            half,
            transfer: Transfer::None,
            animator_ancestors: Vec::new(),
            common_animators: Vec::new(),
            default_animator: None,
            parent_state: SnapshotPair::default(),
            scope_state: None,
        }
    }

    pub fn transfer(&self) -> Transfer {
        self.transfer
    }

    pub fn role(&self) -> Option<&str> {
        self.identifier.role.as_deref()
    }

    /// Initial bounds in the parent's initial coordinate space
    pub fn initial_bounds(&self) -> Option<Rect> {
        let bounds = self.initial.as_ref()?.bounds;
        Some(match &self.parent_state.initial {
            Some(parent) => bounds.relative_to(&parent.bounds),
            None => bounds,
        })
    }

    /// Final bounds in the parent's final coordinate space
    pub fn final_bounds(&self) -> Option<Rect> {
        let bounds = self.final_snapshot.as_ref()?.bounds;
        Some(match &self.parent_state.final_snapshot {
            Some(parent) => bounds.relative_to(&parent.bounds),
            None => bounds,
        })
    }

    /// Parent-relative movement from initial to final position
    pub fn bounds_delta(&self) -> Option<(f64, f64)> {
        let initial = self.initial_bounds()?;
        let last = self.final_bounds()?;
        Some((last.x - initial.x, last.y - initial.y))
    }

    fn bounds_value(bounds: Rect, property: &str) -> Option<Value> {
        let value = match property {
            "width" => bounds.width,
            "height" => bounds.height,
            "top" => bounds.top(),
            "left" => bounds.left(),
            "right" => bounds.right(),
            "bottom" => bounds.bottom(),
            _ => return None,
        };
        Some(Value::px(value))
    }
}

impl MotionTarget for Sprite {
    /// Translations start at minus the movement and end at zero, so the
    /// element appears to travel from its old place into its new layout.
    fn initial_value(&self, property: &str) -> Option<Value> {
        match property {
            "translate-x" => self.bounds_delta().map(|(dx, _)| Value::px(-dx)),
            "translate-y" => self.bounds_delta().map(|(_, dy)| Value::px(-dy)),
            _ => self
                .initial
                .as_ref()?
                .value(property)
                .or_else(|| Self::bounds_value(self.initial_bounds()?, property)),
        }
    }

    fn final_value(&self, property: &str) -> Option<Value> {
        match property {
            "translate-x" | "translate-y" => self.bounds_delta().map(|_| Value::px(0.0)),
            _ => self
                .final_snapshot
                .as_ref()?
                .value(property)
                .or_else(|| Self::bounds_value(self.final_bounds()?, property)),
        }
    }
}

/// A stable scope for one render
#[derive(Clone, Debug, PartialEq)]
pub struct Animator {
    pub id: AnimatorId,
    pub scope: ScopeId,
    pub participant: ParticipantId,
    pub node: NodeId,
    pub element: ElementId,
    pub initial: Snapshot,
    pub final_snapshot: Snapshot,
}

impl Animator {
    pub fn snapshots(&self) -> SnapshotPair {
        SnapshotPair::new(Some(self.initial.clone()), Some(self.final_snapshot.clone()))
    }
}
