//! Participants
//!
//! A participant is the long-lived identity of one animated thing across
//! renders. It owns up to two halves:
//!
//! - `current`: the element while it is live in the tree
//! - `detached`: a previous element that left the tree and may still be
//!   animating out
//!
//! Each render cycle drives the halves through a fixed sequence of stages
//! (`clear_snapshots` -> `snapshot_before_render` -> matching ->
//! `snapshot_after_render`). Every transition checks the stage it starts from
//! and fails with [`SegueError::InvalidState`] otherwise.

use smallvec::SmallVec;
use tracing::{debug, warn};

use segue_core::{
    ElementId, ElementProvider, MeasureOptions, Result, SegueError, SharedAnimation, Snapshot,
};

use crate::registration::{LeafRegistration, NodeId, ScopeId};

/// Logical identity used for matching
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Identifier {
    /// Leaf id, the far-match key
    pub key: Option<String>,
    /// Live element, `None` while only a detached half remains
    pub element: Option<ElementId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CurrentStage {
    Cleared,
    BeforeRender,
    AfterRender,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetachedStage {
    Cleared,
    BeforeRender,
}

/// Which half of a participant something refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Half {
    Current,
    Detached,
}

/// The live half
#[derive(Clone)]
pub struct CurrentHalf {
    pub node: NodeId,
    pub element: ElementId,
    pub stage: CurrentStage,
    pub before: Option<Snapshot>,
    pub after: Option<Snapshot>,
    pub animation: Option<SharedAnimation>,
}

/// The half animating out
#[derive(Clone)]
pub struct DetachedHalf {
    pub node: NodeId,
    pub element: ElementId,
    pub stage: DetachedStage,
    pub before: Option<Snapshot>,
    pub animation: Option<SharedAnimation>,
}

impl std::fmt::Debug for CurrentHalf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentHalf")
            .field("node", &self.node)
            .field("element", &self.element)
            .field("stage", &self.stage)
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .field("animating", &is_animating(&self.animation))
            .finish()
    }
}

impl std::fmt::Debug for DetachedHalf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetachedHalf")
            .field("node", &self.node)
            .field("element", &self.element)
            .field("stage", &self.stage)
            .field("before", &self.before.is_some())
            .field("animating", &is_animating(&self.animation))
            .finish()
    }
}

/// Whether an animation handle still drives its element
pub fn is_animating(animation: &Option<SharedAnimation>) -> bool {
    animation
        .as_ref()
        .is_some_and(|animation| animation.play_state().is_active())
}

/// Registrations that touched one participant during a render
#[derive(Clone, Debug, Default)]
pub struct MatchGroup {
    pub inserted_scope: Option<ScopeId>,
    pub inserted_leaf: Option<LeafRegistration>,
    /// Node created for the inserted element
    pub inserted_node: Option<(NodeId, ElementId)>,
    pub removed_scope: Option<ScopeId>,
    pub removed_leaf: Option<LeafRegistration>,
}

impl MatchGroup {
    pub fn is_empty(&self) -> bool {
        self.inserted_scope.is_none()
            && self.inserted_leaf.is_none()
            && self.removed_scope.is_none()
            && self.removed_leaf.is_none()
    }
}

/// Snapshots a sprite is built from
#[derive(Clone, Debug, PartialEq)]
pub enum SpriteShape {
    /// Current half only, never seen before this render
    Inserted { after: Snapshot },
    /// Detached half only
    Removed { before: Snapshot },
    /// Current half only, seen before
    Kept { before: Snapshot, after: Snapshot },
    /// Live element plus the detached element it replaced
    KeptWithCounterpart {
        /// Current half: `current.before`, falling back to `detached.before`
        initial: Snapshot,
        after: Snapshot,
        /// Detached half: `detached.before`
        counterpart_initial: Snapshot,
    },
}

/// Long-lived identity of one tracked element
#[derive(Debug)]
pub struct Participant {
    pub identifier: Identifier,
    pub latest_leaf: Option<LeafRegistration>,
    pub scope: Option<ScopeId>,
    pub current: Option<CurrentHalf>,
    pub detached: Option<DetachedHalf>,
    /// Nodes evicted by a second detachment, removed at the next cleanup
    pub nodes_to_dispose: SmallVec<[NodeId; 2]>,
}

impl Participant {
    /// Create a participant whose current half lives at `node`
    pub fn new(
        identifier: Identifier,
        latest_leaf: Option<LeafRegistration>,
        scope: Option<ScopeId>,
        node: NodeId,
        element: ElementId,
    ) -> Result<Self> {
        if latest_leaf.is_none() && scope.is_none() {
            return Err(SegueError::invalid_state(
                "participant needs a leaf or scope registration",
            ));
        }
        let mut participant = Self {
            identifier,
            latest_leaf,
            scope,
            current: None,
            detached: None,
            nodes_to_dispose: SmallVec::new(),
        };
        participant.create_current(node, element)?;
        Ok(participant)
    }

    /// Neither half, or a half in a stage it cannot be rendered from
    pub fn is_invalid(&self) -> bool {
        (self.current.is_none() && self.detached.is_none())
            || self
                .current
                .as_ref()
                .is_some_and(|c| c.stage != CurrentStage::AfterRender)
            || self
                .detached
                .as_ref()
                .is_some_and(|d| d.stage != DetachedStage::BeforeRender)
    }

    pub fn can_create_sprite(&self) -> bool {
        self.latest_leaf.is_some()
    }

    /// Removed, with nothing left to animate
    pub fn is_removed(&self) -> bool {
        self.current.is_none() && self.detached.is_some()
    }

    pub fn can_be_cleaned_up(&self) -> bool {
        let detached_idle = self
            .detached
            .as_ref()
            .is_some_and(|d| !is_animating(&d.animation));
        (self.current.is_none() && self.detached.is_none())
            || (self.is_removed() && detached_idle)
            || (!self.can_create_sprite() && self.scope.is_none())
    }

    /// Start a new live half
    pub fn create_current(&mut self, node: NodeId, element: ElementId) -> Result<()> {
        if let Some(current) = &self.current {
            return Err(SegueError::invalid_state(format!(
                "cannot create current half, one already exists at {:?}",
                current.stage
            )));
        }
        self.current = Some(CurrentHalf {
            node,
            element,
            stage: CurrentStage::BeforeRender,
            before: None,
            after: None,
            animation: None,
        });
        Ok(())
    }

    /// Move the live half into the detached slot
    ///
    /// An existing detached half is evicted: its animation is canceled and its
    /// node queued for disposal at the next cleanup.
    pub fn current_to_detached(&mut self) -> Result<()> {
        let Some(current) = self.current.take() else {
            return Err(SegueError::invalid_state(
                "cannot detach a participant without a current half",
            ));
        };
        let before = current
            .before
            .clone()
            .filter(|_| current.stage == CurrentStage::BeforeRender);
        let Some(before) = before else {
            let message = format!(
                "cannot detach current half at {:?} (before-render snapshot: {})",
                current.stage,
                current.before.is_some()
            );
            self.current = Some(current);
            return Err(SegueError::InvalidState(message));
        };
        if current.animation.is_some() {
            self.current = Some(current);
            return Err(SegueError::invalid_state(
                "animation was not canceled before handling matches",
            ));
        }

        if let Some(evicted) = self.detached.take() {
            warn!(
                element = %evicted.element,
                "detached half evicted by a newer detachment, canceling and disposing it"
            );
            if let Some(animation) = evicted.animation {
                animation.cancel();
            }
            self.nodes_to_dispose.push(evicted.node);
        }

        self.detached = Some(DetachedHalf {
            node: current.node,
            element: current.element,
            stage: DetachedStage::BeforeRender,
            before: Some(before),
            animation: None,
        });
        Ok(())
    }

    /// Apply the registrations of one render
    pub fn handle_matches(&mut self, group: MatchGroup) -> Result<()> {
        let MatchGroup {
            inserted_scope,
            inserted_leaf,
            inserted_node,
            removed_scope,
            removed_leaf,
        } = group;

        match (inserted_scope, removed_scope) {
            (Some(inserted), Some(_)) => self.scope = Some(inserted),
            (Some(inserted), None) => {
                if inserted_leaf.is_none() {
                    return Err(SegueError::invalid_match(
                        "matched an inserted scope without an inserted leaf",
                    ));
                }
                self.scope = Some(inserted);
            }
            (None, Some(_)) => {
                self.scope = None;
                if removed_leaf.is_none() {
                    if self.latest_leaf.is_some() {
                        return Err(SegueError::invalid_match(
                            "removed a scope that was also a leaf without removing the leaf",
                        ));
                    }
                    self.current_to_detached()?;
                    self.identifier.element = None;
                    return Ok(());
                }
            }
            (None, None) => {}
        }

        if self.current.is_some() && inserted_leaf.is_some() && removed_leaf.is_none() {
            return Err(SegueError::invalid_match(
                "insertion matches a live element without a removal",
            ));
        }
        if self.detached.is_some() && self.current.is_none() && removed_leaf.is_some() {
            return Err(SegueError::invalid_match(
                "removal of an already removed element",
            ));
        }
        if self.current.is_none() && self.detached.is_none() {
            return Err(SegueError::invalid_match(
                "participant has neither a current nor a detached half",
            ));
        }

        match (removed_leaf, inserted_leaf) {
            (Some(removed), Some(inserted)) => {
                self.check_removal(&removed)?;
                let (node, element) = inserted_node.ok_or_else(|| {
                    SegueError::invalid_match("inserted leaf arrived without a reference node")
                })?;
                self.current_to_detached()?;
                self.create_current(node, element)?;
                self.latest_leaf = Some(inserted);
                self.identifier.element = Some(element);
            }
            (Some(removed), None) => {
                self.check_removal(&removed)?;
                self.current_to_detached()?;
                self.identifier.element = None;
            }
            (None, Some(inserted)) => {
                let (node, element) = inserted_node.ok_or_else(|| {
                    SegueError::invalid_match("inserted leaf arrived without a reference node")
                })?;
                self.create_current(node, element)?;
                self.latest_leaf = Some(inserted);
                self.identifier.element = Some(element);
            }
            (None, None) => {}
        }
        Ok(())
    }

    fn check_removal(&self, removed: &LeafRegistration) -> Result<()> {
        match &self.current {
            Some(current) if current.element == removed.element => Ok(()),
            _ => Err(SegueError::invalid_match(format!(
                "removed leaf {} does not match the current element",
                removed.element
            ))),
        }
    }

    /// Drop last cycle's snapshots
    pub fn clear_snapshots(&mut self) -> Result<()> {
        if let Some(current) = &mut self.current {
            if current.stage != CurrentStage::AfterRender {
                return Err(SegueError::invalid_state(format!(
                    "current half must be after render before clearing, found {:?}",
                    current.stage
                )));
            }
            current.stage = CurrentStage::Cleared;
            current.before = None;
            current.after = None;
        }
        if let Some(detached) = &mut self.detached {
            if detached.stage != DetachedStage::BeforeRender {
                return Err(SegueError::invalid_state(format!(
                    "detached half must be before render before clearing, found {:?}",
                    detached.stage
                )));
            }
            detached.stage = DetachedStage::Cleared;
            detached.before = None;
        }
        Ok(())
    }

    /// Drop this cycle's snapshots whatever stage the halves reached
    pub fn reset_snapshots(&mut self) {
        if let Some(current) = &mut self.current {
            current.stage = CurrentStage::Cleared;
            current.before = None;
            current.after = None;
        }
        if let Some(detached) = &mut self.detached {
            detached.stage = DetachedStage::Cleared;
            detached.before = None;
        }
    }

    /// Record what is visible right now, in-flight animations included
    pub fn snapshot_before_render(&mut self, provider: &dyn ElementProvider) -> Result<()> {
        if let Some(current) = &mut self.current {
            if current.stage != CurrentStage::Cleared {
                return Err(SegueError::invalid_state(format!(
                    "current half must be cleared before the before-render snapshot, found {:?}",
                    current.stage
                )));
            }
            current.before = Some(visible_snapshot(
                provider,
                current.element,
                &current.animation,
            ));
            current.after = None;
            current.stage = CurrentStage::BeforeRender;
        }
        if let Some(detached) = &mut self.detached {
            if detached.stage != DetachedStage::Cleared {
                return Err(SegueError::invalid_state(format!(
                    "detached half must be cleared before the before-render snapshot, found {:?}",
                    detached.stage
                )));
            }
            detached.before = Some(visible_snapshot(
                provider,
                detached.element,
                &detached.animation,
            ));
            detached.stage = DetachedStage::BeforeRender;
        }
        Ok(())
    }

    /// Record the post-layout state of the live half
    pub fn snapshot_after_render(&mut self, provider: &dyn ElementProvider) -> Result<()> {
        if let Some(current) = &mut self.current {
            if current.stage != CurrentStage::BeforeRender {
                return Err(SegueError::invalid_state(format!(
                    "current half must be before render for the after-render snapshot, found {:?}",
                    current.stage
                )));
            }
            current.after = Some(provider.measure(current.element, MeasureOptions::FINAL));
            current.stage = CurrentStage::AfterRender;
        }
        Ok(())
    }

    /// Cancel whatever is playing on either half
    pub fn cancel_animations(&mut self) {
        for animation in [
            self.detached.as_mut().and_then(|d| d.animation.take()),
            self.current.as_mut().and_then(|c| c.animation.take()),
        ]
        .into_iter()
        .flatten()
        {
            animation.cancel();
        }
    }

    /// Track a newly started animation, canceling the previous one
    pub fn start_animation(&mut self, half: Half, animation: SharedAnimation) -> Result<()> {
        let slot = match half {
            Half::Current => self.current.as_mut().map(|c| &mut c.animation),
            Half::Detached => self.detached.as_mut().map(|d| &mut d.animation),
        };
        let Some(slot) = slot else {
            animation.cancel();
            return Err(SegueError::invalid_state(format!(
                "cannot animate missing {half:?} half"
            )));
        };
        if let Some(previous) = slot.replace(animation) {
            debug!("canceling previous animation before starting a new one");
            previous.cancel();
        }
        Ok(())
    }

    pub fn animation(&self, half: Half) -> Option<&SharedAnimation> {
        match half {
            Half::Current => self.current.as_ref().and_then(|c| c.animation.as_ref()),
            Half::Detached => self.detached.as_ref().and_then(|d| d.animation.as_ref()),
        }
    }

    /// Pick the sprite shape for this render
    ///
    /// `None` when the participant is not a leaf.
    pub fn as_sprite(&self) -> Result<Option<SpriteShape>> {
        if !self.can_create_sprite() {
            return Ok(None);
        }

        let shape = match (&self.current, &self.detached) {
            (Some(current), Some(detached)) => {
                let after = require(&current.after, "current after-render")?;
                let counterpart_initial = require(&detached.before, "detached before-render")?;
                let initial = current
                    .before
                    .clone()
                    .unwrap_or_else(|| counterpart_initial.clone());
                SpriteShape::KeptWithCounterpart {
                    initial,
                    after,
                    counterpart_initial,
                }
            }
            (Some(current), None) => match (&current.before, &current.after) {
                (Some(before), Some(after)) => SpriteShape::Kept {
                    before: before.clone(),
                    after: after.clone(),
                },
                (None, Some(after)) => SpriteShape::Inserted {
                    after: after.clone(),
                },
                _ => {
                    return Err(SegueError::invalid_state(format!(
                        "current half at {:?} has no after-render snapshot",
                        current.stage
                    )))
                }
            },
            (None, Some(detached)) => SpriteShape::Removed {
                before: require(&detached.before, "detached before-render")?,
            },
            (None, None) => {
                return Err(SegueError::invalid_state(
                    "cannot create a sprite without a current or detached half",
                ))
            }
        };
        Ok(Some(shape))
    }

    /// Snapshots of the live half, the basis of this scope's animator
    pub fn as_animator(&self) -> Result<(Snapshot, Snapshot)> {
        match &self.current {
            Some(CurrentHalf {
                before: Some(before),
                after: Some(after),
                ..
            }) => Ok((before.clone(), after.clone())),
            _ => Err(SegueError::invalid_state(
                "stable scope is missing its snapshots",
            )),
        }
    }
}

fn require(snapshot: &Option<Snapshot>, what: &str) -> Result<Snapshot> {
    snapshot
        .clone()
        .ok_or_else(|| SegueError::invalid_state(format!("missing {what} snapshot")))
}

fn visible_snapshot(
    provider: &dyn ElementProvider,
    element: ElementId,
    animation: &Option<SharedAnimation>,
) -> Snapshot {
    let options = if animation.is_some() {
        MeasureOptions::VISIBLE
    } else {
        MeasureOptions::FINAL
    };
    provider.measure(element, options)
}
