//! Participant registry
//!
//! Owns every participant, every registered scope and the element reference
//! tree. Once per render it:
//!
//! 1. cleans up participants and nodes that finished animating out
//! 2. matches the render's registrations against existing participants,
//!    by element for removals and by key for insertions (far matches)
//! 3. derives the render's animators and sprites
//!
//! All of it runs synchronously inside one render cycle.

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;
use tracing::{debug, trace, warn};

use segue_core::{ElementId, ElementProvider, Result, SegueError, SharedAnimation};

use crate::changeset::Changeset;
use crate::element_tree::ElementTree;
use crate::participant::{is_animating, Half, Identifier, MatchGroup, Participant, SpriteShape};
use crate::registration::{LeafRegistration, NodeId, ParticipantId, RenderChanges, Scope, ScopeId};
use crate::sprite::{
    Animator, AnimatorId, SnapshotPair, Sprite, SpriteId, SpriteIdentifier, SpriteKind, Transfer,
};

/// Animators and sprites derived from one render
#[derive(Clone, Debug, Default)]
pub struct RenderOutput {
    pub animators: Vec<Animator>,
    pub sprites: Vec<Sprite>,
}

impl RenderOutput {
    pub fn sprite(&self, id: SpriteId) -> Option<&Sprite> {
        self.sprites.get(id.0)
    }

    pub fn animator(&self, id: AnimatorId) -> Option<&Animator> {
        self.animators.get(id.0)
    }

    /// One changeset per animator, holding the sprites it owns
    pub fn changesets(&self) -> Vec<Changeset> {
        self.animators
            .iter()
            .map(|animator| {
                Changeset::new(
                    animator.id,
                    self.sprites
                        .iter()
                        .filter(|sprite| sprite.default_animator == Some(animator.id))
                        .cloned(),
                )
            })
            .collect()
    }
}

/// What a reference node stands for during cleanup
enum NodeRole {
    Live,
    Detached { animating: bool },
    Orphan,
}

/// A registration batch entry that starts a new participant
struct NewParticipant {
    element: ElementId,
    leaf: Option<LeafRegistration>,
    scope: Option<ScopeId>,
}

/// Participants, scopes and the element reference tree of one engine
#[derive(Debug, Default)]
pub struct ParticipantRegistry {
    participants: SlotMap<ParticipantId, Participant>,
    scopes: SlotMap<ScopeId, Scope>,
    tree: ElementTree,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tree(&self) -> &ElementTree {
        &self.tree
    }

    pub fn participants(&self) -> impl Iterator<Item = (ParticipantId, &Participant)> {
        self.participants.iter()
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Participant currently bound to `element`
    pub fn participant_for(&self, element: ElementId) -> Option<ParticipantId> {
        self.participants
            .iter()
            .find(|(_, participant)| participant.identifier.element == Some(element))
            .map(|(id, _)| id)
    }

    pub fn add_scope(&mut self, scope: Scope) -> ScopeId {
        self.scopes.insert(scope)
    }

    pub fn scope(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id)
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> Option<&mut Scope> {
        self.scopes.get_mut(id)
    }

    fn scope_element(&self, id: ScopeId) -> Result<ElementId> {
        self.scopes
            .get(id)
            .map(|scope| scope.element)
            .ok_or_else(|| SegueError::invalid_match(format!("unknown scope {id:?}")))
    }

    /// Drop destroyed scopes no participant refers to anymore
    pub fn purge_scopes(&mut self) -> Vec<ScopeId> {
        let referenced: FxHashSet<ScopeId> = self
            .participants
            .values()
            .filter_map(|participant| participant.scope)
            .collect();
        let purged: Vec<ScopeId> = self
            .scopes
            .iter()
            .filter(|(id, scope)| scope.is_destroying() && !referenced.contains(id))
            .map(|(id, _)| id)
            .collect();
        for id in &purged {
            self.scopes.remove(*id);
        }
        purged
    }

    /// Remove finished detached halves and idle participants
    ///
    /// Animating detached nodes survive and move under their nearest live
    /// ancestor. Every remaining animation is canceled afterwards.
    pub fn perform_cleanup(&mut self) {
        let mut disposed = 0;
        for participant in self.participants.values_mut() {
            for node in participant.nodes_to_dispose.drain(..) {
                self.tree.detach(node);
                disposed += 1;
            }
        }

        let mut deleted: FxHashSet<NodeId> = FxHashSet::default();
        let mut grafts: Vec<(NodeId, Option<NodeId>)> = Vec::new();
        let mut stack: Vec<(NodeId, Option<NodeId>)> =
            self.tree.roots().iter().rev().map(|root| (*root, None)).collect();
        while let Some((node, live_ancestor)) = stack.pop() {
            let next_ancestor = match self.node_role(node) {
                NodeRole::Live => {
                    let parent_deleted = self
                        .tree
                        .parent(node)
                        .is_some_and(|parent| deleted.contains(&parent));
                    if parent_deleted {
                        grafts.push((node, live_ancestor));
                    }
                    Some(node)
                }
                NodeRole::Detached { animating: true } if live_ancestor.is_some() => {
                    if self.tree.parent(node) != live_ancestor {
                        grafts.push((node, live_ancestor));
                    }
                    continue;
                }
                NodeRole::Detached { .. } | NodeRole::Orphan => {
                    deleted.insert(node);
                    live_ancestor
                }
            };
            stack.extend(
                self.tree
                    .children(node)
                    .iter()
                    .rev()
                    .map(|child| (*child, next_ancestor)),
            );
        }

        for node in &deleted {
            self.tree.detach(*node);
        }
        let grafted = grafts.len();
        for (node, parent) in grafts {
            self.tree.detach(node);
            self.tree.attach(node, parent);
        }
        let pruned = self.tree.prune_unreachable();

        for (id, participant) in self.participants.iter_mut() {
            if participant
                .detached
                .as_ref()
                .is_some_and(|d| !self.tree.contains(d.node))
            {
                participant.detached = None;
            }
            if participant
                .current
                .as_ref()
                .is_some_and(|c| !self.tree.contains(c.node))
            {
                warn!(participant = ?id, "live element lost its reference node");
                participant.current = None;
            }
        }

        let dropped: Vec<ParticipantId> = self
            .participants
            .iter()
            .filter(|(_, p)| p.can_be_cleaned_up() && p.detached.is_none())
            .map(|(id, _)| id)
            .collect();
        for id in &dropped {
            if let Some(participant) = self.participants.remove(*id) {
                if let Some(current) = participant.current {
                    self.tree.remove_node(current.node);
                }
            }
        }

        for participant in self.participants.values_mut() {
            participant.cancel_animations();
        }

        debug!(
            disposed,
            pruned = pruned.len(),
            grafted,
            dropped = dropped.len(),
            "cleanup"
        );
    }

    fn node_role(&self, node: NodeId) -> NodeRole {
        let Some(participant) = self
            .tree
            .get(node)
            .and_then(|tree_node| self.participants.get(tree_node.participant))
        else {
            return NodeRole::Orphan;
        };
        if participant.current.as_ref().is_some_and(|c| c.node == node) {
            return NodeRole::Live;
        }
        match participant.detached.as_ref().filter(|d| d.node == node) {
            Some(detached) => NodeRole::Detached {
                animating: is_animating(&detached.animation),
            },
            None => NodeRole::Orphan,
        }
    }

    /// Match one render's registrations against the tracked participants
    pub fn update_participants(
        &mut self,
        changes: &RenderChanges,
        provider: &dyn ElementProvider,
    ) -> Result<()> {
        self.perform_cleanup();

        let mut by_key: FxHashMap<String, ParticipantId> = FxHashMap::default();
        let mut by_element: FxHashMap<ElementId, ParticipantId> = FxHashMap::default();
        for (id, participant) in &self.participants {
            if let Some(key) = &participant.identifier.key {
                by_key.insert(key.clone(), id);
            }
            if let Some(element) = participant.identifier.element {
                by_element.insert(element, id);
            }
        }

        let mut groups: IndexMap<ParticipantId, MatchGroup> = IndexMap::new();
        for leaf in &changes.removed_leaves {
            let id = *by_element
                .get(&leaf.element)
                .ok_or(SegueError::UnmatchedRemoval(leaf.element))?;
            groups.entry(id).or_default().removed_leaf = Some(leaf.clone());
        }
        for scope in &changes.removed_scopes {
            let element = self.scope_element(*scope)?;
            let id = *by_element
                .get(&element)
                .ok_or(SegueError::UnmatchedRemoval(element))?;
            groups.entry(id).or_default().removed_scope = Some(*scope);
        }

        let mut fresh: Vec<NewParticipant> = Vec::new();
        for leaf in &changes.inserted_leaves {
            let matched = by_key.get(&leaf.id).copied().filter(|id| {
                groups
                    .get(id)
                    .map_or(true, |group| group.inserted_leaf.is_none())
            });
            match matched {
                Some(id) => {
                    debug!(key = %leaf.id, element = %leaf.element, "far match");
                    groups.entry(id).or_default().inserted_leaf = Some(leaf.clone());
                }
                None => fresh.push(NewParticipant {
                    element: leaf.element,
                    leaf: Some(leaf.clone()),
                    scope: None,
                }),
            }
        }
        for scope in &changes.inserted_scopes {
            let element = self.scope_element(*scope)?;
            let co_located = groups.values_mut().find(|group| {
                group
                    .inserted_leaf
                    .as_ref()
                    .is_some_and(|leaf| leaf.element == element)
            });
            if let Some(group) = co_located {
                group.inserted_scope = Some(*scope);
            } else if let Some(entry) = fresh.iter_mut().find(|entry| entry.element == element) {
                entry.scope = Some(*scope);
            } else {
                fresh.push(NewParticipant {
                    element,
                    leaf: None,
                    scope: Some(*scope),
                });
            }
        }

        let matched = groups.len();
        let mut new_nodes: Vec<NodeId> = Vec::new();
        for (id, mut group) in groups {
            let Some(participant) = self.participants.get_mut(id) else {
                continue;
            };
            if let Some(leaf) = &group.inserted_leaf {
                let node = self.tree.create_node(leaf.element, id);
                group.inserted_node = Some((node, leaf.element));
                new_nodes.push(node);
            }
            trace!(participant = ?id, ?group, "handling matches");
            participant.handle_matches(group)?;
        }

        let created = fresh.len();
        for NewParticipant {
            element,
            leaf,
            scope,
        } in fresh
        {
            let identifier = Identifier {
                key: leaf.as_ref().map(|leaf| leaf.id.clone()),
                element: Some(element),
            };
            let tree = &mut self.tree;
            let mut node = None;
            self.participants.try_insert_with_key(|id| {
                let created = tree.create_node(element, id);
                node = Some(created);
                Participant::new(identifier, leaf, scope, created, element)
            })?;
            new_nodes.extend(node);
        }

        self.tree.insert_nodes(new_nodes, provider);
        debug!(matched, created, participants = self.participants.len(), "participants updated");
        Ok(())
    }

    pub fn clear_snapshots(&mut self) -> Result<()> {
        for participant in self.participants.values_mut() {
            participant.clear_snapshots()?;
        }
        Ok(())
    }

    /// Return every participant to the cleared stage after a failed cycle
    pub fn reset_snapshots(&mut self) {
        for participant in self.participants.values_mut() {
            participant.reset_snapshots();
        }
    }

    pub fn snapshot_before_render(&mut self, provider: &dyn ElementProvider) -> Result<()> {
        for participant in self.participants.values_mut() {
            participant.snapshot_before_render(provider)?;
        }
        Ok(())
    }

    pub fn snapshot_after_render(&mut self, provider: &dyn ElementProvider) -> Result<()> {
        for participant in self.participants.values_mut() {
            participant.snapshot_after_render(provider)?;
        }
        Ok(())
    }

    /// Derive this render's animators and sprites
    ///
    /// Unstable scopes are marked as rendered and produce no animator until
    /// the next render.
    pub fn create_animators_and_sprites(&mut self) -> Result<RenderOutput> {
        let mut animators: Vec<Animator> = Vec::new();
        let mut animator_at: FxHashMap<NodeId, AnimatorId> = FxHashMap::default();
        let mut animator_of: FxHashMap<ParticipantId, AnimatorId> = FxHashMap::default();

        for (id, participant) in &self.participants {
            let Some(scope_id) = participant.scope else {
                continue;
            };
            let Some(current) = &participant.current else {
                return Err(SegueError::invalid_state(format!(
                    "scope participant {id:?} has no current half"
                )));
            };
            let Some(scope) = self.scopes.get_mut(scope_id) else {
                return Err(SegueError::invalid_state(format!(
                    "participant {id:?} refers to unknown scope {scope_id:?}"
                )));
            };
            if !scope.is_stable() {
                scope.mark_initial_render_completed();
                continue;
            }

            let (initial, final_snapshot) = participant.as_animator()?;
            let animator = AnimatorId(animators.len());
            animators.push(Animator {
                id: animator,
                scope: scope_id,
                participant: id,
                node: current.node,
                element: current.element,
                initial,
                final_snapshot,
            });
            animator_at.insert(current.node, animator);
            animator_of.insert(id, animator);
        }

        let paths = self.animator_paths(&animator_at);
        let path = |node: NodeId| paths.get(&node).cloned().unwrap_or_default();

        let mut sprites: Vec<Sprite> = Vec::new();
        for (id, participant) in &self.participants {
            let Some(shape) = participant.as_sprite()? else {
                continue;
            };
            let Some(leaf) = &participant.latest_leaf else {
                continue;
            };
            let identifier = SpriteIdentifier {
                id: leaf.id.clone(),
                role: leaf.role.clone(),
            };
            let current = participant.current.as_ref().map(|c| (c.node, c.element));
            let detached = participant.detached.as_ref().map(|d| (d.node, d.element));
            let next = SpriteId(sprites.len());

            match (shape, current, detached) {
                (SpriteShape::Inserted { after }, Some((node, element)), _) => {
                    let mut sprite = Sprite::new(
                        next,
                        id,
                        node,
                        element,
                        identifier,
                        SpriteKind::Inserted,
                        Half::Current,
                    );
                    sprite.final_snapshot = Some(after);
                    sprite.animator_ancestors = path(node);
                    sprites.push(sprite);
                }
                (SpriteShape::Kept { before, after }, Some((node, element)), _) => {
                    let mut sprite = Sprite::new(
                        next,
                        id,
                        node,
                        element,
                        identifier,
                        SpriteKind::Kept,
                        Half::Current,
                    );
                    sprite.initial = Some(before);
                    sprite.final_snapshot = Some(after);
                    sprite.animator_ancestors = path(node);
                    sprites.push(sprite);
                }
                (SpriteShape::Removed { before }, _, Some((node, element))) => {
                    let mut sprite = Sprite::new(
                        next,
                        id,
                        node,
                        element,
                        identifier,
                        SpriteKind::Removed,
                        Half::Detached,
                    );
                    sprite.initial = Some(before);
                    sprite.animator_ancestors = path(node);
                    sprites.push(sprite);
                }
                (
                    SpriteShape::KeptWithCounterpart {
                        initial,
                        after,
                        counterpart_initial,
                    },
                    Some((node, element)),
                    Some((old_node, old_element)),
                ) => {
                    let other = SpriteId(next.0 + 1);
                    let mut live = Sprite::new(
                        next,
                        id,
                        node,
                        element,
                        identifier.clone(),
                        SpriteKind::Kept,
                        Half::Current,
                    );
                    live.initial = Some(initial);
                    live.final_snapshot = Some(after.clone());
                    live.counterpart = Some(other);
                    live.animator_ancestors = path(node);

                    let mut leaving = Sprite::new(
                        other,
                        id,
                        old_node,
                        old_element,
                        identifier,
                        SpriteKind::Kept,
                        Half::Detached,
                    );
                    leaving.initial = Some(counterpart_initial);
                    leaving.final_snapshot = Some(after);
                    leaving.counterpart = Some(next);
                    leaving.animator_ancestors = path(old_node);

                    let common: Vec<AnimatorId> = live
                        .animator_ancestors
                        .iter()
                        .zip(&leaving.animator_ancestors)
                        .take_while(|(a, b)| a == b)
                        .map(|(a, _)| *a)
                        .collect();
                    live.common_animators = common.clone();
                    leaving.common_animators = common;

                    let (arriving_in, leaving_from) = (
                        live.animator_ancestors.last(),
                        leaving.animator_ancestors.last(),
                    );
                    if arriving_in != leaving_from {
                        live.transfer = Transfer::Received;
                        leaving.transfer = Transfer::Sent;
                    }
                    sprites.push(live);
                    sprites.push(leaving);
                }
                (shape, current, detached) => {
                    return Err(SegueError::invalid_state(format!(
                        "sprite shape {shape:?} does not fit halves (current: {}, detached: {})",
                        current.is_some(),
                        detached.is_some()
                    )))
                }
            }
        }

        let sprite_at: FxHashMap<NodeId, SpriteId> =
            sprites.iter().map(|sprite| (sprite.node, sprite.id)).collect();
        let states: Vec<(SnapshotPair, Option<SnapshotPair>)> = sprites
            .iter()
            .map(|sprite| {
                let parent_state = self
                    .tree
                    .parent(sprite.node)
                    .map(|parent| {
                        if let Some(animator) = animator_at.get(&parent) {
                            animators[animator.0].snapshots()
                        } else if let Some(other) = sprite_at.get(&parent) {
                            let other = &sprites[other.0];
                            SnapshotPair::new(other.initial.clone(), other.final_snapshot.clone())
                        } else {
                            self.node_snapshots(parent)
                        }
                    })
                    .unwrap_or_default();
                let scope_state = animator_of
                    .get(&sprite.participant)
                    .map(|animator| animators[animator.0].snapshots());
                (parent_state, scope_state)
            })
            .collect();
        for (sprite, (parent_state, scope_state)) in sprites.iter_mut().zip(states) {
            if sprite.common_animators.is_empty() && sprite.counterpart.is_none() {
                sprite.common_animators = sprite.animator_ancestors.clone();
            }
            sprite.default_animator = sprite.animator_ancestors.last().copied();
            sprite.parent_state = parent_state;
            sprite.scope_state = scope_state;
        }

        debug!(
            animators = animators.len(),
            sprites = sprites.len(),
            "derived animators and sprites"
        );
        Ok(RenderOutput { animators, sprites })
    }

    /// Stable scopes above every node, innermost last, excluding the node
    fn animator_paths(
        &self,
        animator_at: &FxHashMap<NodeId, AnimatorId>,
    ) -> FxHashMap<NodeId, Vec<AnimatorId>> {
        let mut paths = FxHashMap::default();
        let mut stack: Vec<(NodeId, Vec<AnimatorId>)> = self
            .tree
            .roots()
            .iter()
            .rev()
            .map(|root| (*root, Vec::new()))
            .collect();
        while let Some((node, path)) = stack.pop() {
            let mut below = path.clone();
            if let Some(animator) = animator_at.get(&node) {
                below.push(*animator);
            }
            for child in self.tree.children(node).iter().rev() {
                stack.push((*child, below.clone()));
            }
            paths.insert(node, path);
        }
        paths
    }

    fn node_snapshots(&self, node: NodeId) -> SnapshotPair {
        let Some(participant) = self
            .tree
            .get(node)
            .and_then(|tree_node| self.participants.get(tree_node.participant))
        else {
            return SnapshotPair::default();
        };
        match (&participant.current, &participant.detached) {
            (Some(current), _) if current.node == node => {
                SnapshotPair::new(current.before.clone(), current.after.clone())
            }
            (_, Some(detached)) if detached.node == node => {
                SnapshotPair::new(detached.before.clone(), None)
            }
            _ => SnapshotPair::default(),
        }
    }

    /// Attach a started animation to the half it plays on
    pub fn record_animation(
        &mut self,
        participant: ParticipantId,
        half: Half,
        animation: SharedAnimation,
    ) -> Result<()> {
        match self.participants.get_mut(participant) {
            Some(p) => p.start_animation(half, animation),
            None => {
                animation.cancel();
                Err(SegueError::invalid_state(format!(
                    "cannot animate unknown participant {participant:?}"
                )))
            }
        }
    }

    /// Emit the reference tree and a participant summary at debug level
    pub fn log_tree(&self) {
        let tree = self.tree.format(|node, tree_node| {
            let Some(participant) = self.participants.get(tree_node.participant) else {
                return format!("{} (orphan)", tree_node.element);
            };
            let label = participant
                .latest_leaf
                .as_ref()
                .map(|leaf| leaf.id.clone())
                .or_else(|| {
                    participant
                        .scope
                        .and_then(|scope| self.scopes.get(scope))
                        .and_then(|scope| scope.id.clone())
                })
                .unwrap_or_default();
            let half = if participant.current.as_ref().is_some_and(|c| c.node == node) {
                "current"
            } else {
                "detached"
            };
            format!("{} {label} [{half}]", tree_node.element)
        });
        debug!(
            participants = self.participants.len(),
            scopes = self.scopes.len(),
            nodes = self.tree.len(),
            "element reference tree:\n{tree}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::Registration;
    use segue_animation::MotionTarget;
    use segue_core::{
        AnimationHandle, AnimationOptions, Completion, Keyframe, MeasureOptions, PlayState, Rect,
        Snapshot, Value,
    };
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::rc::Rc;

    /// Pauses an element's handles for visible measurements and resumes
    /// them only when asked to
    #[derive(Default)]
    struct Doc {
        parents: RefCell<HashMap<ElementId, ElementId>>,
        bounds: RefCell<HashMap<ElementId, Rect>>,
        animations: RefCell<HashMap<ElementId, Vec<SharedAnimation>>>,
    }

    impl Doc {
        fn add(&self, element: u64, parent: Option<u64>, bounds: Rect) {
            if let Some(parent) = parent {
                self.parents
                    .borrow_mut()
                    .insert(ElementId(element), ElementId(parent));
            }
            self.bounds.borrow_mut().insert(ElementId(element), bounds);
        }

        fn remove(&self, element: u64) {
            self.parents.borrow_mut().remove(&ElementId(element));
        }

        fn track(&self, element: u64, animation: SharedAnimation) {
            self.animations
                .borrow_mut()
                .entry(ElementId(element))
                .or_default()
                .push(animation);
        }
    }

    impl ElementProvider for Doc {
        fn parent(&self, element: ElementId) -> Option<ElementId> {
            self.parents.borrow().get(&element).copied()
        }

        fn measure(&self, element: ElementId, options: MeasureOptions) -> Snapshot {
            let mut paused = Vec::new();
            if options.with_animations {
                for animation in self.animations.borrow().get(&element).into_iter().flatten() {
                    if animation.play_state() == PlayState::Running {
                        animation.pause();
                        paused.push(animation.clone());
                    }
                }
            }
            let snapshot =
                Snapshot::new(self.bounds.borrow().get(&element).copied().unwrap_or_default());
            if options.play_animations {
                for animation in paused {
                    animation.play();
                }
            }
            snapshot
        }

        fn animate(
            &self,
            element: ElementId,
            _: &[Keyframe],
            _: &AnimationOptions,
        ) -> SharedAnimation {
            let animation: SharedAnimation = Rc::new(Running::default());
            self.track(element.0, animation.clone());
            animation
        }
    }

    struct Running(Cell<PlayState>);

    impl Default for Running {
        fn default() -> Self {
            Self(Cell::new(PlayState::Running))
        }
    }

    impl AnimationHandle for Running {
        fn play_state(&self) -> PlayState {
            self.0.get()
        }
        fn pause(&self) {
            self.0.set(PlayState::Paused);
        }
        fn play(&self) {
            self.0.set(PlayState::Running);
        }
        fn cancel(&self) {
            self.0.set(PlayState::Idle);
        }
        fn completion(&self) -> Completion {
            Completion::Pending
        }
    }

    fn render(
        registry: &mut ParticipantRegistry,
        doc: &Doc,
        changes: RenderChanges,
    ) -> RenderOutput {
        registry.clear_snapshots().unwrap();
        registry.snapshot_before_render(doc).unwrap();
        registry.update_participants(&changes, doc).unwrap();
        registry.snapshot_after_render(doc).unwrap();
        registry.create_animators_and_sprites().unwrap()
    }

    fn leaf(id: &str, element: u64) -> Registration {
        Registration::Leaf(LeafRegistration::new(id, ElementId(element)))
    }

    fn inserting(registrations: Vec<Registration>) -> RenderChanges {
        let mut changes = RenderChanges::new();
        for registration in registrations {
            changes.insert(registration);
        }
        changes
    }

    fn removing(registrations: Vec<Registration>) -> RenderChanges {
        let mut changes = RenderChanges::new();
        for registration in registrations {
            changes.remove(registration);
        }
        changes
    }

    /// Registry with a rendered root scope at element 1
    fn rooted() -> (ParticipantRegistry, Doc, ScopeId) {
        let doc = Doc::default();
        doc.add(1, None, Rect::new(0.0, 0.0, 500.0, 500.0));
        let mut registry = ParticipantRegistry::new();
        let root = registry.add_scope(Scope::new(ElementId(1)).with_id("root"));
        let output = render(&mut registry, &doc, inserting(vec![Registration::Scope(root)]));
        assert!(output.animators.is_empty());
        assert!(registry.scope(root).unwrap().initial_render_completed());
        (registry, doc, root)
    }

    fn with_card(registry: &mut ParticipantRegistry, doc: &Doc) -> RenderOutput {
        doc.add(2, Some(1), Rect::new(10.0, 10.0, 50.0, 50.0));
        render(registry, doc, inserting(vec![leaf("card", 2)]))
    }

    #[test]
    fn test_inserted_sprite() {
        let (mut registry, doc, root) = rooted();
        let output = with_card(&mut registry, &doc);

        assert_eq!(output.animators.len(), 1);
        assert_eq!(output.animators[0].scope, root);
        assert_eq!(output.sprites.len(), 1);
        let sprite = &output.sprites[0];
        assert_eq!(sprite.kind, SpriteKind::Inserted);
        assert!(sprite.initial.is_none());
        assert!(sprite.final_snapshot.is_some());
        assert_eq!(sprite.default_animator, Some(AnimatorId(0)));
        assert_eq!(sprite.parent_state, output.animators[0].snapshots());
    }

    #[test]
    fn test_removed_sprite() {
        let (mut registry, doc, _) = rooted();
        with_card(&mut registry, &doc);

        doc.remove(2);
        let output = render(&mut registry, &doc, removing(vec![leaf("card", 2)]));
        assert_eq!(output.sprites.len(), 1);
        let sprite = &output.sprites[0];
        assert_eq!(sprite.kind, SpriteKind::Removed);
        assert_eq!(sprite.half, Half::Detached);
        assert_eq!(sprite.initial.as_ref().unwrap().bounds.x, 10.0);
        assert!(sprite.final_snapshot.is_none());
    }

    #[test]
    fn test_unmatched_removal() {
        let (mut registry, doc, _) = rooted();
        registry.clear_snapshots().unwrap();
        registry.snapshot_before_render(&doc).unwrap();
        let result = registry.update_participants(&removing(vec![leaf("ghost", 99)]), &doc);
        assert!(matches!(result, Err(SegueError::UnmatchedRemoval(ElementId(99)))));
    }

    #[test]
    fn test_far_match_in_one_render() {
        let (mut registry, doc, _) = rooted();
        with_card(&mut registry, &doc);

        doc.remove(2);
        doc.add(3, Some(1), Rect::new(200.0, 10.0, 50.0, 50.0));
        let mut changes = removing(vec![leaf("card", 2)]);
        changes.insert(leaf("card", 3));
        let output = render(&mut registry, &doc, changes);

        assert_eq!(output.sprites.len(), 2);
        let (live, leaving) = (&output.sprites[0], &output.sprites[1]);
        assert_eq!(live.kind, SpriteKind::Kept);
        assert_eq!(leaving.kind, SpriteKind::Kept);
        assert_eq!(live.counterpart, Some(leaving.id));
        assert_eq!(leaving.counterpart, Some(live.id));
        assert_eq!(live.element, ElementId(3));
        assert_eq!(leaving.element, ElementId(2));
        assert_eq!(live.transfer(), Transfer::None);
        // The new element starts where the old one was
        assert_eq!(live.initial.as_ref().unwrap().bounds.x, 10.0);
        assert_eq!(live.initial_value("translate-x"), Some(Value::px(-190.0)));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_reinsert_while_animating_out() {
        let (mut registry, doc, _) = rooted();
        with_card(&mut registry, &doc);

        doc.remove(2);
        let output = render(&mut registry, &doc, removing(vec![leaf("card", 2)]));
        let removed = &output.sprites[0];
        let animation = doc.animate(ElementId(2), &[], &AnimationOptions::default());
        registry
            .record_animation(removed.participant, removed.half, animation.clone())
            .unwrap();

        doc.add(3, Some(1), Rect::new(20.0, 10.0, 50.0, 50.0));
        let output = render(&mut registry, &doc, inserting(vec![leaf("card", 3)]));
        // Cleanup canceled the outgoing animation before matching
        assert_eq!(animation.play_state(), PlayState::Idle);
        assert_eq!(output.sprites.len(), 2);
        assert!(output.sprites.iter().all(|s| s.kind == SpriteKind::Kept));
        assert_eq!(output.sprites[0].counterpart, Some(output.sprites[1].id));
    }

    #[test]
    fn test_visible_snapshot_keeps_animations_playing() {
        let (mut registry, doc, _) = rooted();
        with_card(&mut registry, &doc);

        doc.remove(2);
        let output = render(&mut registry, &doc, removing(vec![leaf("card", 2)]));
        let removed = &output.sprites[0];
        let animation = doc.animate(ElementId(2), &[], &AnimationOptions::default());
        registry
            .record_animation(removed.participant, removed.half, animation.clone())
            .unwrap();

        registry.clear_snapshots().unwrap();
        registry.snapshot_before_render(&doc).unwrap();
        assert_eq!(animation.play_state(), PlayState::Running);

        // Still animating out, so cleanup keeps the detached half for matching
        doc.add(3, Some(1), Rect::new(20.0, 10.0, 50.0, 50.0));
        registry
            .update_participants(&inserting(vec![leaf("card", 3)]), &doc)
            .unwrap();
        registry.snapshot_after_render(&doc).unwrap();
        let output = registry.create_animators_and_sprites().unwrap();
        let kinds: Vec<_> = output.sprites.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![SpriteKind::Kept, SpriteKind::Kept]);
    }

    #[test]
    fn test_reinsert_after_animation_finished() {
        let (mut registry, doc, _) = rooted();
        with_card(&mut registry, &doc);

        doc.remove(2);
        render(&mut registry, &doc, removing(vec![leaf("card", 2)]));

        doc.add(3, Some(1), Rect::new(20.0, 10.0, 50.0, 50.0));
        let output = render(&mut registry, &doc, inserting(vec![leaf("card", 3)]));
        assert_eq!(output.sprites.len(), 1);
        assert_eq!(output.sprites[0].kind, SpriteKind::Inserted);
    }

    #[test]
    fn test_matched_scope_and_leaf() {
        let (mut registry, doc, _) = rooted();
        with_card(&mut registry, &doc);

        doc.remove(2);
        doc.add(5, Some(1), Rect::new(0.0, 100.0, 50.0, 50.0));
        let scope = registry.add_scope(Scope::new(ElementId(5)));
        let mut changes = removing(vec![leaf("card", 2)]);
        changes.insert(leaf("card", 5));
        changes.insert(Registration::Scope(scope));
        let output = render(&mut registry, &doc, changes);

        // The new scope is not stable yet
        assert_eq!(output.animators.len(), 1);
        assert_eq!(output.sprites.len(), 2);
        assert_eq!(output.sprites[0].counterpart, Some(output.sprites[1].id));
        let id = output.sprites[0].participant;
        assert_eq!(registry.participant(id).unwrap().scope, Some(scope));
    }

    #[test]
    fn test_default_animator_is_innermost_stable_scope() {
        let (mut registry, doc, _) = rooted();
        doc.add(2, Some(1), Rect::new(0.0, 0.0, 100.0, 100.0));
        doc.add(3, Some(2), Rect::new(0.0, 0.0, 100.0, 100.0));
        doc.add(4, Some(3), Rect::new(0.0, 0.0, 10.0, 10.0));
        let context = registry.add_scope(Scope::new(ElementId(3)));
        let output = render(
            &mut registry,
            &doc,
            inserting(vec![
                leaf("sprite-2", 4),
                Registration::Scope(context),
                leaf("sprite-1", 2),
            ]),
        );
        assert_eq!(output.animators.len(), 1);
        assert!(output
            .sprites
            .iter()
            .all(|s| s.default_animator == Some(AnimatorId(0))));

        let output = render(&mut registry, &doc, RenderChanges::new());
        assert_eq!(output.animators.len(), 2);
        let context_animator = output
            .animators
            .iter()
            .find(|a| a.scope == context)
            .unwrap()
            .id;
        let by_key = |key: &str| {
            output
                .sprites
                .iter()
                .find(|s| s.identifier.id == key)
                .unwrap()
        };
        assert_eq!(by_key("sprite-1").default_animator, Some(AnimatorId(0)));
        assert_eq!(by_key("sprite-2").default_animator, Some(context_animator));
        assert_eq!(
            by_key("sprite-2").animator_ancestors,
            vec![AnimatorId(0), context_animator]
        );
    }

    #[test]
    fn test_cross_scope_transfer() {
        let (mut registry, doc, _) = rooted();
        doc.add(10, Some(1), Rect::new(0.0, 0.0, 200.0, 200.0));
        doc.add(20, Some(1), Rect::new(250.0, 0.0, 200.0, 200.0));
        let a = registry.add_scope(Scope::new(ElementId(10)).with_id("a"));
        let b = registry.add_scope(Scope::new(ElementId(20)).with_id("b"));
        render(
            &mut registry,
            &doc,
            inserting(vec![Registration::Scope(a), Registration::Scope(b)]),
        );
        doc.add(11, Some(10), Rect::new(20.0, 20.0, 10.0, 10.0));
        render(&mut registry, &doc, inserting(vec![leaf("card", 11)]));

        doc.remove(11);
        doc.add(21, Some(20), Rect::new(270.0, 20.0, 10.0, 10.0));
        let mut changes = removing(vec![leaf("card", 11)]);
        changes.insert(leaf("card", 21));
        let output = render(&mut registry, &doc, changes);

        let animator = |scope: ScopeId| output.animators.iter().find(|x| x.scope == scope).unwrap();
        let live = output.sprites.iter().find(|s| s.half == Half::Current).unwrap();
        let leaving = output.sprites.iter().find(|s| s.half == Half::Detached).unwrap();

        assert_eq!(live.default_animator, Some(animator(b).id));
        assert_eq!(leaving.default_animator, Some(animator(a).id));
        assert_eq!(live.transfer(), Transfer::Received);
        assert_eq!(leaving.transfer(), Transfer::Sent);
        assert_eq!(live.common_animators, vec![AnimatorId(0)]);
        assert_eq!(leaving.parent_state, animator(a).snapshots());

        let changesets = output.changesets();
        let owned = |scope: ScopeId| changesets[animator(scope).id.0].sprite_ids();
        assert_eq!(owned(a), vec![leaving.id]);
        assert_eq!(owned(b), vec![live.id]);
    }

    #[test]
    fn test_double_eviction_disposes_on_cleanup() {
        let (mut registry, doc, _) = rooted();
        with_card(&mut registry, &doc);
        let root = registry.tree().roots()[0];

        doc.remove(2);
        doc.add(3, Some(1), Rect::new(20.0, 10.0, 50.0, 50.0));
        let mut changes = removing(vec![leaf("card", 2)]);
        changes.insert(leaf("card", 3));
        let output = render(&mut registry, &doc, changes);
        let leaving = output.sprites.iter().find(|s| s.half == Half::Detached).unwrap();
        registry
            .record_animation(leaving.participant, Half::Detached, Rc::new(Running::default()))
            .unwrap();

        doc.remove(3);
        doc.add(4, Some(1), Rect::new(30.0, 10.0, 50.0, 50.0));
        let mut changes = removing(vec![leaf("card", 3)]);
        changes.insert(leaf("card", 4));
        render(&mut registry, &doc, changes);

        let queued: usize = registry
            .participants()
            .map(|(_, p)| p.nodes_to_dispose.len())
            .sum();
        assert_eq!(queued, 1);
        assert_eq!(registry.tree().children(root).len(), 3);

        registry.perform_cleanup();
        let queued: usize = registry
            .participants()
            .map(|(_, p)| p.nodes_to_dispose.len())
            .sum();
        assert_eq!(queued, 0);
        assert_eq!(registry.tree().children(root).len(), 1);
        assert_eq!(registry.tree().len(), 2);
    }

    #[test]
    fn test_cleanup_keeps_running_detached_halves() {
        let (mut registry, doc, _) = rooted();
        with_card(&mut registry, &doc);
        let root = registry.tree().roots()[0];

        doc.remove(2);
        let output = render(&mut registry, &doc, removing(vec![leaf("card", 2)]));
        let id = output.sprites[0].participant;
        let animation: SharedAnimation = Rc::new(Running::default());
        registry
            .record_animation(id, Half::Detached, animation.clone())
            .unwrap();

        registry.perform_cleanup();
        assert!(registry.participant(id).unwrap().detached.is_some());
        assert_eq!(registry.tree().children(root).len(), 1);

        // Cleanup canceled it, so the next pass drops the participant
        registry.perform_cleanup();
        assert!(registry.participant(id).is_none());
        assert!(registry.tree().children(root).is_empty());
    }

    #[test]
    fn test_animating_child_grafts_onto_live_ancestor() {
        let (mut registry, doc, _) = rooted();
        doc.add(2, Some(1), Rect::new(0.0, 0.0, 100.0, 100.0));
        doc.add(3, Some(2), Rect::new(0.0, 0.0, 10.0, 10.0));
        render(&mut registry, &doc, inserting(vec![leaf("group", 2), leaf("item", 3)]));

        doc.remove(2);
        doc.remove(3);
        let output = render(
            &mut registry,
            &doc,
            removing(vec![leaf("group", 2), leaf("item", 3)]),
        );
        let item = output
            .sprites
            .iter()
            .find(|s| s.identifier.id == "item")
            .unwrap();
        registry
            .record_animation(item.participant, Half::Detached, Rc::new(Running::default()))
            .unwrap();

        registry.perform_cleanup();
        let root = registry.tree().roots()[0];
        assert_eq!(registry.tree().children(root), &[item.node]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_scope_removal_and_purge() {
        let (mut registry, doc, root) = rooted();
        registry.scope_mut(root).unwrap().mark_destroying();
        render(&mut registry, &doc, removing(vec![Registration::Scope(root)]));
        assert_eq!(registry.purge_scopes(), vec![root]);
        assert!(registry.scope(root).is_none());

        registry.perform_cleanup();
        assert!(registry.is_empty());
        assert!(registry.tree().is_empty());
    }
}
