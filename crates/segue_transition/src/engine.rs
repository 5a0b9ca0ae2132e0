//! Render-cycle driver
//!
//! [`TransitionEngine`] ties the registry to the host's element provider:
//!
//! ```text
//! begin_render()      clear snapshots, measure what is visible now
//! <host mutates its tree, registers/unregisters scopes and leaves>
//! finish_render()     match, measure the new layout, derive sprites,
//!                     run transition rules, start playback
//! ```

use std::fmt;

use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use segue_animation::{
    compose_transform, construct_keyframe, AnimationTimeline, OrchestrationMatrix,
};
use segue_core::{
    frames_to_time, AnimationOptions, Completion, ElementId, ElementProvider, Keyframe, Result,
    SegueError, SharedAnimation,
};

use crate::changeset::Changeset;
use crate::config::EngineConfig;
use crate::registration::{LeafRegistration, Registration, RenderChanges, Scope, ScopeId};
use crate::registry::{ParticipantRegistry, RenderOutput};
use crate::sprite::{Sprite, SpriteId};

/// Host-supplied animation definition for one scope
///
/// Called once per render with the changeset of the scope's animator.
/// Timelines target sprites by id; `Ok(None)` leaves the changeset
/// unanimated.
pub trait TransitionRules {
    fn timeline(&self, changeset: &Changeset) -> Result<Option<AnimationTimeline<SpriteId>>>;
}

impl<F> TransitionRules for F
where
    F: Fn(&Changeset) -> Result<Option<AnimationTimeline<SpriteId>>>,
{
    fn timeline(&self, changeset: &Changeset) -> Result<Option<AnimationTimeline<SpriteId>>> {
        self(changeset)
    }
}

/// Overall state of the animations started by one render
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionStatus {
    /// At least one animation is still pending
    Running,
    /// Every animation finished or was canceled
    Settled,
}

/// One started animation
#[derive(Clone)]
pub struct StartedAnimation {
    pub sprite: SpriteId,
    pub element: ElementId,
    pub frames: usize,
    pub animation: SharedAnimation,
}

impl fmt::Debug for StartedAnimation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartedAnimation")
            .field("sprite", &self.sprite)
            .field("element", &self.element)
            .field("frames", &self.frames)
            .field("play_state", &self.animation.play_state())
            .finish()
    }
}

/// Completion handles for everything one render started
#[derive(Clone, Debug, Default)]
pub struct TransitionHandle {
    animations: Vec<StartedAnimation>,
}

impl TransitionHandle {
    pub fn animations(&self) -> &[StartedAnimation] {
        &self.animations
    }

    pub fn animation_for(&self, sprite: SpriteId) -> Option<&StartedAnimation> {
        self.animations.iter().find(|started| started.sprite == sprite)
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }

    /// Aborted animations count as settled
    pub fn status(&self) -> TransitionStatus {
        let mut running = false;
        for started in &self.animations {
            match started.animation.completion() {
                Completion::Pending => running = true,
                Completion::Aborted => {
                    debug!(element = %started.element, "animation aborted");
                }
                Completion::Finished => {}
            }
        }
        if running {
            TransitionStatus::Running
        } else {
            TransitionStatus::Settled
        }
    }

    pub fn cancel(&self) {
        for started in &self.animations {
            started.animation.cancel();
        }
    }
}

/// Transition engine bound to one element provider
pub struct TransitionEngine<P: ElementProvider> {
    provider: P,
    config: EngineConfig,
    registry: ParticipantRegistry,
    pending: RenderChanges,
    rules: FxHashMap<ScopeId, Box<dyn TransitionRules>>,
    rendering: bool,
    /// Set when a failed cycle already cleared the snapshots
    snapshots_reset: bool,
}

impl<P: ElementProvider> TransitionEngine<P> {
    pub fn new(provider: P, config: EngineConfig) -> Self {
        Self {
            provider,
            config,
            registry: ParticipantRegistry::new(),
            pending: RenderChanges::new(),
            rules: FxHashMap::default(),
            rendering: false,
            snapshots_reset: false,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ParticipantRegistry {
        &self.registry
    }

    pub fn is_rendering(&self) -> bool {
        self.rendering
    }

    pub fn register_scope(&mut self, element: ElementId, id: Option<&str>) -> ScopeId {
        let mut scope = Scope::new(element);
        scope.id = id.map(str::to_string);
        let scope = self.registry.add_scope(scope);
        self.pending.insert(Registration::Scope(scope));
        scope
    }

    pub fn unregister_scope(&mut self, scope: ScopeId) -> Result<()> {
        let Some(registered) = self.registry.scope_mut(scope) else {
            return Err(SegueError::invalid_match(format!(
                "unregistering unknown scope {scope:?}"
            )));
        };
        registered.mark_destroying();
        self.pending.remove(Registration::Scope(scope));
        Ok(())
    }

    pub fn register_leaf(&mut self, leaf: LeafRegistration) {
        self.pending.insert(Registration::Leaf(leaf));
    }

    pub fn unregister_leaf(&mut self, leaf: LeafRegistration) {
        self.pending.remove(Registration::Leaf(leaf));
    }

    /// Install the rules run for the animator of `scope`
    pub fn set_rules(&mut self, scope: ScopeId, rules: impl TransitionRules + 'static) {
        self.rules.insert(scope, Box::new(rules));
    }

    pub fn clear_rules(&mut self, scope: ScopeId) {
        self.rules.remove(&scope);
    }

    /// Measure the tree before the host mutates it
    pub fn begin_render(&mut self) -> Result<()> {
        if self.rendering {
            return Err(SegueError::invalid_state("render already in progress"));
        }
        if !std::mem::take(&mut self.snapshots_reset) {
            self.registry.clear_snapshots()?;
        }
        self.registry.snapshot_before_render(&self.provider)?;
        self.rendering = true;
        trace!("render started");
        Ok(())
    }

    /// Match, derive sprites and start every animation the rules ask for
    ///
    /// If matching or sprite derivation fails, the cycle's registrations are
    /// discarded and its snapshots reset so the next `begin_render` starts
    /// clean.
    pub fn finish_render(&mut self) -> Result<TransitionHandle> {
        if !self.rendering {
            return Err(SegueError::invalid_state(
                "finish_render called without begin_render",
            ));
        }
        self.rendering = false;

        let changes = std::mem::take(&mut self.pending);
        let output = match self.derive(&changes) {
            Ok(output) => output,
            Err(err) => {
                warn!(error = %err, "render cycle failed, discarding its snapshots");
                self.registry.reset_snapshots();
                self.snapshots_reset = true;
                return Err(err);
            }
        };
        if self.config.log_tree {
            self.registry.log_tree();
        }

        let mut handle = TransitionHandle::default();
        let defaults = self.config.motion();
        for changeset in output.changesets() {
            let Some(animator) = changeset.animator.and_then(|id| output.animator(id)) else {
                continue;
            };
            let Some(rules) = self.rules.get(&animator.scope) else {
                continue;
            };
            let changeset = changeset.with_defaults(defaults);
            let Some(timeline) = rules.timeline(&changeset)? else {
                continue;
            };
            debug!(
                scope = ?animator.scope,
                sprites = changeset.len(),
                "running transition rules"
            );
            self.play(&output, &timeline, &mut handle)?;
        }

        for scope in self.registry.purge_scopes() {
            self.rules.remove(&scope);
        }
        Ok(handle)
    }

    fn derive(&mut self, changes: &RenderChanges) -> Result<RenderOutput> {
        self.registry.update_participants(changes, &self.provider)?;
        self.registry.snapshot_after_render(&self.provider)?;
        self.registry.create_animators_and_sprites()
    }

    fn play(
        &mut self,
        output: &RenderOutput,
        timeline: &AnimationTimeline<SpriteId>,
        handle: &mut TransitionHandle,
    ) -> Result<()> {
        let resolved = timeline.try_map_targets(&mut |id: &SpriteId| {
            output.sprite(*id).ok_or_else(|| {
                SegueError::InvalidTimeline(format!("timeline targets unknown sprite {id:?}"))
            })
        })?;
        let matrix: OrchestrationMatrix<&Sprite> = OrchestrationMatrix::from_timeline(&resolved)?;

        for (sprite, keyframes) in matrix.get_keyframes(construct_keyframe) {
            if keyframes.is_empty() {
                continue;
            }
            let keyframes: Vec<Keyframe> = if self.config.compose_transforms {
                keyframes.iter().map(compose_transform).collect()
            } else {
                keyframes
            };
            let options = AnimationOptions {
                duration_ms: frames_to_time(keyframes.len() - 1),
                fill: self.config.fill,
                ..AnimationOptions::default()
            };
            trace!(
                element = %sprite.element,
                frames = keyframes.len(),
                duration_ms = options.duration_ms,
                "starting animation"
            );
            let animation = self.provider.animate(sprite.element, &keyframes, &options);
            self.registry
                .record_animation(sprite.participant, sprite.half, animation.clone())?;
            handle.animations.push(StartedAnimation {
                sprite: sprite.id,
                element: sprite.element,
                frames: keyframes.len(),
                animation,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changeset::SpriteQuery;
    use crate::sprite::SpriteKind;
    use segue_animation::{Behavior, MotionDefinition, MotionOptions, MotionTiming};
    use segue_core::{AnimationHandle, MeasureOptions, PlayState, Rect, Snapshot, Value};
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::rc::Rc;

    struct Playback {
        state: Cell<PlayState>,
        completion: Cell<Completion>,
    }

    impl AnimationHandle for Playback {
        fn play_state(&self) -> PlayState {
            self.state.get()
        }
        fn pause(&self) {
            self.state.set(PlayState::Paused);
        }
        fn play(&self) {
            self.state.set(PlayState::Running);
        }
        fn cancel(&self) {
            self.state.set(PlayState::Idle);
            self.completion.set(Completion::Aborted);
        }
        fn completion(&self) -> Completion {
            self.completion.get()
        }
    }

    #[derive(Default)]
    struct Page {
        parents: RefCell<HashMap<ElementId, ElementId>>,
        bounds: RefCell<HashMap<ElementId, Rect>>,
        played: RefCell<Vec<(ElementId, Vec<Keyframe>, AnimationOptions)>>,
    }

    impl Page {
        fn place(&self, element: u64, parent: Option<u64>, bounds: Rect) {
            if let Some(parent) = parent {
                self.parents
                    .borrow_mut()
                    .insert(ElementId(element), ElementId(parent));
            }
            self.bounds.borrow_mut().insert(ElementId(element), bounds);
        }
    }

    impl ElementProvider for Page {
        fn parent(&self, element: ElementId) -> Option<ElementId> {
            self.parents.borrow().get(&element).copied()
        }

        fn measure(&self, element: ElementId, _: MeasureOptions) -> Snapshot {
            Snapshot::new(self.bounds.borrow().get(&element).copied().unwrap_or_default())
        }

        fn animate(
            &self,
            element: ElementId,
            keyframes: &[Keyframe],
            options: &AnimationOptions,
        ) -> SharedAnimation {
            self.played
                .borrow_mut()
                .push((element, keyframes.to_vec(), options.clone()));
            Rc::new(Playback {
                state: Cell::new(PlayState::Running),
                completion: Cell::new(Completion::Pending),
            })
        }
    }

    fn slide(changeset: &Changeset) -> Result<Option<AnimationTimeline<SpriteId>>> {
        let kept = changeset.sprites_for(&SpriteQuery::new().kind(SpriteKind::Kept));
        if kept.is_empty() {
            return Ok(None);
        }
        Ok(Some(AnimationTimeline::parallel(vec![MotionDefinition::new(
            kept.iter().map(|sprite| sprite.id),
            [("x", MotionOptions::from_snapshots())],
            MotionTiming::new(Behavior::linear()).with_duration(50.0),
        )
        .into()])))
    }

    fn engine() -> (TransitionEngine<Page>, ScopeId) {
        let page = Page::default();
        page.place(1, None, Rect::new(0.0, 0.0, 500.0, 500.0));
        page.place(2, Some(1), Rect::new(0.0, 0.0, 50.0, 50.0));
        let mut engine = TransitionEngine::new(page, EngineConfig::testing());

        engine.begin_render().unwrap();
        let root = engine.register_scope(ElementId(1), Some("root"));
        engine.register_leaf(LeafRegistration::new("card", ElementId(2)));
        assert!(engine.finish_render().unwrap().is_empty());
        (engine, root)
    }

    #[test]
    fn test_render_cycle_guards() {
        let (mut engine, _) = engine();
        assert!(engine.finish_render().is_err());
        engine.begin_render().unwrap();
        assert!(engine.begin_render().is_err());
        assert!(engine.is_rendering());
    }

    #[test]
    fn test_kept_sprite_slides() {
        let (mut engine, root) = engine();
        engine.set_rules(root, slide);

        engine.begin_render().unwrap();
        engine
            .provider()
            .place(2, Some(1), Rect::new(30.0, 0.0, 50.0, 50.0));
        let handle = engine.finish_render().unwrap();

        assert_eq!(handle.len(), 1);
        let played = engine.provider().played.borrow();
        let (element, keyframes, options) = &played[0];
        assert_eq!(*element, ElementId(2));
        assert_eq!(keyframes.len(), 4);
        assert_eq!(keyframes[0]["translateX"], Value::px(-30.0));
        assert_eq!(keyframes[3]["translateX"], Value::px(0.0));
        assert!((options.duration_ms - 50.0).abs() < 1e-9);
        assert_eq!(handle.status(), TransitionStatus::Running);
    }

    #[test]
    fn test_composed_transforms() {
        let page = Page::default();
        page.place(1, None, Rect::new(0.0, 0.0, 500.0, 500.0));
        page.place(2, Some(1), Rect::new(0.0, 0.0, 50.0, 50.0));
        let mut engine = TransitionEngine::new(page, EngineConfig::standard());
        engine.begin_render().unwrap();
        let root = engine.register_scope(ElementId(1), None);
        engine.register_leaf(LeafRegistration::new("card", ElementId(2)));
        engine.finish_render().unwrap();
        engine.set_rules(root, slide);

        engine.begin_render().unwrap();
        engine
            .provider()
            .place(2, Some(1), Rect::new(30.0, 0.0, 50.0, 50.0));
        engine.finish_render().unwrap();

        let played = engine.provider().played.borrow();
        let first = &played[0].1[0];
        assert!(!first.contains_key("translateX"));
        assert_eq!(first["transform"].to_string(), "translateX(-30px)");
    }

    #[test]
    fn test_interrupted_animation_is_canceled() {
        let (mut engine, root) = engine();
        engine.set_rules(root, slide);

        engine.begin_render().unwrap();
        engine
            .provider()
            .place(2, Some(1), Rect::new(30.0, 0.0, 50.0, 50.0));
        let first = engine.finish_render().unwrap();

        engine.begin_render().unwrap();
        engine
            .provider()
            .place(2, Some(1), Rect::new(60.0, 0.0, 50.0, 50.0));
        let second = engine.finish_render().unwrap();

        assert_eq!(first.status(), TransitionStatus::Settled);
        assert_eq!(
            first.animations()[0].animation.play_state(),
            PlayState::Idle
        );
        assert_eq!(second.status(), TransitionStatus::Running);
        second.cancel();
        assert_eq!(second.status(), TransitionStatus::Settled);
    }

    #[test]
    fn test_unknown_sprite_in_timeline() {
        let (mut engine, root) = engine();
        engine.set_rules(root, |_: &Changeset| -> Result<Option<AnimationTimeline<SpriteId>>> {
            Ok(Some(AnimationTimeline::sequence(vec![
                MotionDefinition::wait(vec![SpriteId(42)], 100.0).into(),
            ])))
        });
        engine.begin_render().unwrap();
        assert!(matches!(
            engine.finish_render(),
            Err(SegueError::InvalidTimeline(_))
        ));
    }

    #[test]
    fn test_engine_recovers_from_unmatched_removal() {
        let (mut engine, root) = engine();
        engine.set_rules(root, slide);

        engine.begin_render().unwrap();
        engine.unregister_leaf(LeafRegistration::new("ghost", ElementId(99)));
        assert!(matches!(
            engine.finish_render(),
            Err(SegueError::UnmatchedRemoval(ElementId(99)))
        ));

        engine.begin_render().unwrap();
        engine
            .provider()
            .place(2, Some(1), Rect::new(30.0, 0.0, 50.0, 50.0));
        let handle = engine.finish_render().unwrap();
        assert_eq!(handle.len(), 1);

        // Back on the normal snapshot cycle
        engine.begin_render().unwrap();
        engine.finish_render().unwrap();
    }

    #[test]
    fn test_unregistered_scope_is_purged() {
        let (mut engine, root) = engine();
        engine.set_rules(root, slide);

        engine.begin_render().unwrap();
        engine.unregister_scope(root).unwrap();
        engine.unregister_leaf(LeafRegistration::new("card", ElementId(2)));
        engine.finish_render().unwrap();

        assert!(engine.registry().scope(root).is_none());
        assert!(engine.unregister_scope(root).is_err());
    }
}
