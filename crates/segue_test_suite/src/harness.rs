//! Test harness for scenario tests
//!
//! Provides infrastructure for running scenarios, including:
//! - An in-memory element provider with scriptable layout
//! - Animation handles that can be finished or canceled from the test
//! - A context that drives render cycles and records changesets

use anyhow::{Context, Result};
use segue_animation::AnimationTimeline;
use segue_core::{
    AnimationHandle, AnimationOptions, Completion, ElementId, ElementProvider, Keyframe,
    MeasureOptions, PlayState, Rect, SharedAnimation, Snapshot,
};
use segue_transition::{
    Changeset, EngineConfig, ScopeId, SpriteId, TransitionEngine, TransitionHandle,
    TransitionRules,
};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

/// Return type of transition rules written as plain functions
pub type RulesResult = segue_core::Result<Option<AnimationTimeline<SpriteId>>>;

/// Environment variable naming a TOML engine configuration for scenarios
pub const CONFIG_ENV: &str = "SEGUE_SCENARIO_CONFIG";

/// Result of a scenario
#[derive(Debug)]
pub enum TestResult {
    /// Scenario passed
    Passed,
    /// Scenario returned an error or panicked
    Failed { reason: String },
    /// Scenario skipped
    Skipped { reason: String },
}

impl TestResult {
    pub fn is_passed(&self) -> bool {
        matches!(self, TestResult::Passed | TestResult::Skipped { .. })
    }
}

/// Native animation stand-in
///
/// Starts running; the test decides when it finishes.
#[derive(Debug)]
pub struct MemoryAnimation {
    state: Cell<PlayState>,
    completion: Cell<Completion>,
}

impl Default for MemoryAnimation {
    fn default() -> Self {
        Self {
            state: Cell::new(PlayState::Running),
            completion: Cell::new(Completion::Pending),
        }
    }
}

impl MemoryAnimation {
    /// Play to the end
    pub fn finish(&self) {
        if self.completion.get() == Completion::Pending {
            self.state.set(PlayState::Finished);
            self.completion.set(Completion::Finished);
        }
    }
}

impl AnimationHandle for MemoryAnimation {
    fn play_state(&self) -> PlayState {
        self.state.get()
    }

    fn pause(&self) {
        if self.state.get() == PlayState::Running {
            self.state.set(PlayState::Paused);
        }
    }

    fn play(&self) {
        if self.state.get() == PlayState::Paused {
            self.state.set(PlayState::Running);
        }
    }

    fn cancel(&self) {
        self.state.set(PlayState::Idle);
        if self.completion.get() == Completion::Pending {
            self.completion.set(Completion::Aborted);
        }
    }

    fn completion(&self) -> Completion {
        self.completion.get()
    }
}

/// One `animate` call received by the document
#[derive(Clone, Debug)]
pub struct PlayedAnimation {
    pub element: ElementId,
    pub keyframes: Vec<Keyframe>,
    pub options: AnimationOptions,
    pub handle: Rc<MemoryAnimation>,
}

/// One `measure` call received by the document
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Measurement {
    pub element: ElementId,
    pub options: MeasureOptions,
    /// Running animations paused for the read
    pub paused: usize,
}

/// In-memory element tree
///
/// Elements are plain numbers. Detaching an element only drops its parent
/// link, so later measurements still report its last layout.
///
/// Measuring with animations pauses the element's running animations for
/// the read and resumes them only when the options ask for it.
#[derive(Debug, Default)]
pub struct MemoryDocument {
    parents: RefCell<HashMap<ElementId, ElementId>>,
    bounds: RefCell<HashMap<ElementId, Rect>>,
    styles: RefCell<HashMap<ElementId, Vec<(String, String)>>>,
    played: RefCell<Vec<PlayedAnimation>>,
    measurements: RefCell<Vec<Measurement>>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `element` under `parent` with the given layout
    pub fn place(&self, element: u64, parent: Option<u64>, bounds: Rect) {
        let element = ElementId(element);
        match parent {
            Some(parent) => {
                self.parents.borrow_mut().insert(element, ElementId(parent));
            }
            None => {
                self.parents.borrow_mut().remove(&element);
            }
        }
        self.bounds.borrow_mut().insert(element, bounds);
    }

    /// Change the layout of an element without reparenting it
    pub fn move_to(&self, element: u64, bounds: Rect) {
        self.bounds.borrow_mut().insert(ElementId(element), bounds);
    }

    pub fn detach(&self, element: u64) {
        self.parents.borrow_mut().remove(&ElementId(element));
    }

    pub fn set_style(&self, element: u64, property: &str, value: &str) {
        let mut styles = self.styles.borrow_mut();
        let entry = styles.entry(ElementId(element)).or_default();
        entry.retain(|(name, _)| name != property);
        entry.push((property.to_string(), value.to_string()));
    }

    /// Every animation started so far, oldest first
    pub fn played(&self) -> Vec<PlayedAnimation> {
        self.played.borrow().clone()
    }

    /// Animations started on one element, oldest first
    pub fn played_on(&self, element: u64) -> Vec<PlayedAnimation> {
        self.played
            .borrow()
            .iter()
            .filter(|played| played.element == ElementId(element))
            .cloned()
            .collect()
    }

    /// Measurements of one element, oldest first
    pub fn measurements_of(&self, element: u64) -> Vec<Measurement> {
        self.measurements
            .borrow()
            .iter()
            .filter(|measurement| measurement.element == ElementId(element))
            .copied()
            .collect()
    }

    /// Finish every animation that is still pending
    pub fn finish_all(&self) {
        for played in self.played.borrow().iter() {
            played.handle.finish();
        }
    }
}

impl ElementProvider for MemoryDocument {
    fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.parents.borrow().get(&element).copied()
    }

    fn measure(&self, element: ElementId, options: MeasureOptions) -> Snapshot {
        let paused: Vec<Rc<MemoryAnimation>> = if options.with_animations {
            self.played
                .borrow()
                .iter()
                .filter(|played| played.element == element)
                .filter(|played| played.handle.play_state() == PlayState::Running)
                .map(|played| {
                    played.handle.pause();
                    played.handle.clone()
                })
                .collect()
        } else {
            Vec::new()
        };
        self.measurements.borrow_mut().push(Measurement {
            element,
            options,
            paused: paused.len(),
        });

        let bounds = self
            .bounds
            .borrow()
            .get(&element)
            .copied()
            .unwrap_or_default();
        let styles = self.styles.borrow();
        let snapshot = styles
            .get(&element)
            .into_iter()
            .flatten()
            .fold(Snapshot::new(bounds), |snapshot, (property, value)| {
                snapshot.with_style(property.as_str(), value.as_str())
            });

        if options.play_animations {
            for handle in paused {
                handle.play();
            }
        }
        snapshot
    }

    fn animate(
        &self,
        element: ElementId,
        keyframes: &[Keyframe],
        options: &AnimationOptions,
    ) -> SharedAnimation {
        let handle = Rc::new(MemoryAnimation::default());
        self.played.borrow_mut().push(PlayedAnimation {
            element,
            keyframes: keyframes.to_vec(),
            options: options.clone(),
            handle: handle.clone(),
        });
        handle
    }
}

/// Rules that remember every changeset before delegating
struct Recording<R> {
    seen: Rc<RefCell<Vec<Changeset>>>,
    rules: R,
}

impl<R: TransitionRules> TransitionRules for Recording<R> {
    fn timeline(&self, changeset: &Changeset) -> RulesResult {
        self.seen.borrow_mut().push(changeset.clone());
        self.rules.timeline(changeset)
    }
}

fn no_animation(_: &Changeset) -> RulesResult {
    Ok(None)
}

/// Context for a single scenario
pub struct TestContext {
    /// Scenario name
    pub name: String,
    engine: TransitionEngine<MemoryDocument>,
    seen: Rc<RefCell<Vec<Changeset>>>,
}

impl TestContext {
    /// Create a new context with an empty document
    pub fn new(name: &str, config: EngineConfig) -> Self {
        Self {
            name: name.to_string(),
            engine: TransitionEngine::new(MemoryDocument::new(), config),
            seen: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn engine(&mut self) -> &mut TransitionEngine<MemoryDocument> {
        &mut self.engine
    }

    pub fn document(&self) -> &MemoryDocument {
        self.engine.provider()
    }

    /// Run one full render cycle around `mutate`
    pub fn render<F>(&mut self, mutate: F) -> Result<TransitionHandle>
    where
        F: FnOnce(&mut TransitionEngine<MemoryDocument>) -> Result<()>,
    {
        self.engine.begin_render().context("begin_render")?;
        mutate(&mut self.engine)?;
        let handle = self.engine.finish_render().context("finish_render")?;
        Ok(handle)
    }

    /// Record changesets of `scope` without animating them
    pub fn observe(&mut self, scope: ScopeId) {
        self.observe_with(scope, no_animation);
    }

    /// Record changesets of `scope` and animate them with `rules`
    pub fn observe_with(&mut self, scope: ScopeId, rules: impl TransitionRules + 'static) {
        self.engine.set_rules(
            scope,
            Recording {
                seen: self.seen.clone(),
                rules,
            },
        );
    }

    /// Changesets recorded since the last call
    pub fn take_changesets(&mut self) -> Vec<Changeset> {
        std::mem::take(&mut *self.seen.borrow_mut())
    }

    /// The only changeset recorded since the last call
    pub fn take_changeset(&mut self) -> Result<Changeset> {
        let mut changesets = self.take_changesets();
        anyhow::ensure!(
            changesets.len() == 1,
            "expected one changeset, got {}",
            changesets.len()
        );
        Ok(changesets.remove(0))
    }
}

/// Scenario harness
pub struct TestHarness {
    config: EngineConfig,
}

impl TestHarness {
    /// Create a harness using the testing preset, or the TOML file named by
    /// [`CONFIG_ENV`]
    pub fn new() -> Result<Self> {
        let config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => EngineConfig::load(&path)
                .with_context(|| format!("loading {}", path.to_string_lossy()))?,
            None => EngineConfig::testing(),
        };
        Ok(Self::with_config(config))
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one scenario in a fresh context
    pub fn run_test<F>(&self, name: &str, test_fn: F) -> Result<TestResult>
    where
        F: FnOnce(&mut TestContext) -> Result<()>,
    {
        let mut ctx = TestContext::new(name, self.config.clone());
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| test_fn(&mut ctx)));
        Ok(match outcome {
            Ok(Ok(())) => TestResult::Passed,
            Ok(Err(e)) => TestResult::Failed {
                reason: format!("{e:#}"),
            },
            Err(payload) => TestResult::Failed {
                reason: panic_message(payload.as_ref()),
            },
        })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "scenario panicked".to_string()
    }
}
