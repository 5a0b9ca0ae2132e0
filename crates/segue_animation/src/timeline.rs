//! Declarative motion definitions and timelines
//!
//! An animation is a tree of [`AnimationTimeline`]s whose leaves are
//! [`MotionDefinition`]s. A motion definition applies one timing to a set of
//! properties on a set of targets; timelines compose motions back-to-back
//! (`sequence`) or side by side (`parallel`).
//!
//! ```rust
//! use segue_animation::{AnimationTimeline, Behavior, MotionDefinition, MotionOptions, MotionTiming};
//!
//! let fade_in: MotionDefinition<&str> = MotionDefinition::new(
//!     vec!["card"],
//!     [("opacity", MotionOptions::between(0.0, 1.0))],
//!     MotionTiming::new(Behavior::linear()).with_duration(300.0),
//! );
//! let timeline = AnimationTimeline::sequence(vec![fade_in.into()]);
//! assert_eq!(timeline.animations.len(), 1);
//! ```

use indexmap::IndexMap;

use segue_core::Value;

use crate::behavior::Behavior;

/// Endpoints of an interpolated property
///
/// Missing endpoints are read from the target's before/after snapshots.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MotionOptions {
    pub from: Option<Value>,
    pub to: Option<Value>,
    /// Initial velocity in units per millisecond (springs only)
    pub velocity: f64,
}

impl MotionOptions {
    /// Both endpoints from the target's snapshots
    pub fn from_snapshots() -> Self {
        Self::default()
    }

    pub fn between(from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Self {
            from: Some(from.into()),
            to: Some(to.into()),
            velocity: 0.0,
        }
    }

    pub fn with_from(mut self, from: impl Into<Value>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn with_to(mut self, to: impl Into<Value>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn with_velocity(mut self, velocity: f64) -> Self {
        self.velocity = velocity;
        self
    }
}

/// What happens to one property
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyMotion {
    /// Interpolate between two values
    Animate(MotionOptions),
    /// Hold a value (static behaviors only)
    Hold(Value),
}

impl From<MotionOptions> for PropertyMotion {
    fn from(options: MotionOptions) -> Self {
        PropertyMotion::Animate(options)
    }
}

impl From<Value> for PropertyMotion {
    fn from(value: Value) -> Self {
        PropertyMotion::Hold(value)
    }
}

/// Duration of a motion
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TimingDuration {
    Ms(f64),
    /// Inside a parallel timeline: as long as the longest sibling laid out
    /// before this motion
    Infer,
}

/// Placement of a motion within the longest earlier sibling of a parallel
/// timeline
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Anchor {
    #[default]
    Start,
    Center,
    End,
}

/// Behavior and timing shared by every property of a motion definition
#[derive(Clone, Debug, PartialEq)]
pub struct MotionTiming {
    pub behavior: Behavior,
    pub duration: Option<TimingDuration>,
    pub delay_ms: f64,
    pub anchor: Anchor,
}

impl MotionTiming {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            duration: None,
            delay_ms: 0.0,
            anchor: Anchor::Start,
        }
    }

    pub fn with_duration(mut self, duration_ms: f64) -> Self {
        self.duration = Some(TimingDuration::Ms(duration_ms));
        self
    }

    pub fn with_inferred_duration(mut self) -> Self {
        self.duration = Some(TimingDuration::Infer);
        self
    }

    pub fn with_delay(mut self, delay_ms: f64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }
}

/// A set of property motions applied to a set of targets
#[derive(Clone, Debug, PartialEq)]
pub struct MotionDefinition<K> {
    pub targets: Vec<K>,
    pub properties: IndexMap<String, PropertyMotion>,
    pub timing: MotionTiming,
}

impl<K> MotionDefinition<K> {
    pub fn new<P, M>(
        targets: impl IntoIterator<Item = K>,
        properties: impl IntoIterator<Item = (P, M)>,
        timing: MotionTiming,
    ) -> Self
    where
        P: Into<String>,
        M: Into<PropertyMotion>,
    {
        Self {
            targets: targets.into_iter().collect(),
            properties: properties
                .into_iter()
                .map(|(property, motion)| (property.into(), motion.into()))
                .collect(),
            timing,
        }
    }

    /// A wait of `duration_ms` on `targets`
    pub fn wait(targets: impl IntoIterator<Item = K>, duration_ms: f64) -> Self {
        Self {
            targets: targets.into_iter().collect(),
            properties: IndexMap::new(),
            timing: MotionTiming::new(Behavior::wait()).with_duration(duration_ms),
        }
    }
}

/// How a timeline lays out its children
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimelineKind {
    Sequence,
    Parallel,
}

/// A child of a timeline
#[derive(Clone, Debug, PartialEq)]
pub enum TimelineItem<K> {
    Motion(MotionDefinition<K>),
    Timeline(AnimationTimeline<K>),
}

impl<K> From<MotionDefinition<K>> for TimelineItem<K> {
    fn from(motion: MotionDefinition<K>) -> Self {
        TimelineItem::Motion(motion)
    }
}

impl<K> From<AnimationTimeline<K>> for TimelineItem<K> {
    fn from(timeline: AnimationTimeline<K>) -> Self {
        TimelineItem::Timeline(timeline)
    }
}

/// Sequential or parallel composition of motions
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationTimeline<K> {
    pub kind: TimelineKind,
    pub animations: Vec<TimelineItem<K>>,
}

impl<K> AnimationTimeline<K> {
    pub fn sequence(animations: Vec<TimelineItem<K>>) -> Self {
        Self {
            kind: TimelineKind::Sequence,
            animations,
        }
    }

    pub fn parallel(animations: Vec<TimelineItem<K>>) -> Self {
        Self {
            kind: TimelineKind::Parallel,
            animations,
        }
    }

    /// Every target mentioned anywhere in the timeline, first mention first
    pub fn targets(&self) -> Vec<&K>
    where
        K: PartialEq,
    {
        let mut targets: Vec<&K> = Vec::new();
        self.collect_targets(&mut targets);
        targets
    }

    /// Rebuild the timeline with every target resolved through `resolve`
    pub fn try_map_targets<U, E>(
        &self,
        resolve: &mut impl FnMut(&K) -> Result<U, E>,
    ) -> Result<AnimationTimeline<U>, E> {
        let animations = self
            .animations
            .iter()
            .map(|item| match item {
                TimelineItem::Motion(motion) => Ok(TimelineItem::Motion(MotionDefinition {
                    targets: motion
                        .targets
                        .iter()
                        .map(&mut *resolve)
                        .collect::<Result<_, E>>()?,
                    properties: motion.properties.clone(),
                    timing: motion.timing.clone(),
                })),
                TimelineItem::Timeline(timeline) => {
                    timeline.try_map_targets(resolve).map(TimelineItem::Timeline)
                }
            })
            .collect::<Result<_, E>>()?;
        Ok(AnimationTimeline {
            kind: self.kind,
            animations,
        })
    }

    fn collect_targets<'a>(&'a self, into: &mut Vec<&'a K>)
    where
        K: PartialEq,
    {
        for item in &self.animations {
            match item {
                TimelineItem::Motion(motion) => {
                    for target in &motion.targets {
                        if !into.contains(&target) {
                            into.push(target);
                        }
                    }
                }
                TimelineItem::Timeline(timeline) => timeline.collect_targets(into),
            }
        }
    }
}
