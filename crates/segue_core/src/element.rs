//! Element provider contract
//!
//! The host owns the real visual tree. Segue only sees opaque
//! [`ElementId`] handles and talks to the tree through [`ElementProvider`]:
//! reading structure, measuring geometry/style, and starting native keyframe
//! playback which is observed through an [`AnimationHandle`].

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::keyframe::Keyframe;
use crate::snapshot::Snapshot;

/// Opaque, stable handle to one element of the host's visual tree
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

impl ElementId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How in-flight animations are treated while measuring
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeasureOptions {
    /// Measure the element as currently displayed, including animation effects
    pub with_animations: bool,
    /// Resume paused animations once the measurement is read
    pub play_animations: bool,
}

impl MeasureOptions {
    /// Post-layout truth, no special handling of animations
    pub const FINAL: MeasureOptions = MeasureOptions {
        with_animations: false,
        play_animations: true,
    };

    /// Pause in-flight animations, read the visible state, then resume them
    ///
    /// Handles must be back in their previous play state afterwards: cleanup
    /// treats a paused handle as no longer animating.
    pub const VISIBLE: MeasureOptions = MeasureOptions {
        with_animations: true,
        play_animations: true,
    };
}

impl Default for MeasureOptions {
    fn default() -> Self {
        Self::FINAL
    }
}

/// Fill mode applied by the native playback primitive
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FillMode {
    /// Effects are removed once playback ends
    #[default]
    None,
    /// Last keyframe persists after playback
    Forwards,
    /// First keyframe applies during the delay
    Backwards,
    /// Both forwards and backwards
    Both,
}

/// Options passed to [`ElementProvider::animate`]
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationOptions {
    pub duration_ms: f64,
    pub delay_ms: f64,
    /// Native easing; generated keyframes are already eased so this is
    /// normally `"linear"`
    pub easing: String,
    pub fill: FillMode,
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self {
            duration_ms: 0.0,
            delay_ms: 0.0,
            easing: "linear".to_string(),
            fill: FillMode::None,
        }
    }
}

/// Play state of a native animation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayState {
    Idle,
    Running,
    Paused,
    Finished,
}

impl PlayState {
    /// Whether an animation in this state still drives its element
    pub fn is_active(self) -> bool {
        matches!(self, PlayState::Running)
    }
}

/// Completion signal of a native animation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// Still playing (or paused)
    Pending,
    /// Played to the end
    Finished,
    /// Canceled before it finished
    Aborted,
}

/// Handle to one native keyframe animation
///
/// Cancellation is synchronous: after `cancel()` returns, `play_state()`
/// reports [`PlayState::Idle`] and `completion()` reports
/// [`Completion::Aborted`].
pub trait AnimationHandle {
    fn play_state(&self) -> PlayState;

    fn pause(&self);

    fn play(&self);

    fn cancel(&self);

    fn completion(&self) -> Completion;
}

/// Shared animation handle, held by both the participant half and the caller
pub type SharedAnimation = Rc<dyn AnimationHandle>;

/// The host's visual tree, as seen by the engine
pub trait ElementProvider {
    /// Parent element in the live tree, `None` for roots or detached elements
    fn parent(&self, element: ElementId) -> Option<ElementId>;

    /// Capture geometry and computed style
    fn measure(&self, element: ElementId, options: MeasureOptions) -> Snapshot;

    /// Start native keyframe playback on an element
    fn animate(
        &self,
        element: ElementId,
        keyframes: &[Keyframe],
        options: &AnimationOptions,
    ) -> SharedAnimation;

    /// Depth of an element in the live tree (roots are 0)
    fn depth(&self, element: ElementId) -> usize {
        let mut depth = 0;
        let mut cursor = self.parent(element);
        while let Some(parent) = cursor {
            depth += 1;
            cursor = self.parent(parent);
        }
        depth
    }
}
