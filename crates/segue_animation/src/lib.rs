//! Segue Animation
//!
//! The motion engine behind Segue transitions:
//!
//! - **Behaviors**: spring physics, eased tweens, static holds and waits,
//!   all sampled at 60 frames per second
//! - **Frame generation**: per-property frames for numbers, dimensions,
//!   colors and multi-part values
//! - **Timelines**: declarative sequential/parallel composition of motions
//! - **Orchestration**: flattening a timeline into per-target keyframes
//!
//! # Example
//!
//! ```rust
//! use segue_animation::{
//!     construct_keyframe, AnimationTimeline, Behavior, MotionDefinition, MotionOptions,
//!     MotionTarget, MotionTiming, OrchestrationMatrix,
//! };
//! use segue_core::Value;
//!
//! #[derive(Clone, PartialEq, Eq, Hash)]
//! struct Card;
//!
//! impl MotionTarget for Card {
//!     fn initial_value(&self, _: &str) -> Option<Value> { None }
//!     fn final_value(&self, _: &str) -> Option<Value> { None }
//! }
//!
//! let timeline = AnimationTimeline::sequence(vec![MotionDefinition::new(
//!     vec![Card],
//!     [("opacity", MotionOptions::between(0.0, 1.0))],
//!     MotionTiming::new(Behavior::linear()).with_duration(100.0),
//! )
//! .into()]);
//!
//! let matrix = OrchestrationMatrix::from_timeline(&timeline).unwrap();
//! let keyframes = matrix.get_keyframes(construct_keyframe);
//! assert_eq!(keyframes[&Card].len(), 7);
//! ```

pub mod behavior;
pub mod easing;
pub mod frame;
pub mod generate;
pub mod keyframe;
pub mod matrix;
pub mod timeline;

pub use behavior::{
    checked_frames, instantaneous_velocity, Behavior, SpringBehavior, SpringOptions,
    StaticBehavior, TweenBehavior, WaitBehavior, MAX_FRAMES, MAX_SPRING_FRAMES,
};
pub use easing::Easing;
pub use frame::{Frame, MatrixFrame, PropertyFrame};
pub use generate::{dasherize, generate_frames, normalize_property, FrameTiming, MotionTarget};
pub use keyframe::{compose_transform, construct_keyframe, TRANSFORM_PROPERTIES};
pub use matrix::{OrchestrationMatrix, RowFragment};
pub use timeline::{
    Anchor, AnimationTimeline, MotionDefinition, MotionOptions, MotionTiming, PropertyMotion,
    TimelineItem, TimelineKind, TimingDuration,
};
