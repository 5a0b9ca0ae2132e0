//! Segue Transition
//!
//! Layout transitions for a retained element tree:
//!
//! - **Registrations**: scopes (animation boundaries) and leaves
//!   (individually animated elements) reported by the host
//! - **Participants**: long-lived identities matched across renders, by
//!   element for removals and by key for insertions
//! - **Element reference tree**: which stable scopes sit above every leaf
//! - **Sprites and animators**: the per-render view handed to transition
//!   rules through changesets
//! - **Engine**: the render-cycle driver that measures, matches, runs the
//!   rules and starts playback
//!
//! # Example
//!
//! ```rust,ignore
//! use segue_transition::{EngineConfig, LeafRegistration, TransitionEngine};
//!
//! let mut engine = TransitionEngine::new(document, EngineConfig::standard());
//!
//! engine.begin_render()?;
//! let root = engine.register_scope(root_element, Some("root"));
//! engine.register_leaf(LeafRegistration::new("card", card_element));
//! engine.finish_render()?;
//!
//! engine.set_rules(root, |changeset: &Changeset| {
//!     // build an AnimationTimeline<SpriteId> from the changeset
//! #   Ok(None)
//! });
//! ```

pub mod changeset;
pub mod config;
pub mod element_tree;
pub mod engine;
pub mod participant;
pub mod registration;
pub mod registry;
pub mod sprite;

pub use changeset::{Changeset, SpriteQuery};
pub use config::{EngineConfig, MotionDefaults};
pub use element_tree::{ElementTree, TreeNode};
pub use engine::{
    StartedAnimation, TransitionEngine, TransitionHandle, TransitionRules, TransitionStatus,
};
pub use participant::{
    CurrentStage, DetachedStage, Half, Identifier, MatchGroup, Participant, SpriteShape,
};
pub use registration::{
    LeafRegistration, NodeId, ParticipantId, Registration, RenderChanges, Scope, ScopeId,
};
pub use registry::{ParticipantRegistry, RenderOutput};
pub use sprite::{
    Animator, AnimatorId, SnapshotPair, Sprite, SpriteId, SpriteIdentifier, SpriteKind, Transfer,
};
