//! Segue Scenario Test Suite
//!
//! End-to-end scenarios for the Segue transition engine, run against an
//! in-memory element provider.
//!
//! # Test Categories
//!
//! - **Matching**: insertions, removals and far matches across renders
//! - **Physics**: spring, tween and hold frame generation
//! - **Orchestration**: timeline layout and keyframe construction
//! - **Engine**: full render cycles with transition rules and playback

pub mod harness;
pub mod runner;
pub mod tests;

pub use harness::{
    Measurement, MemoryAnimation, MemoryDocument, PlayedAnimation, RulesResult, TestContext,
    TestHarness, TestResult,
};
pub use runner::TestRunner;
