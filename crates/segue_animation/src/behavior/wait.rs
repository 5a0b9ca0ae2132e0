//! Placeholder motion that only occupies time

use segue_core::time_to_frames;

use crate::frame::MatrixFrame;

/// Emits empty columns to shift whatever follows it in a sequence
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WaitBehavior;

impl WaitBehavior {
    /// Waits carry no value, so filling is meaningless
    pub fn fill(&self) -> bool {
        false
    }

    pub fn frame_count(&self, duration_ms: f64) -> usize {
        time_to_frames(duration_ms) + 1
    }

    pub fn frames(&self, duration_ms: f64) -> Vec<MatrixFrame> {
        vec![None; self.frame_count(duration_ms)]
    }
}
