//! Constant-value hold

use segue_core::time_to_frames;

/// Holds one value for a duration
///
/// Filling holds persist after their last frame like any other motion.
/// Transient holds (`fill == false`) only show for their own columns and are
/// removed from every later keyframe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StaticBehavior {
    fill: bool,
}

impl Default for StaticBehavior {
    fn default() -> Self {
        Self { fill: true }
    }
}

impl StaticBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    /// A hold that is not forward-filled past its duration
    pub fn transient() -> Self {
        Self { fill: false }
    }

    pub fn fill(&self) -> bool {
        self.fill
    }

    /// Number of frames a hold of `duration_ms` after `delay_ms` occupies
    pub fn frame_count(&self, duration_ms: f64, delay_ms: f64) -> usize {
        time_to_frames(delay_ms) + time_to_frames(duration_ms) + 1
    }

    /// Repeat `value` for the whole hold
    pub fn frames<T: Clone>(&self, value: &T, duration_ms: f64, delay_ms: f64) -> Vec<T> {
        vec![value.clone(); self.frame_count(duration_ms, delay_ms)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use segue_core::FRAME_DURATION_MS;

    #[test]
    fn test_hold_length() {
        let frames = StaticBehavior::new().frames(&"123", 3.0 * FRAME_DURATION_MS, 0.0);
        assert_eq!(frames, vec!["123"; 4]);
    }

    #[test]
    fn test_fill_modes() {
        assert!(StaticBehavior::default().fill());
        assert!(!StaticBehavior::transient().fill());
    }
}
