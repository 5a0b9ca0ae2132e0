//! Scenarios organized by category


use crate::runner::TestSuite;

/// Create all scenario suites
pub fn all_suites() -> Vec<TestSuite> {
    vec![
        matching::suite(),
        physics::suite(),
        orchestration::suite(),
        engine::suite(),
    ]
}
