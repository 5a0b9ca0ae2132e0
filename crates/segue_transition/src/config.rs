//! Engine configuration presets

use std::path::Path;

use serde::{Deserialize, Serialize};

use segue_animation::{Behavior, Easing, MotionTiming, SpringOptions};
use segue_core::{FillMode, Result, SegueError};

/// Motion defaults offered to transition rules through the changeset
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionDefaults {
    pub spring: SpringOptions,
    pub tween_duration_ms: f64,
}

impl Default for MotionDefaults {
    fn default() -> Self {
        Self {
            spring: SpringOptions::default(),
            tween_duration_ms: 300.0,
        }
    }
}

impl MotionDefaults {
    /// Timing for the configured spring
    pub fn spring_timing(&self) -> Result<MotionTiming> {
        Behavior::spring(self.spring).map(MotionTiming::new)
    }

    /// Timing for a tween of the configured duration
    pub fn tween_timing(&self, easing: Easing) -> MotionTiming {
        MotionTiming::new(Behavior::tween(easing)).with_duration(self.tween_duration_ms)
    }
}

/// Configuration for a transition engine
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tween_duration_ms: f64,
    /// Fill mode passed to native playback
    pub fill: FillMode,
    /// Dump the element reference tree after every render
    pub log_tree: bool,
    /// Fold transform shorthands into a single `transform` keyframe property
    pub compose_transforms: bool,
    /// Default spring for rules that ask for one
    pub spring: SpringOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl EngineConfig {
    /// Standard configuration for general use.
    pub fn standard() -> Self {
        let motion = MotionDefaults::default();
        Self {
            spring: motion.spring,
            tween_duration_ms: motion.tween_duration_ms,
            fill: FillMode::None,
            log_tree: false,
            compose_transforms: true,
        }
    }

    /// Debug configuration: dumps the reference tree every render.
    pub fn debug() -> Self {
        Self {
            log_tree: true,
            ..Self::standard()
        }
    }

    /// Testing configuration: raw keyframes, short tweens.
    pub fn testing() -> Self {
        Self {
            spring: SpringOptions::default(),
            tween_duration_ms: 100.0,
            fill: FillMode::None,
            log_tree: false,
            compose_transforms: false,
        }
    }

    /// Defaults handed to transition rules
    pub fn motion(&self) -> MotionDefaults {
        MotionDefaults {
            spring: self.spring,
            tween_duration_ms: self.tween_duration_ms,
        }
    }

    pub fn with_spring(mut self, spring: SpringOptions) -> Self {
        self.spring = spring;
        self
    }

    pub fn with_tween_duration(mut self, duration_ms: f64) -> Self {
        self.tween_duration_ms = duration_ms;
        self
    }

    pub fn with_fill(mut self, fill: FillMode) -> Self {
        self.fill = fill;
        self
    }

    pub fn with_log_tree(mut self, log_tree: bool) -> Self {
        self.log_tree = log_tree;
        self
    }

    pub fn with_compose_transforms(mut self, compose: bool) -> Self {
        self.compose_transforms = compose;
        self
    }

    /// Parse a TOML document; missing keys take their standard values
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| SegueError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| SegueError::Config(e.to_string()))
    }

    fn validate(&self) -> Result<()> {
        if !(self.tween_duration_ms.is_finite() && self.tween_duration_ms >= 0.0) {
            return Err(SegueError::Config(format!(
                "tween_duration_ms must be a non-negative number, got {}",
                self.tween_duration_ms
            )));
        }
        Behavior::spring(self.spring)
            .map(|_| ())
            .map_err(|e| SegueError::Config(e.to_string()))
    }
}
