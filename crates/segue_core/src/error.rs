//! Segue error types

use std::io;
use thiserror::Error;

use crate::element::ElementId;

/// Errors raised by the transition engine
///
/// Every variant except [`SegueError::Io`] and [`SegueError::Config`] is an
/// invariant violation: the render cycle that produced it must be abandoned.
#[derive(Error, Debug)]
pub enum SegueError {
    /// A removal arrived for an element the registry never tracked
    #[error("unexpected unmatched removed element {0}")]
    UnmatchedRemoval(ElementId),

    /// A participant state transition was attempted from the wrong stage
    #[error("invalid participant state: {0}")]
    InvalidState(String),

    /// A match group combination that cannot happen for a well-behaved host
    #[error("invalid match: {0}")]
    InvalidMatch(String),

    /// Behavior parameters out of range or incompatible with the motion
    #[error("invalid behavior: {0}")]
    InvalidBehavior(String),

    /// A timeline that cannot be laid out
    #[error("invalid timeline: {0}")]
    InvalidTimeline(String),

    /// Endpoints that cannot be interpolated into each other
    #[error("incompatible values: {0}")]
    IncompatibleValues(String),

    /// Style value parsing error
    #[error("parse error: {0}")]
    Parse(String),

    /// Engine configuration error
    #[error("config error: {0}")]
    Config(String),

    /// IO error when reading configuration
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl SegueError {
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn invalid_match(message: impl Into<String>) -> Self {
        Self::InvalidMatch(message.into())
    }
}

/// Result type for Segue operations
pub type Result<T> = std::result::Result<T, SegueError>;
