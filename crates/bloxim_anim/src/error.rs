//! # Animation Error Types

use thiserror::Error;

/// Errors raised when starting an animation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimError {
    /// A keyframe animation needs at least one keyframe.
    #[error("timeline has no keyframes")]
    EmptyTimeline,

    /// A keyframe duration was negative or not finite.
    #[error("keyframe {index} has invalid duration {duration}")]
    InvalidDuration {
        /// Position of the keyframe.
        index: usize,
        /// The offending duration.
        duration: f32,
    },

    /// No motion clip is registered under this name.
    #[error("unknown motion {0:?}")]
    UnknownMotion(String),

    /// Iteration count was negative or NaN.
    #[error("invalid iteration count {0}")]
    InvalidIterations(f32),

    /// The entity or player to animate does not exist.
    #[error("animation target {0} does not exist")]
    MissingTarget(String),
}

/// Result type for animation operations.
pub type AnimResult<T> = Result<T, AnimError>;
