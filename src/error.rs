//! Error types for pipeline construction and lifecycle operations.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced while building a pipeline.
///
/// Construction is the only place configuration problems can appear; once a
/// pipeline exists, the publishing and consuming hot paths are non-faulting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Ring capacity must be a positive power of two.
    #[error("capacity must be a positive power of two, got {got}")]
    InvalidCapacity {
        /// The rejected capacity.
        got: usize,
    },

    /// A pipeline without consumers would publish into the void.
    #[error("pipeline requires at least one event handler")]
    NoHandlers,

    /// Backoff delays must be non-zero and ordered.
    #[error("invalid backoff delays: min {min:?} must be non-zero and no greater than max {max:?}")]
    InvalidBackoff {
        /// Configured lower bound.
        min: Duration,
        /// Configured upper bound.
        max: Duration,
    },

    /// Only a single producer is supported; the option exists for forward
    /// compatibility.
    #[error("unsupported producer count {got}, only a single producer is supported")]
    UnsupportedProducerCount {
        /// The rejected producer count.
        got: usize,
    },
}

/// Errors surfaced by [`Pipeline`](crate::Pipeline) lifecycle entry points.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// `start` was called on a pipeline that already started once.
    /// Processors cannot be restarted.
    #[error("pipeline already started")]
    AlreadyStarted,

    /// The OS refused to spawn a worker thread.
    #[error("failed to spawn event processor thread")]
    Spawn(#[from] std::io::Error),
}

/// Errors surfaced by [`Producer`](crate::Producer) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PublishError {
    /// The pipeline has been halted; its consumers are gone and nothing will
    /// ever observe the slot.
    #[error("pipeline has been halted")]
    Halted,
}

impl PublishError {
    /// Returns `true` if this error indicates the pipeline is permanently unusable.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Halted)
    }
}

/// Failure raised by a user event handler while processing a slot.
///
/// What happens next is governed by the pipeline's
/// [`FaultPolicy`](crate::FaultPolicy).
#[derive(Debug, Error)]
#[error(transparent)]
pub struct HandlerError(#[from] Box<dyn std::error::Error + Send + Sync>);

impl HandlerError {
    /// Creates a handler error from a plain message.
    pub fn msg(msg: impl Into<String>) -> Self {
        Self(msg.into().into())
    }
}
