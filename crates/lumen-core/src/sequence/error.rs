//! Sequence mutation errors

use thiserror::Error;

use super::EventId;

/// Errors from the sequence mutation API
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SequenceError {
    #[error("No event with id {0}")]
    NotFound(EventId),

    #[error("Invalid time {time} for {id}")]
    InvalidTime { id: EventId, time: f64 },

    #[error("Invalid duration {duration} for {id}")]
    InvalidDuration { id: EventId, duration: f64 },

    #[error("No drag in progress")]
    NoDrag,
}

/// Result type for sequence operations
pub type SequenceResult<T> = Result<T, SequenceError>;
