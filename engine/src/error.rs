//! Error types for the cachegrid engine.
//!
//! Applying a change-set never fails; errors only arise at the edges, when
//! decoding feed messages or compiling a type filter.

use thiserror::Error;

/// All possible errors from the cachegrid engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Filter errors
    #[error("invalid type filter '{pattern}': {reason}")]
    InvalidFilter { pattern: String, reason: String },

    // Feed message errors
    #[error("invalid feed message: {0}")]
    InvalidMessage(String),

    #[error("unexpected {got} message while {state}")]
    UnexpectedFrame { got: String, state: String },

    #[error("frame id mismatch: expected {expected}, got {actual}")]
    FrameIdMismatch { expected: String, actual: String },

    #[error("frame {id} received more {kind} than the {announced} announced")]
    FrameOverflow {
        id: String,
        kind: String,
        announced: usize,
    },

    #[error("frame {id} ended early: {puts}/{num_puts} puts, {removes}/{num_removes} removes")]
    IncompleteFrame {
        id: String,
        puts: usize,
        num_puts: usize,
        removes: usize,
        num_removes: usize,
    },
}

impl Error {
    /// Stable machine-readable code, sent to feed clients alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidFilter { .. } => "invalid_filter",
            Error::InvalidMessage(_) => "invalid_message",
            Error::UnexpectedFrame { .. } => "unexpected_frame",
            Error::FrameIdMismatch { .. } => "frame_id_mismatch",
            Error::FrameOverflow { .. } => "frame_overflow",
            Error::IncompleteFrame { .. } => "incomplete_frame",
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
