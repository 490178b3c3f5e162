//! Protocol error types

use thiserror::Error;

/// Protocol-specific errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Frame too large: {size} > {max}")]
    FrameTooLarge { size: usize, max: usize },

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    #[error("Missing resource in {0} event")]
    MissingResource(String),

    #[error("Core error: {0}")]
    Core(#[from] flinkwatch_core::Error),
}

/// Result type for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;
