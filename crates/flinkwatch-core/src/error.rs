//! Error types for flinkwatch core

use thiserror::Error;

/// Core error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid resource ID: {0}")]
    InvalidResourceId(String),

    #[error("Invalid resource key: {0}")]
    InvalidResourceKey(String),

    #[error("Resource has no uid: {0}")]
    MissingUid(String),
}

/// Result type alias for flinkwatch core operations
pub type Result<T> = std::result::Result<T, Error>;
