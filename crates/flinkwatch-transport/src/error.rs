//! Transport error types

use std::time::Duration;
use thiserror::Error;

/// Errors that end a connection attempt or a detail request
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Protocol error: {0}")]
    Protocol(#[from] flinkwatch_protocol::ProtocolError),

    #[error("Connection timeout: no data received for {}ms. Reconnecting...", .0.as_millis())]
    Timeout(Duration),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;
