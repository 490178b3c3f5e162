//! Transport abstraction for the watch stream

use crate::error::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use std::pin::Pin;

/// Raw chunks of the event stream, in arrival order
///
/// Dropping the stream must cancel the underlying read.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Opens one connection to the event stream per call
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Connect and validate the response; resolves once the body is readable
    async fn open(&self) -> Result<ByteStream, TransportError>;

    /// Where this transport connects to, for logs
    fn describe(&self) -> String;
}
