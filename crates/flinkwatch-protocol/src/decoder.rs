//! Frame → change event decoding

use crate::error::{ProtocolError, ProtocolResult};
use crate::frame::Frame;
use flinkwatch_core::{ChangeEvent, ChangeKind, Resource, ResourceId};
use serde::Deserialize;

/// What to do with a frame
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// Apply the event to the snapshot store
    Apply(ChangeEvent),
    /// Surface as a connectivity error; the stream stays open
    Error(String),
    /// Nothing to do
    Ignore,
}

/// Watch event payload as sent by the backend
#[derive(Debug, Deserialize)]
struct WatchEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    deployment: Option<Resource>,
    /// Deletions may carry the id alone
    #[serde(default)]
    id: Option<String>,
}

/// Reported for an `error` event that carries no message
pub const UNSPECIFIED_SERVER_ERROR: &str = "Server reported an error";

/// Decide the disposition of a frame
pub fn decode(frame: &Frame) -> Disposition {
    if frame.is_error() {
        let message = match frame.data.trim() {
            "" => UNSPECIFIED_SERVER_ERROR.to_string(),
            _ => frame.data.clone(),
        };
        return Disposition::Error(message);
    }

    if frame.data.is_empty() {
        return Disposition::Ignore;
    }

    match decode_payload(&frame.data) {
        Ok(event) => Disposition::Apply(event),
        Err(e) => Disposition::Error(e.to_string()),
    }
}

/// Parse a `data` payload into a change event
pub fn decode_payload(data: &str) -> ProtocolResult<ChangeEvent> {
    let event: WatchEvent =
        serde_json::from_str(data).map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;

    let kind: ChangeKind = serde_json::from_value(serde_json::Value::String(event.kind.clone()))
        .map_err(|_| ProtocolError::UnknownEventType(event.kind.clone()))?;

    match kind {
        ChangeKind::Added | ChangeKind::Modified => {
            let resource = event
                .deployment
                .ok_or_else(|| ProtocolError::MissingResource(kind.to_string()))?;
            Ok(ChangeEvent::upserted(resource)?)
        }
        ChangeKind::Deleted => {
            // Embedded uid first, then the bare id
            let id = match (event.deployment.map(|r| r.id()), event.id) {
                (Some(Ok(id)), _) => id,
                (_, Some(id)) => ResourceId::new(id)?,
                (Some(Err(e)), None) => return Err(e.into()),
                (None, None) => return Err(ProtocolError::MissingResource(kind.to_string())),
            };
            Ok(ChangeEvent::removed(id))
        }
    }
}
