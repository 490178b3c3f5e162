//! Change events applied to the snapshot store

use crate::error::Result;
use crate::resource::{Resource, ResourceId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Watch event type as sent by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Added => write!(f, "ADDED"),
            ChangeKind::Modified => write!(f, "MODIFIED"),
            ChangeKind::Deleted => write!(f, "DELETED"),
        }
    }
}

/// A decoded instruction describing how one resource changed
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// The full current value of a resource (added or modified)
    Upserted { id: ResourceId, resource: Arc<Resource> },
    /// The resource is gone
    Removed { id: ResourceId },
}

impl ChangeEvent {
    /// Build an upsert, taking the id from `metadata.uid`
    pub fn upserted(resource: Resource) -> Result<Self> {
        let id = resource.id()?;
        Ok(ChangeEvent::Upserted {
            id,
            resource: Arc::new(resource),
        })
    }

    pub fn removed(id: ResourceId) -> Self {
        ChangeEvent::Removed { id }
    }

    pub fn id(&self) -> &ResourceId {
        match self {
            ChangeEvent::Upserted { id, .. } | ChangeEvent::Removed { id } => id,
        }
    }

    pub fn resource(&self) -> Option<&Arc<Resource>> {
        match self {
            ChangeEvent::Upserted { resource, .. } => Some(resource),
            ChangeEvent::Removed { .. } => None,
        }
    }

    /// Short label used in logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            ChangeEvent::Upserted { .. } => "upserted",
            ChangeEvent::Removed { .. } => "removed",
        }
    }
}
