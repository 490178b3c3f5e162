//! Resource types
//!
//! A resource is a `FlinkDeployment` record as delivered by the backend.
//! Only the metadata needed for identity and lookup is typed; every other
//! field is carried through verbatim.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Maximum resource ID length (Kubernetes uids are 36 bytes)
pub const MAX_ID_LEN: usize = 253;

/// Stable unique identifier of a resource (`metadata.uid`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId(String);

impl ResourceId {
    /// Create a new resource ID, validating the format
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();

        if id.is_empty() {
            return Err(Error::InvalidResourceId("Resource ID cannot be empty".into()));
        }

        if id.len() > MAX_ID_LEN {
            return Err(Error::InvalidResourceId(format!(
                "Resource ID exceeds {} bytes",
                MAX_ID_LEN
            )));
        }

        if id.chars().any(char::is_control) {
            return Err(Error::InvalidResourceId(
                "Resource ID must not contain control characters".into(),
            ));
        }

        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ResourceId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Human-facing address of a resource: `namespace/name`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn matches(&self, namespace: &str, name: &str) -> bool {
        self.namespace == namespace && self.name == name
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl std::str::FromStr for ResourceKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((namespace, name))
                if !namespace.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self::new(namespace, name))
            }
            _ => Err(Error::InvalidResourceKey(format!(
                "expected <namespace>/<name>, got {:?}",
                s
            ))),
        }
    }
}

/// Object metadata of a resource
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Remaining metadata fields, preserved as received
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An immutable resource snapshot as delivered by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub metadata: ObjectMeta,
    /// Everything besides `metadata` (`kind`, `apiVersion`, `spec`, `status`, ...)
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Resource {
    /// Build a resource from a JSON value
    pub fn from_value(value: Value) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// The stable identifier of this resource
    pub fn id(&self) -> Result<ResourceId> {
        if self.metadata.uid.is_empty() {
            return Err(Error::MissingUid(self.key().to_string()));
        }
        ResourceId::new(self.metadata.uid.clone())
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.metadata.namespace.clone(), self.metadata.name.clone())
    }

    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn resource_version(&self) -> Option<&str> {
        self.metadata.resource_version.as_deref()
    }

    /// Look up a field by a dotted path below the top level, e.g. `status.lifecycleState`
    pub fn field(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    /// `status.lifecycleState`, e.g. `STABLE`
    pub fn lifecycle_state(&self) -> Option<&str> {
        self.field("status.lifecycleState").and_then(Value::as_str)
    }

    /// `status.jobStatus.state`, e.g. `RUNNING`
    pub fn job_state(&self) -> Option<&str> {
        self.field("status.jobStatus.state").and_then(Value::as_str)
    }

    /// `spec.flinkVersion`
    pub fn flink_version(&self) -> Option<&str> {
        self.field("spec.flinkVersion").and_then(Value::as_str)
    }
}
