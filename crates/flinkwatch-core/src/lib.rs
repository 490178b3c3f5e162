//! flinkwatch Core - resource model and snapshot store
//!
//! This crate provides the core data types for flinkwatch:
//! - Resources (`FlinkDeployment` records) with stable identity
//! - Change events decoded from the watch stream
//! - The snapshot store that folds change events into current state

pub mod error;
pub mod event;
pub mod resource;
pub mod store;

pub use error::{Error, Result};
pub use event::{ChangeEvent, ChangeKind};
pub use resource::{ObjectMeta, Resource, ResourceId, ResourceKey};
pub use store::{Applied, Snapshot, SnapshotStore};
