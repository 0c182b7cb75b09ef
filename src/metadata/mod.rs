//! Entity metadata: the read-only catalog of entities and their navigable
//! properties consumed by dependency-path validation.
//!
//! Metadata is supplied by an external service once per form-configuration
//! session. The wire payloads arrive in either camelCase or PascalCase; both
//! are normalized to one canonical schema at this boundary so core logic
//! never sees dual casing.

use async_trait::async_trait;

pub mod entity;
pub mod registry;

pub use entity::{EntityMetadata, PropertyMetadata};
pub use registry::EntityRegistry;

/// External metadata service boundary.
///
/// Loaded once per form-configuration session; a failure here degrades the
/// path resolver to "no valid entities" rather than crashing.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fetch the full entity catalog
    async fn get_all_entity_metadata(&self) -> anyhow::Result<Vec<EntityMetadata>>;
}
