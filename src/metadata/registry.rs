//! Read-only entity catalog for one form-configuration session.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::entity::{EntityMetadata, PropertyMetadata};
use super::MetadataProvider;

/// Immutable catalog of entities keyed by entity name.
///
/// Built once per session from the metadata service. When the service is
/// unavailable the registry is empty and path validation reports unknown
/// entities; the form itself keeps working.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entities: HashMap<String, EntityMetadata>,
}

impl EntityRegistry {
    /// Build a registry from an entity list
    pub fn new(entities: Vec<EntityMetadata>) -> Self {
        let entities = entities
            .into_iter()
            .map(|e| (e.entity_name.clone(), e))
            .collect();
        Self { entities }
    }

    /// An empty registry ("no valid entities")
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the catalog from the metadata service, degrading to an empty
    /// registry on failure.
    pub async fn load(provider: &dyn MetadataProvider) -> Self {
        match provider.get_all_entity_metadata().await {
            Ok(entities) => {
                debug!(count = entities.len(), "Loaded entity metadata catalog");
                Self::new(entities)
            }
            Err(err) => {
                warn!(error = %err, "Metadata service unavailable; no valid entities");
                Self::empty()
            }
        }
    }

    /// Look up an entity by name
    pub fn entity(&self, name: &str) -> Option<&EntityMetadata> {
        self.entities.get(name)
    }

    /// Look up a property on an entity
    pub fn property(&self, entity: &str, property: &str) -> Option<&PropertyMetadata> {
        self.entity(entity).and_then(|e| e.property(property))
    }

    /// Comma-joined entity names, for diagnostics
    pub fn entity_names(&self) -> String {
        let mut names: Vec<&str> = self.entities.keys().map(String::as_str).collect();
        names.sort_unstable();
        names.join(", ")
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    struct FailingProvider;

    #[async_trait]
    impl MetadataProvider for FailingProvider {
        async fn get_all_entity_metadata(&self) -> anyhow::Result<Vec<EntityMetadata>> {
            anyhow::bail!("metadata service down")
        }
    }

    struct FixedProvider(Vec<EntityMetadata>);

    #[async_trait]
    impl MetadataProvider for FixedProvider {
        async fn get_all_entity_metadata(&self) -> anyhow::Result<Vec<EntityMetadata>> {
            Ok(self.0.clone())
        }
    }

    fn town_entity() -> EntityMetadata {
        serde_json::from_str(
            r#"{
                "entityName": "Town",
                "fields": [
                    {"fieldName": "name", "fieldType": "string"},
                    {"fieldName": "region", "fieldType": "string", "isRelatedEntity": true, "relatedEntityType": "Region"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_load_degrades_to_empty_on_provider_failure() {
        let registry = EntityRegistry::load(&FailingProvider).await;
        assert!(registry.is_empty());
        assert!(registry.entity("Town").is_none());
    }

    #[tokio::test]
    async fn test_load_builds_catalog() {
        let registry = EntityRegistry::load(&FixedProvider(vec![town_entity()])).await;
        assert_eq!(registry.len(), 1);
        assert!(registry.property("Town", "name").is_some());
        assert!(registry.property("Town", "mayor").is_none());
    }
}
