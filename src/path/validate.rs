//! Dependency path validation against the entity catalog.

use std::sync::Arc;

use uuid::Uuid;

use super::DependencyPath;
use crate::config::EngineConfig;
use crate::debounce::{Debouncer, Trigger};
use crate::error::PathError;
use crate::metadata::EntityRegistry;

/// Check a parsed path against the catalog.
///
/// Self-references are checked against `form_entity_type`; cross-entity
/// paths must name a known entity. Either way the property must be declared
/// and navigable. Failures carry the available candidates so the builder UI
/// can render a useful diagnostic.
pub fn validate_path(
    path: &DependencyPath,
    form_entity_type: &str,
    registry: &EntityRegistry,
) -> Result<(), PathError> {
    let entity_name = path.entity().unwrap_or(form_entity_type);

    let entity = registry
        .entity(entity_name)
        .ok_or_else(|| PathError::UnknownEntity {
            entity: entity_name.to_string(),
            available: non_empty(registry.entity_names()),
        })?;

    let property =
        entity
            .property(path.property())
            .ok_or_else(|| PathError::UnknownProperty {
                entity: entity_name.to_string(),
                property: path.property().to_string(),
                available: non_empty(entity.property_names()),
            })?;

    if !property.is_navigable() {
        return Err(PathError::NotNavigable {
            entity: entity_name.to_string(),
            property: path.property().to_string(),
        });
    }

    Ok(())
}

fn non_empty(joined: String) -> String {
    if joined.is_empty() {
        "(none)".to_string()
    } else {
        joined
    }
}

/// Debounced path checking for the rule builder.
///
/// Runs on every entity/property selection change. Interactive edits wait
/// out the debounce window so rapid dropdown changes don't cause a request
/// storm; loading a saved path is checked immediately. `None` means a newer
/// edit superseded this one and nothing should be rendered for it.
pub struct PathValidator {
    registry: Arc<EntityRegistry>,
    debouncer: Debouncer<Uuid>,
}

impl PathValidator {
    pub fn new(registry: Arc<EntityRegistry>, config: &EngineConfig) -> Self {
        Self {
            registry,
            debouncer: Debouncer::new(config.debounce()),
        }
    }

    /// Parse and validate the current selection for one rule editor.
    ///
    /// `rule_id` keys the debounce stream: edits to different rules never
    /// supersede each other.
    pub async fn check_selection(
        &self,
        rule_id: Uuid,
        raw: &str,
        form_entity_type: &str,
        trigger: Trigger,
    ) -> Option<Result<DependencyPath, PathError>> {
        let generation = self.debouncer.begin(rule_id, trigger).await?;

        let result = DependencyPath::parse(raw).and_then(|path| {
            validate_path(&path, form_entity_type, &self.registry)?;
            Ok(path)
        });

        if !self.debouncer.is_current(&rule_id, generation).await {
            return None;
        }

        Some(result)
    }
}
