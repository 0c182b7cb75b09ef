//! Shared fixtures for the integration suites.

// Not every suite uses every fixture
#![allow(dead_code)]

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use formgraph::{
    DependencyPath, EntityMetadata, FormConfiguration, MetadataProvider, ValidationOutcome,
    ValidationRule, ValidationType,
};

pub const TOWN_FIELD: i64 = 5;
pub const LOCATION_FIELD: i64 = 2;
pub const NOTES_FIELD: i64 = 3;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Metadata catalog with Town / Location / Region entities
pub struct WorldMetadata;

#[async_trait]
impl MetadataProvider for WorldMetadata {
    async fn get_all_entity_metadata(&self) -> anyhow::Result<Vec<EntityMetadata>> {
        Ok(serde_json::from_value(serde_json::json!([
            {
                "entityName": "Town",
                "displayName": "Town",
                "fields": [
                    {"fieldName": "name", "fieldType": "string"},
                    {"fieldName": "region", "fieldType": "string", "isRelatedEntity": true, "relatedEntityType": "Region"}
                ]
            },
            {
                "entityName": "Location",
                "displayName": "Location",
                "fields": [
                    {"fieldName": "coordinates", "fieldType": "point"}
                ]
            },
            {
                "entityName": "Region",
                "displayName": "Region",
                "fields": [
                    {"fieldName": "boundary", "fieldType": "polygon"}
                ]
            }
        ]))?)
    }
}

/// The standard "place editor" rule: Location must lie inside the town the
/// user picked.
pub fn location_inside_town_rule() -> ValidationRule {
    ValidationRule {
        id: Uuid::new_v4(),
        owner_field_id: LOCATION_FIELD,
        validation_type: ValidationType::Custom("LocationInsideRegion".to_string()),
        depends_on_field_id: Some(TOWN_FIELD),
        dependency_path: Some(DependencyPath::parse("Town.name").unwrap()),
        config: serde_json::json!({"tolerance": 0.0}),
        error_message_template: "Location is outside {Town.name} boundaries".to_string(),
        success_message_template: Some("Location confirmed inside {Town.name}".to_string()),
        is_blocking: true,
        requires_dependency_filled: true,
    }
}

/// Well-ordered configuration: Town is declared before Location.
pub fn place_editor_configuration(rules: Vec<ValidationRule>) -> FormConfiguration {
    let mut configuration: FormConfiguration = serde_json::from_value(serde_json::json!({
        "id": Uuid::new_v4(),
        "name": "Place editor",
        "entityType": "Location",
        "steps": [
            {
                "title": "Placement",
                "sections": [
                    {
                        "title": "Where",
                        "fields": [
                            {"fieldId": TOWN_FIELD, "fieldName": "town", "label": "Town"},
                            {"fieldId": LOCATION_FIELD, "fieldName": "location", "label": "Location"}
                        ]
                    }
                ]
            },
            {
                "title": "Extras",
                "sections": [
                    {
                        "title": "Misc",
                        "fields": [
                            {"fieldId": NOTES_FIELD, "fieldName": "notes", "label": "Notes"}
                        ]
                    }
                ]
            }
        ],
        "rules": []
    }))
    .unwrap();
    configuration.rules = rules;
    configuration
}

/// Mis-ordered configuration: Location (dependent) declared before Town.
pub fn misordered_configuration(rules: Vec<ValidationRule>) -> FormConfiguration {
    let mut configuration: FormConfiguration = serde_json::from_value(serde_json::json!({
        "id": Uuid::new_v4(),
        "name": "Place editor (misordered)",
        "entityType": "Location",
        "steps": [
            {
                "title": "Placement",
                "sections": [
                    {
                        "title": "Where",
                        "fields": [
                            {"fieldId": LOCATION_FIELD, "fieldName": "location", "label": "Location"},
                            {"fieldId": NOTES_FIELD, "fieldName": "notes", "label": "Notes"},
                            {"fieldId": TOWN_FIELD, "fieldName": "town", "label": "Town"}
                        ]
                    }
                ]
            }
        ],
        "rules": []
    }))
    .unwrap();
    configuration.rules = rules;
    configuration
}

pub fn outside_boundaries_outcome(town_name: &str) -> ValidationOutcome {
    let mut placeholders = HashMap::new();
    placeholders.insert("Town.name".to_string(), town_name.to_string());
    ValidationOutcome {
        is_valid: false,
        is_blocking: true,
        message: Some("Location is outside {Town.name} boundaries".to_string()),
        success_message: None,
        placeholders,
    }
}
