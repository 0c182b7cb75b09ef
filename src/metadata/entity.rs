//! Canonical entity/property metadata structs.
//!
//! The backend has been observed emitting both camelCase and PascalCase
//! payloads for these shapes; serde aliases accept both and everything
//! downstream works with the snake_case structs only.

use serde::{Deserialize, Serialize};

/// One entity type in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMetadata {
    #[serde(alias = "EntityName")]
    pub entity_name: String,

    #[serde(default, alias = "DisplayName")]
    pub display_name: String,

    #[serde(default, alias = "Fields")]
    pub fields: Vec<PropertyMetadata>,
}

/// One property on an entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyMetadata {
    #[serde(alias = "FieldName")]
    pub field_name: String,

    #[serde(default, alias = "FieldType")]
    pub field_type: String,

    #[serde(default, alias = "IsNullable")]
    pub is_nullable: bool,

    /// Whether the property navigates to another entity
    #[serde(default, alias = "IsRelatedEntity")]
    pub is_related_entity: bool,

    #[serde(default, alias = "RelatedEntityType")]
    pub related_entity_type: Option<String>,
}

impl PropertyMetadata {
    /// Whether the property can be bound as a dependency target.
    ///
    /// Collection- and blob-typed properties have no single value to bind.
    pub fn is_navigable(&self) -> bool {
        !matches!(
            self.field_type.as_str(),
            "collection" | "array" | "list" | "binary"
        )
    }
}

impl EntityMetadata {
    /// Look up a property by name
    pub fn property(&self, name: &str) -> Option<&PropertyMetadata> {
        self.fields.iter().find(|f| f.field_name == name)
    }

    /// Comma-joined property names, for diagnostics
    pub fn property_names(&self) -> String {
        self.fields
            .iter()
            .map(|f| f.field_name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
