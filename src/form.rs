//! Persisted form configuration model.
//!
//! A configuration describes a multi-step form: steps contain sections,
//! sections contain fields, and validation rules are attached to fields.
//! Declaration order matters: a field's dependency must appear no later
//! than the field itself (the health checker flags violations).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rules::{FieldId, ValidationRule};

/// Snapshot of in-progress form values, keyed by field name
pub type FormSnapshot = HashMap<String, serde_json::Value>;

/// A saved multi-step form configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormConfiguration {
    #[serde(alias = "Id")]
    pub id: Uuid,

    #[serde(default, alias = "Name")]
    pub name: String,

    /// Entity type the form edits; self-reference paths resolve against it
    #[serde(alias = "EntityType")]
    pub entity_type: String,

    #[serde(default, alias = "Steps")]
    pub steps: Vec<FormStep>,

    #[serde(default, alias = "Rules")]
    pub rules: Vec<ValidationRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormStep {
    #[serde(default, alias = "Title")]
    pub title: String,

    #[serde(default, alias = "Sections")]
    pub sections: Vec<FormSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSection {
    #[serde(default, alias = "Title")]
    pub title: String,

    #[serde(default, alias = "Fields")]
    pub fields: Vec<FieldDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    #[serde(alias = "FieldId")]
    pub field_id: FieldId,

    /// Name the form runtime binds values under
    #[serde(alias = "FieldName")]
    pub field_name: String,

    #[serde(default, alias = "Label")]
    pub label: String,

    #[serde(default, alias = "FieldType")]
    pub field_type: String,

    #[serde(default, alias = "Required")]
    pub required: bool,
}

impl FieldDefinition {
    /// Label if set, otherwise the field name
    pub fn display_name(&self) -> &str {
        if self.label.is_empty() {
            &self.field_name
        } else {
            &self.label
        }
    }
}

/// Declaration position of a field: (step, section, index), ordered
/// lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FieldPosition {
    pub step: usize,
    pub section: usize,
    pub index: usize,
}

/// Id/name/position lookups over a configuration's fields.
#[derive(Debug, Clone, Default)]
pub struct FieldIndex {
    by_id: HashMap<FieldId, FieldDefinition>,
    by_name: HashMap<String, FieldId>,
    positions: HashMap<FieldId, FieldPosition>,
}

impl FieldIndex {
    pub fn from_configuration(configuration: &FormConfiguration) -> Self {
        let mut index = Self::default();
        for (step_idx, step) in configuration.steps.iter().enumerate() {
            for (section_idx, section) in step.sections.iter().enumerate() {
                for (field_idx, field) in section.fields.iter().enumerate() {
                    index.by_name.insert(field.field_name.clone(), field.field_id);
                    index.positions.insert(
                        field.field_id,
                        FieldPosition {
                            step: step_idx,
                            section: section_idx,
                            index: field_idx,
                        },
                    );
                    index.by_id.insert(field.field_id, field.clone());
                }
            }
        }
        index
    }

    pub fn field(&self, field_id: FieldId) -> Option<&FieldDefinition> {
        self.by_id.get(&field_id)
    }

    pub fn id_for(&self, field_name: &str) -> Option<FieldId> {
        self.by_name.get(field_name).copied()
    }

    pub fn position(&self, field_id: FieldId) -> Option<FieldPosition> {
        self.positions.get(&field_id).copied()
    }

    pub fn contains(&self, field_id: FieldId) -> bool {
        self.by_id.contains_key(&field_id)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.by_id.values()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
