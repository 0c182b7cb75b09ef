//! Validation rule model: rules attached to fields, each optionally
//! pointing at a dependency field/path, indexed as an in-memory graph.
//!
//! A rule's logical condition is evaluated by the external validation
//! service; this model only carries the metadata needed to resolve
//! dependencies, dispatch validation, and render messages.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::path::DependencyPath;

/// Stable numeric field identifier (survives field renames)
pub type FieldId = i64;

/// Rule identifier
pub type RuleId = Uuid;

/// Kind of validation a rule requests.
///
/// The set is open: the validation service grows new kinds over time, so
/// anything unrecognized is carried through as `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ValidationType {
    Required,
    Range,
    Pattern,
    Custom(String),
}

impl ValidationType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Required => "required",
            Self::Range => "range",
            Self::Pattern => "pattern",
            Self::Custom(kind) => kind,
        }
    }
}

impl fmt::Display for ValidationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

impl From<String> for ValidationType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "required" => Self::Required,
            "range" => Self::Range,
            "pattern" => Self::Pattern,
            _ => Self::Custom(value),
        }
    }
}

impl From<ValidationType> for String {
    fn from(value: ValidationType) -> Self {
        value.as_str().to_string()
    }
}

/// One validation rule owned by exactly one field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    #[serde(alias = "Id")]
    pub id: RuleId,

    #[serde(alias = "OwnerFieldId")]
    pub owner_field_id: FieldId,

    #[serde(alias = "ValidationType")]
    pub validation_type: ValidationType,

    /// Field whose value this rule depends on, if any
    #[serde(default, alias = "DependsOnFieldId")]
    pub depends_on_field_id: Option<FieldId>,

    /// Where the dependency value lives, as `Entity.Property` or a bare
    /// property on the form's own entity
    #[serde(default, alias = "DependencyPath")]
    pub dependency_path: Option<DependencyPath>,

    /// Opaque payload handed to the validation service unmodified
    #[serde(default, alias = "Config")]
    pub config: serde_json::Value,

    #[serde(alias = "ErrorMessageTemplate")]
    pub error_message_template: String,

    #[serde(default, alias = "SuccessMessageTemplate")]
    pub success_message_template: Option<String>,

    /// Blocking rules reject the field value on failure; non-blocking rules
    /// only warn
    #[serde(default, alias = "IsBlocking")]
    pub is_blocking: bool,

    /// When set, the rule is not evaluable (resolution stays pending) until
    /// the dependency field has a value
    #[serde(default, alias = "RequiresDependencyFilled")]
    pub requires_dependency_filled: bool,
}

/// In-memory rule graph for one form configuration.
///
/// Rules are indexed by id, by owning field, and by dependency field; the
/// dependency index drives invalidation when a field value changes.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: HashMap<RuleId, ValidationRule>,
    by_owner: HashMap<FieldId, Vec<RuleId>>,
    by_dependency: HashMap<FieldId, Vec<RuleId>>,
}

impl RuleSet {
    pub fn new(rules: Vec<ValidationRule>) -> Self {
        let mut set = Self::default();
        for rule in rules {
            set.by_owner
                .entry(rule.owner_field_id)
                .or_default()
                .push(rule.id);
            if let Some(dependency) = rule.depends_on_field_id {
                set.by_dependency.entry(dependency).or_default().push(rule.id);
            }
            set.rules.insert(rule.id, rule);
        }
        set
    }

    pub fn rule(&self, id: &RuleId) -> Option<&ValidationRule> {
        self.rules.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationRule> {
        self.rules.values()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules owned by a field
    pub fn rules_for_owner(&self, field_id: FieldId) -> Vec<&ValidationRule> {
        self.collect(self.by_owner.get(&field_id))
    }

    /// Rules whose dependency is the given field
    pub fn rules_depending_on(&self, field_id: FieldId) -> Vec<&ValidationRule> {
        self.collect(self.by_dependency.get(&field_id))
    }

    /// Every rule whose dependency is among `field_ids` (the batch closure)
    pub fn dependents_of(&self, field_ids: &BTreeSet<FieldId>) -> Vec<&ValidationRule> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for field_id in field_ids {
            for rule in self.rules_depending_on(*field_id) {
                if seen.insert(rule.id) {
                    out.push(rule);
                }
            }
        }
        out
    }

    /// Owner fields whose validation must re-run when `field_id` changes
    pub fn owners_depending_on(&self, field_id: FieldId) -> BTreeSet<FieldId> {
        self.rules_depending_on(field_id)
            .into_iter()
            .map(|rule| rule.owner_field_id)
            .collect()
    }

    fn collect(&self, ids: Option<&Vec<RuleId>>) -> Vec<&ValidationRule> {
        ids.map(|ids| ids.iter().filter_map(|id| self.rules.get(id)).collect())
            .unwrap_or_default()
    }
}
