//! External rule store boundary.
//!
//! The store owns rule persistence and evaluates rule conditions; this
//! crate only carries rule metadata, dispatches requests, and consumes
//! results. `HttpRuleStore` talks to the real service; `StubRuleStore` is
//! an in-memory implementation with canned outcomes for tests and offline
//! development.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::form::FormSnapshot;
use crate::health::HealthIssue;
use crate::resolver::ResolvedDependency;
use crate::rules::{FieldId, RuleId, ValidationRule};
use crate::validator::ValidationOutcome;

pub mod http;
pub mod stub;

pub use http::HttpRuleStore;
pub use stub::StubRuleStore;

/// Batch dependency resolution request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveDependenciesRequest {
    pub field_ids: BTreeSet<FieldId>,

    /// Current in-progress form values, keyed by field name
    pub form_context: FormSnapshot,

    #[serde(default)]
    pub configuration_id: Option<Uuid>,
}

/// Batch dependency resolution response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveDependenciesResponse {
    #[serde(default)]
    pub resolved: HashMap<RuleId, ResolvedDependency>,

    /// Non-fatal problems the store noticed while resolving
    #[serde(default)]
    pub issues: Vec<HealthIssue>,
}

/// Per-field validation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValidationRequest {
    pub field_id: FieldId,
    pub field_name: String,
    pub value: serde_json::Value,

    /// Resolved dependency value, when the field's rule has one
    #[serde(default)]
    pub dependency_value: Option<serde_json::Value>,

    #[serde(default)]
    pub form_context: FormSnapshot,

    #[serde(default)]
    pub configuration_id: Option<Uuid>,
}

/// Server-side dependency path check result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathCheckResponse {
    pub is_valid: bool,

    #[serde(default)]
    pub error: Option<String>,

    #[serde(default)]
    pub detailed_error: Option<String>,
}

/// Rule persistence and dispatch operations exposed by the store service.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// All rules saved for a configuration
    async fn rules_for_configuration(
        &self,
        configuration_id: Uuid,
    ) -> anyhow::Result<Vec<ValidationRule>>;

    /// Create or replace a rule
    async fn save_rule(&self, configuration_id: Uuid, rule: ValidationRule) -> anyhow::Result<()>;

    /// Delete a rule
    async fn delete_rule(&self, configuration_id: Uuid, rule_id: RuleId) -> anyhow::Result<()>;

    /// Resolve dependency values for every rule depending on the given fields
    async fn resolve_dependencies(
        &self,
        request: ResolveDependenciesRequest,
    ) -> anyhow::Result<ResolveDependenciesResponse>;

    /// Evaluate a field's rules against its value and resolved dependency
    async fn validate_field(
        &self,
        request: FieldValidationRequest,
    ) -> anyhow::Result<ValidationOutcome>;

    /// Server-side path check (the store also validates paths on save)
    async fn validate_path(
        &self,
        path: &str,
        entity_type_name: &str,
    ) -> anyhow::Result<PathCheckResponse>;

    /// Server-side configuration health check
    async fn check_configuration_health(
        &self,
        configuration_id: Uuid,
    ) -> anyhow::Result<Vec<HealthIssue>>;
}
