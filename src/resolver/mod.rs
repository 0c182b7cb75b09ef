//! Batch dependency resolution with a session-scoped cache.
//!
//! When a field value changes, every rule depending on that field gets a
//! fresh `ResolvedDependency`. Results are cached per rule id and replaced
//! wholesale on the next batch; a stale entry and a fresh one are never
//! merged. The cache belongs to the form session and is discarded with it.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::ResolutionError;
use crate::form::{FieldIndex, FormSnapshot};
use crate::path::DependencyPath;
use crate::rules::{FieldId, RuleId, RuleSet, ValidationRule};
use crate::store::{ResolveDependenciesRequest, RuleStore};

/// Outcome of resolving one rule's dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionStatus {
    Success,
    Pending,
    Error,
}

/// The value (or state) currently bound to a rule's dependency.
///
/// Created fresh on every batch resolution; superseded, never mutated, by
/// the next resolution for the same rule id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedDependency {
    #[serde(alias = "RuleId")]
    pub rule_id: RuleId,

    #[serde(alias = "Status")]
    pub status: ResolutionStatus,

    #[serde(default, alias = "ResolvedValue")]
    pub resolved_value: Option<serde_json::Value>,

    #[serde(default, alias = "DependencyPath")]
    pub dependency_path: Option<DependencyPath>,

    #[serde(alias = "ResolvedAt")]
    pub resolved_at: DateTime<Utc>,

    #[serde(default, alias = "Message")]
    pub message: Option<String>,

    #[serde(default, alias = "ErrorDetail")]
    pub error_detail: Option<String>,
}

impl ResolvedDependency {
    /// Dependency field not yet filled; a legitimate transient state, not
    /// an error.
    pub fn pending(rule: &ValidationRule, resolved_at: DateTime<Utc>) -> Self {
        Self {
            rule_id: rule.id,
            status: ResolutionStatus::Pending,
            resolved_value: None,
            dependency_path: rule.dependency_path.clone(),
            resolved_at,
            message: Some("Waiting for the dependency field to be filled".to_string()),
            error_detail: None,
        }
    }

    pub fn success(
        rule: &ValidationRule,
        resolved_at: DateTime<Utc>,
        value: serde_json::Value,
    ) -> Self {
        Self {
            rule_id: rule.id,
            status: ResolutionStatus::Success,
            resolved_value: Some(value),
            dependency_path: rule.dependency_path.clone(),
            resolved_at,
            message: None,
            error_detail: None,
        }
    }

    pub fn error(
        rule: &ValidationRule,
        resolved_at: DateTime<Utc>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule.id,
            status: ResolutionStatus::Error,
            resolved_value: None,
            dependency_path: rule.dependency_path.clone(),
            resolved_at,
            message: None,
            error_detail: Some(detail.into()),
        }
    }
}

/// Result of one batch resolution call
#[derive(Debug, Clone)]
pub struct ResolvedBatch {
    pub resolved_at: DateTime<Utc>,
    pub entries: HashMap<RuleId, ResolvedDependency>,
}

impl ResolvedBatch {
    fn empty(resolved_at: DateTime<Utc>) -> Self {
        Self {
            resolved_at,
            entries: HashMap::new(),
        }
    }
}

/// Resolves dependency values in batches and owns the per-rule cache table.
pub struct DependencyResolver {
    store: Arc<dyn RuleStore>,
    configuration_id: Uuid,
    cache: RwLock<HashMap<RuleId, ResolvedDependency>>,
    dispatch_timeout: Duration,
}

impl DependencyResolver {
    pub fn new(store: Arc<dyn RuleStore>, configuration_id: Uuid, config: &EngineConfig) -> Self {
        Self {
            store,
            configuration_id,
            cache: RwLock::new(HashMap::new()),
            dispatch_timeout: config.dispatch_timeout(),
        }
    }

    /// Re-resolve every rule whose dependency is among `field_ids`.
    ///
    /// An empty `field_ids` set is a no-op returning an empty, timestamped
    /// batch. Rules whose dependency is unfilled and marked
    /// `requires_dependency_filled` become `Pending` without touching the
    /// network; everything else goes out as a single batched dispatch.
    ///
    /// A dispatch failure or timeout degrades the whole batch to an error
    /// and leaves the cache untouched; entries cached for rules outside
    /// this batch always remain valid.
    pub async fn resolve_batch(
        &self,
        rules: &RuleSet,
        fields: &FieldIndex,
        field_ids: &BTreeSet<FieldId>,
        snapshot: &FormSnapshot,
    ) -> Result<ResolvedBatch, ResolutionError> {
        let resolved_at = Utc::now();
        if field_ids.is_empty() {
            return Ok(ResolvedBatch::empty(resolved_at));
        }

        let dependents = rules.dependents_of(field_ids);
        if dependents.is_empty() {
            return Ok(ResolvedBatch::empty(resolved_at));
        }

        let mut entries: HashMap<RuleId, ResolvedDependency> = HashMap::new();
        let mut dispatch_fields: BTreeSet<FieldId> = BTreeSet::new();

        for rule in &dependents {
            let Some(dependency) = rule.depends_on_field_id else {
                continue;
            };
            let current_value = fields
                .field(dependency)
                .and_then(|f| snapshot.get(&f.field_name))
                .filter(|v| !v.is_null());

            if current_value.is_none() && rule.requires_dependency_filled {
                entries.insert(rule.id, ResolvedDependency::pending(rule, resolved_at));
            } else {
                dispatch_fields.insert(dependency);
            }
        }

        if !dispatch_fields.is_empty() {
            let request = ResolveDependenciesRequest {
                field_ids: dispatch_fields,
                form_context: snapshot.clone(),
                configuration_id: Some(self.configuration_id),
            };

            let response = timeout(
                self.dispatch_timeout,
                self.store.resolve_dependencies(request),
            )
            .await
            .map_err(|_| ResolutionError::Timeout {
                timeout_ms: self.dispatch_timeout.as_millis() as u64,
            })?
            .map_err(|err| ResolutionError::DispatchFailed {
                message: format!("{err:#}"),
            })?;

            for issue in &response.issues {
                warn!(message = %issue.message, "Rule store reported issue during resolution");
            }
            entries.extend(response.resolved);
        }

        // Per-rule-id replacement: a batch entry fully supersedes the prior
        // entry for that rule, and rules outside the batch are untouched.
        {
            let mut cache = self.cache.write().await;
            for (rule_id, entry) in &entries {
                cache.insert(*rule_id, entry.clone());
            }
        }

        debug!(
            fields = field_ids.len(),
            rules = entries.len(),
            "Resolved dependency batch"
        );

        Ok(ResolvedBatch {
            resolved_at,
            entries,
        })
    }

    /// Snapshot of the current cache table
    pub async fn cached(&self) -> HashMap<RuleId, ResolvedDependency> {
        self.cache.read().await.clone()
    }

    /// Cached resolution for one rule, if any
    pub async fn cached_for_rule(&self, rule_id: &RuleId) -> Option<ResolvedDependency> {
        self.cache.read().await.get(rule_id).cloned()
    }

    /// Drop every cached entry (form session reset / configuration change)
    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FormConfiguration;
    use crate::rules::ValidationType;
    use crate::store::StubRuleStore;

    fn configuration() -> FormConfiguration {
        serde_json::from_value(serde_json::json!({
            "id": Uuid::new_v4(),
            "entityType": "Location",
            "steps": [{
                "title": "Main",
                "sections": [{
                    "title": "All",
                    "fields": [
                        {"fieldId": 5, "fieldName": "town", "label": "Town"},
                        {"fieldId": 2, "fieldName": "location", "label": "Location"}
                    ]
                }]
            }],
            "rules": []
        }))
        .unwrap()
    }

    fn dependent_rule(requires_filled: bool) -> ValidationRule {
        ValidationRule {
            id: Uuid::new_v4(),
            owner_field_id: 2,
            validation_type: ValidationType::Custom("LocationInsideRegion".to_string()),
            depends_on_field_id: Some(5),
            dependency_path: Some(DependencyPath::parse("Town.name").unwrap()),
            config: serde_json::Value::Null,
            error_message_template: "Location is outside {Town.name} boundaries".to_string(),
            success_message_template: None,
            is_blocking: true,
            requires_dependency_filled: requires_filled,
        }
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_timestamped_no_op() {
        let store = Arc::new(StubRuleStore::new());
        let resolver =
            DependencyResolver::new(store.clone(), Uuid::new_v4(), &EngineConfig::default());

        let batch = resolver
            .resolve_batch(
                &RuleSet::default(),
                &FieldIndex::default(),
                &BTreeSet::new(),
                &FormSnapshot::new(),
            )
            .await
            .unwrap();

        assert!(batch.entries.is_empty());
        assert_eq!(store.resolve_calls(), 0);
    }

    #[tokio::test]
    async fn test_unfilled_required_dependency_is_pending_without_dispatch() {
        let store = Arc::new(StubRuleStore::new());
        let rule = dependent_rule(true);
        let rules = RuleSet::new(vec![rule.clone()]);
        let fields = FieldIndex::from_configuration(&configuration());
        let resolver =
            DependencyResolver::new(store.clone(), Uuid::new_v4(), &EngineConfig::default());

        let batch = resolver
            .resolve_batch(
                &rules,
                &fields,
                &BTreeSet::from([5i64]),
                &FormSnapshot::new(),
            )
            .await
            .unwrap();

        let entry = &batch.entries[&rule.id];
        assert_eq!(entry.status, ResolutionStatus::Pending);
        assert_eq!(store.resolve_calls(), 0);
        assert_eq!(
            resolver.cached_for_rule(&rule.id).await.unwrap().status,
            ResolutionStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_filled_dependency_dispatches_and_caches_success() {
        let store = Arc::new(StubRuleStore::new());
        store.set_configuration(&configuration());
        let rule = dependent_rule(true);
        store.put_rule(rule.clone());
        let rules = RuleSet::new(vec![rule.clone()]);
        let fields = FieldIndex::from_configuration(&configuration());
        let resolver =
            DependencyResolver::new(store.clone(), Uuid::new_v4(), &EngineConfig::default());

        let mut snapshot = FormSnapshot::new();
        snapshot.insert("town".to_string(), serde_json::json!("Town Square"));

        let batch = resolver
            .resolve_batch(&rules, &fields, &BTreeSet::from([5i64]), &snapshot)
            .await
            .unwrap();

        let entry = &batch.entries[&rule.id];
        assert_eq!(entry.status, ResolutionStatus::Success);
        assert_eq!(
            entry.resolved_value,
            Some(serde_json::json!("Town Square"))
        );
        assert_eq!(store.resolve_calls(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_failure_degrades_batch_and_keeps_cache() {
        let store = Arc::new(StubRuleStore::new());
        store.set_configuration(&configuration());
        let rule = dependent_rule(false);
        store.put_rule(rule.clone());
        let rules = RuleSet::new(vec![rule.clone()]);
        let fields = FieldIndex::from_configuration(&configuration());
        let resolver =
            DependencyResolver::new(store.clone(), Uuid::new_v4(), &EngineConfig::default());

        // Seed the cache with a successful round
        let mut snapshot = FormSnapshot::new();
        snapshot.insert("town".to_string(), serde_json::json!("Old Town"));
        resolver
            .resolve_batch(&rules, &fields, &BTreeSet::from([5i64]), &snapshot)
            .await
            .unwrap();

        store.fail_next_resolve("rule store unreachable");
        let err = resolver
            .resolve_batch(&rules, &fields, &BTreeSet::from([5i64]), &snapshot)
            .await
            .unwrap_err();

        assert!(matches!(err, ResolutionError::DispatchFailed { .. }));
        let cached = resolver.cached_for_rule(&rule.id).await.unwrap();
        assert_eq!(cached.resolved_value, Some(serde_json::json!("Old Town")));
    }

    #[tokio::test]
    async fn test_clear_discards_cache() {
        let store = Arc::new(StubRuleStore::new());
        let rule = dependent_rule(true);
        let rules = RuleSet::new(vec![rule.clone()]);
        let fields = FieldIndex::from_configuration(&configuration());
        let resolver =
            DependencyResolver::new(store.clone(), Uuid::new_v4(), &EngineConfig::default());

        resolver
            .resolve_batch(
                &rules,
                &fields,
                &BTreeSet::from([5i64]),
                &FormSnapshot::new(),
            )
            .await
            .unwrap();
        assert!(resolver.cached_for_rule(&rule.id).await.is_some());

        resolver.clear().await;
        assert!(resolver.cached().await.is_empty());
    }
}
