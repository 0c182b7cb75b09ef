//! In-memory rule store for tests and offline development.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::time::sleep;
use uuid::Uuid;

use super::{
    FieldValidationRequest, PathCheckResponse, ResolveDependenciesRequest,
    ResolveDependenciesResponse, RuleStore,
};
use crate::form::FormConfiguration;
use crate::health::HealthIssue;
use crate::path::DependencyPath;
use crate::resolver::ResolvedDependency;
use crate::rules::{FieldId, RuleId, ValidationRule};
use crate::validator::ValidationOutcome;

/// Stub implementation of [`RuleStore`].
///
/// Resolution echoes the dependency value found in the submitted form
/// context (the field-id → field-name mapping comes from the configuration
/// registered with `set_configuration`). Validation outcomes can be queued
/// per field, with an artificial delay, to exercise debounce and supersede
/// behavior; dispatch counters let tests assert how many calls actually
/// went out.
#[derive(Default)]
pub struct StubRuleStore {
    rules: Mutex<HashMap<RuleId, ValidationRule>>,
    configuration: Mutex<Option<FormConfiguration>>,
    canned_resolutions: Mutex<HashMap<RuleId, ResolvedDependency>>,
    queued_outcomes: Mutex<HashMap<FieldId, VecDeque<(Duration, ValidationOutcome)>>>,
    fail_resolve: Mutex<Option<String>>,
    fail_validate: Mutex<Option<String>>,
    resolve_calls: AtomicUsize,
    validate_calls: AtomicUsize,
}

impl StubRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the saved configuration (field names, rules, health data)
    pub fn set_configuration(&self, configuration: &FormConfiguration) {
        for rule in &configuration.rules {
            self.put_rule(rule.clone());
        }
        *self.configuration.lock().unwrap() = Some(configuration.clone());
    }

    /// Add a rule without a full configuration
    pub fn put_rule(&self, rule: ValidationRule) {
        self.rules.lock().unwrap().insert(rule.id, rule);
    }

    /// Fix the resolution returned for one rule
    pub fn put_resolution(&self, resolution: ResolvedDependency) {
        self.canned_resolutions
            .lock()
            .unwrap()
            .insert(resolution.rule_id, resolution);
    }

    /// Queue the outcome (and artificial latency) for the next validation
    /// dispatch on a field; queued entries are consumed in order.
    pub fn queue_field_outcome(
        &self,
        field_id: FieldId,
        delay: Duration,
        outcome: ValidationOutcome,
    ) {
        self.queued_outcomes
            .lock()
            .unwrap()
            .entry(field_id)
            .or_default()
            .push_back((delay, outcome));
    }

    /// Make the next resolve dispatch fail
    pub fn fail_next_resolve(&self, message: &str) {
        *self.fail_resolve.lock().unwrap() = Some(message.to_string());
    }

    /// Make the next validate dispatch fail
    pub fn fail_next_validate(&self, message: &str) {
        *self.fail_validate.lock().unwrap() = Some(message.to_string());
    }

    /// How many resolve dispatches actually went out
    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    /// How many validate dispatches actually went out
    pub fn validate_calls(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    fn field_name(&self, field_id: FieldId) -> Option<String> {
        let configuration = self.configuration.lock().unwrap();
        configuration.as_ref().and_then(|c| {
            c.steps
                .iter()
                .flat_map(|s| &s.sections)
                .flat_map(|s| &s.fields)
                .find(|f| f.field_id == field_id)
                .map(|f| f.field_name.clone())
        })
    }
}

#[async_trait]
impl RuleStore for StubRuleStore {
    async fn rules_for_configuration(
        &self,
        _configuration_id: Uuid,
    ) -> anyhow::Result<Vec<ValidationRule>> {
        Ok(self.rules.lock().unwrap().values().cloned().collect())
    }

    async fn save_rule(&self, _configuration_id: Uuid, rule: ValidationRule) -> anyhow::Result<()> {
        self.put_rule(rule);
        Ok(())
    }

    async fn delete_rule(&self, _configuration_id: Uuid, rule_id: RuleId) -> anyhow::Result<()> {
        self.rules.lock().unwrap().remove(&rule_id);
        Ok(())
    }

    async fn resolve_dependencies(
        &self,
        request: ResolveDependenciesRequest,
    ) -> anyhow::Result<ResolveDependenciesResponse> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = self.fail_resolve.lock().unwrap().take() {
            anyhow::bail!(message);
        }

        let rules: Vec<ValidationRule> = self.rules.lock().unwrap().values().cloned().collect();
        let canned = self.canned_resolutions.lock().unwrap().clone();
        let now = Utc::now();

        let mut resolved = HashMap::new();
        for rule in rules {
            let Some(dependency) = rule.depends_on_field_id else {
                continue;
            };
            if !request.field_ids.contains(&dependency) {
                continue;
            }

            if let Some(mut entry) = canned.get(&rule.id).cloned() {
                entry.resolved_at = now;
                resolved.insert(rule.id, entry);
                continue;
            }

            let value = self
                .field_name(dependency)
                .and_then(|name| request.form_context.get(&name).cloned())
                .filter(|v| !v.is_null());
            let entry = match value {
                Some(value) => ResolvedDependency::success(&rule, now, value),
                None => ResolvedDependency::pending(&rule, now),
            };
            resolved.insert(rule.id, entry);
        }

        Ok(ResolveDependenciesResponse {
            resolved,
            issues: Vec::new(),
        })
    }

    async fn validate_field(
        &self,
        request: FieldValidationRequest,
    ) -> anyhow::Result<ValidationOutcome> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = self.fail_validate.lock().unwrap().take() {
            anyhow::bail!(message);
        }

        let queued = self
            .queued_outcomes
            .lock()
            .unwrap()
            .get_mut(&request.field_id)
            .and_then(VecDeque::pop_front);

        match queued {
            Some((delay, outcome)) => {
                if !delay.is_zero() {
                    sleep(delay).await;
                }
                Ok(outcome)
            }
            None => Ok(ValidationOutcome::valid()),
        }
    }

    async fn validate_path(
        &self,
        path: &str,
        _entity_type_name: &str,
    ) -> anyhow::Result<PathCheckResponse> {
        Ok(match DependencyPath::parse(path) {
            Ok(_) => PathCheckResponse {
                is_valid: true,
                error: None,
                detailed_error: None,
            },
            Err(err) => PathCheckResponse {
                is_valid: false,
                error: Some("Invalid dependency path".to_string()),
                detailed_error: Some(err.to_string()),
            },
        })
    }

    async fn check_configuration_health(
        &self,
        _configuration_id: Uuid,
    ) -> anyhow::Result<Vec<HealthIssue>> {
        let configuration = self.configuration.lock().unwrap().clone();
        Ok(configuration
            .map(|c| crate::health::check_configuration(&c).issues)
            .unwrap_or_default())
    }
}
