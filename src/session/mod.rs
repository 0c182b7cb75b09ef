//! Live form session state.
//!
//! A `FormSession` owns everything scoped to one user filling out one form:
//! current values, the resolved-dependency cache, per-field validation
//! states, and the debounce generations. It is constructed at session start
//! and discarded (or `reset()`) at session end; nothing here is a process
//! singleton.
//!
//! ## Data flow
//!
//! ```text
//! set_field_value(name, value)
//!        │
//!        ├─► values table updated
//!        ├─► batch resolver: every rule depending on the field
//!        │   is re-resolved before the call returns
//!        └─► debounced validation of affected fields (spawned);
//!            outcomes land in field_states and notify watchers
//! ```
//!
//! Subscribers receive lightweight snapshots over a watch channel rather
//! than holding locks while rendering.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, RwLock};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::debounce::Trigger;
use crate::error::{EngineError, ResolutionError};
use crate::form::{FieldIndex, FormConfiguration, FormSnapshot};
use crate::health::{check_configuration, HealthReport};
use crate::metadata::{EntityRegistry, MetadataProvider};
use crate::resolver::{DependencyResolver, ResolutionStatus, ResolvedDependency};
use crate::rules::{FieldId, RuleId, RuleSet};
use crate::store::{FieldValidationRequest, RuleStore};
use crate::validator::{FieldValidator, ValidationOutcome};

/// Validation state of one field, as the form runtime renders it
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValidationState {
    /// No validation has been requested yet
    #[default]
    NotValidated,

    /// A validation is debouncing or in flight
    Pending,

    /// The newest dispatched validation returned an outcome
    Validated(ValidationOutcome),

    /// The dispatch itself failed ("validation unavailable, retry");
    /// distinct from a rule failure
    Unavailable { message: String },
}

impl FieldValidationState {
    pub fn blocks_submission(&self) -> bool {
        match self {
            Self::Validated(outcome) => outcome.blocks_submission(),
            _ => false,
        }
    }
}

/// Lightweight state snapshot sent to watch subscribers.
///
/// A snapshot rather than the live session crosses the channel so
/// subscribers never hold session locks while rendering.
#[derive(Debug, Clone)]
pub struct FormStateSnapshot {
    /// Incremented on every published change
    pub version: u64,
    pub values: FormSnapshot,
    /// Count of fields currently holding a blocking invalid outcome
    pub blocking_failures: usize,
    pub is_loading: bool,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl FormStateSnapshot {
    fn empty() -> Self {
        Self {
            version: 0,
            values: FormSnapshot::new(),
            blocking_failures: 0,
            is_loading: false,
            error: None,
            updated_at: Utc::now(),
        }
    }
}

struct SessionState {
    values: FormSnapshot,
    field_states: HashMap<FieldId, FieldValidationState>,
    version: u64,
    loading: usize,
    error: Option<String>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            values: FormSnapshot::new(),
            field_states: HashMap::new(),
            version: 0,
            loading: 0,
            error: None,
        }
    }

    fn snapshot(&self) -> FormStateSnapshot {
        FormStateSnapshot {
            version: self.version,
            values: self.values.clone(),
            blocking_failures: self
                .field_states
                .values()
                .filter(|s| s.blocks_submission())
                .count(),
            is_loading: self.loading > 0,
            error: self.error.clone(),
            updated_at: Utc::now(),
        }
    }
}

struct SessionInner {
    configuration: FormConfiguration,
    fields: FieldIndex,
    rules: RuleSet,
    registry: Arc<EntityRegistry>,
    resolver: DependencyResolver,
    validator: FieldValidator,
    state: RwLock<SessionState>,
    watch_tx: watch::Sender<FormStateSnapshot>,
}

/// One user's live form session.
///
/// Cheaply cloneable; clones share the same session state.
#[derive(Clone)]
pub struct FormSession {
    inner: Arc<SessionInner>,
}

impl FormSession {
    /// Build a session from a configuration whose rules are already loaded.
    pub fn new(
        configuration: FormConfiguration,
        registry: Arc<EntityRegistry>,
        store: Arc<dyn RuleStore>,
        config: &EngineConfig,
    ) -> Self {
        let fields = FieldIndex::from_configuration(&configuration);
        let rules = RuleSet::new(configuration.rules.clone());
        let resolver = DependencyResolver::new(Arc::clone(&store), configuration.id, config);
        let validator = FieldValidator::new(store, config);
        let (watch_tx, _) = watch::channel(FormStateSnapshot::empty());

        Self {
            inner: Arc::new(SessionInner {
                configuration,
                fields,
                rules,
                registry,
                resolver,
                validator,
                state: RwLock::new(SessionState::new()),
                watch_tx,
            }),
        }
    }

    /// Build a session, loading entity metadata and (if the configuration
    /// carries none) the saved rules from the store.
    pub async fn load(
        mut configuration: FormConfiguration,
        provider: &dyn MetadataProvider,
        store: Arc<dyn RuleStore>,
        config: &EngineConfig,
    ) -> Result<Self, EngineError> {
        let registry = Arc::new(EntityRegistry::load(provider).await);

        if configuration.rules.is_empty() {
            configuration.rules = store
                .rules_for_configuration(configuration.id)
                .await
                .map_err(|err| {
                    EngineError::Resolution(ResolutionError::DispatchFailed {
                        message: format!("{err:#}"),
                    })
                })?;
        }

        Ok(Self::new(configuration, registry, store, config))
    }

    /// Update one field's value and kick off dependent recomputation.
    ///
    /// Every rule depending on the field is re-resolved before this call
    /// returns (the invalidation rule); re-validation of affected fields is
    /// debounced and runs in the background, landing in `field_state` and
    /// the watch stream. A resolution dispatch failure is recorded as the
    /// session error and propagated, never silently dropped.
    pub async fn set_field_value(
        &self,
        field_name: &str,
        value: serde_json::Value,
    ) -> Result<(), EngineError> {
        let inner = &self.inner;
        let Some(field_id) = inner.fields.id_for(field_name) else {
            return Err(EngineError::UnknownField {
                name: field_name.to_string(),
            });
        };

        {
            let mut state = inner.state.write().await;
            state.values.insert(field_name.to_string(), value);
            state.error = None;
        }
        self.publish().await;

        let dependent_owners = inner.rules.owners_depending_on(field_id);
        if !dependent_owners.is_empty() {
            self.resolve_dependents(field_id).await?;
        }

        // The edited field re-validates too, when it owns rules
        let mut targets = dependent_owners;
        if !inner.rules.rules_for_owner(field_id).is_empty() {
            targets.insert(field_id);
        }
        for target in targets {
            self.spawn_validation(target, Trigger::Interactive).await;
        }

        Ok(())
    }

    /// Re-validate one field immediately (no debounce), awaiting the
    /// outcome. Used by refresh affordances and when loading saved values.
    pub async fn refresh_validation(&self, field_name: &str) -> Result<(), EngineError> {
        let inner = &self.inner;
        let Some(field_id) = inner.fields.id_for(field_name) else {
            return Err(EngineError::UnknownField {
                name: field_name.to_string(),
            });
        };

        let Some(request) = self.build_request(field_id).await else {
            return Ok(());
        };

        self.apply_field_state(field_id, FieldValidationState::Pending)
            .await;
        match inner
            .validator
            .validate_field(request, Trigger::Programmatic)
            .await
        {
            Ok(Some(outcome)) => {
                self.apply_field_state(field_id, FieldValidationState::Validated(outcome))
                    .await;
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(err) => {
                self.apply_field_state(
                    field_id,
                    FieldValidationState::Unavailable {
                        message: err.to_string(),
                    },
                )
                .await;
                Err(err.into())
            }
        }
    }

    /// Current form values
    pub async fn values(&self) -> FormSnapshot {
        self.inner.state.read().await.values.clone()
    }

    /// Current resolved-dependency cache
    pub async fn resolved_dependencies(&self) -> HashMap<RuleId, ResolvedDependency> {
        self.inner.resolver.cached().await
    }

    /// Validation state of one field
    pub async fn field_state(&self, field_name: &str) -> FieldValidationState {
        let Some(field_id) = self.inner.fields.id_for(field_name) else {
            return FieldValidationState::NotValidated;
        };
        self.inner
            .state
            .read()
            .await
            .field_states
            .get(&field_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether a batch resolution is in flight
    pub async fn is_loading(&self) -> bool {
        self.inner.state.read().await.loading > 0
    }

    /// Last surfaced dispatch error, if any
    pub async fn last_error(&self) -> Option<String> {
        self.inner.state.read().await.error.clone()
    }

    /// Submission is allowed unless some field holds a blocking failure.
    /// Advisory (non-blocking) failures never prevent submission.
    pub async fn can_submit(&self) -> bool {
        let state = self.inner.state.read().await;
        !state.field_states.values().any(|s| s.blocks_submission())
    }

    /// Subscribe to state snapshots
    pub fn subscribe(&self) -> watch::Receiver<FormStateSnapshot> {
        self.inner.watch_tx.subscribe()
    }

    /// Field id/name/position lookups for rendering
    pub fn fields(&self) -> &FieldIndex {
        &self.inner.fields
    }

    /// The session's rule graph
    pub fn rules(&self) -> &RuleSet {
        &self.inner.rules
    }

    /// Entity catalog loaded for this session
    pub fn registry(&self) -> &EntityRegistry {
        &self.inner.registry
    }

    pub fn configuration(&self) -> &FormConfiguration {
        &self.inner.configuration
    }

    /// Static health diagnostics for this session's configuration
    pub fn check_health(&self) -> HealthReport {
        check_configuration(&self.inner.configuration)
    }

    /// Discard all session state: values, validation states, the
    /// resolved-dependency cache, and in-flight generations.
    pub async fn reset(&self) {
        {
            let mut state = self.inner.state.write().await;
            state.values.clear();
            state.field_states.clear();
            state.error = None;
        }
        self.inner.resolver.clear().await;
        self.inner.validator.reset().await;
        self.publish().await;
        debug!("Form session reset");
    }

    async fn resolve_dependents(&self, field_id: FieldId) -> Result<(), EngineError> {
        let inner = &self.inner;

        self.set_loading(true).await;
        let snapshot = self.values().await;
        let result = inner
            .resolver
            .resolve_batch(
                &inner.rules,
                &inner.fields,
                &BTreeSet::from([field_id]),
                &snapshot,
            )
            .await;
        self.set_loading(false).await;

        match result {
            Ok(batch) => {
                debug!(
                    field_id,
                    rules = batch.entries.len(),
                    "Re-resolved dependents"
                );
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                warn!(field_id, error = %message, "Dependency resolution failed");
                {
                    let mut state = inner.state.write().await;
                    state.error = Some(message);
                }
                self.publish().await;
                Err(err.into())
            }
        }
    }

    async fn spawn_validation(&self, field_id: FieldId, trigger: Trigger) {
        self.apply_field_state(field_id, FieldValidationState::Pending)
            .await;

        let Some(request) = self.build_request(field_id).await else {
            return;
        };

        let session = self.clone();
        tokio::spawn(async move {
            match session.inner.validator.validate_field(request, trigger).await {
                Ok(Some(outcome)) => {
                    session
                        .apply_field_state(field_id, FieldValidationState::Validated(outcome))
                        .await;
                }
                // Superseded: the newer request owns this field's state
                Ok(None) => {}
                Err(err) => {
                    warn!(field_id, error = %err, "Validation dispatch failed");
                    session
                        .apply_field_state(
                            field_id,
                            FieldValidationState::Unavailable {
                                message: err.to_string(),
                            },
                        )
                        .await;
                }
            }
        });
    }

    async fn build_request(&self, field_id: FieldId) -> Option<FieldValidationRequest> {
        let inner = &self.inner;
        let field = inner.fields.field(field_id)?.clone();

        let (value, form_context) = {
            let state = inner.state.read().await;
            (
                state
                    .values
                    .get(&field.field_name)
                    .cloned()
                    .unwrap_or(serde_json::Value::Null),
                state.values.clone(),
            )
        };

        let mut dependency_value = None;
        for rule in inner.rules.rules_for_owner(field_id) {
            if let Some(resolved) = inner.resolver.cached_for_rule(&rule.id).await {
                if resolved.status == ResolutionStatus::Success {
                    dependency_value = resolved.resolved_value.clone();
                    break;
                }
            }
        }

        Some(FieldValidationRequest {
            field_id,
            field_name: field.field_name,
            value,
            dependency_value,
            form_context,
            configuration_id: Some(inner.configuration.id),
        })
    }

    async fn apply_field_state(&self, field_id: FieldId, new_state: FieldValidationState) {
        {
            let mut state = self.inner.state.write().await;
            state.field_states.insert(field_id, new_state);
        }
        self.publish().await;
    }

    async fn set_loading(&self, loading: bool) {
        {
            let mut state = self.inner.state.write().await;
            if loading {
                state.loading += 1;
            } else {
                state.loading = state.loading.saturating_sub(1);
            }
        }
        self.publish().await;
    }

    async fn publish(&self) {
        let snapshot = {
            let mut state = self.inner.state.write().await;
            state.version += 1;
            state.snapshot()
        };
        let _ = self.inner.watch_tx.send(snapshot);
    }
}
