//! Debounced, cancelable per-field validation.
//!
//! Interactive edits coalesce into a single dispatch after the quiescence
//! window; a validation in flight when a newer edit arrives is superseded
//! and its result discarded, even if it comes back later (last-write-wins
//! by request generation, not by arrival time). Dispatch failures and
//! timeouts surface as `ValidationError`, a distinct state that is never folded
//! into "invalid".

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::debug;

use crate::config::EngineConfig;
use crate::debounce::{Debouncer, Trigger};
use crate::error::ValidationError;
use crate::rules::FieldId;
use crate::store::{FieldValidationRequest, RuleStore};
use crate::template::interpolate_opt;

/// Result of validating one field value, as reported by the validation
/// service. Not cached: superseded by the next invocation for that field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    #[serde(alias = "IsValid")]
    pub is_valid: bool,

    #[serde(default, alias = "IsBlocking")]
    pub is_blocking: bool,

    /// Error message template (`{Key}` tokens)
    #[serde(default, alias = "Message")]
    pub message: Option<String>,

    /// Success message template (`{Key}` tokens)
    #[serde(default, alias = "SuccessMessage")]
    pub success_message: Option<String>,

    /// Values for message interpolation
    #[serde(default, alias = "Placeholders")]
    pub placeholders: HashMap<String, String>,
}

impl ValidationOutcome {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            is_blocking: false,
            message: None,
            success_message: None,
            placeholders: HashMap::new(),
        }
    }

    /// Blocking failure: the field's value must be rejected and submission
    /// prevented. Non-blocking failures are advisory only.
    pub fn blocks_submission(&self) -> bool {
        self.is_blocking && !self.is_valid
    }

    /// Error message with placeholders substituted
    pub fn rendered_message(&self) -> String {
        interpolate_opt(self.message.as_deref(), &self.placeholders)
    }

    /// Success message with placeholders substituted
    pub fn rendered_success_message(&self) -> String {
        interpolate_opt(self.success_message.as_deref(), &self.placeholders)
    }
}

/// Dispatches per-field validation with debounce and generation checks.
pub struct FieldValidator {
    store: Arc<dyn RuleStore>,
    debouncer: Debouncer<FieldId>,
    dispatch_timeout: Duration,
}

impl FieldValidator {
    pub fn new(store: Arc<dyn RuleStore>, config: &EngineConfig) -> Self {
        Self {
            store,
            debouncer: Debouncer::new(config.debounce()),
            dispatch_timeout: config.dispatch_timeout(),
        }
    }

    /// Validate one field value.
    ///
    /// Returns `Ok(None)` when the request was superseded by a newer edit,
    /// either during the debounce wait or while the dispatch was in flight.
    /// A superseded result must not be applied; only the newest request's
    /// outcome counts.
    pub async fn validate_field(
        &self,
        request: FieldValidationRequest,
        trigger: Trigger,
    ) -> Result<Option<ValidationOutcome>, ValidationError> {
        let field_id = request.field_id;

        let Some(generation) = self.debouncer.begin(field_id, trigger).await else {
            debug!(field_id, "Validation coalesced into a newer edit");
            return Ok(None);
        };

        let result = timeout(self.dispatch_timeout, self.store.validate_field(request)).await;

        // A newer request owns this field now; whatever we got back
        // (outcome, failure, or timeout) is stale and must be discarded.
        if !self.debouncer.is_current(&field_id, generation).await {
            debug!(field_id, "Discarding superseded validation result");
            return Ok(None);
        }

        match result {
            Ok(Ok(outcome)) => Ok(Some(outcome)),
            Ok(Err(err)) => Err(ValidationError::DispatchFailed {
                field_id,
                message: format!("{err:#}"),
            }),
            Err(_elapsed) => Err(ValidationError::Timeout {
                field_id,
                timeout_ms: self.dispatch_timeout.as_millis() as u64,
            }),
        }
    }

    /// Invalidate all in-flight generations (form session reset)
    pub async fn reset(&self) {
        self.debouncer.reset().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StubRuleStore;

    fn request(field_id: FieldId, value: serde_json::Value) -> FieldValidationRequest {
        FieldValidationRequest {
            field_id,
            field_name: format!("field_{field_id}"),
            value,
            dependency_value: None,
            form_context: HashMap::new(),
            configuration_id: None,
        }
    }

    fn failing_outcome(message: &str) -> ValidationOutcome {
        ValidationOutcome {
            is_valid: false,
            is_blocking: true,
            message: Some(message.to_string()),
            success_message: None,
            placeholders: HashMap::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_edits_dispatch_once() {
        let store = Arc::new(StubRuleStore::new());
        let validator = Arc::new(FieldValidator::new(store.clone(), &EngineConfig::default()));

        let mut handles = Vec::new();
        for keystroke in ["T", "To", "Tow"] {
            let validator = Arc::clone(&validator);
            handles.push(tokio::spawn(async move {
                validator
                    .validate_field(request(7, serde_json::json!(keystroke)), Trigger::Interactive)
                    .await
            }));
        }

        let results: Vec<_> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap().unwrap())
            .collect();

        assert_eq!(store.validate_calls(), 1);
        assert_eq!(results.iter().filter(|r| r.is_some()).count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_result_from_superseded_request_is_discarded() {
        let store = Arc::new(StubRuleStore::new());
        // First dispatch answers slowly and invalid; second fast and valid
        store.queue_field_outcome(7, Duration::from_millis(500), failing_outcome("stale"));
        store.queue_field_outcome(7, Duration::from_millis(10), ValidationOutcome::valid());

        let validator = Arc::new(FieldValidator::new(store.clone(), &EngineConfig::default()));

        let first = {
            let validator = Arc::clone(&validator);
            tokio::spawn(async move {
                validator
                    .validate_field(request(7, serde_json::json!("old")), Trigger::Programmatic)
                    .await
            })
        };
        let second = {
            let validator = Arc::clone(&validator);
            tokio::spawn(async move {
                validator
                    .validate_field(request(7, serde_json::json!("new")), Trigger::Programmatic)
                    .await
            })
        };

        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();

        // Both dispatched, but only the newest outcome may be applied
        assert_eq!(store.validate_calls(), 2);
        assert!(first.is_none());
        assert_eq!(second, Some(ValidationOutcome::valid()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_failure_is_distinct_from_invalid() {
        let store = Arc::new(StubRuleStore::new());
        store.fail_next_validate("validation service unreachable");

        let validator = FieldValidator::new(store, &EngineConfig::default());
        let err = validator
            .validate_field(request(3, serde_json::json!(1)), Trigger::Programmatic)
            .await
            .unwrap_err();

        assert!(matches!(err, ValidationError::DispatchFailed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_dispatch_times_out() {
        let store = Arc::new(StubRuleStore::new());
        store.queue_field_outcome(3, Duration::from_secs(60), ValidationOutcome::valid());

        let validator = FieldValidator::new(store, &EngineConfig::default());
        let err = validator
            .validate_field(request(3, serde_json::json!(1)), Trigger::Programmatic)
            .await
            .unwrap_err();

        assert!(matches!(err, ValidationError::Timeout { .. }));
    }

    #[test]
    fn test_blocking_semantics() {
        let blocking = failing_outcome("no");
        assert!(blocking.blocks_submission());

        let advisory = ValidationOutcome {
            is_blocking: false,
            ..failing_outcome("warn")
        };
        assert!(!advisory.blocks_submission());
        assert!(!ValidationOutcome::valid().blocks_submission());
    }

    #[test]
    fn test_message_rendering() {
        let mut outcome = failing_outcome("Location is outside {Town.name} boundaries");
        outcome
            .placeholders
            .insert("Town.name".to_string(), "Town Square".to_string());

        assert_eq!(
            outcome.rendered_message(),
            "Location is outside Town Square boundaries"
        );
        assert_eq!(outcome.rendered_success_message(), "");
    }
}
