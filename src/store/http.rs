//! HTTP client for the rule store service.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use url::Url;
use uuid::Uuid;

use super::{
    FieldValidationRequest, PathCheckResponse, ResolveDependenciesRequest,
    ResolveDependenciesResponse, RuleStore,
};
use crate::config::EngineConfig;
use crate::health::HealthIssue;
use crate::rules::{RuleId, ValidationRule};
use crate::validator::ValidationOutcome;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PathCheckRequest<'a> {
    path: &'a str,
    entity_type_name: &'a str,
}

/// Rule store client over HTTP/JSON.
pub struct HttpRuleStore {
    client: Client,
    base_url: Url,
}

impl HttpRuleStore {
    /// Build a client from the engine configuration.
    ///
    /// Requires `service_base_url` to be set; the dispatch timeout doubles
    /// as the request timeout so no call outlives the engine's own bound.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let base = config
            .service_base_url
            .as_deref()
            .context("Engine configuration has no service_base_url")?;
        Self::new(base, config)
    }

    pub fn new(base_url: &str, config: &EngineConfig) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid rule store base URL '{base_url}'"))?;
        let client = Client::builder()
            .timeout(config.dispatch_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Invalid endpoint path '{path}'"))
    }
}

#[async_trait]
impl RuleStore for HttpRuleStore {
    async fn rules_for_configuration(
        &self,
        configuration_id: Uuid,
    ) -> Result<Vec<ValidationRule>> {
        let url = self.endpoint(&format!("configurations/{configuration_id}/validation-rules"))?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to fetch validation rules")?
            .error_for_status()
            .context("Rule store rejected rule fetch")?;

        response
            .json()
            .await
            .context("Failed to decode validation rules")
    }

    async fn save_rule(&self, configuration_id: Uuid, rule: ValidationRule) -> Result<()> {
        let url = self.endpoint(&format!("configurations/{configuration_id}/validation-rules"))?;
        self.client
            .post(url)
            .json(&rule)
            .send()
            .await
            .context("Failed to save validation rule")?
            .error_for_status()
            .context("Rule store rejected rule save")?;
        Ok(())
    }

    async fn delete_rule(&self, configuration_id: Uuid, rule_id: RuleId) -> Result<()> {
        let url = self.endpoint(&format!(
            "configurations/{configuration_id}/validation-rules/{rule_id}"
        ))?;
        self.client
            .delete(url)
            .send()
            .await
            .context("Failed to delete validation rule")?
            .error_for_status()
            .context("Rule store rejected rule delete")?;
        Ok(())
    }

    async fn resolve_dependencies(
        &self,
        request: ResolveDependenciesRequest,
    ) -> Result<ResolveDependenciesResponse> {
        let url = self.endpoint("validation-rules/resolve-dependencies")?;
        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .context("Failed to dispatch dependency resolution")?
            .error_for_status()
            .context("Rule store rejected dependency resolution")?;

        response
            .json()
            .await
            .context("Failed to decode dependency resolution response")
    }

    async fn validate_field(&self, request: FieldValidationRequest) -> Result<ValidationOutcome> {
        let url = self.endpoint("validation-rules/validate-field")?;
        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .context("Failed to dispatch field validation")?
            .error_for_status()
            .context("Rule store rejected field validation")?;

        response
            .json()
            .await
            .context("Failed to decode validation outcome")
    }

    async fn validate_path(
        &self,
        path: &str,
        entity_type_name: &str,
    ) -> Result<PathCheckResponse> {
        let url = self.endpoint("validation-rules/validate-path")?;
        let response = self
            .client
            .post(url)
            .json(&PathCheckRequest {
                path,
                entity_type_name,
            })
            .send()
            .await
            .context("Failed to dispatch path check")?
            .error_for_status()
            .context("Rule store rejected path check")?;

        response.json().await.context("Failed to decode path check")
    }

    async fn check_configuration_health(
        &self,
        configuration_id: Uuid,
    ) -> Result<Vec<HealthIssue>> {
        let url = self.endpoint(&format!("configurations/{configuration_id}/health"))?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to dispatch health check")?
            .error_for_status()
            .context("Rule store rejected health check")?;

        response
            .json()
            .await
            .context("Failed to decode health issues")
    }
}
