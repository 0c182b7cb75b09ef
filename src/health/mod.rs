//! Static health diagnostics over a saved form configuration.
//!
//! Runs against persisted rule data only, never live form values, so the
//! builder UI can surface problems on load/save/refresh. Issues are always
//! collected and returned, never thrown: a form with bad rule data must
//! still be usable, perhaps degraded.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::form::{FieldIndex, FormConfiguration};
use crate::rules::{FieldId, RuleId};

/// Diagnostic severity, ordered least to most severe
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum IssueSeverity {
    Info,
    Warning,
    Error,
}

/// One configuration problem found by a health pass
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthIssue {
    pub severity: IssueSeverity,
    pub message: String,

    #[serde(default)]
    pub field_id: Option<FieldId>,

    #[serde(default)]
    pub rule_id: Option<RuleId>,
}

/// Result of one health pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub issues: Vec<HealthIssue>,
}

impl HealthReport {
    /// A configuration is healthy iff no issues were found
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }

    /// Issues grouped by severity, most severe group last
    pub fn by_severity(&self) -> BTreeMap<IssueSeverity, Vec<&HealthIssue>> {
        let mut grouped: BTreeMap<IssueSeverity, Vec<&HealthIssue>> = BTreeMap::new();
        for issue in &self.issues {
            grouped.entry(issue.severity).or_default().push(issue);
        }
        grouped
    }

    pub fn errors(&self) -> impl Iterator<Item = &HealthIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &HealthIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Warning)
    }
}

/// Run all diagnostics over a saved configuration.
///
/// Pure and idempotent: same configuration in, same issues out, no side
/// effects. A configuration with zero rules is trivially healthy.
pub fn check_configuration(configuration: &FormConfiguration) -> HealthReport {
    let index = FieldIndex::from_configuration(configuration);
    let mut issues = Vec::new();

    check_dangling_references(configuration, &index, &mut issues);
    check_field_ordering(configuration, &index, &mut issues);
    check_cycles(configuration, &index, &mut issues);

    debug!(
        configuration_id = %configuration.id,
        issues = issues.len(),
        "Configuration health pass complete"
    );

    HealthReport { issues }
}

/// Rules referencing fields that no longer exist (deleted fields)
fn check_dangling_references(
    configuration: &FormConfiguration,
    index: &FieldIndex,
    issues: &mut Vec<HealthIssue>,
) {
    for rule in &configuration.rules {
        if !index.contains(rule.owner_field_id) {
            issues.push(HealthIssue {
                severity: IssueSeverity::Error,
                message: format!(
                    "Rule {} is attached to missing field id {}; the field was deleted or the rule was not cleaned up",
                    rule.id, rule.owner_field_id
                ),
                field_id: Some(rule.owner_field_id),
                rule_id: Some(rule.id),
            });
        }

        if let Some(dependency) = rule.depends_on_field_id {
            if !index.contains(dependency) {
                issues.push(HealthIssue {
                    severity: IssueSeverity::Error,
                    message: format!(
                        "Rule {} depends on missing field id {}; the field was deleted or the rule was not cleaned up",
                        rule.id, dependency
                    ),
                    field_id: Some(dependency),
                    rule_id: Some(rule.id),
                });
            }
        }
    }
}

/// Dependencies declared later in display order than their dependents
fn check_field_ordering(
    configuration: &FormConfiguration,
    index: &FieldIndex,
    issues: &mut Vec<HealthIssue>,
) {
    for rule in &configuration.rules {
        let Some(dependency) = rule.depends_on_field_id else {
            continue;
        };
        let (Some(owner_pos), Some(dependency_pos)) =
            (index.position(rule.owner_field_id), index.position(dependency))
        else {
            // Dangling references are reported separately
            continue;
        };

        if dependency_pos > owner_pos {
            let owner_name = field_name(index, rule.owner_field_id);
            let dependency_name = field_name(index, dependency);
            issues.push(HealthIssue {
                severity: IssueSeverity::Warning,
                message: format!(
                    "Field '{owner_name}' depends on field '{dependency_name}', which is declared later in the form; move '{dependency_name}' before '{owner_name}' so its value is available first"
                ),
                field_id: Some(rule.owner_field_id),
                rule_id: Some(rule.id),
            });
        }
    }
}

/// Circular chains over `depends_on_field_id` edges
fn check_cycles(
    configuration: &FormConfiguration,
    index: &FieldIndex,
    issues: &mut Vec<HealthIssue>,
) {
    // owner -> dependency adjacency
    let mut edges: HashMap<FieldId, Vec<FieldId>> = HashMap::new();
    for rule in &configuration.rules {
        if let Some(dependency) = rule.depends_on_field_id {
            edges.entry(rule.owner_field_id).or_default().push(dependency);
        }
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        InProgress,
        Done,
    }

    let mut marks: HashMap<FieldId, Mark> = HashMap::new();
    let mut chain: Vec<FieldId> = Vec::new();
    let mut cycles: Vec<Vec<FieldId>> = Vec::new();

    fn visit(
        node: FieldId,
        edges: &HashMap<FieldId, Vec<FieldId>>,
        marks: &mut HashMap<FieldId, Mark>,
        chain: &mut Vec<FieldId>,
        cycles: &mut Vec<Vec<FieldId>>,
    ) {
        match marks.get(&node) {
            Some(Mark::Done) => return,
            Some(Mark::InProgress) => {
                let start = chain.iter().position(|&n| n == node).unwrap_or(0);
                let mut cycle = chain[start..].to_vec();
                cycle.push(node);
                cycles.push(cycle);
                return;
            }
            None => {}
        }

        marks.insert(node, Mark::InProgress);
        chain.push(node);
        if let Some(next) = edges.get(&node) {
            for &dependency in next {
                visit(dependency, edges, marks, chain, cycles);
            }
        }
        chain.pop();
        marks.insert(node, Mark::Done);
    }

    let mut roots: Vec<FieldId> = edges.keys().copied().collect();
    roots.sort_unstable();
    for root in roots {
        visit(root, &edges, &mut marks, &mut chain, &mut cycles);
    }

    for cycle in cycles {
        let chain_text = cycle
            .iter()
            .map(|&id| field_name(index, id))
            .collect::<Vec<_>>()
            .join(" -> ");
        issues.push(HealthIssue {
            severity: IssueSeverity::Error,
            message: format!("Circular dependency detected: {chain_text}"),
            field_id: cycle.first().copied(),
            rule_id: None,
        });
    }
}

fn field_name(index: &FieldIndex, field_id: FieldId) -> String {
    index
        .field(field_id)
        .map(|f| f.display_name().to_string())
        .unwrap_or_else(|| format!("#{field_id}"))
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::rules::{ValidationRule, ValidationType};

    fn field(id: FieldId, name: &str) -> serde_json::Value {
        serde_json::json!({"fieldId": id, "fieldName": name, "label": name})
    }

    fn rule(owner: FieldId, depends_on: Option<FieldId>) -> ValidationRule {
        ValidationRule {
            id: Uuid::new_v4(),
            owner_field_id: owner,
            validation_type: ValidationType::Custom("LocationInsideRegion".to_string()),
            depends_on_field_id: depends_on,
            dependency_path: None,
            config: serde_json::Value::Null,
            error_message_template: "invalid".to_string(),
            success_message_template: None,
            is_blocking: true,
            requires_dependency_filled: false,
        }
    }

    fn configuration(fields: Vec<serde_json::Value>, rules: Vec<ValidationRule>) -> FormConfiguration {
        let mut config: FormConfiguration = serde_json::from_value(serde_json::json!({
            "id": Uuid::new_v4(),
            "name": "Test form",
            "entityType": "Location",
            "steps": [
                {"title": "Main", "sections": [{"title": "All", "fields": fields}]}
            ],
            "rules": []
        }))
        .unwrap();
        config.rules = rules;
        config
    }

    #[test]
    fn test_zero_rules_is_trivially_healthy() {
        let config = configuration(vec![field(1, "Town")], vec![]);
        let report = check_configuration(&config);
        assert!(report.is_healthy());
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_dangling_dependency_reported_with_field_id() {
        let config = configuration(vec![field(1, "Location")], vec![rule(1, Some(999))]);
        let report = check_configuration(&config);

        assert!(!report.is_healthy());
        let issue = report.errors().next().expect("expected an error issue");
        assert!(issue.message.contains("999"));
        assert_eq!(issue.field_id, Some(999));
    }

    #[test]
    fn test_dangling_owner_reported() {
        let config = configuration(vec![field(1, "Town")], vec![rule(42, None)]);
        let report = check_configuration(&config);
        let issue = report.errors().next().expect("expected an error issue");
        assert!(issue.message.contains("42"));
    }

    #[test]
    fn test_ordering_violation_names_both_fields() {
        // "Location" declared before "Town" but depends on it
        let config = configuration(
            vec![
                field(2, "Location"),
                field(3, "Notes"),
                field(5, "Town"),
            ],
            vec![rule(2, Some(5))],
        );

        let report = check_configuration(&config);
        let issue = report.warnings().next().expect("expected a warning");
        assert!(issue.message.contains("Location"));
        assert!(issue.message.contains("Town"));
        assert_eq!(issue.severity, IssueSeverity::Warning);
    }

    #[test]
    fn test_correct_ordering_is_clean() {
        let config = configuration(
            vec![field(5, "Town"), field(2, "Location")],
            vec![rule(2, Some(5))],
        );

        let report = check_configuration(&config);
        assert!(report.is_healthy());
    }

    #[test]
    fn test_cycle_detected_with_chain() {
        let config = configuration(
            vec![field(1, "Location"), field(2, "Town")],
            vec![rule(1, Some(2)), rule(2, Some(1))],
        );

        let report = check_configuration(&config);
        let cycle_issue = report
            .errors()
            .find(|i| i.message.contains("Circular dependency"))
            .expect("expected a cycle issue");
        assert!(cycle_issue.message.contains("Location"));
        assert!(cycle_issue.message.contains("Town"));
    }

    #[test]
    fn test_self_cycle_detected() {
        let config = configuration(vec![field(1, "Location")], vec![rule(1, Some(1))]);
        let report = check_configuration(&config);
        assert!(report
            .errors()
            .any(|i| i.message.contains("Circular dependency")));
    }

    #[test]
    fn test_idempotent() {
        let config = configuration(
            vec![field(2, "Location"), field(5, "Town")],
            vec![rule(2, Some(5)), rule(1, Some(999))],
        );

        let first = check_configuration(&config);
        let second = check_configuration(&config);
        assert_eq!(first.issues.len(), second.issues.len());
    }

    #[test]
    fn test_grouping_by_severity() {
        let config = configuration(
            vec![field(2, "Location"), field(3, "Notes"), field(5, "Town")],
            vec![rule(2, Some(5)), rule(3, Some(999))],
        );

        let report = check_configuration(&config);
        let grouped = report.by_severity();
        assert!(grouped.contains_key(&IssueSeverity::Warning));
        assert!(grouped.contains_key(&IssueSeverity::Error));
    }
}
