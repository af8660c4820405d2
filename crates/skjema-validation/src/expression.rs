//! Expression-driven validation: a per-data-type config maps base
//! fields to conditions evaluated against every instance of the field.

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;
use serde_json::Value;
use skjema_data::FormData;
use skjema_expr::evaluate_with_default;
use skjema_expr::Expr;
use skjema_expr::ExprContext;
use skjema_expr::ExprParseError;
use skjema_expr::ExprValue;
use skjema_hierarchy::AppContext;
use skjema_hierarchy::NodeTree;
use skjema_hierarchy::TreeDataSources;
use thiserror::Error;

use crate::issue::Message;
use crate::issue::Severity;
use crate::issue::ValidationIssue;
use crate::issue::ValidationMask;
use crate::source;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("validation config must be an object of field rules")]
    NotAnObject,
    #[error("rule for '{field}' is malformed: {reason}")]
    MalformedRule { field: String, reason: String },
    #[error("invalid condition for '{field}': {source}")]
    InvalidCondition {
        field: String,
        source: ExprParseError,
    },
}

/// One rule: when `condition` is true for a field instance, `message`
/// (a text key) is raised with `severity`.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldValidationRule {
    pub condition: Expr,
    pub message: String,
    pub severity: Severity,
    /// Shown regardless of the node's current mask.
    pub show_immediately: bool,
}

/// Rules grouped by un-indexed base field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpressionValidationConfig {
    rules: BTreeMap<String, Vec<FieldValidationRule>>,
}

impl ExpressionValidationConfig {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    #[must_use]
    pub fn rules_for(&self, base_field: &str) -> &[FieldValidationRule] {
        self.rules.get(base_field).map_or(&[], Vec::as_slice)
    }
}

/// Parses a validation config document:
/// `{ "validations": { "Field.Path": [ { "condition": ..., "message": ...,
/// "severity"?: ..., "showImmediately"?: ... } ] } }`.
///
/// # Errors
///
/// Fails on the first malformed rule; a partially applied config would
/// silently drop validations.
pub fn parse_validation_config(raw: &Value) -> Result<ExpressionValidationConfig, ConfigError> {
    let validations = raw
        .get("validations")
        .and_then(Value::as_object)
        .ok_or(ConfigError::NotAnObject)?;

    let mut rules = BTreeMap::new();
    for (field, entries) in validations {
        let entries = entries
            .as_array()
            .ok_or_else(|| ConfigError::MalformedRule {
                field: field.clone(),
                reason: "expected an array of rules".to_string(),
            })?;
        let mut parsed = Vec::with_capacity(entries.len());
        for entry in entries {
            parsed.push(parse_rule(field, entry)?);
        }
        rules.insert(field.clone(), parsed);
    }
    Ok(ExpressionValidationConfig { rules })
}

fn parse_rule(field: &str, entry: &Value) -> Result<FieldValidationRule, ConfigError> {
    let malformed = |reason: &str| ConfigError::MalformedRule {
        field: field.to_string(),
        reason: reason.to_string(),
    };
    let condition = entry.get("condition").ok_or_else(|| malformed("missing 'condition'"))?;
    let condition = Expr::parse(condition).map_err(|source| ConfigError::InvalidCondition {
        field: field.to_string(),
        source,
    })?;
    let message = entry
        .get("message")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("missing 'message'"))?
        .to_string();
    let severity = match entry.get("severity") {
        None => Severity::Error,
        Some(raw) => serde_json::from_value(raw.clone())
            .map_err(|_| malformed("unknown 'severity'"))?,
    };
    let show_immediately = entry
        .get("showImmediately")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    Ok(FieldValidationRule {
        condition,
        message,
        severity,
        show_immediately,
    })
}

/// Runs the config against every field instance the tree binds in
/// `data_type`. The field's current value is positional argument 0 of
/// the condition.
#[must_use]
pub fn validate_expressions(
    config: &ExpressionValidationConfig,
    tree: &NodeTree,
    ctx: &AppContext,
    data: &FormData,
    data_type: &str,
) -> Vec<ValidationIssue> {
    let mut out = Vec::new();
    if config.is_empty() {
        return out;
    }

    let sources = TreeDataSources::new(data, tree, ctx);
    let mut seen: FxHashSet<(String, usize)> = FxHashSet::default();

    for node_id in tree.flat() {
        let node = tree.node(node_id);
        let eval_node = node.eval_node();
        for reference in node.item.bindings.values() {
            if reference.data_type != data_type {
                continue;
            }
            let Ok(path) = reference.parsed_field() else {
                continue;
            };
            let base = path.without_indices().to_string();
            let rules = config.rules_for(&base);
            if rules.is_empty() {
                continue;
            }
            let value = data
                .pick(reference)
                .map_or(ExprValue::Null, ExprValue::from_json);
            for (index, rule) in rules.iter().enumerate() {
                // One finding per field instance and rule, no matter how
                // many bindings share the field.
                if !seen.insert((reference.field.clone(), index)) {
                    continue;
                }
                let positional = [value.clone()];
                let eval = ExprContext::new(&sources, &eval_node).with_positional(&positional);
                let triggered = evaluate_with_default(&rule.condition, &eval, ExprValue::Bool(false))
                    .as_bool()
                    .ok()
                    .flatten()
                    .unwrap_or(false);
                if !triggered {
                    continue;
                }
                let category = if rule.show_immediately {
                    // An empty category is never masked away.
                    ValidationMask::empty()
                } else {
                    ValidationMask::EXPRESSION
                };
                out.push(
                    ValidationIssue::new(
                        source::EXPRESSION,
                        category,
                        rule.severity,
                        Message::new(rule.message.clone()),
                    )
                    .with_field(reference.clone()),
                );
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use skjema_hierarchy::generate_tree;
    use skjema_hierarchy::LayoutLookups;
    use skjema_models::parse_layout_set;
    use skjema_models::ComponentRegistry;
    use skjema_models::LayoutSettings;

    use super::*;

    fn config() -> ExpressionValidationConfig {
        parse_validation_config(&json!({
            "validations": {
                "Persons.Age": [
                    {
                        "condition": ["lessThan", ["argv", 0], 18],
                        "message": "validation.too_young",
                        "severity": "warning"
                    },
                    {
                        "condition": ["equals", ["argv", 0], null],
                        "message": "validation.age_missing",
                        "showImmediately": true
                    }
                ]
            }
        }))
        .unwrap()
    }

    fn setup(data: Value) -> (NodeTree, AppContext, FormData) {
        let (set, _) = parse_layout_set(&json!({
            "Form": { "data": { "layout": [
                {
                    "id": "people", "type": "Group", "maxCount": 99,
                    "dataModelBindings": { "group": "Persons" },
                    "children": ["age"]
                },
                { "id": "age", "type": "Input",
                  "dataModelBindings": { "simpleBinding": "Persons.Age" } }
            ] } }
        }));
        let lookups = LayoutLookups::build(set, &ComponentRegistry::standard());
        let ctx = AppContext::new("org", "app", "form").with_default_data_type("model");
        let form = FormData::new().with_model("model", data);
        let (tree, _) = generate_tree(&lookups, &LayoutSettings::default(), &ctx, &form);
        (tree, ctx, form)
    }

    #[test]
    fn each_row_is_validated_with_its_own_value() {
        let (tree, ctx, form) = setup(json!({ "Persons": [
            { "Age": 12 }, { "Age": 40 }, {}
        ] }));
        let issues = validate_expressions(&config(), &tree, &ctx, &form, "model");

        let fields: Vec<_> = issues
            .iter()
            .map(|i| (i.field.as_ref().unwrap().field.as_str(), i.message.key.as_str()))
            .collect();
        assert_eq!(
            fields,
            [
                ("Persons[0].Age", "validation.too_young"),
                ("Persons[2].Age", "validation.age_missing"),
            ]
        );
        assert_eq!(issues[0].severity, Severity::Warning);
        assert_eq!(issues[0].category, ValidationMask::EXPRESSION);
        assert!(issues[1].category.is_empty());
    }

    #[test]
    fn malformed_rules_fail_the_whole_config() {
        let err = parse_validation_config(&json!({
            "validations": { "A": [{ "message": "m" }] }
        }))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MalformedRule { .. }));

        let err = parse_validation_config(&json!({
            "validations": { "A": [{ "condition": ["nope"], "message": "m" }] }
        }))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCondition { .. }));
    }
}
