use serde_json::Value;
use skjema_data::FormData;
use skjema_hierarchy::NodeTree;
use skjema_models::ComponentDecl;
use skjema_models::ComponentRegistry;

use crate::issue::Message;
use crate::issue::Severity;
use crate::issue::ValidationIssue;
use crate::issue::ValidationMask;
use crate::source;

const DEFAULT_REQUIRED_KEY: &str = "form_filler.error_required";

/// Required-field validation: every visible node whose resolved
/// `required` is true and whose type participates must have a non-empty
/// value in each checked binding.
#[must_use]
pub fn validate_empty_fields(
    tree: &NodeTree,
    registry: &ComponentRegistry,
    data: &FormData,
) -> Vec<ValidationIssue> {
    let mut out = Vec::new();
    for node_id in tree.flat() {
        let node = tree.node(node_id);
        if !node.item.required || tree.is_hidden(node_id) {
            continue;
        }
        let Some(caps) = registry.capabilities(node.item.component_type) else {
            continue;
        };
        if !caps.runs_empty_field_validation() {
            continue;
        }

        let label = node
            .item
            .texts
            .get("shortName")
            .or_else(|| node.item.texts.get("title"))
            .cloned()
            .unwrap_or_else(|| node.base_id.clone());
        let key = node
            .item
            .texts
            .get("requiredValidation")
            .cloned()
            .unwrap_or_else(|| DEFAULT_REQUIRED_KEY.to_string());

        for (binding_key, reference) in &node.item.bindings {
            if binding_key == ComponentDecl::GROUP_BINDING {
                continue;
            }
            if caps.is_simple_binding_only() && binding_key != ComponentDecl::SIMPLE_BINDING {
                continue;
            }
            if !is_empty(data.pick(reference)) {
                continue;
            }
            out.push(
                ValidationIssue::new(
                    source::REQUIRED,
                    ValidationMask::REQUIRED,
                    Severity::Error,
                    Message::new(key.clone()).with_param(label.clone()),
                )
                .with_field(reference.clone()),
            );
        }
    }
    out
}

fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}
