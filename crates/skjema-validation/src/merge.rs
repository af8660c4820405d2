//! Merging issues across sources and deciding what each node shows.

use std::collections::BTreeMap;

use skjema_data::DataModelReference;
use skjema_hierarchy::Node;
use skjema_hierarchy::NodeId;
use skjema_hierarchy::NodeTree;
use skjema_models::ComponentRegistry;
use skjema_models::ValidationFilterInput;

use crate::issue::ValidationIssue;
use crate::issue::ValidationMask;

/// All current issues, grouped by producing source. Updating one source
/// replaces only that source's group; sources never overwrite each
/// other.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationGroups {
    groups: BTreeMap<String, Vec<ValidationIssue>>,
}

impl ValidationGroups {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_source(&mut self, source: impl Into<String>, issues: Vec<ValidationIssue>) {
        self.groups.insert(source.into(), issues);
    }

    /// Every issue across sources, in stable source order.
    pub fn all(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.groups.values().flatten()
    }

    /// Issues addressed to one field, across sources.
    pub fn for_field<'a>(
        &'a self,
        field: &'a DataModelReference,
    ) -> impl Iterator<Item = &'a ValidationIssue> {
        self.all()
            .filter(move |issue| issue.field.as_ref() == Some(field))
    }

    /// Issues addressed to any field a node owns, after the node's
    /// registry filters.
    #[must_use]
    pub fn for_node<'a>(
        &'a self,
        tree: &NodeTree,
        node_id: NodeId,
        registry: &ComponentRegistry,
    ) -> Vec<&'a ValidationIssue> {
        let node = tree.node(node_id);
        self.all()
            .filter(|issue| owns_field(node, issue))
            .filter(|issue| keeps(registry, node, issue))
            .collect()
    }

    /// The node's visible issues under its current mask.
    #[must_use]
    pub fn visible_for_node<'a>(
        &'a self,
        tree: &NodeTree,
        node_id: NodeId,
        registry: &ComponentRegistry,
        base_mask: ValidationMask,
    ) -> Vec<&'a ValidationIssue> {
        let mask = effective_mask(tree.node(node_id), base_mask);
        self.for_node(tree, node_id, registry)
            .into_iter()
            .filter(|issue| is_visible(issue, mask))
            .collect()
    }

    /// Whether any node would show an error under `mask`. Drives the
    /// submit gate.
    #[must_use]
    pub fn has_errors(
        &self,
        tree: &NodeTree,
        registry: &ComponentRegistry,
        base_mask: ValidationMask,
    ) -> bool {
        tree.flat().any(|node_id| {
            self.visible_for_node(tree, node_id, registry, base_mask)
                .iter()
                .any(|issue| issue.is_error())
        })
    }

    /// Every (node, error) pair in document order, for the error summary.
    #[must_use]
    pub fn error_summary<'a>(
        &'a self,
        tree: &NodeTree,
        registry: &ComponentRegistry,
        base_mask: ValidationMask,
    ) -> Vec<(NodeId, &'a ValidationIssue)> {
        let mut out = Vec::new();
        for node_id in tree.flat() {
            for issue in self.visible_for_node(tree, node_id, registry, base_mask) {
                if issue.is_error() {
                    out.push((node_id, issue));
                }
            }
        }
        out
    }
}

fn owns_field(node: &Node, issue: &ValidationIssue) -> bool {
    let Some(field) = &issue.field else {
        return false;
    };
    node.item
        .bindings
        .values()
        .any(|binding| binding.data_type == field.data_type && binding.field == field.field)
}

fn keeps(registry: &ComponentRegistry, node: &Node, issue: &ValidationIssue) -> bool {
    registry
        .capabilities(node.item.component_type)
        .is_none_or(|caps| {
            caps.keeps_issue(&ValidationFilterInput {
                text_key: &issue.message.key,
                keyword: issue.keyword.as_deref(),
            })
        })
}

/// An unmaskable issue (empty category) is always visible.
fn is_visible(issue: &ValidationIssue, mask: ValidationMask) -> bool {
    issue.category.is_empty() || mask.intersects(issue.category)
}

/// A component's `showValidations` replaces the ambient mask outright;
/// it can both widen (show required early) and narrow it.
fn effective_mask(node: &Node, base: ValidationMask) -> ValidationMask {
    match &node.item.show_validations {
        None => base,
        Some(names) => names
            .iter()
            .filter_map(|name| ValidationMask::from_setting_name(name))
            .fold(ValidationMask::empty(), |acc, mask| acc | mask),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use skjema_data::DataModelReference;
    use skjema_hierarchy::generate_tree;
    use skjema_hierarchy::AppContext;
    use skjema_hierarchy::LayoutLookups;
    use skjema_models::parse_layout_set;
    use skjema_models::LayoutSettings;

    use super::*;
    use crate::issue::Message;
    use crate::issue::Severity;
    use crate::source;

    fn tree() -> NodeTree {
        let (set, _) = parse_layout_set(&json!({
            "Form": { "data": { "layout": [
                { "id": "name", "type": "Input", "required": true,
                  "dataModelBindings": { "simpleBinding": "Name" } },
                { "id": "eager", "type": "Input", "showValidations": ["Required", "Schema"],
                  "dataModelBindings": { "simpleBinding": "Name" } }
            ] } }
        }));
        let lookups = LayoutLookups::build(set, &ComponentRegistry::standard());
        let ctx = AppContext::new("org", "app", "form").with_default_data_type("model");
        let data = skjema_data::FormData::new().with_model("model", json!({ "Name": "" }));
        let (tree, _) = generate_tree(&lookups, &LayoutSettings::default(), &ctx, &data);
        tree
    }

    fn required_issue() -> ValidationIssue {
        ValidationIssue::new(
            source::REQUIRED,
            ValidationMask::REQUIRED,
            Severity::Error,
            Message::new("form_filler.error_required"),
        )
        .with_field(DataModelReference::new("model", "Name"))
    }

    #[test]
    fn sources_merge_without_overwriting_each_other() {
        let mut groups = ValidationGroups::new();
        groups.set_source(source::REQUIRED, vec![required_issue()]);
        groups.set_source(source::SCHEMA, vec![required_issue()]);
        assert_eq!(groups.all().count(), 2);
        groups.set_source(source::SCHEMA, Vec::new());
        assert_eq!(groups.all().count(), 1);
    }

    #[test]
    fn required_issues_hide_behind_the_default_mask() {
        let tree = tree();
        let registry = ComponentRegistry::standard();
        let mut groups = ValidationGroups::new();
        groups.set_source(source::REQUIRED, vec![required_issue()]);

        let name = tree.find_by_indexed_id("name").unwrap();
        assert!(groups
            .visible_for_node(&tree, name, &registry, ValidationMask::default_visible())
            .is_empty());
        assert_eq!(
            groups
                .visible_for_node(&tree, name, &registry, ValidationMask::all())
                .len(),
            1
        );
    }

    #[test]
    fn show_validations_overrides_the_ambient_mask() {
        let tree = tree();
        let registry = ComponentRegistry::standard();
        let mut groups = ValidationGroups::new();
        groups.set_source(source::REQUIRED, vec![required_issue()]);

        // The eager component opts into required issues before touch.
        let eager = tree.find_by_indexed_id("eager").unwrap();
        assert_eq!(
            groups
                .visible_for_node(&tree, eager, &registry, ValidationMask::default_visible())
                .len(),
            1
        );
    }

    #[test]
    fn error_summary_walks_document_order() {
        let tree = tree();
        let registry = ComponentRegistry::standard();
        let mut groups = ValidationGroups::new();
        groups.set_source(source::REQUIRED, vec![required_issue()]);

        let summary = groups.error_summary(&tree, &registry, ValidationMask::all());
        let ids: Vec<_> = summary
            .iter()
            .map(|(id, _)| tree.node(*id).indexed_id.as_str())
            .collect();
        assert_eq!(ids, ["name", "eager"]);
        assert!(groups.has_errors(&tree, &registry, ValidationMask::all()));
    }
}
