use std::collections::BTreeMap;

use skjema_data::DataModelReference;
use skjema_data::FieldPath;
use skjema_data::FormData;
use skjema_expr::evaluate_with_default;
use skjema_expr::EvalNode;
use skjema_expr::ExprContext;
use skjema_expr::ExpressionDataSources;
use skjema_expr::ExprValue;
use skjema_models::ComponentDecl;
use skjema_models::Dynamic;
use skjema_models::LayoutSettings;

use crate::lookups::HierarchyIssue;
use crate::lookups::LayoutLookups;
use crate::sources::AppContext;
use crate::sources::TreeDataSources;
use crate::tree::Node;
use crate::tree::NodeId;
use crate::tree::NodeTree;
use crate::tree::PageEntry;
use crate::tree::ResolvedItem;

/// Generates the full tree for one data snapshot: materializes the
/// structure, then resolves every dynamic property.
#[must_use]
pub fn generate_tree(
    lookups: &LayoutLookups,
    settings: &LayoutSettings,
    ctx: &AppContext,
    data: &FormData,
) -> (NodeTree, Vec<HierarchyIssue>) {
    let (mut tree, issues) = materialize(lookups, settings, data, ctx.default_data_type.as_deref());
    resolve(&mut tree, lookups, ctx, data);
    (tree, issues)
}

/// Stage 2 of hierarchy generation: builds the node arena from the claim
/// edges, expanding repeating groups into one subtree per data row.
///
/// An error on one component yields a diagnostic and no node; siblings
/// and the rest of the page are unaffected.
#[must_use]
pub fn materialize(
    lookups: &LayoutLookups,
    settings: &LayoutSettings,
    data: &FormData,
    default_data_type: Option<&str>,
) -> (NodeTree, Vec<HierarchyIssue>) {
    let mut m = Materializer {
        lookups,
        data,
        default_data_type,
        tree: NodeTree::new(),
        issues: Vec::new(),
    };

    for page_name in page_order(lookups, settings) {
        let navigable = settings.pages.order.iter().any(|n| *n == page_name)
            || settings.pages.pdf_layout_name.as_deref() == Some(page_name.as_str());
        let mut top_level = Vec::new();
        for decl in lookups.top_level(&page_name) {
            if let Some(id) = m.add(decl, &page_name, None, &[], None, None) {
                top_level.push(id);
            }
        }
        m.tree.push_page(PageEntry {
            name: page_name,
            navigable,
            hidden: false,
            top_level,
        });
    }

    (m.tree, m.issues)
}

/// Pages in display order, then any page the settings omit.
fn page_order(lookups: &LayoutLookups, settings: &LayoutSettings) -> Vec<String> {
    let set = lookups.layout_set();
    let mut order: Vec<String> = settings
        .pages
        .order
        .iter()
        .filter(|name| set.page(name).is_some())
        .cloned()
        .collect();
    for name in set.pages.keys() {
        if !order.contains(name) {
            order.push(name.clone());
        }
    }
    order
}

/// A concrete repeating-group row: the reference addressing it and its
/// parsed path, kept together to avoid reparsing per descendant.
struct RowLocation {
    reference: DataModelReference,
    path: FieldPath,
}

struct Materializer<'a> {
    lookups: &'a LayoutLookups,
    data: &'a FormData,
    default_data_type: Option<&'a str>,
    tree: NodeTree,
    issues: Vec<HierarchyIssue>,
}

impl Materializer<'_> {
    fn add(
        &mut self,
        decl: &ComponentDecl,
        page: &str,
        parent: Option<NodeId>,
        row_indices: &[usize],
        row_index: Option<usize>,
        location: Option<&RowLocation>,
    ) -> Option<NodeId> {
        let bindings = match self.resolve_bindings(decl, location) {
            Ok(bindings) => bindings,
            Err(message) => {
                tracing::warn!(page, component = %decl.id, "{message}");
                self.issues
                    .push(HierarchyIssue::error(page, decl.id.clone(), message));
                return None;
            }
        };

        let mut indexed_id = decl.id.clone();
        for index in row_indices {
            indexed_id.push_str(&format!("-{index}"));
        }

        let mut item = ResolvedItem::new(decl.component_type);
        item.bindings = bindings;
        item.show_validations = decl.show_validations.clone();

        let id = self.tree.push_node(Node {
            base_id: decl.id.clone(),
            indexed_id,
            page: page.to_string(),
            parent,
            children: Vec::new(),
            row_index,
            data_model_location: location.map(|loc| loc.reference.clone()),
            item,
        });

        let children = if decl.is_repeating() {
            self.repeating_children(decl, page, id, row_indices)
        } else {
            self.static_children(decl, page, id, row_indices, row_index, location)
        };
        self.tree.node_mut(id).children = children;
        Some(id)
    }

    fn static_children(
        &mut self,
        decl: &ComponentDecl,
        page: &str,
        parent: NodeId,
        row_indices: &[usize],
        row_index: Option<usize>,
        location: Option<&RowLocation>,
    ) -> Vec<NodeId> {
        let mut children = Vec::new();
        for child_id in self.lookups.claimed_children(&decl.id).to_vec() {
            let Some(child) = self.lookups.component(&child_id) else {
                continue;
            };
            if let Some(id) = self.add(child, page, Some(parent), row_indices, row_index, location) {
                children.push(id);
            }
        }
        children
    }

    fn repeating_children(
        &mut self,
        decl: &ComponentDecl,
        page: &str,
        parent: NodeId,
        row_indices: &[usize],
    ) -> Vec<NodeId> {
        let group_ref = self
            .tree
            .node(parent)
            .item
            .bindings
            .get(ComponentDecl::GROUP_BINDING)
            .cloned();
        let Some(group_ref) = group_ref else {
            return Vec::new();
        };
        let group_path = match group_ref.parsed_field() {
            Ok(path) => path,
            Err(err) => {
                self.issues.push(HierarchyIssue::error(
                    page,
                    decl.id.clone(),
                    format!("invalid group binding '{}': {err}", group_ref.field),
                ));
                return Vec::new();
            }
        };

        let row_count = self.data.row_count(&group_ref).unwrap_or(0);
        let mut children = Vec::new();
        for row in 0..row_count {
            let row_path = group_path.with_trailing_index(row);
            let row_location = RowLocation {
                reference: DataModelReference::new(group_ref.data_type.clone(), row_path.to_string()),
                path: row_path,
            };
            let mut child_indices = row_indices.to_vec();
            child_indices.push(row);
            for child_id in self.lookups.claimed_children(&decl.id).to_vec() {
                let Some(child) = self.lookups.component(&child_id) else {
                    continue;
                };
                if let Some(id) = self.add(
                    child,
                    page,
                    Some(parent),
                    &child_indices,
                    Some(row),
                    Some(&row_location),
                ) {
                    children.push(id);
                }
            }
        }
        children
    }

    /// Resolves every declared binding to a concrete reference in the
    /// node's row context.
    fn resolve_bindings(
        &self,
        decl: &ComponentDecl,
        location: Option<&RowLocation>,
    ) -> Result<BTreeMap<String, DataModelReference>, String> {
        let mut bindings = BTreeMap::new();
        for (key, binding) in &decl.data_model_bindings {
            let resolved = match self.default_data_type {
                Some(default) => binding.resolve(default),
                None => match binding {
                    skjema_models::BindingRef::Reference(reference) => reference.clone(),
                    skjema_models::BindingRef::Field(field) => {
                        return Err(format!(
                            "binding '{key}' = '{field}' needs a default data type"
                        ));
                    }
                },
            };
            let reference = match location {
                Some(loc) if loc.reference.data_type == resolved.data_type => {
                    let path = resolved
                        .parsed_field()
                        .map_err(|err| format!("invalid binding '{key}': {err}"))?;
                    DataModelReference::new(
                        resolved.data_type.clone(),
                        path.transpose(&loc.path).to_string(),
                    )
                }
                _ => resolved,
            };
            bindings.insert(key.clone(), reference);
        }
        Ok(bindings)
    }
}

/// Resolution pass: evaluates page `hidden` expressions and every
/// dynamic property of every node, in document order, against the tree
/// as resolved so far.
pub fn resolve(tree: &mut NodeTree, lookups: &LayoutLookups, ctx: &AppContext, data: &FormData) {
    let page_names: Vec<String> = tree.pages().iter().map(|p| p.name.clone()).collect();
    for name in page_names {
        let hidden = {
            let Some(expr) = lookups.layout_set().page(&name).and_then(|p| p.hidden.as_ref())
            else {
                continue;
            };
            let sources = TreeDataSources::new(data, tree, ctx);
            let node = EvalNode::for_page(&name);
            let eval = ExprContext::new(&sources, &node);
            as_bool(evaluate_with_default(expr, &eval, ExprValue::Bool(false)))
        };
        if let Some(page) = tree.page_mut(&name) {
            page.hidden = hidden;
        }
    }

    let ids: Vec<NodeId> = tree.flat().collect();
    for id in ids {
        let props = {
            let node = tree.node(id);
            let Some(decl) = lookups.component(&node.base_id) else {
                continue;
            };
            let sources = TreeDataSources::new(data, tree, ctx);
            resolve_props(decl, node.eval_node(), &sources)
        };
        let item = &mut tree.node_mut(id).item;
        item.hidden = props.hidden;
        item.required = props.required;
        item.read_only = props.read_only;
        item.texts = props.texts;
    }
}

struct ResolvedProps {
    hidden: bool,
    required: bool,
    read_only: bool,
    texts: BTreeMap<String, String>,
}

fn resolve_props(
    decl: &ComponentDecl,
    node: EvalNode,
    sources: &dyn ExpressionDataSources,
) -> ResolvedProps {
    let eval = ExprContext::new(sources, &node);
    let mut texts = BTreeMap::new();
    for (key, dynamic) in &decl.text_resource_bindings {
        let raw = match dynamic {
            Dynamic::Literal(text) => text.clone(),
            Dynamic::Expr(expr) => evaluate_with_default(expr, &eval, ExprValue::Null)
                .as_string()
                .unwrap_or_default(),
        };
        // Binding values are text resource keys; an unknown key is shown
        // verbatim.
        let resolved = sources.text_resource(&raw).unwrap_or(raw);
        texts.insert(key.clone(), resolved);
    }
    ResolvedProps {
        hidden: resolve_bool(&decl.hidden, &eval),
        required: resolve_bool(&decl.required, &eval),
        read_only: resolve_bool(&decl.read_only, &eval),
        texts,
    }
}

fn resolve_bool(dynamic: &Dynamic<bool>, eval: &ExprContext<'_>) -> bool {
    match dynamic {
        Dynamic::Literal(value) => *value,
        Dynamic::Expr(expr) => as_bool(evaluate_with_default(expr, eval, ExprValue::Bool(false))),
    }
}

fn as_bool(value: ExprValue) -> bool {
    value.as_bool().ok().flatten().unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use skjema_models::parse_layout_set;
    use skjema_models::ComponentRegistry;

    use super::*;

    fn persons_lookups() -> LayoutLookups {
        let (set, issues) = parse_layout_set(&json!({
            "Form": { "data": { "layout": [
                {
                    "id": "people", "type": "Group", "maxCount": 99,
                    "dataModelBindings": { "group": "Persons" },
                    "children": ["name", "age"]
                },
                { "id": "name", "type": "Input", "required": true,
                  "dataModelBindings": { "simpleBinding": "Persons.Name" } },
                { "id": "age", "type": "Input",
                  "hidden": ["equals", ["dataModel", "Persons.Name"], "Hidden"],
                  "dataModelBindings": { "simpleBinding": "Persons.Age" } },
                { "id": "title", "type": "Header",
                  "textResourceBindings": { "title": "form.title" } }
            ] } }
        }));
        assert!(issues.is_empty());
        LayoutLookups::build(set, &ComponentRegistry::standard())
    }

    fn persons_data() -> FormData {
        FormData::new().with_model(
            "model",
            json!({ "Persons": [
                { "Name": "Alice", "Age": 40 },
                { "Name": "Hidden", "Age": 41 }
            ] }),
        )
    }

    fn ctx() -> AppContext {
        AppContext::new("org", "app", "form")
            .with_default_data_type("model")
            .with_text("form.title", "Registration")
    }

    fn generate() -> (NodeTree, Vec<HierarchyIssue>) {
        generate_tree(
            &persons_lookups(),
            &LayoutSettings::default(),
            &ctx(),
            &persons_data(),
        )
    }

    #[test]
    fn rows_expand_with_indexed_ids_and_rewritten_bindings() {
        let (tree, issues) = generate();
        assert!(issues.is_empty());

        let name_1 = tree.find_by_indexed_id("name-1").unwrap();
        let node = tree.node(name_1);
        assert_eq!(node.base_id, "name");
        assert_eq!(node.row_index, Some(1));
        assert_eq!(
            node.item.simple_binding().unwrap().field,
            "Persons[1].Name"
        );
        assert_eq!(
            node.data_model_location.as_ref().unwrap().field,
            "Persons[1]"
        );

        let group = tree.find_by_indexed_id("people").unwrap();
        let children: Vec<_> = tree
            .children(group)
            .iter()
            .map(|&id| tree.node(id).indexed_id.clone())
            .collect();
        assert_eq!(children, ["name-0", "age-0", "name-1", "age-1"]);
    }

    #[test]
    fn flat_iteration_follows_document_order() {
        let (tree, _) = generate();
        let order = tree
            .flat()
            .map(|id| tree.node(id).indexed_id.clone())
            .collect::<Vec<_>>()
            .join("\n");
        insta::assert_snapshot!(order, @r"
        people
        name-0
        age-0
        name-1
        age-1
        title
        ");
    }

    #[test]
    fn dynamic_props_resolve_per_row() {
        let (tree, _) = generate();
        // Row 1 has Name == "Hidden"; its age field hides, row 0 does not.
        let age_0 = tree.find_by_indexed_id("age-0").unwrap();
        let age_1 = tree.find_by_indexed_id("age-1").unwrap();
        assert!(!tree.is_hidden(age_0));
        assert!(tree.is_hidden(age_1));

        let name_0 = tree.find_by_indexed_id("name-0").unwrap();
        assert!(tree.node(name_0).item.required);
    }

    #[test]
    fn text_bindings_resolve_through_text_resources() {
        let (tree, _) = generate();
        let title = tree.find_by_indexed_id("title").unwrap();
        assert_eq!(
            tree.node(title).item.texts.get("title").map(String::as_str),
            Some("Registration")
        );
    }

    #[test]
    fn pages_missing_from_the_order_are_not_navigable() {
        let settings: LayoutSettings =
            serde_json::from_value(json!({ "pages": { "order": ["Other"] } })).unwrap();
        let (tree, _) = generate_tree(&persons_lookups(), &settings, &ctx(), &persons_data());
        let page = tree.page("Form").unwrap();
        assert!(!page.navigable);
        assert!(!page.top_level.is_empty());
    }

    #[test]
    fn a_failing_component_does_not_take_its_siblings() {
        let (set, _) = parse_layout_set(&json!({
            "Form": { "data": { "layout": [
                { "id": "bare", "type": "Input",
                  "dataModelBindings": { "simpleBinding": "Field" } },
                { "id": "ok", "type": "Header" }
            ] } }
        }));
        let lookups = LayoutLookups::build(set, &ComponentRegistry::standard());
        // No default data type: the bare binding cannot resolve.
        let ctx = AppContext::new("org", "app", "form");
        let (tree, issues) =
            generate_tree(&lookups, &LayoutSettings::default(), &ctx, &FormData::new());
        assert!(tree.find_by_indexed_id("bare").is_none());
        assert!(tree.find_by_indexed_id("ok").is_some());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].component_id.as_deref(), Some("bare"));
    }

    #[test]
    fn empty_group_data_yields_no_rows() {
        let data = FormData::new().with_model("model", json!({ "Persons": [] }));
        let (tree, issues) = generate_tree(
            &persons_lookups(),
            &LayoutSettings::default(),
            &ctx(),
            &data,
        );
        assert!(issues.is_empty());
        let group = tree.find_by_indexed_id("people").unwrap();
        assert!(tree.children(group).is_empty());
    }
}
