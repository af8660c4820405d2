use std::sync::Arc;

use skjema_engine::Db;
use skjema_engine::DiagnosticSeverity;
use skjema_engine::FormEngine;
use skjema_hierarchy::AppContext;
use skjema_validation::BackendIssue;
use skjema_validation::ValidationMask;

const LAYOUTS: &str = r#"{
    "FormPage": {
        "data": {
            "layout": [
                {
                    "id": "persons",
                    "type": "Group",
                    "maxCount": 5,
                    "children": ["name"],
                    "dataModelBindings": { "group": "Persons" }
                },
                {
                    "id": "name",
                    "type": "Input",
                    "required": true,
                    "dataModelBindings": { "simpleBinding": "Persons.Name" },
                    "textResourceBindings": { "title": "person.name" }
                }
            ]
        }
    }
}"#;

const SCHEMA: &str = r#"{
    "type": "object",
    "properties": {
        "Persons": {
            "type": "array",
            "items": {
                "type": "object",
                "properties": {
                    "Name": { "type": "string", "minLength": 2 }
                }
            }
        }
    }
}"#;

fn context() -> AppContext {
    AppContext::new("digdir", "demo", "form")
        .with_default_data_type("model")
        .with_text("person.name", "Navn")
}

fn engine_with(data: &str) -> FormEngine {
    let mut engine = FormEngine::new(context());
    engine.set_layouts(LAYOUTS, "");
    engine.set_form_data(data);
    engine.set_schema("model", SCHEMA);
    engine
}

#[test]
fn repeating_group_expands_per_row() {
    let engine = engine_with(r#"{"Persons": [{"Name": "Ada"}, {"Name": ""}]}"#);
    let tree = engine.node_tree().unwrap();

    let first = tree.find_by_indexed_id("name-0").unwrap();
    let second = tree.find_by_indexed_id("name-1").unwrap();
    assert!(tree.find_by_indexed_id("name-2").is_none());

    let binding = tree.node(first).item.bindings["simpleBinding"].clone();
    assert_eq!(binding.field, "Persons[0].Name");
    let binding = tree.node(second).item.bindings["simpleBinding"].clone();
    assert_eq!(binding.field, "Persons[1].Name");
}

#[test]
fn required_errors_hide_until_the_mask_allows_them() {
    let engine = engine_with(r#"{"Persons": [{"Name": "Ada"}, {"Name": ""}]}"#);
    let tree = engine.node_tree().unwrap();
    let groups = engine.validation().unwrap();
    let registry = engine.registry();

    let missing = tree.find_by_indexed_id("name-1").unwrap();
    let all = groups.for_node(&tree, missing, &registry);
    assert!(all
        .iter()
        .any(|issue| issue.message.key == "form_filler.error_required"));

    let visible = groups.visible_for_node(&tree, missing, &registry, ValidationMask::default_visible());
    assert!(visible.is_empty());

    let visible = groups.visible_for_node(&tree, missing, &registry, ValidationMask::all());
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].message.params, vec!["Navn".to_string()]);

    assert!(!groups.has_errors(&tree, &registry, ValidationMask::default_visible()));
    assert!(groups.has_errors(&tree, &registry, ValidationMask::all()));
}

#[test]
fn schema_errors_address_the_offending_row() {
    let engine = engine_with(r#"{"Persons": [{"Name": "A"}, {"Name": "Grace"}]}"#);
    let tree = engine.node_tree().unwrap();
    let groups = engine.validation().unwrap();
    let registry = engine.registry();

    let short = tree.find_by_indexed_id("name-0").unwrap();
    let visible = groups.visible_for_node(&tree, short, &registry, ValidationMask::default_visible());
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].message.key, "validation_errors.minLength");

    let fine = tree.find_by_indexed_id("name-1").unwrap();
    assert!(groups
        .visible_for_node(&tree, fine, &registry, ValidationMask::default_visible())
        .is_empty());
}

#[test]
fn row_removal_rebuilds_tree_and_validation() {
    let mut engine = engine_with(r#"{"Persons": [{"Name": "Ada"}, {"Name": ""}]}"#);
    assert!(engine
        .validation()
        .unwrap()
        .all()
        .any(|issue| issue.message.key == "form_filler.error_required"));

    engine.set_form_data(r#"{"Persons": [{"Name": "Ada"}]}"#);
    let tree = engine.node_tree().unwrap();
    assert!(tree.find_by_indexed_id("name-0").is_some());
    assert!(tree.find_by_indexed_id("name-1").is_none());
    assert!(!engine
        .validation()
        .unwrap()
        .all()
        .any(|issue| issue.message.key == "form_filler.error_required"));
}

#[test]
fn deleting_the_first_row_shifts_ids_and_drops_stale_state() {
    let mut engine = engine_with(r#"{"Persons": [{"Name": ""}, {"Name": "Ada"}, {"Name": "Grace"}]}"#);
    let tree = engine.node_tree().unwrap();
    let empty = tree.find_by_indexed_id("name-0").unwrap();
    assert_eq!(tree.node(empty).item.bindings["simpleBinding"].field, "Persons[0].Name");
    assert!(engine
        .validation()
        .unwrap()
        .all()
        .any(|issue| issue.message.key == "form_filler.error_required"));

    // Dropping row 0 shifts the remaining rows down one index.
    engine.set_form_data(r#"{"Persons": [{"Name": "Ada"}, {"Name": "Grace"}]}"#);
    let tree = engine.node_tree().unwrap();
    let shifted = tree.find_by_indexed_id("name-0").unwrap();
    assert_eq!(tree.node(shifted).item.bindings["simpleBinding"].field, "Persons[0].Name");
    assert!(tree.find_by_indexed_id("name-1").is_some());
    assert!(tree.find_by_indexed_id("name-2").is_none());

    // The error keyed to the removed row is gone, not retained under a
    // stale id.
    assert!(!engine
        .validation()
        .unwrap()
        .all()
        .any(|issue| issue.message.key == "form_filler.error_required"));
}

#[test]
fn unchanged_inputs_reuse_the_memoized_tree() {
    let engine = engine_with(r#"{"Persons": [{"Name": "Ada"}]}"#);
    let first = engine.node_tree().unwrap();
    let second = engine.node_tree().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn identical_inputs_produce_identical_trees() {
    let data = r#"{"Persons": [{"Name": "Ada"}, {"Name": "Grace"}]}"#;
    let a = engine_with(data);
    let b = engine_with(data);
    assert_eq!(*a.node_tree().unwrap(), *b.node_tree().unwrap());
}

#[test]
fn malformed_layout_degrades_with_a_diagnostic() {
    let mut engine = FormEngine::new(context());
    engine.set_layouts("{ not json", "");
    engine.set_form_data("{}");

    let tree = engine.node_tree().unwrap();
    assert!(tree.is_empty());

    let diagnostics = engine.diagnostics();
    assert!(diagnostics
        .iter()
        .any(|d| d.code == "layout-parse" && d.severity == DiagnosticSeverity::Error));
}

#[tokio::test]
async fn backend_issues_join_the_merged_view() {
    let fetch: skjema_validation::FetchFn = Arc::new(|_, _, _| {
        Box::pin(async {
            Ok(vec![
                BackendIssue {
                    field: Some("Persons[0].Name".to_string()),
                    data_element_id: None,
                    severity: 1,
                    source: "expression-validator".to_string(),
                    code: Some("name-taken".to_string()),
                    custom_text_key: None,
                },
                BackendIssue {
                    field: None,
                    data_element_id: None,
                    severity: 4,
                    source: "expression-validator".to_string(),
                    code: Some("was-fixed".to_string()),
                    custom_text_key: None,
                },
            ])
        })
    });

    let mut engine = FormEngine::new(context()).with_backend(fetch);
    engine.set_layouts(LAYOUTS, "");
    engine.set_form_data(r#"{"Persons": [{"Name": "Ada"}]}"#);
    engine.set_schema("model", SCHEMA);

    let before = engine.validation().unwrap();
    assert!(!before.all().any(|issue| issue.source == "expression-validator"));

    engine
        .refresh_backend_validation("instance-1", false)
        .await
        .unwrap();

    let after = engine.validation().unwrap();
    let backend: Vec<_> = after
        .all()
        .filter(|issue| issue.source == "expression-validator")
        .collect();
    assert_eq!(backend.len(), 1);
    assert_eq!(backend[0].message.key, "name-taken");

    let tree = engine.node_tree().unwrap();
    let registry = engine.registry();
    let node = tree.find_by_indexed_id("name-0").unwrap();
    let visible = after.visible_for_node(&tree, node, &registry, ValidationMask::default_visible());
    assert!(visible.iter().any(|issue| issue.message.key == "name-taken"));
}
