use std::sync::Arc;

use salsa::Accumulator;
use serde_json::Value;
use skjema_data::FormData;
use skjema_hierarchy::generate_tree;
use skjema_hierarchy::IssueSeverity;
use skjema_hierarchy::LayoutLookups;
use skjema_hierarchy::NodeTree;
use skjema_models::apply_quirks;
use skjema_models::parse_layout_set;
use skjema_models::LayoutSettings;
use skjema_validation::source;
use skjema_validation::validate_against_schema;
use skjema_validation::validate_empty_fields;
use skjema_validation::validate_expressions;
use skjema_validation::ValidationGroups;

use crate::db::Db;
use crate::db::Diagnostic;
use crate::db::EngineDiagnostic;
use crate::inputs::FormDataSource;
use crate::inputs::LayoutSource;
use crate::inputs::SchemaSource;

/// Parses the layout set, applies any registered quirk, and builds the
/// claim lookups. Configuration errors accumulate as diagnostics.
#[salsa::tracked]
pub fn parse_layouts(db: &dyn Db, source: LayoutSource) -> Arc<LayoutLookups> {
    let _ = source.revision(db);
    let ctx = db.app_context();

    let raw: Value = match serde_json::from_str(source.text(db)) {
        Ok(value) => value,
        Err(err) => {
            EngineDiagnostic(Diagnostic::error(
                "layout-parse",
                format!("layout set is not valid JSON: {err}"),
            ))
            .accumulate(db);
            Value::Object(serde_json::Map::new())
        }
    };
    let patched = apply_quirks(&raw, &ctx.org, &ctx.app, &ctx.layout_set_id);

    let (set, issues) = parse_layout_set(&patched);
    for issue in issues {
        let mut diagnostic = Diagnostic::error("layout-config", issue.message).on_page(issue.page);
        if let Some(component) = issue.component_id {
            diagnostic = diagnostic.on_component(component);
        }
        EngineDiagnostic(diagnostic).accumulate(db);
    }

    let lookups = LayoutLookups::build(set, &db.registry());
    for issue in lookups.issues() {
        accumulate_hierarchy_issue(db, "layout-config", issue);
    }
    Arc::new(lookups)
}

/// Parses the layout settings file; a malformed file degrades to the
/// defaults.
#[salsa::tracked]
pub fn layout_settings(db: &dyn Db, source: LayoutSource) -> Arc<LayoutSettings> {
    let _ = source.revision(db);
    let text = source.settings_text(db);
    if text.is_empty() {
        return Arc::new(LayoutSettings::default());
    }
    match serde_json::from_str(text) {
        Ok(settings) => Arc::new(settings),
        Err(err) => {
            EngineDiagnostic(Diagnostic::error(
                "settings-parse",
                format!("layout settings are not valid: {err}"),
            ))
            .accumulate(db);
            Arc::new(LayoutSettings::default())
        }
    }
}

/// Parses the form data snapshot into the default data type's model.
#[salsa::tracked]
pub fn parse_form_data(db: &dyn Db, source: FormDataSource) -> Arc<FormData> {
    let _ = source.revision(db);
    let ctx = db.app_context();
    let value: Value = match serde_json::from_str(source.text(db)) {
        Ok(value) => value,
        Err(err) => {
            EngineDiagnostic(Diagnostic::error(
                "form-data-parse",
                format!("form data is not valid JSON: {err}"),
            ))
            .accumulate(db);
            Value::Null
        }
    };
    let data_type = ctx.default_data_type.clone().unwrap_or_default();
    Arc::new(FormData::new().with_model(data_type, value))
}

/// Generates and resolves the node tree for the current inputs.
/// Memoized on the input revisions; fixed inputs produce an identical
/// tree.
#[salsa::tracked]
pub fn build_node_tree(db: &dyn Db, layouts: LayoutSource, data: FormDataSource) -> Arc<NodeTree> {
    let lookups = parse_layouts(db, layouts);
    let settings = layout_settings(db, layouts);
    let form = parse_form_data(db, data);
    let ctx = db.app_context();

    let (tree, issues) = generate_tree(&lookups, &settings, &ctx, &form);
    for issue in &issues {
        accumulate_hierarchy_issue(db, "hierarchy", issue);
    }
    Arc::new(tree)
}

/// Runs the three local validation sources against the completed tree.
/// Consuming the tree value (not the inputs) means expressions in
/// validation configs can never observe a partially built tree.
#[salsa::tracked]
pub fn validate(
    db: &dyn Db,
    layouts: LayoutSource,
    data: FormDataSource,
    schema: SchemaSource,
) -> Arc<ValidationGroups> {
    let tree = build_node_tree(db, layouts, data);
    let form = parse_form_data(db, data);
    let ctx = db.app_context();
    let data_type = schema.data_type(db).clone();

    let mut groups = ValidationGroups::new();

    let schema_issues = match serde_json::from_str::<Value>(schema.text(db)) {
        Ok(doc) => form
            .model(&data_type)
            .map(|model| validate_against_schema(model, &doc, &data_type))
            .unwrap_or_default(),
        Err(err) => {
            EngineDiagnostic(Diagnostic::error(
                "schema-parse",
                format!("schema for '{data_type}' is not valid JSON: {err}"),
            ))
            .accumulate(db);
            Vec::new()
        }
    };
    groups.set_source(source::SCHEMA, schema_issues);

    groups.set_source(
        source::EXPRESSION,
        validate_expressions(&db.validation_messages(), &tree, &ctx, &form, &data_type),
    );
    groups.set_source(
        source::REQUIRED,
        validate_empty_fields(&tree, &db.registry(), &form),
    );

    Arc::new(groups)
}

fn accumulate_hierarchy_issue(db: &dyn Db, code: &'static str, issue: &skjema_hierarchy::HierarchyIssue) {
    let mut diagnostic = match issue.severity {
        IssueSeverity::Error => Diagnostic::error(code, issue.message.clone()),
        IssueSeverity::Warning => Diagnostic::warning(code, issue.message.clone()),
    };
    if let Some(page) = &issue.page {
        diagnostic = diagnostic.on_page(page.clone());
    }
    if let Some(component) = &issue.component_id {
        diagnostic = diagnostic.on_component(component.clone());
    }
    EngineDiagnostic(diagnostic).accumulate(db);
}
