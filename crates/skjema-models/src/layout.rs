use std::collections::BTreeMap;

use serde_json::Value;
use skjema_expr::Expr;

use crate::components::ComponentDecl;

/// One parsed layout page: the ordered component declarations plus the
/// optional page-level `hidden` expression.
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    pub name: String,
    pub components: Vec<ComponentDecl>,
    pub hidden: Option<Expr>,
}

/// A full layout set, keyed by page name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutSet {
    pub pages: BTreeMap<String, Page>,
}

impl LayoutSet {
    #[must_use]
    pub fn page(&self, name: &str) -> Option<&Page> {
        self.pages.get(name)
    }

    pub fn components(&self) -> impl Iterator<Item = (&str, &ComponentDecl)> {
        self.pages
            .values()
            .flat_map(|page| page.components.iter().map(move |c| (page.name.as_str(), c)))
    }
}

/// A non-fatal problem found while loading a layout. Bad authoring
/// degrades the affected component or page, never the whole set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayoutIssue {
    pub page: String,
    pub component_id: Option<String>,
    pub message: String,
}

/// Parses the external layout-set JSON:
/// `{ [pageName]: { data: { layout: [...], hidden?: expr } } }`.
///
/// Each component is deserialized independently so one malformed
/// declaration is reported and skipped without taking the page down.
#[must_use]
pub fn parse_layout_set(raw: &Value) -> (LayoutSet, Vec<LayoutIssue>) {
    let mut pages = BTreeMap::new();
    let mut issues = Vec::new();

    let Some(entries) = raw.as_object() else {
        issues.push(LayoutIssue {
            page: String::new(),
            component_id: None,
            message: "layout set must be a JSON object keyed by page name".to_string(),
        });
        return (LayoutSet::default(), issues);
    };

    for (name, page_raw) in entries {
        let data = page_raw.get("data");
        let Some(layout) = data.and_then(|d| d.get("layout")).and_then(Value::as_array) else {
            issues.push(LayoutIssue {
                page: name.clone(),
                component_id: None,
                message: "page is missing 'data.layout'".to_string(),
            });
            continue;
        };

        let mut components = Vec::with_capacity(layout.len());
        for component_raw in layout {
            let id = component_raw
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string);
            match serde_json::from_value::<ComponentDecl>(component_raw.clone()) {
                Ok(decl) => components.push(decl),
                Err(err) => {
                    tracing::warn!(page = %name, component = ?id, error = %err, "skipping malformed component declaration");
                    issues.push(LayoutIssue {
                        page: name.clone(),
                        component_id: id,
                        message: err.to_string(),
                    });
                }
            }
        }

        let hidden = match data.and_then(|d| d.get("hidden")) {
            None | Some(Value::Null) => None,
            Some(raw_expr) => match Expr::parse(raw_expr) {
                Ok(expr) => Some(expr),
                Err(err) => {
                    issues.push(LayoutIssue {
                        page: name.clone(),
                        component_id: None,
                        message: format!("invalid page 'hidden' expression: {err}"),
                    });
                    None
                }
            },
        };

        pages.insert(
            name.clone(),
            Page {
                name: name.clone(),
                components,
                hidden,
            },
        );
    }

    (LayoutSet { pages }, issues)
}
