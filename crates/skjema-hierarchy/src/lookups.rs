use rustc_hash::FxHashMap;
use skjema_models::ComponentDecl;
use skjema_models::ComponentRegistry;
use skjema_models::ComponentType;
use skjema_models::ContainerKind;
use skjema_models::LayoutSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IssueSeverity {
    Warning,
    Error,
}

/// A configuration problem found while indexing or materializing a
/// layout. Never fatal; the offending piece is skipped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HierarchyIssue {
    pub severity: IssueSeverity,
    pub page: Option<String>,
    pub component_id: Option<String>,
    pub message: String,
}

impl HierarchyIssue {
    pub(crate) fn error(
        page: impl Into<String>,
        component_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: IssueSeverity::Error,
            page: Some(page.into()),
            component_id: Some(component_id.into()),
            message: message.into(),
        }
    }

    pub(crate) fn warning(
        page: impl Into<String>,
        component_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: IssueSeverity::Warning,
            page: Some(page.into()),
            component_id: Some(component_id.into()),
            message: message.into(),
        }
    }
}

/// Precomputed indexes over a layout set: declaration by id, page
/// membership, and the claim edges that define the hierarchy.
///
/// Claims are resolved first-claim-wins, in declaration order within a
/// page and page order across pages. A second claim on the same child is
/// a configuration error, not a tie to break at materialization time.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutLookups {
    set: LayoutSet,
    component_pages: FxHashMap<String, String>,
    claims: FxHashMap<String, Vec<String>>,
    claimed_by: FxHashMap<String, String>,
    issues: Vec<HierarchyIssue>,
}

impl LayoutLookups {
    #[must_use]
    pub fn build(set: LayoutSet, registry: &ComponentRegistry) -> Self {
        let mut component_pages = FxHashMap::default();
        let mut issues = Vec::new();

        for page in set.pages.values() {
            for decl in &page.components {
                if let Some(first_page) = component_pages.get(&decl.id) {
                    issues.push(HierarchyIssue::error(
                        page.name.clone(),
                        decl.id.clone(),
                        format!("duplicate component id, first declared on page '{first_page}'"),
                    ));
                } else {
                    component_pages.insert(decl.id.clone(), page.name.clone());
                }
            }
        }

        let mut claims: FxHashMap<String, Vec<String>> = FxHashMap::default();
        let mut claimed_by: FxHashMap<String, String> = FxHashMap::default();

        for page in set.pages.values() {
            for decl in &page.components {
                if registry.container_kind(decl.component_type) == ContainerKind::None {
                    continue;
                }
                // Duplicates never claim; only the winning declaration's
                // page matters.
                if component_pages.get(&decl.id) != Some(&page.name) {
                    continue;
                }
                let mut accepted = Vec::new();
                for child_id in decl.claimed_child_ids() {
                    if child_id == decl.id {
                        issues.push(HierarchyIssue::error(
                            page.name.clone(),
                            decl.id.clone(),
                            "container claims itself",
                        ));
                        continue;
                    }
                    let Some(child) = find_component(&set, &component_pages, child_id) else {
                        issues.push(HierarchyIssue::error(
                            page.name.clone(),
                            decl.id.clone(),
                            format!("claimed child '{child_id}' does not exist"),
                        ));
                        continue;
                    };
                    if let Some(prior) = claimed_by.get(child_id) {
                        issues.push(HierarchyIssue::error(
                            page.name.clone(),
                            decl.id.clone(),
                            format!("child '{child_id}' is already claimed by '{prior}'"),
                        ));
                        continue;
                    }
                    if !claimable(decl.component_type, child.component_type) {
                        issues.push(HierarchyIssue::warning(
                            page.name.clone(),
                            decl.id.clone(),
                            format!(
                                "child '{child_id}' of type {:?} cannot be rendered inside {:?}",
                                child.component_type, decl.component_type
                            ),
                        ));
                        continue;
                    }
                    claimed_by.insert(child_id.to_string(), decl.id.clone());
                    accepted.push(child_id.to_string());
                }
                claims.insert(decl.id.clone(), accepted);
            }
        }

        Self {
            set,
            component_pages,
            claims,
            claimed_by,
            issues,
        }
    }

    #[must_use]
    pub fn layout_set(&self) -> &LayoutSet {
        &self.set
    }

    #[must_use]
    pub fn component(&self, base_id: &str) -> Option<&ComponentDecl> {
        find_component(&self.set, &self.component_pages, base_id)
    }

    #[must_use]
    pub fn page_of(&self, base_id: &str) -> Option<&str> {
        self.component_pages.get(base_id).map(String::as_str)
    }

    /// Accepted child claims of a container, in claim order.
    #[must_use]
    pub fn claimed_children(&self, base_id: &str) -> &[String] {
        self.claims.get(base_id).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn parent_of(&self, base_id: &str) -> Option<&str> {
        self.claimed_by.get(base_id).map(String::as_str)
    }

    #[must_use]
    pub fn is_claimed(&self, base_id: &str) -> bool {
        self.claimed_by.contains_key(base_id)
    }

    /// Repeating-group ancestors of a component, outermost first. The
    /// component's own repetition does not count.
    #[must_use]
    pub fn repeating_ancestors(&self, base_id: &str) -> Vec<&ComponentDecl> {
        let mut chain = Vec::new();
        let mut current = self.parent_of(base_id);
        while let Some(parent_id) = current {
            if let Some(parent) = self.component(parent_id) {
                if parent.is_repeating() {
                    chain.push(parent);
                }
            }
            current = self.parent_of(parent_id);
        }
        chain.reverse();
        chain
    }

    /// Components of a page that no container claimed, in declaration
    /// order.
    #[must_use]
    pub fn top_level(&self, page_name: &str) -> Vec<&ComponentDecl> {
        self.set.page(page_name).map_or_else(Vec::new, |page| {
            page.components
                .iter()
                .filter(|decl| {
                    !self.is_claimed(&decl.id)
                        && self.component_pages.get(&decl.id) == Some(&page.name)
                })
                .collect()
        })
    }

    #[must_use]
    pub fn issues(&self) -> &[HierarchyIssue] {
        &self.issues
    }
}

fn find_component<'a>(
    set: &'a LayoutSet,
    component_pages: &FxHashMap<String, String>,
    base_id: &str,
) -> Option<&'a ComponentDecl> {
    let page = set.page(component_pages.get(base_id)?)?;
    page.components.iter().find(|decl| decl.id == base_id)
}

fn claimable(parent: ComponentType, child: ComponentType) -> bool {
    match parent {
        // Navigation chrome only makes sense at page level.
        ComponentType::Cards | ComponentType::Tabs => !matches!(
            child,
            ComponentType::NavigationButtons | ComponentType::NavigationBar
        ),
        _ => true,
    }
}
