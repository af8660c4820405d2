use serde::Deserialize;

/// Page-level settings from the layout settings file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagesSettings {
    /// Display order of page names. Pages absent from the order are
    /// still part of the set but never navigated to.
    #[serde(default)]
    pub order: Vec<String>,
    /// When set, PDF rendering uses this dedicated page and skips all
    /// ordinary pages.
    #[serde(default)]
    pub pdf_layout_name: Option<String>,
    #[serde(default)]
    pub exclude_from_pdf: Vec<String>,
}

/// Component-level settings from the layout settings file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSettings {
    #[serde(default)]
    pub exclude_from_pdf: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSettings {
    #[serde(default)]
    pub pages: PagesSettings,
    #[serde(default)]
    pub components: ComponentSettings,
}

/// Returns a copy of `settings` with `page_name` added to the PDF
/// exclusion list. The input is left untouched; adding an already
/// excluded page is a no-op copy.
#[must_use]
pub fn exclude_page_from_pdf(settings: &LayoutSettings, page_name: &str) -> LayoutSettings {
    let mut updated = settings.clone();
    if !updated
        .pages
        .exclude_from_pdf
        .iter()
        .any(|name| name == page_name)
    {
        updated.pages.exclude_from_pdf.push(page_name.to_string());
    }
    updated
}

#[must_use]
pub fn page_excluded_from_pdf(settings: &LayoutSettings, page_name: &str) -> bool {
    if let Some(pdf_page) = &settings.pages.pdf_layout_name {
        return pdf_page != page_name;
    }
    settings
        .pages
        .exclude_from_pdf
        .iter()
        .any(|name| name == page_name)
}

#[must_use]
pub fn component_excluded_from_pdf(settings: &LayoutSettings, component_id: &str) -> bool {
    settings
        .components
        .exclude_from_pdf
        .iter()
        .any(|id| id == component_id)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn settings(value: serde_json::Value) -> LayoutSettings {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn explicit_exclusions_apply() {
        let settings = settings(json!({
            "pages": { "order": ["Form", "Summary"], "excludeFromPdf": ["Summary"] },
            "components": { "excludeFromPdf": ["submit"] }
        }));
        assert!(!page_excluded_from_pdf(&settings, "Form"));
        assert!(page_excluded_from_pdf(&settings, "Summary"));
        assert!(component_excluded_from_pdf(&settings, "submit"));
        assert!(!component_excluded_from_pdf(&settings, "name"));
    }

    #[test]
    fn excluding_a_page_returns_a_new_copy() {
        let before = settings(json!({
            "pages": { "order": ["Form", "Summary"], "excludeFromPdf": ["Summary"] }
        }));
        let after = exclude_page_from_pdf(&before, "Form");

        assert!(!page_excluded_from_pdf(&before, "Form"));
        assert!(page_excluded_from_pdf(&after, "Form"));
        assert_eq!(after.pages.exclude_from_pdf, ["Summary", "Form"]);

        // Excluding twice does not duplicate the entry.
        assert_eq!(exclude_page_from_pdf(&after, "Form"), after);
    }

    #[test]
    fn dedicated_pdf_page_excludes_everything_else() {
        let settings = settings(json!({
            "pages": { "order": ["Form"], "pdfLayoutName": "PdfPage" }
        }));
        assert!(page_excluded_from_pdf(&settings, "Form"));
        assert!(!page_excluded_from_pdf(&settings, "PdfPage"));
    }
}
