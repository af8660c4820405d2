use std::collections::BTreeMap;
use std::sync::Arc;

use salsa::Setter;
use skjema_data::FormData;
use skjema_hierarchy::AppContext;
use skjema_hierarchy::NodeTree;
use skjema_models::ComponentRegistry;
use skjema_validation::BackendValidation;
use skjema_validation::ExpressionValidationConfig;
use skjema_validation::FetchError;
use skjema_validation::FetchFn;
use skjema_validation::ValidationGroups;
use skjema_validation::ValidationIssue;

use crate::db::Db;
use crate::db::Diagnostic;
use crate::db::EngineDiagnostic;
use crate::inputs::FormDataSource;
use crate::inputs::LayoutSource;
use crate::inputs::SchemaSource;
use crate::queries::build_node_tree;
use crate::queries::parse_form_data;
use crate::queries::validate;

/// Concrete salsa database for one form instance.
///
/// Inputs are string snapshots; `set_*` replaces the text and bumps the
/// revision, and every read returns an `Arc` snapshot memoized on those
/// revisions. Backend validation state lives outside the database and
/// is merged into reads, so a fetch completing never invalidates the
/// local queries.
#[salsa::db]
#[derive(Clone)]
pub struct FormEngine {
    registry: Arc<ComponentRegistry>,
    context: Arc<AppContext>,
    messages: Arc<ExpressionValidationConfig>,
    backend: Option<Arc<BackendValidation>>,

    layouts: Option<LayoutSource>,
    form_data: Option<FormDataSource>,
    schema: Option<SchemaSource>,

    storage: salsa::Storage<Self>,
}

#[salsa::db]
impl salsa::Database for FormEngine {}

#[salsa::db]
impl Db for FormEngine {
    fn registry(&self) -> Arc<ComponentRegistry> {
        self.registry.clone()
    }

    fn app_context(&self) -> Arc<AppContext> {
        self.context.clone()
    }

    fn validation_messages(&self) -> Arc<ExpressionValidationConfig> {
        self.messages.clone()
    }
}

impl FormEngine {
    #[must_use]
    pub fn new(context: AppContext) -> Self {
        Self {
            registry: Arc::new(ComponentRegistry::standard()),
            context: Arc::new(context),
            messages: Arc::new(ExpressionValidationConfig::default()),
            backend: None,
            layouts: None,
            form_data: None,
            schema: None,
            storage: salsa::Storage::new(None),
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: ComponentRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    #[must_use]
    pub fn with_validation_messages(mut self, messages: ExpressionValidationConfig) -> Self {
        self.messages = Arc::new(messages);
        self
    }

    #[must_use]
    pub fn with_backend(mut self, fetch: FetchFn) -> Self {
        self.backend = Some(Arc::new(BackendValidation::new(fetch)));
        self
    }

    pub fn set_layouts(&mut self, text: impl Into<String>, settings_text: impl Into<String>) {
        match self.layouts {
            Some(source) => {
                let revision = source.revision(self) + 1;
                source.set_text(self).to(text.into());
                source.set_settings_text(self).to(settings_text.into());
                source.set_revision(self).to(revision);
            }
            None => {
                self.layouts = Some(LayoutSource::new(self, text.into(), settings_text.into(), 0));
            }
        }
    }

    pub fn set_form_data(&mut self, text: impl Into<String>) {
        match self.form_data {
            Some(source) => {
                let revision = source.revision(self) + 1;
                source.set_text(self).to(text.into());
                source.set_revision(self).to(revision);
            }
            None => {
                self.form_data = Some(FormDataSource::new(self, text.into(), 0));
            }
        }
    }

    pub fn set_schema(&mut self, data_type: impl Into<String>, text: impl Into<String>) {
        match self.schema {
            Some(source) => {
                let revision = source.revision(self) + 1;
                source.set_text(self).to(text.into());
                source.set_data_type(self).to(data_type.into());
                source.set_revision(self).to(revision);
            }
            None => {
                self.schema = Some(SchemaSource::new(self, text.into(), data_type.into(), 0));
            }
        }
    }

    /// The current node tree. `None` until layouts and form data are
    /// set.
    #[must_use]
    pub fn node_tree(&self) -> Option<Arc<NodeTree>> {
        Some(build_node_tree(self, self.layouts?, self.form_data?))
    }

    #[must_use]
    pub fn form_data(&self) -> Option<Arc<FormData>> {
        Some(parse_form_data(self, self.form_data?))
    }

    /// All current validation issues: the local sources from the
    /// tracked query plus the latest backend contribution.
    #[must_use]
    pub fn validation(&self) -> Option<Arc<ValidationGroups>> {
        let local = validate(self, self.layouts?, self.form_data?, self.schema?);
        let Some(backend) = &self.backend else {
            return Some(local);
        };

        let mut merged = (*local).clone();
        let state = backend.state();
        let mut by_source: BTreeMap<String, Vec<ValidationIssue>> = BTreeMap::new();
        for issue in state.issues(self.context.default_data_type.as_deref()) {
            by_source.entry(issue.source.clone()).or_default().push(issue);
        }
        for (source, issues) in by_source {
            merged.set_source(source, issues);
        }
        Some(Arc::new(merged))
    }

    /// Refreshes the backend contribution for an instance. A call made
    /// while an earlier one is in flight supersedes it.
    ///
    /// # Errors
    ///
    /// Propagates the fetch error; local validation is unaffected.
    pub async fn refresh_backend_validation(
        &self,
        instance_id: &str,
        only_incremental: bool,
    ) -> Result<(), FetchError> {
        let Some(backend) = &self.backend else {
            return Ok(());
        };
        backend
            .refresh(instance_id, &self.context.language, only_incremental)
            .await
    }

    /// Configuration diagnostics accumulated while producing the
    /// current tree and validations.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        if let (Some(layouts), Some(data)) = (self.layouts, self.form_data) {
            let accumulated = match self.schema {
                Some(schema) => {
                    validate::accumulated::<EngineDiagnostic>(self, layouts, data, schema)
                }
                None => build_node_tree::accumulated::<EngineDiagnostic>(self, layouts, data),
            };
            out.extend(accumulated.into_iter().map(|d| d.0.clone()));
        }
        out
    }
}
