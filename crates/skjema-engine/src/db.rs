use std::sync::Arc;

use skjema_hierarchy::AppContext;
use skjema_models::ComponentRegistry;
use skjema_validation::ExpressionValidationConfig;

/// Everything the tracked queries need besides the string inputs:
/// the component registry and the per-app context, supplied by the
/// concrete database.
#[salsa::db]
pub trait Db: salsa::Database {
    fn registry(&self) -> Arc<ComponentRegistry>;
    fn app_context(&self) -> Arc<AppContext>;
    fn validation_messages(&self) -> Arc<ExpressionValidationConfig>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    Warning,
    Error,
}

/// A configuration problem surfaced to the app developer. Carried by
/// every config-error channel: layout parsing, claim resolution,
/// materialization, and the validation inputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: &'static str,
    pub severity: DiagnosticSeverity,
    pub component: Option<String>,
    pub page: Option<String>,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: DiagnosticSeverity::Error,
            component: None,
            page: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn warning(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            ..Self::error(code, message)
        }
    }

    #[must_use]
    pub fn on_page(mut self, page: impl Into<String>) -> Self {
        self.page = Some(page.into());
        self
    }

    #[must_use]
    pub fn on_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }
}

/// Accumulator for configuration diagnostics raised inside tracked
/// queries.
#[salsa::accumulator]
pub struct EngineDiagnostic(pub Diagnostic);

impl From<EngineDiagnostic> for Diagnostic {
    fn from(diagnostic: EngineDiagnostic) -> Self {
        diagnostic.0
    }
}
