use skjema_data::DataModelReference;
use skjema_data::FormData;

use crate::value::ExprValue;

/// Instance metadata keys expressions may ask for. Anything else is a
/// runtime error, matching the closed key set of the backing platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InstanceContextKey {
    InstanceId,
    AppId,
    InstanceOwnerPartyId,
    InstanceOwnerPartyType,
}

impl InstanceContextKey {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "instanceId" => Some(Self::InstanceId),
            "appId" => Some(Self::AppId),
            "instanceOwnerPartyId" => Some(Self::InstanceOwnerPartyId),
            "instanceOwnerPartyType" => Some(Self::InstanceOwnerPartyType),
            _ => None,
        }
    }
}

/// Process-task authorization flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthContextKey {
    Read,
    Write,
    Instantiate,
    Confirm,
    Sign,
    Reject,
}

impl AuthContextKey {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "read" => Some(Self::Read),
            "write" => Some(Self::Write),
            "instantiate" => Some(Self::Instantiate),
            "confirm" => Some(Self::Confirm),
            "sign" => Some(Self::Sign),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}

/// The identity an expression evaluates under: which node asked, and
/// where in the data model that node lives. `data_model_location` carries
/// concrete row indices, and is what makes unqualified `dataModel`
/// lookups row-relative inside repeating groups.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EvalNode {
    pub indexed_id: Option<String>,
    pub page: Option<String>,
    pub data_model_location: Option<DataModelReference>,
}

impl EvalNode {
    /// Context for expressions evaluated directly on a page, outside any
    /// component (e.g. a page `hidden` expression).
    #[must_use]
    pub fn for_page(page: impl Into<String>) -> Self {
        Self {
            indexed_id: None,
            page: Some(page.into()),
            data_model_location: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentLookupError {
    NotFound,
    NoSimpleBinding,
}

/// Read-only view of everything expressions may consult. Implementations
/// wrap a snapshot; two evaluations against the same snapshot must agree.
pub trait ExpressionDataSources {
    fn form_data(&self) -> &FormData;

    /// The data type `dataModel` lookups fall back to when the expression
    /// does not name one.
    fn default_data_type(&self) -> Option<&str>;

    fn instance_context(&self, _key: InstanceContextKey) -> Option<String> {
        None
    }

    fn auth_context(&self, _key: AuthContextKey) -> bool {
        false
    }

    fn frontend_setting(&self, _key: &str) -> Option<ExprValue> {
        None
    }

    /// Key→string text resource lookup. `None` falls back to the key
    /// itself.
    fn text_resource(&self, _key: &str) -> Option<String> {
        None
    }

    fn language(&self) -> &str {
        "nb"
    }

    /// Resolves the simple-binding value of the closest component with the
    /// given id, seen from `from`. `Ok(None)` means the component exists
    /// but is hidden.
    fn component_value(
        &self,
        _from: &EvalNode,
        _id: &str,
    ) -> Result<Option<ExprValue>, ComponentLookupError> {
        Err(ComponentLookupError::NotFound)
    }

    /// Resolves another component's user-facing display string.
    fn display_value(
        &self,
        _from: &EvalNode,
        _id: &str,
    ) -> Result<Option<String>, ComponentLookupError> {
        Err(ComponentLookupError::NotFound)
    }
}

/// Everything [`crate::evaluate`] needs: the sources snapshot, the asking
/// node, and any positional arguments (`argv`) the caller supplies.
#[derive(Clone, Copy)]
pub struct ExprContext<'a> {
    pub sources: &'a dyn ExpressionDataSources,
    pub node: &'a EvalNode,
    pub positional: &'a [ExprValue],
}

impl<'a> ExprContext<'a> {
    #[must_use]
    pub fn new(sources: &'a dyn ExpressionDataSources, node: &'a EvalNode) -> Self {
        Self {
            sources,
            node,
            positional: &[],
        }
    }

    #[must_use]
    pub fn with_positional(mut self, positional: &'a [ExprValue]) -> Self {
        self.positional = positional;
        self
    }
}
