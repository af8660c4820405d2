use rustc_hash::FxHashMap;
use serde_json::Map;
use serde_json::Value;
use skjema_data::FormData;
use skjema_expr::AuthContextKey;
use skjema_expr::ComponentLookupError;
use skjema_expr::EvalNode;
use skjema_expr::ExpressionDataSources;
use skjema_expr::ExprValue;
use skjema_expr::InstanceContextKey;

use crate::tree::NodeId;
use crate::tree::NodeTree;

/// Application-level context a tree is generated under: identity,
/// language, and the lookup tables expressions may consult.
#[derive(Clone, Debug, Default)]
pub struct AppContext {
    pub org: String,
    pub app: String,
    pub layout_set_id: String,
    pub language: String,
    pub default_data_type: Option<String>,
    pub instance: FxHashMap<InstanceContextKey, String>,
    pub auth: Vec<AuthContextKey>,
    pub frontend_settings: Map<String, Value>,
    pub text_resources: FxHashMap<String, String>,
}

impl AppContext {
    #[must_use]
    pub fn new(
        org: impl Into<String>,
        app: impl Into<String>,
        layout_set_id: impl Into<String>,
    ) -> Self {
        Self {
            org: org.into(),
            app: app.into(),
            layout_set_id: layout_set_id.into(),
            language: "nb".to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_default_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.default_data_type = Some(data_type.into());
        self
    }

    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    #[must_use]
    pub fn with_text(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.text_resources.insert(key.into(), text.into());
        self
    }
}

/// [`ExpressionDataSources`] over a generated tree and the form data it
/// was generated from. Both the resolution pass and later validation
/// passes evaluate expressions through this view.
pub struct TreeDataSources<'a> {
    data: &'a FormData,
    tree: &'a NodeTree,
    ctx: &'a AppContext,
}

impl<'a> TreeDataSources<'a> {
    #[must_use]
    pub fn new(data: &'a FormData, tree: &'a NodeTree, ctx: &'a AppContext) -> Self {
        Self { data, tree, ctx }
    }

    fn locate(&self, from: &EvalNode, id: &str) -> Option<NodeId> {
        if let Some(origin) = from
            .indexed_id
            .as_deref()
            .and_then(|indexed| self.tree.find_by_indexed_id(indexed))
        {
            return self.tree.closest(origin, id);
        }
        self.tree.flat().find(|&candidate| {
            let node = self.tree.node(candidate);
            node.indexed_id == id || node.base_id == id
        })
    }
}

impl ExpressionDataSources for TreeDataSources<'_> {
    fn form_data(&self) -> &FormData {
        self.data
    }

    fn default_data_type(&self) -> Option<&str> {
        self.ctx.default_data_type.as_deref()
    }

    fn instance_context(&self, key: InstanceContextKey) -> Option<String> {
        self.ctx.instance.get(&key).cloned()
    }

    fn auth_context(&self, key: AuthContextKey) -> bool {
        self.ctx.auth.contains(&key)
    }

    fn frontend_setting(&self, key: &str) -> Option<ExprValue> {
        self.ctx.frontend_settings.get(key).map(ExprValue::from_json)
    }

    fn text_resource(&self, key: &str) -> Option<String> {
        self.ctx.text_resources.get(key).cloned()
    }

    fn language(&self) -> &str {
        &self.ctx.language
    }

    fn component_value(
        &self,
        from: &EvalNode,
        id: &str,
    ) -> Result<Option<ExprValue>, ComponentLookupError> {
        let node_id = self.locate(from, id).ok_or(ComponentLookupError::NotFound)?;
        if self.tree.is_hidden(node_id) {
            return Ok(None);
        }
        let item = &self.tree.node(node_id).item;
        let binding = item
            .simple_binding()
            .ok_or(ComponentLookupError::NoSimpleBinding)?;
        let value = self
            .data
            .pick_simple(binding)
            .map_or(ExprValue::Null, |v| ExprValue::from_json(&v));
        Ok(Some(value))
    }

    fn display_value(
        &self,
        from: &EvalNode,
        id: &str,
    ) -> Result<Option<String>, ComponentLookupError> {
        match self.component_value(from, id)? {
            None => Ok(None),
            Some(value) => Ok(Some(value.as_string().unwrap_or_default())),
        }
    }
}
