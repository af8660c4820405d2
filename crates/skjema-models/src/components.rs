use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;
use skjema_data::DataModelReference;

use crate::dynamic::Dynamic;

/// The closed set of component types a layout may declare. Deserializing
/// an unknown type fails for that one component; the page parser treats
/// it as a configuration error and keeps going.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
pub enum ComponentType {
    Input,
    TextArea,
    Checkboxes,
    RadioButtons,
    Dropdown,
    Datepicker,
    FileUpload,
    FileUploadWithTag,
    Group,
    Cards,
    Tabs,
    Header,
    Paragraph,
    Panel,
    Summary,
    Button,
    NavigationButtons,
    NavigationBar,
    Custom,
}

/// A data model binding as authored: either a bare field in the default
/// data type, or a fully qualified reference.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BindingRef {
    Field(String),
    Reference(DataModelReference),
}

impl BindingRef {
    #[must_use]
    pub fn resolve(&self, default_data_type: &str) -> DataModelReference {
        match self {
            Self::Field(field) => DataModelReference::new(default_data_type, field.clone()),
            Self::Reference(reference) => reference.clone(),
        }
    }

    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Field(field) => field,
            Self::Reference(reference) => &reference.field,
        }
    }
}

/// One card inside a `Cards` container.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSpec {
    #[serde(default)]
    pub title: Option<Dynamic<String>>,
    #[serde(default)]
    pub children: Vec<String>,
}

/// One tab inside a `Tabs` container.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabSpec {
    pub id: String,
    #[serde(default)]
    pub title: Option<Dynamic<String>>,
    #[serde(default)]
    pub children: Vec<String>,
}

/// A component declaration as it appears in a layout page. Unknown
/// properties land in `extra` so component-specific settings survive the
/// round trip without the core having to know them.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDecl {
    pub id: String,
    #[serde(rename = "type")]
    pub component_type: ComponentType,

    #[serde(default)]
    pub data_model_bindings: BTreeMap<String, BindingRef>,
    #[serde(default)]
    pub text_resource_bindings: BTreeMap<String, Dynamic<String>>,

    #[serde(default)]
    pub required: Dynamic<bool>,
    #[serde(default)]
    pub hidden: Dynamic<bool>,
    #[serde(default)]
    pub read_only: Dynamic<bool>,

    /// Child ids claimed by a `Group`.
    #[serde(default)]
    pub children: Vec<String>,
    /// Cards claimed by a `Cards` container.
    #[serde(default)]
    pub cards: Vec<CardSpec>,
    /// Tabs claimed by a `Tabs` container.
    #[serde(default)]
    pub tabs: Vec<TabSpec>,

    /// A Group with `maxCount > 1` and a `group` binding repeats.
    pub max_count: Option<u32>,

    /// Validation categories this component wants shown immediately,
    /// overriding the default masking policy.
    pub show_validations: Option<Vec<String>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ComponentDecl {
    pub const SIMPLE_BINDING: &'static str = "simpleBinding";
    pub const GROUP_BINDING: &'static str = "group";

    #[must_use]
    pub fn binding(&self, key: &str) -> Option<&BindingRef> {
        self.data_model_bindings.get(key)
    }

    #[must_use]
    pub fn simple_binding(&self) -> Option<&BindingRef> {
        self.binding(Self::SIMPLE_BINDING)
    }

    /// The binding used to anchor this component in the data model for
    /// transposition: the simple binding when present, else the group
    /// binding, else any binding.
    #[must_use]
    pub fn primary_binding(&self) -> Option<&BindingRef> {
        self.simple_binding()
            .or_else(|| self.binding(Self::GROUP_BINDING))
            .or_else(|| self.data_model_bindings.values().next())
    }

    /// Whether this declaration expands once per row of its group binding.
    #[must_use]
    pub fn is_repeating(&self) -> bool {
        self.component_type == ComponentType::Group
            && self.max_count.is_some_and(|max| max > 1)
            && self.binding(Self::GROUP_BINDING).is_some()
    }

    /// All child ids this declaration claims, in declared order.
    #[must_use]
    pub fn claimed_child_ids(&self) -> Vec<&str> {
        match self.component_type {
            ComponentType::Group => self.children.iter().map(String::as_str).collect(),
            ComponentType::Cards => self
                .cards
                .iter()
                .flat_map(|card| card.children.iter().map(String::as_str))
                .collect(),
            ComponentType::Tabs => self
                .tabs
                .iter()
                .flat_map(|tab| tab.children.iter().map(String::as_str))
                .collect(),
            _ => Vec::new(),
        }
    }
}
