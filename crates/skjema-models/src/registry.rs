use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::components::ComponentType;

/// How a component participates in the layout hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerKind {
    /// Leaf component, claims no children.
    None,
    /// Claims children but renders them in place.
    Plain,
    /// Claims children and repeats them per data model row when a
    /// `group` binding and `maxCount > 1` are present.
    Repeating,
}

/// The context handed to a per-component validation filter. Filters may
/// drop issues a component replaces with its own messaging.
#[derive(Clone, Copy, Debug)]
pub struct ValidationFilterInput<'a> {
    /// The text key the issue resolved to.
    pub text_key: &'a str,
    /// The schema keyword that produced the issue, when it came from
    /// schema validation.
    pub keyword: Option<&'a str>,
}

type ValidationFilter = fn(&ValidationFilterInput<'_>) -> bool;

/// Static behavior of a component type: whether it binds form data,
/// whether it participates in empty-field validation, and how it
/// contains children.
#[derive(Clone, Copy, Debug)]
pub struct ComponentCapabilities {
    container: ContainerKind,
    form_bound: bool,
    empty_field_validation: bool,
    simple_binding_only: bool,
    filter: Option<ValidationFilter>,
}

impl ComponentCapabilities {
    /// A form component: binds data and runs empty-field validation
    /// when required.
    #[must_use]
    pub fn form() -> Self {
        Self {
            container: ContainerKind::None,
            form_bound: true,
            empty_field_validation: true,
            simple_binding_only: false,
            filter: None,
        }
    }

    /// A presentational component with no data binding.
    #[must_use]
    pub fn presentation() -> Self {
        Self {
            container: ContainerKind::None,
            form_bound: false,
            empty_field_validation: false,
            simple_binding_only: false,
            filter: None,
        }
    }

    /// A container. Repeating containers are form-bound through their
    /// `group` binding but never run empty-field validation themselves.
    #[must_use]
    pub fn container(kind: ContainerKind) -> Self {
        Self {
            container: kind,
            form_bound: kind == ContainerKind::Repeating,
            empty_field_validation: false,
            simple_binding_only: false,
            filter: None,
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: ValidationFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Restricts empty-field validation to the simple binding even when
    /// the component declares more bindings.
    #[must_use]
    pub fn simple_binding_only(mut self) -> Self {
        self.simple_binding_only = true;
        self
    }

    /// Opts a form component out of empty-field validation, for types
    /// that report missing content through their own channel.
    #[must_use]
    pub fn without_empty_field_validation(mut self) -> Self {
        self.empty_field_validation = false;
        self
    }

    #[must_use]
    pub fn container_kind(&self) -> ContainerKind {
        self.container
    }

    #[must_use]
    pub fn is_form_bound(&self) -> bool {
        self.form_bound
    }

    #[must_use]
    pub fn runs_empty_field_validation(&self) -> bool {
        self.empty_field_validation
    }

    #[must_use]
    pub fn is_simple_binding_only(&self) -> bool {
        self.simple_binding_only
    }

    /// Returns `true` when the issue should be kept for this component.
    #[must_use]
    pub fn keeps_issue(&self, input: &ValidationFilterInput<'_>) -> bool {
        self.filter.is_none_or(|filter| filter(input))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("component type {0:?} is already registered")]
    Duplicate(ComponentType),
    #[error("empty-field validation requires a form-bound component, got {0:?}")]
    EmptyFieldWithoutBinding(ComponentType),
}

/// Registry of component capabilities, keyed by type. The standard set
/// covers every built-in type; apps extend it through `register`.
#[derive(Clone, Debug)]
pub struct ComponentRegistry {
    capabilities: FxHashMap<ComponentType, ComponentCapabilities>,
}

impl ComponentRegistry {
    /// The registry covering all built-in component types.
    #[must_use]
    pub fn standard() -> Self {
        let mut capabilities = FxHashMap::default();
        for ty in [
            ComponentType::Input,
            ComponentType::TextArea,
            ComponentType::Datepicker,
        ] {
            capabilities.insert(ty, ComponentCapabilities::form());
        }
        // Option components keep their selection in the simple binding;
        // auxiliary bindings (labels, metadata) may stay empty.
        for ty in [
            ComponentType::Checkboxes,
            ComponentType::RadioButtons,
            ComponentType::Dropdown,
        ] {
            capabilities.insert(ty, ComponentCapabilities::form().simple_binding_only());
        }
        // Uploads report missing attachments through attachment state,
        // not through a text value being empty.
        capabilities.insert(
            ComponentType::FileUpload,
            ComponentCapabilities::form().without_empty_field_validation(),
        );
        capabilities.insert(
            ComponentType::FileUploadWithTag,
            ComponentCapabilities::form().without_empty_field_validation(),
        );

        capabilities.insert(
            ComponentType::Group,
            ComponentCapabilities::container(ContainerKind::Repeating),
        );
        capabilities.insert(
            ComponentType::Cards,
            ComponentCapabilities::container(ContainerKind::Plain),
        );
        capabilities.insert(
            ComponentType::Tabs,
            ComponentCapabilities::container(ContainerKind::Plain),
        );

        for ty in [
            ComponentType::Header,
            ComponentType::Paragraph,
            ComponentType::Panel,
            ComponentType::Summary,
            ComponentType::Button,
            ComponentType::NavigationButtons,
            ComponentType::NavigationBar,
            ComponentType::Custom,
        ] {
            capabilities.insert(ty, ComponentCapabilities::presentation());
        }

        Self { capabilities }
    }

    /// Registers capabilities for a type not already covered.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate registration or an inconsistent capability
    /// combination.
    pub fn register(
        &mut self,
        ty: ComponentType,
        capabilities: ComponentCapabilities,
    ) -> Result<(), RegistryError> {
        if self.capabilities.contains_key(&ty) {
            return Err(RegistryError::Duplicate(ty));
        }
        if capabilities.empty_field_validation && !capabilities.form_bound {
            return Err(RegistryError::EmptyFieldWithoutBinding(ty));
        }
        self.capabilities.insert(ty, capabilities);
        Ok(())
    }

    #[must_use]
    pub fn capabilities(&self, ty: ComponentType) -> Option<&ComponentCapabilities> {
        self.capabilities.get(&ty)
    }

    #[must_use]
    pub fn container_kind(&self, ty: ComponentType) -> ContainerKind {
        self.capabilities(ty)
            .map_or(ContainerKind::None, ComponentCapabilities::container_kind)
    }

    #[must_use]
    pub fn is_form_bound(&self, ty: ComponentType) -> bool {
        self.capabilities(ty)
            .is_some_and(ComponentCapabilities::is_form_bound)
    }

    #[must_use]
    pub fn runs_empty_field_validation(&self, ty: ComponentType) -> bool {
        self.capabilities(ty)
            .is_some_and(ComponentCapabilities::runs_empty_field_validation)
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
