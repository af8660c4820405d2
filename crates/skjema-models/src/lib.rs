//! Layout declarations, the component-type registry, layout settings and
//! the production-layout quirks table.
//!
//! Everything here is the *static* side of a form: what the author wrote,
//! deserialized and sanity-checked, before any form data enters the
//! picture. The hierarchy generator consumes these declarations; it never
//! mutates them.

mod components;
mod dynamic;
mod layout;
mod quirks;
mod registry;
mod settings;

pub use components::BindingRef;
pub use components::CardSpec;
pub use components::ComponentDecl;
pub use components::ComponentType;
pub use components::TabSpec;
pub use dynamic::Dynamic;
pub use layout::parse_layout_set;
pub use layout::LayoutIssue;
pub use layout::LayoutSet;
pub use layout::Page;
pub use quirks::apply_quirks;
pub use quirks::QuirkError;
pub use registry::ComponentCapabilities;
pub use registry::ComponentRegistry;
pub use registry::ContainerKind;
pub use registry::RegistryError;
pub use registry::ValidationFilterInput;
pub use settings::component_excluded_from_pdf;
pub use settings::exclude_page_from_pdf;
pub use settings::page_excluded_from_pdf;
pub use settings::ComponentSettings;
pub use settings::LayoutSettings;
pub use settings::PagesSettings;
