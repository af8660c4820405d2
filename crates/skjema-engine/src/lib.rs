//! The incremental form engine: string-snapshot inputs, salsa-tracked
//! parse/generate/validate queries, and the concrete [`FormEngine`]
//! database that ties them together.

mod db;
mod engine;
mod inputs;
mod queries;

pub use db::Db;
pub use db::Diagnostic;
pub use db::DiagnosticSeverity;
pub use db::EngineDiagnostic;
pub use engine::FormEngine;
pub use inputs::FormDataSource;
pub use inputs::LayoutSource;
pub use inputs::SchemaSource;
pub use queries::build_node_tree;
pub use queries::layout_settings;
pub use queries::parse_form_data;
pub use queries::parse_layouts;
pub use queries::validate;
