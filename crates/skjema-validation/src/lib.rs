//! The four validation sources (schema, expression, empty-field,
//! backend) and the merge/mask layer that decides what a node shows.

mod backend;
mod empty_field;
mod expression;
mod issue;
mod merge;
mod schema;

pub use backend::BackendIssue;
pub use backend::BackendValidation;
pub use backend::BackendValidationState;
pub use backend::FetchError;
pub use backend::FetchFn;
pub use empty_field::validate_empty_fields;
pub use expression::parse_validation_config;
pub use expression::validate_expressions;
pub use expression::ConfigError;
pub use expression::ExpressionValidationConfig;
pub use expression::FieldValidationRule;
pub use issue::Message;
pub use issue::Severity;
pub use issue::ValidationIssue;
pub use issue::ValidationMask;
pub use merge::ValidationGroups;
pub use schema::validate_against_schema;

/// Well-known source names for locally produced issues.
pub mod source {
    pub const SCHEMA: &str = "Schema";
    pub const EXPRESSION: &str = "Expression";
    pub const REQUIRED: &str = "Required";
}
