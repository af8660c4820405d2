//! Form data snapshots and data-binding path arithmetic.
//!
//! Everything in this crate is a pure function over immutable snapshots:
//! field paths parse and transpose without touching form data, and
//! [`FormData`] hands out read-only views keyed by data type. Mutation
//! happens outside the core; a changed snapshot is a new [`FormData`].

mod convert;
mod form_data;
mod path;

pub use convert::convert_data;
pub use convert::ConvertError;
pub use convert::JsonSchemaType;
pub use form_data::FormData;
pub use path::split_dashed_key;
pub use path::DataModelReference;
pub use path::FieldPath;
pub use path::PathError;
pub use path::Segment;
