use thiserror::Error;

use crate::value::CoerceError;
use crate::value::ExprValue;

/// Rejected at load time, before any evaluation. A parse failure rejects
/// the one expression it occurs in, never the session.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ExprParseError {
    #[error("unknown operator '{name}' at {path}")]
    UnknownOperator { name: String, path: String },

    #[error("expected an operator name as the first array element at {path}")]
    MissingOperator { path: String },

    #[error("objects are not valid expressions (at {path})")]
    UnexpectedObject { path: String },

    #[error("'{func}' expects {min}{} argument(s), got {got} (at {path})", max.map(|m| format!("..{m}")).unwrap_or_default())]
    WrongArgumentCount {
        func: &'static str,
        got: usize,
        min: usize,
        max: Option<usize>,
        path: String,
    },

    #[error("'if' expects 2 arguments, or 4 with 'else' as the third, got {got} (at {path})")]
    MalformedIf { got: usize, path: String },
}

/// Raised during evaluation. Callers at the rendering boundary use
/// [`crate::evaluate_with_default`], which logs these and degrades to a
/// type-appropriate default instead of propagating.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ExprError {
    #[error("expected {expected}, got {got:?}")]
    InvalidArgument { expected: &'static str, got: ExprValue },

    #[error("unknown instance context property '{0}'")]
    UnknownInstanceContextKey(String),

    #[error("unknown auth context property '{0}'")]
    UnknownAuthContextKey(String),

    #[error("unable to find component '{id}', or it has no simple binding")]
    ComponentNotFound { id: String },

    #[error("cannot look up '{func}' with a null key")]
    NullKey { func: &'static str },

    #[error("no data type given and no default data type configured")]
    MissingDataType,

    #[error("data model with type '{0}' not found")]
    UnknownDataType(String),

    #[error("no positional arguments available")]
    NoPositionalArguments,

    #[error("positional argument index {0} out of range")]
    PositionalIndexOutOfRange(usize),
}

impl From<CoerceError> for ExprError {
    fn from(err: CoerceError) -> Self {
        Self::InvalidArgument {
            expected: err.expected,
            got: err.got,
        }
    }
}
