//! The embedded expression language used by form layouts.
//!
//! Expressions arrive as JSON: a literal, or an array `[op, ...args]`
//! where each argument is itself an expression. Parsing into [`Expr`]
//! validates the operator vocabulary and argument counts up front, so a
//! malformed expression is rejected once at load time instead of
//! surprising the evaluator later.
//!
//! Evaluation is a pure function of the supplied [`ExpressionDataSources`]
//! snapshot: same expression + same sources = same result, which is what
//! makes resolved layouts safe to memoize and regenerate.

mod ast;
mod error;
mod eval;
mod sources;
mod value;

pub use ast::Expr;
pub use ast::ExprFunction;
pub use error::ExprError;
pub use error::ExprParseError;
pub use eval::evaluate;
pub use eval::evaluate_with_default;
pub use sources::AuthContextKey;
pub use sources::ComponentLookupError;
pub use sources::EvalNode;
pub use sources::ExprContext;
pub use sources::ExpressionDataSources;
pub use sources::InstanceContextKey;
pub use value::CoerceError;
pub use value::ExprValue;
