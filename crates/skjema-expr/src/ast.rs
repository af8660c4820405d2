use serde_json::Value;

use crate::error::ExprParseError;
use crate::value::ExprValue;

/// The operator vocabulary. This set is a compatibility contract with
/// already-shipped layouts; names match the external JSON spelling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExprFunction {
    // logical
    And,
    Or,
    Not,
    If,
    // relational
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanEq,
    LessThan,
    LessThanEq,
    // string
    Concat,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    StringLength,
    CommaContains,
    LowerCase,
    UpperCase,
    // numeric
    Round,
    // lookups
    DataModel,
    Component,
    DisplayValue,
    InstanceContext,
    AuthContext,
    FrontendSettings,
    Text,
    Language,
    Argv,
}

/// Argument count bounds: `(min, max)`, `None` meaning unbounded.
type Arity = (usize, Option<usize>);

impl ExprFunction {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "and" => Self::And,
            "or" => Self::Or,
            "not" => Self::Not,
            "if" => Self::If,
            "equals" => Self::Equals,
            "notEquals" => Self::NotEquals,
            "greaterThan" => Self::GreaterThan,
            "greaterThanEq" => Self::GreaterThanEq,
            "lessThan" => Self::LessThan,
            "lessThanEq" => Self::LessThanEq,
            "concat" => Self::Concat,
            "contains" => Self::Contains,
            "notContains" => Self::NotContains,
            "startsWith" => Self::StartsWith,
            "endsWith" => Self::EndsWith,
            "stringLength" => Self::StringLength,
            "commaContains" => Self::CommaContains,
            "lowerCase" => Self::LowerCase,
            "upperCase" => Self::UpperCase,
            "round" => Self::Round,
            "dataModel" => Self::DataModel,
            "component" => Self::Component,
            "displayValue" => Self::DisplayValue,
            "instanceContext" => Self::InstanceContext,
            "authContext" => Self::AuthContext,
            "frontendSettings" => Self::FrontendSettings,
            "text" => Self::Text,
            "language" => Self::Language,
            "argv" => Self::Argv,
            _ => return None,
        })
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
            Self::If => "if",
            Self::Equals => "equals",
            Self::NotEquals => "notEquals",
            Self::GreaterThan => "greaterThan",
            Self::GreaterThanEq => "greaterThanEq",
            Self::LessThan => "lessThan",
            Self::LessThanEq => "lessThanEq",
            Self::Concat => "concat",
            Self::Contains => "contains",
            Self::NotContains => "notContains",
            Self::StartsWith => "startsWith",
            Self::EndsWith => "endsWith",
            Self::StringLength => "stringLength",
            Self::CommaContains => "commaContains",
            Self::LowerCase => "lowerCase",
            Self::UpperCase => "upperCase",
            Self::Round => "round",
            Self::DataModel => "dataModel",
            Self::Component => "component",
            Self::DisplayValue => "displayValue",
            Self::InstanceContext => "instanceContext",
            Self::AuthContext => "authContext",
            Self::FrontendSettings => "frontendSettings",
            Self::Text => "text",
            Self::Language => "language",
            Self::Argv => "argv",
        }
    }

    fn arity(self) -> Arity {
        match self {
            Self::Language => (0, Some(0)),
            Self::Not
            | Self::StringLength
            | Self::LowerCase
            | Self::UpperCase
            | Self::InstanceContext
            | Self::AuthContext
            | Self::FrontendSettings
            | Self::Text
            | Self::Component
            | Self::DisplayValue
            | Self::Argv => (1, Some(1)),
            Self::Equals
            | Self::NotEquals
            | Self::GreaterThan
            | Self::GreaterThanEq
            | Self::LessThan
            | Self::LessThanEq
            | Self::Contains
            | Self::NotContains
            | Self::StartsWith
            | Self::EndsWith
            | Self::CommaContains => (2, Some(2)),
            Self::Round | Self::DataModel => (1, Some(2)),
            Self::And | Self::Or => (1, None),
            Self::Concat => (0, None),
            // `if` is special-cased in parsing: 2 args, or 4 with "else".
            Self::If => (2, Some(4)),
        }
    }
}

/// A parsed expression tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(ExprValue),
    Call { func: ExprFunction, args: Vec<Expr> },
}

impl Expr {
    /// Parses the external JSON encoding. Arrays are calls, everything
    /// scalar is a literal; objects have no meaning in the language.
    pub fn parse(value: &Value) -> Result<Self, ExprParseError> {
        let mut path = Vec::new();
        Self::parse_at(value, &mut path)
    }

    /// Whether a raw JSON value would parse as a call rather than a
    /// literal. Used by layout deserialization to decide if a property is
    /// dynamic.
    #[must_use]
    pub fn looks_like_expression(value: &Value) -> bool {
        matches!(value, Value::Array(items) if matches!(items.first(), Some(Value::String(_))))
    }

    fn parse_at(value: &Value, path: &mut Vec<usize>) -> Result<Self, ExprParseError> {
        match value {
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
                Ok(Self::Literal(ExprValue::from_json(value)))
            }
            Value::Object(_) => Err(ExprParseError::UnexpectedObject {
                path: render_path(path),
            }),
            Value::Array(items) => {
                let Some(Value::String(name)) = items.first() else {
                    return Err(ExprParseError::MissingOperator {
                        path: render_path(path),
                    });
                };
                let func = ExprFunction::from_name(name).ok_or_else(|| {
                    ExprParseError::UnknownOperator {
                        name: name.clone(),
                        path: render_path(path),
                    }
                })?;

                let raw_args = &items[1..];
                check_arity(func, raw_args, path)?;

                let mut args = Vec::with_capacity(raw_args.len());
                for (i, raw) in raw_args.iter().enumerate() {
                    path.push(i + 1);
                    args.push(Self::parse_at(raw, path)?);
                    path.pop();
                }

                Ok(Self::Call { func, args })
            }
        }
    }
}

fn check_arity(func: ExprFunction, raw_args: &[Value], path: &[usize]) -> Result<(), ExprParseError> {
    if func == ExprFunction::If {
        // Either ["if", cond, then] or ["if", cond, then, "else", otherwise].
        let ok = match raw_args.len() {
            2 => true,
            4 => matches!(&raw_args[2], Value::String(s) if s == "else"),
            _ => false,
        };
        if !ok {
            return Err(ExprParseError::MalformedIf {
                got: raw_args.len(),
                path: render_path(path),
            });
        }
        return Ok(());
    }

    let (min, max) = func.arity();
    if raw_args.len() < min || max.is_some_and(|max| raw_args.len() > max) {
        return Err(ExprParseError::WrongArgumentCount {
            func: func.name(),
            got: raw_args.len(),
            min,
            max,
            path: render_path(path),
        });
    }
    Ok(())
}

fn render_path(path: &[usize]) -> String {
    let mut out = String::from("$");
    for index in path {
        out.push_str(&format!("[{index}]"));
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_literals_and_calls() {
        assert_eq!(
            Expr::parse(&json!("hello")),
            Ok(Expr::Literal(ExprValue::String("hello".into())))
        );
        let expr = Expr::parse(&json!(["equals", ["dataModel", "A"], "x"])).unwrap();
        let Expr::Call { func, args } = expr else {
            panic!("expected call");
        };
        assert_eq!(func, ExprFunction::Equals);
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn unknown_operator_is_rejected_with_path() {
        let err = Expr::parse(&json!(["and", true, ["frobnicate", 1]])).unwrap_err();
        assert_eq!(
            err,
            ExprParseError::UnknownOperator {
                name: "frobnicate".into(),
                path: "$[2]".into(),
            }
        );
    }

    #[test]
    fn arity_is_checked_at_parse_time() {
        let err = Expr::parse(&json!(["equals", "only-one"])).unwrap_err();
        assert!(matches!(err, ExprParseError::WrongArgumentCount { func: "equals", got: 1, .. }));

        let err = Expr::parse(&json!(["language", "extra"])).unwrap_err();
        assert!(matches!(err, ExprParseError::WrongArgumentCount { func: "language", .. }));
    }

    #[test]
    fn if_requires_else_keyword() {
        assert!(Expr::parse(&json!(["if", true, "a"])).is_ok());
        assert!(Expr::parse(&json!(["if", true, "a", "else", "b"])).is_ok());
        assert!(matches!(
            Expr::parse(&json!(["if", true, "a", "otherwise", "b"])),
            Err(ExprParseError::MalformedIf { got: 4, .. })
        ));
        assert!(matches!(
            Expr::parse(&json!(["if", true, "a", "else"])),
            Err(ExprParseError::MalformedIf { got: 3, .. })
        ));
    }

    #[test]
    fn objects_and_bare_arrays_are_rejected() {
        assert!(matches!(
            Expr::parse(&json!({"op": "and"})),
            Err(ExprParseError::UnexpectedObject { .. })
        ));
        assert!(matches!(
            Expr::parse(&json!([1, 2])),
            Err(ExprParseError::MissingOperator { .. })
        ));
    }
}
