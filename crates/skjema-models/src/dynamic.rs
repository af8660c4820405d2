use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Deserializer;
use serde_json::Value;
use skjema_expr::Expr;

/// A declaration property that is either authored as a literal or as an
/// expression to be resolved against the current data sources.
///
/// The JSON encoding is positional: an array whose first element is a
/// string is an expression, anything else is the literal.
#[derive(Clone, Debug, PartialEq)]
pub enum Dynamic<T> {
    Literal(T),
    Expr(Expr),
}

impl<T> Dynamic<T> {
    #[must_use]
    pub fn literal(value: T) -> Self {
        Self::Literal(value)
    }

    #[must_use]
    pub fn as_literal(&self) -> Option<&T> {
        match self {
            Self::Literal(value) => Some(value),
            Self::Expr(_) => None,
        }
    }

    #[must_use]
    pub fn as_expr(&self) -> Option<&Expr> {
        match self {
            Self::Expr(expr) => Some(expr),
            Self::Literal(_) => None,
        }
    }
}

impl<T: Default> Default for Dynamic<T> {
    fn default() -> Self {
        Self::Literal(T::default())
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Dynamic<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        if Expr::looks_like_expression(&raw) {
            let expr = Expr::parse(&raw).map_err(serde::de::Error::custom)?;
            return Ok(Self::Expr(expr));
        }
        let literal = T::deserialize(raw).map_err(serde::de::Error::custom)?;
        Ok(Self::Literal(literal))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn deserializes_literals_and_expressions() {
        let literal: Dynamic<bool> = serde_json::from_value(json!(true)).unwrap();
        assert_eq!(literal, Dynamic::Literal(true));

        let dynamic: Dynamic<bool> = serde_json::from_value(json!(["equals", "a", "b"])).unwrap();
        assert!(dynamic.as_expr().is_some());
    }

    #[test]
    fn malformed_expression_is_a_deserialize_error() {
        let result: Result<Dynamic<bool>, _> = serde_json::from_value(json!(["nonsense", 1]));
        assert!(result.is_err());
    }
}
