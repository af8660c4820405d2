use serde_json::Value;

/// A scalar expression result. The language has no object or array values;
/// lookups that land on a structure resolve to `Null`.
#[derive(Clone, Debug, PartialEq)]
pub enum ExprValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl ExprValue {
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            Value::String(s) => Self::String(s.clone()),
            Value::Null | Value::Array(_) | Value::Object(_) => Self::Null,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Coerces to a boolean. `None` means null; `Err` means the value has
    /// no boolean reading at all. Strings `"true"`/`"1"` and the number 1
    /// are true, `"false"`/`"0"` and 0 are false, matching what shipped
    /// layouts rely on.
    pub fn as_bool(&self) -> Result<Option<bool>, CoerceError> {
        match self {
            Self::Null => Ok(None),
            Self::Bool(b) => Ok(Some(*b)),
            Self::Number(n) if *n == 1.0 => Ok(Some(true)),
            Self::Number(n) if *n == 0.0 => Ok(Some(false)),
            Self::String(s) if s == "true" || s == "1" => Ok(Some(true)),
            Self::String(s) if s == "false" || s == "0" => Ok(Some(false)),
            _ => Err(CoerceError {
                expected: "boolean",
                got: self.clone(),
            }),
        }
    }

    /// Coerces to a number using a strict parse: only plain decimal
    /// notation is accepted from strings, and booleans never coerce.
    pub fn as_number(&self) -> Result<Option<f64>, CoerceError> {
        match self {
            Self::Null => Ok(None),
            Self::Number(n) => Ok(Some(*n)),
            Self::String(s) if is_strict_numeric(s) => {
                s.parse::<f64>().map(Some).map_err(|_| CoerceError {
                    expected: "number",
                    got: self.clone(),
                })
            }
            _ => Err(CoerceError {
                expected: "number",
                got: self.clone(),
            }),
        }
    }

    /// Coerces to a string. Numbers render without a trailing `.0` when
    /// they are whole, so `5.0` compares equal to `"5"`.
    #[must_use]
    pub fn as_string(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(b.to_string()),
            Self::Number(n) => Some(format_number(*n)),
            Self::String(s) => Some(s.clone()),
        }
    }
}

impl From<ExprValue> for Value {
    fn from(value: ExprValue) -> Self {
        match value {
            ExprValue::Null => Value::Null,
            ExprValue::Bool(b) => Value::Bool(b),
            ExprValue::Number(n) => {
                serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
            }
            ExprValue::String(s) => Value::String(s),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CoerceError {
    pub expected: &'static str,
    pub got: ExprValue,
}

fn is_strict_numeric(s: &str) -> bool {
    let rest = s.strip_prefix('-').unwrap_or(s);
    if rest.is_empty() {
        return false;
    }
    let (int, frac) = match rest.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rest, None),
    };
    if int.is_empty() || !int.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    match frac {
        None => true,
        Some(f) => !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()),
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        #[allow(clippy::cast_possible_truncation)]
        let whole = n as i64;
        whole.to_string()
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_numeric_parse() {
        assert_eq!(ExprValue::String("42".into()).as_number(), Ok(Some(42.0)));
        assert_eq!(ExprValue::String("-4.25".into()).as_number(), Ok(Some(-4.25)));
        assert!(ExprValue::String("4e2".into()).as_number().is_err());
        assert!(ExprValue::String("4.".into()).as_number().is_err());
        assert!(ExprValue::String(" 4".into()).as_number().is_err());
        assert!(ExprValue::Bool(true).as_number().is_err());
        assert_eq!(ExprValue::Null.as_number(), Ok(None));
    }

    #[test]
    fn boolean_coercion() {
        assert_eq!(ExprValue::String("true".into()).as_bool(), Ok(Some(true)));
        assert_eq!(ExprValue::Number(0.0).as_bool(), Ok(Some(false)));
        assert!(ExprValue::String("yes".into()).as_bool().is_err());
        assert!(ExprValue::Number(2.0).as_bool().is_err());
    }

    #[test]
    fn number_to_string_drops_whole_fraction() {
        assert_eq!(ExprValue::Number(5.0).as_string(), Some("5".to_string()));
        assert_eq!(ExprValue::Number(5.5).as_string(), Some("5.5".to_string()));
    }
}
