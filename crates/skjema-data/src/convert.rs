use serde_json::Number;
use serde_json::Value;
use thiserror::Error;

/// Largest magnitude accepted for decimal-typed fields. This mirrors the
/// backing store's decimal range and is an externally visible
/// compatibility contract; layouts in production depend on the exact
/// cutoff.
const DECIMAL_MAX_MAGNITUDE: f64 = 7.92e28;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConvertError {
    #[error("'{0}' is not a valid integer")]
    NotAnInteger(String),
    #[error("'{0}' is outside the int32 range")]
    IntegerOutOfRange(String),
    #[error("'{0}' is not a valid number")]
    NotANumber(String),
    #[error("'{0}' is outside the decimal range")]
    NumberOutOfRange(String),
    #[error("'{0}' is not a valid boolean")]
    NotABoolean(String),
}

/// The JSON-schema primitive types a data model binding can target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JsonSchemaType {
    String,
    Integer,
    Number,
    Boolean,
}

impl JsonSchemaType {
    #[must_use]
    pub fn from_schema_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }
}

/// Converts user input to the JSON value a schema-typed field stores.
///
/// Conversion failures are values, not panics: the caller turns an `Err`
/// into a validation issue on the field. An empty input always converts to
/// `null` (clearing the field), regardless of target type.
pub fn convert_data(input: &str, kind: JsonSchemaType) -> Result<Value, ConvertError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }

    match kind {
        JsonSchemaType::String => Ok(Value::String(input.to_string())),
        JsonSchemaType::Integer => {
            let number: i64 = trimmed
                .parse()
                .map_err(|_| ConvertError::NotAnInteger(input.to_string()))?;
            let int32 = i32::try_from(number)
                .map_err(|_| ConvertError::IntegerOutOfRange(input.to_string()))?;
            Ok(Value::Number(Number::from(int32)))
        }
        JsonSchemaType::Number => {
            let number: f64 = trimmed
                .parse()
                .map_err(|_| ConvertError::NotANumber(input.to_string()))?;
            if !number.is_finite() || number.abs() > DECIMAL_MAX_MAGNITUDE {
                return Err(ConvertError::NumberOutOfRange(input.to_string()));
            }
            Number::from_f64(number)
                .map(Value::Number)
                .ok_or_else(|| ConvertError::NotANumber(input.to_string()))
        }
        JsonSchemaType::Boolean => match trimmed {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(ConvertError::NotABoolean(input.to_string())),
        },
    }
}
