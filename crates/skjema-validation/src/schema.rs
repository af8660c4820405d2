//! Structural validation of a data model against its JSON Schema.
//!
//! This is a deliberate subset of draft-07: the keywords forms actually
//! use, with the platform's keyword-to-text-key mapping. `required` and
//! `oneOf` findings are suppressed here (empty-field validation owns
//! required-ness), as is any finding on an empty or null value.

use regex::Regex;
use serde_json::Value;
use skjema_data::DataModelReference;

use crate::issue::Message;
use crate::issue::Severity;
use crate::issue::ValidationIssue;
use crate::issue::ValidationMask;
use crate::source;

const MAX_REF_DEPTH: usize = 32;

/// Validates one data model against the schema document for its data
/// type. `data_type` is only used to address the emitted issues.
#[must_use]
pub fn validate_against_schema(
    model: &Value,
    schema: &Value,
    data_type: &str,
) -> Vec<ValidationIssue> {
    let root = root_element(schema);
    let mut walker = Walker {
        doc: schema,
        data_type,
        out: Vec::new(),
    };
    walker.walk(model, root, &mut String::new());
    walker.out
}

/// Locates the root element subschema. Schemas generated from XSD wrap
/// the payload in a single property holding a `$ref`; plain schemas are
/// their own root.
fn root_element(schema: &Value) -> &Value {
    let pointer = schema
        .get("info")
        .and_then(|info| info.get("rootNode"))
        .and_then(Value::as_str)
        .or_else(|| {
            let name = schema
                .get("info")
                .and_then(|info| info.get("meldingsnavn"))
                .and_then(Value::as_str);
            let properties = schema.get("properties")?.as_object()?;
            let root = match name {
                Some(name) => properties.get(name)?,
                None => properties.values().next()?,
            };
            root.get("$ref")?.as_str()
        });
    match pointer {
        Some(pointer) if !pointer.is_empty() => {
            resolve_pointer(schema, pointer).unwrap_or(schema)
        }
        _ => schema,
    }
}

fn resolve_pointer<'s>(doc: &'s Value, reference: &str) -> Option<&'s Value> {
    doc.pointer(reference.trim_start_matches('#'))
}

struct Walker<'a> {
    doc: &'a Value,
    data_type: &'a str,
    out: Vec<ValidationIssue>,
}

impl<'a> Walker<'a> {
    fn walk(&mut self, value: &Value, subschema: &'a Value, path: &mut String) {
        let Some(subschema) = self.deref(subschema) else {
            return;
        };

        match value {
            Value::Object(fields) => {
                if let Some(properties) = subschema.get("properties").and_then(Value::as_object) {
                    for (name, child_schema) in properties {
                        if let Some(child) = fields.get(name) {
                            let len = path.len();
                            if !path.is_empty() {
                                path.push('.');
                            }
                            path.push_str(name);
                            self.walk(child, child_schema, path);
                            path.truncate(len);
                        }
                    }
                }
            }
            Value::Array(items) => {
                self.check_array(items, subschema, path);
                if let Some(item_schema) = subschema.get("items") {
                    for (index, item) in items.iter().enumerate() {
                        let len = path.len();
                        path.push_str(&format!("[{index}]"));
                        self.walk(item, item_schema, path);
                        path.truncate(len);
                    }
                }
            }
            Value::Null => {}
            scalar => self.check_scalar(scalar, subschema, path),
        }
    }

    fn deref(&self, mut subschema: &'a Value) -> Option<&'a Value> {
        let mut depth = 0;
        while let Some(reference) = subschema.get("$ref").and_then(Value::as_str) {
            subschema = resolve_pointer(self.doc, reference)?;
            depth += 1;
            if depth > MAX_REF_DEPTH {
                return None;
            }
        }
        Some(subschema)
    }

    fn check_array(&mut self, items: &[Value], subschema: &Value, path: &str) {
        if let Some(min) = subschema.get("minItems").and_then(Value::as_u64) {
            if (items.len() as u64) < min {
                self.emit(path, subschema, "minItems", min.to_string());
            }
        }
        if let Some(max) = subschema.get("maxItems").and_then(Value::as_u64) {
            if items.len() as u64 > max {
                self.emit(path, subschema, "maxItems", max.to_string());
            }
        }
    }

    fn check_scalar(&mut self, value: &Value, subschema: &Value, path: &str) {
        // Findings on empty values are suppressed; emptiness is the
        // required-field source's concern.
        if value.as_str().is_some_and(str::is_empty) {
            return;
        }

        if let Some(expected) = subschema.get("type") {
            if !type_matches(value, expected) {
                let name = expected.as_str().unwrap_or("value").to_string();
                self.emit(path, subschema, "type", name);
                return;
            }
        }

        if let Some(allowed) = subschema.get("enum").and_then(Value::as_array) {
            if !allowed.contains(value) {
                self.emit(path, subschema, "enum", join_values(allowed));
            }
        }
        if let Some(expected) = subschema.get("const") {
            if value != expected {
                self.emit(path, subschema, "const", join_values(&[expected.clone()]));
            }
        }

        if let Some(text) = value.as_str() {
            self.check_string(text, subschema, path);
        }
        if let Some(number) = value.as_f64() {
            self.check_number(number, subschema, path);
        }
    }

    fn check_string(&mut self, text: &str, subschema: &Value, path: &str) {
        let length = text.chars().count() as u64;
        if let Some(min) = subschema.get("minLength").and_then(Value::as_u64) {
            if length < min {
                self.emit(path, subschema, "minLength", min.to_string());
            }
        }
        if let Some(max) = subschema.get("maxLength").and_then(Value::as_u64) {
            if length > max {
                self.emit(path, subschema, "maxLength", max.to_string());
            }
        }
        if let Some(pattern) = subschema.get("pattern").and_then(Value::as_str) {
            match Regex::new(pattern) {
                Ok(regex) => {
                    if !regex.is_match(text) {
                        self.emit(path, subschema, "pattern", pattern.to_string());
                    }
                }
                Err(err) => {
                    tracing::warn!(pattern, error = %err, "unsupported schema pattern, skipping");
                }
            }
        }
        if let Some(format) = subschema.get("format").and_then(Value::as_str) {
            let ok = match format {
                "year" => text.len() == 4 && text.bytes().all(|b| b.is_ascii_digit()),
                "year-month" => is_year_month(text),
                // Other formats are annotations only.
                _ => true,
            };
            if !ok {
                self.emit(path, subschema, "format", format.to_string());
            }
        }
    }

    fn check_number(&mut self, number: f64, subschema: &Value, path: &str) {
        let bound = |key: &str| subschema.get(key).and_then(Value::as_f64);
        if let Some(min) = bound("minimum") {
            if number < min {
                self.emit(path, subschema, "minimum", min.to_string());
            }
        }
        if let Some(min) = bound("exclusiveMinimum") {
            if number <= min {
                self.emit(path, subschema, "exclusiveMinimum", min.to_string());
            }
        }
        if let Some(max) = bound("maximum") {
            if number > max {
                self.emit(path, subschema, "maximum", max.to_string());
            }
        }
        if let Some(max) = bound("exclusiveMaximum") {
            if number >= max {
                self.emit(path, subschema, "exclusiveMaximum", max.to_string());
            }
        }
        if let Some(step) = bound("multipleOf") {
            if step > 0.0 && (number / step - (number / step).round()).abs() > 1e-9 {
                self.emit(path, subschema, "multipleOf", step.to_string());
            }
        }
    }

    fn emit(&mut self, path: &str, subschema: &Value, keyword: &str, param: String) {
        let Some(text_key) = keyword_text_key(keyword) else {
            return;
        };
        // A schema author may override the message for a field.
        let message = match subschema.get("errorMessage").and_then(Value::as_str) {
            Some(custom) => Message::new(custom),
            None => Message::new(format!("validation_errors.{text_key}")).with_param(param),
        };
        self.out.push(
            ValidationIssue::new(source::SCHEMA, ValidationMask::SCHEMA, Severity::Error, message)
                .with_field(DataModelReference::new(self.data_type, path))
                .with_keyword(keyword),
        );
    }
}

/// The platform's keyword-to-text-key table. `required` and `oneOf` are
/// absent on purpose: this source never reports them.
fn keyword_text_key(keyword: &str) -> Option<&'static str> {
    match keyword {
        "minimum" | "exclusiveMinimum" => Some("min"),
        "maximum" | "exclusiveMaximum" => Some("max"),
        "minLength" => Some("minLength"),
        "maxLength" => Some("maxLength"),
        "pattern" | "format" | "type" => Some("pattern"),
        "enum" | "const" => Some("enum"),
        "multipleOf" => Some("multipleOf"),
        "minItems" => Some("minItems"),
        "maxItems" => Some("maxItems"),
        "anyOf" => Some("anyOf"),
        "allOf" => Some("allOf"),
        "not" => Some("not"),
        _ => None,
    }
}

fn type_matches(value: &Value, expected: &Value) -> bool {
    match expected {
        Value::String(name) => match name.as_str() {
            "string" => value.is_string(),
            "number" => value.is_number(),
            "integer" => value.as_f64().is_some_and(|n| n.fract() == 0.0),
            "boolean" => value.is_boolean(),
            "object" => value.is_object(),
            "array" => value.is_array(),
            "null" => value.is_null(),
            _ => true,
        },
        Value::Array(names) => names.iter().any(|name| type_matches(value, name)),
        _ => true,
    }
}

fn is_year_month(text: &str) -> bool {
    let Some((year, month)) = text.split_once('-') else {
        return false;
    };
    year.len() == 4
        && year.bytes().all(|b| b.is_ascii_digit())
        && matches!(month.parse::<u8>(), Ok(1..=12))
        && month.len() == 2
}

fn join_values(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
