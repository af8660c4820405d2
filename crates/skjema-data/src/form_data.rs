use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::path::DataModelReference;
use crate::path::FieldPath;

/// Read-only snapshot of the current form data, keyed by data type.
///
/// The engine never writes through this type. Edits happen at the
/// asynchronous boundary and arrive here as a whole new snapshot, which is
/// what makes expression evaluation referentially transparent and safe to
/// memoize.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormData {
    models: FxHashMap<String, Value>,
}

impl FormData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_model(mut self, data_type: impl Into<String>, data: Value) -> Self {
        self.models.insert(data_type.into(), data);
        self
    }

    #[must_use]
    pub fn model(&self, data_type: &str) -> Option<&Value> {
        self.models.get(data_type)
    }

    #[must_use]
    pub fn has_model(&self, data_type: &str) -> bool {
        self.models.contains_key(data_type)
    }

    /// Resolves a reference to the value it points at, walking objects by
    /// segment base and arrays by segment index.
    #[must_use]
    pub fn pick(&self, reference: &DataModelReference) -> Option<&Value> {
        let path = reference.parsed_field().ok()?;
        self.pick_path(&reference.data_type, &path)
    }

    #[must_use]
    pub fn pick_path(&self, data_type: &str, path: &FieldPath) -> Option<&Value> {
        let mut current = self.models.get(data_type)?;
        for segment in path.segments() {
            current = current.as_object()?.get(&segment.base)?;
            if let Some(index) = segment.index {
                current = current.as_array()?.get(index)?;
            }
        }
        Some(current)
    }

    /// The scalar view expressions see: strings, numbers and booleans come
    /// through as-is, anything else (missing, object, array) is `None`.
    #[must_use]
    pub fn pick_simple(&self, reference: &DataModelReference) -> Option<Value> {
        match self.pick(reference)? {
            value @ (Value::String(_) | Value::Number(_) | Value::Bool(_)) => Some(value.clone()),
            _ => None,
        }
    }

    /// Current number of rows in the array the reference points at, or
    /// `None` when the value is absent or not an array.
    #[must_use]
    pub fn row_count(&self, reference: &DataModelReference) -> Option<usize> {
        self.pick(reference).and_then(Value::as_array).map(Vec::len)
    }
}
