use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("empty field path")]
    Empty,
    #[error("empty segment in field path '{0}'")]
    EmptySegment(String),
    #[error("malformed index in field path '{0}'")]
    MalformedIndex(String),
}

/// One dotted segment of a data model path, e.g. `Persons[2]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Segment {
    pub base: String,
    pub index: Option<usize>,
}

/// A parsed dotted/indexed data model path, e.g. `Group[0].Nested[2].Field`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn parse(input: &str) -> Result<Self, PathError> {
        if input.is_empty() {
            return Err(PathError::Empty);
        }

        let mut segments = Vec::new();
        for part in input.split('.') {
            if part.is_empty() {
                return Err(PathError::EmptySegment(input.to_string()));
            }

            match part.split_once('[') {
                None => {
                    if part.contains(']') {
                        return Err(PathError::MalformedIndex(input.to_string()));
                    }
                    segments.push(Segment {
                        base: part.to_string(),
                        index: None,
                    });
                }
                Some((base, rest)) => {
                    let Some(digits) = rest.strip_suffix(']') else {
                        return Err(PathError::MalformedIndex(input.to_string()));
                    };
                    if base.is_empty() {
                        return Err(PathError::EmptySegment(input.to_string()));
                    }
                    let index = digits
                        .parse::<usize>()
                        .map_err(|_| PathError::MalformedIndex(input.to_string()))?;
                    segments.push(Segment {
                        base: base.to_string(),
                        index: Some(index),
                    });
                }
            }
        }

        Ok(Self { segments })
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The same path with every array index stripped, i.e. the path as it
    /// appears in component declarations before repeating-group expansion.
    #[must_use]
    pub fn without_indices(&self) -> Self {
        Self {
            segments: self
                .segments
                .iter()
                .map(|s| Segment {
                    base: s.base.clone(),
                    index: None,
                })
                .collect(),
        }
    }

    /// Concrete indices in outer-to-inner order.
    #[must_use]
    pub fn indices(&self) -> Vec<usize> {
        self.segments.iter().filter_map(|s| s.index).collect()
    }

    /// Whether `prefix` matches the leading segments of this path,
    /// comparing bases only (indices are ignored).
    #[must_use]
    pub fn starts_with_bases(&self, prefix: &FieldPath) -> bool {
        if prefix.segments.len() > self.segments.len() {
            return false;
        }
        prefix
            .segments
            .iter()
            .zip(&self.segments)
            .all(|(p, s)| p.base == s.base)
    }

    /// Returns a copy with the last segment pinned to `index`, turning a
    /// group binding into the path of one of its rows.
    #[must_use]
    pub fn with_trailing_index(&self, index: usize) -> FieldPath {
        let mut out = self.clone();
        if let Some(last) = out.segments.last_mut() {
            last.index = Some(index);
        }
        out
    }

    /// Transposes `self` into the row context of `current_location`.
    ///
    /// Walks both paths while the segment bases match and copies concrete
    /// indices from the location onto un-indexed segments of the subject.
    /// Stops early at the first base mismatch, and also when the subject
    /// already carries its own index for a segment: an authored index
    /// wins over the ambient row context.
    #[must_use]
    pub fn transpose(&self, current_location: &FieldPath) -> FieldPath {
        let mut out = self.clone();
        for (ours, theirs) in current_location.segments.iter().zip(&mut out.segments) {
            if ours.base != theirs.base {
                break;
            }
            let Some(index) = ours.index else {
                continue;
            };
            if theirs.index.is_some() {
                break;
            }
            theirs.index = Some(index);
        }
        out
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&segment.base)?;
            if let Some(index) = segment.index {
                write!(f, "[{index}]")?;
            }
        }
        Ok(())
    }
}

/// A named reference into the data model: which data type, and which field
/// inside it. The field is kept in its external dotted/indexed syntax.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataModelReference {
    #[serde(rename = "dataType")]
    pub data_type: String,
    pub field: String,
}

impl DataModelReference {
    #[must_use]
    pub fn new(data_type: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            data_type: data_type.into(),
            field: field.into(),
        }
    }

    pub fn parsed_field(&self) -> Result<FieldPath, PathError> {
        FieldPath::parse(&self.field)
    }
}

/// Splits a row-suffixed component id into its base id and row indices.
///
/// Only trailing all-numeric dash segments count as indices; a component
/// authored as `my-component` keeps its dashes.
#[must_use]
pub fn split_dashed_key(key: &str) -> (String, Vec<usize>) {
    let mut base_parts: Vec<&str> = key.split('-').collect();
    let mut indices_rev = Vec::new();

    while base_parts.len() > 1 {
        let last = base_parts[base_parts.len() - 1];
        if last.is_empty() || !last.bytes().all(|b| b.is_ascii_digit()) {
            break;
        }
        match last.parse::<usize>() {
            Ok(index) => {
                indices_rev.push(index);
                base_parts.pop();
            }
            Err(_) => break,
        }
    }

    indices_rev.reverse();
    (base_parts.join("-"), indices_rev)
}
