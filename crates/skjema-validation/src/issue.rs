use bitflags::bitflags;
use serde::Deserialize;
use serde::Serialize;
use skjema_data::DataModelReference;

/// Issue severity, ordered so that `Error` compares greatest.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Maps the numeric severity of backend issues. `4` marks an issue
    /// the backend considers fixed; it carries no message to show.
    #[must_use]
    pub fn from_backend(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Error),
            2 => Some(Self::Warning),
            3 => Some(Self::Info),
            5 => Some(Self::Success),
            _ => None,
        }
    }
}

bitflags! {
    /// Which categories of issues a node currently shows. An issue whose
    /// category is empty cannot be masked away.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ValidationMask: u8 {
        const REQUIRED = 1;
        const SCHEMA = 1 << 1;
        const EXPRESSION = 1 << 2;
        const COMPONENT = 1 << 3;
        const BACKEND = 1 << 4;
        const CUSTOM_BACKEND = 1 << 5;
    }
}

impl ValidationMask {
    /// The default visibility before the user touches a field or tries
    /// to submit: everything except required-ness.
    #[must_use]
    pub fn default_visible() -> Self {
        Self::all() & !Self::REQUIRED
    }

    /// Parses one `showValidations` entry from a component declaration.
    #[must_use]
    pub fn from_setting_name(name: &str) -> Option<Self> {
        match name {
            "Required" => Some(Self::REQUIRED),
            "Schema" => Some(Self::SCHEMA),
            "Expression" => Some(Self::EXPRESSION),
            "Component" => Some(Self::COMPONENT),
            "Backend" => Some(Self::BACKEND),
            "CustomBackend" => Some(Self::CUSTOM_BACKEND),
            "AllExceptRequired" => Some(Self::default_visible()),
            "All" => Some(Self::all()),
            _ => None,
        }
    }
}

/// A resolvable message: a text key plus its substitution params.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub key: String,
    pub params: Vec<String>,
}

impl Message {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.params.push(param.into());
        self
    }
}

/// One validation finding, addressed to a concrete (indexed) field when
/// the source knows one.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationIssue {
    pub field: Option<DataModelReference>,
    pub severity: Severity,
    pub source: String,
    pub category: ValidationMask,
    pub message: Message,
    /// The schema keyword behind the issue, consulted by component
    /// validation filters.
    pub keyword: Option<String>,
    pub code: Option<String>,
}

impl ValidationIssue {
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        category: ValidationMask,
        severity: Severity,
        message: Message,
    ) -> Self {
        Self {
            field: None,
            severity,
            source: source.into(),
            category,
            message,
            keyword: None,
            code: None,
        }
    }

    #[must_use]
    pub fn with_field(mut self, field: DataModelReference) -> Self {
        self.field = Some(field);
        self
    }

    #[must_use]
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_error_greatest() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
        assert!(Severity::Info > Severity::Success);
    }

    #[test]
    fn default_mask_hides_required_only() {
        let mask = ValidationMask::default_visible();
        assert!(!mask.contains(ValidationMask::REQUIRED));
        assert!(mask.contains(ValidationMask::SCHEMA));
        assert!(mask.contains(ValidationMask::CUSTOM_BACKEND));
    }

    #[test]
    fn mask_names_parse() {
        assert_eq!(
            ValidationMask::from_setting_name("Required"),
            Some(ValidationMask::REQUIRED)
        );
        assert_eq!(ValidationMask::from_setting_name("All"), Some(ValidationMask::all()));
        assert_eq!(ValidationMask::from_setting_name("bogus"), None);
    }
}
