//! String-snapshot inputs. I/O happens outside the database; callers
//! hand in serialized documents and bump `revision` to invalidate.

/// The layout set and its settings file, as authored.
#[salsa::input]
pub struct LayoutSource {
    #[returns(ref)]
    pub text: String,
    #[returns(ref)]
    pub settings_text: String,
    /// The revision number for invalidation tracking
    pub revision: u64,
}

/// The current form data for the default data type.
#[salsa::input]
pub struct FormDataSource {
    #[returns(ref)]
    pub text: String,
    pub revision: u64,
}

/// The JSON Schema document for one data type.
#[salsa::input]
pub struct SchemaSource {
    #[returns(ref)]
    pub text: String,
    #[returns(ref)]
    pub data_type: String,
    pub revision: u64,
}
