use std::fmt;

use thiserror::Error;

/// Broad failure classes, used by callers that only care which contract
/// was violated rather than the exact rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    UnsupportedType,
    RecursiveType,
    KeySchema,
    Conversion,
    Registry,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ErrorKind {
    // -- resolution --
    #[error("unsupported type shape: {0}")]
    UnsupportedType(String),
    #[error("naive DateTime is not supported; use the offset-aware DateTimeOffset shape instead")]
    NaiveDateTime,
    #[error("recursive type: '{0}' is already being resolved on this call stack")]
    RecursiveType(String),
    #[error("map key type must be string, found {0}")]
    NonStringMapKey(String),
    #[error("set elements must pickle to a scalar S, N or B attribute, found {0}")]
    NonScalarSetElement(String),

    // -- key schema --
    #[error("no hash key declared: mark exactly one field as hash key or declare a constant hash key")]
    MissingHashKey,
    #[error("found {0} fields marked as hash key, expected exactly one")]
    MultipleHashKeys(usize),
    #[error("both a field-level hash key and a constant hash key are declared")]
    ConflictingHashKeys,
    #[error("found {0} range key declarations, expected at most one")]
    MultipleRangeKeys(usize),
    #[error("key attribute '{attribute}' must be of scalar type S, N or B, found {found}")]
    NonScalarKey { attribute: String, found: String },
    #[error("secondary index declares a range key but no hash key")]
    RangeOnlyIndex,
    #[error("secondary index declares {0} hash keys, expected exactly one")]
    DuplicateIndexHashKey(usize),
    #[error("secondary index declares {0} range keys, expected at most one")]
    DuplicateIndexRangeKey(usize),
    #[error("local secondary index requires the record to declare a primary range key")]
    LocalIndexWithoutPrimaryRange,

    // -- conversion --
    #[error("required attribute '{0}' is missing")]
    MissingAttribute(String),
    #[error("attribute type mismatch: expected {expected}, found {actual}")]
    AttributeTypeMismatch {
        expected: &'static str,
        actual: String,
    },
    #[error("value '{value}' is out of range for {target_type}")]
    OutOfRange {
        value: String,
        target_type: &'static str,
    },
    #[error("invalid value '{value}': {message}")]
    InvalidValue { value: String, message: String },
    #[error("unknown enum discriminant {0}")]
    UnknownEnumVariant(i128),
    #[error("unknown union case '{0}'")]
    UnknownUnionCase(String),

    // -- registry --
    #[error("duplicate shape definition '{0}'")]
    DuplicateDefinition(String),
    #[error("unknown shape definition '{0}'")]
    UnknownDefinition(String),
}

impl ErrorKind {
    pub fn class(&self) -> ErrorClass {
        match self {
            ErrorKind::UnsupportedType(_)
            | ErrorKind::NaiveDateTime
            | ErrorKind::NonStringMapKey(_)
            | ErrorKind::NonScalarSetElement(_) => ErrorClass::UnsupportedType,
            ErrorKind::RecursiveType(_) => ErrorClass::RecursiveType,
            ErrorKind::MissingHashKey
            | ErrorKind::MultipleHashKeys(_)
            | ErrorKind::ConflictingHashKeys
            | ErrorKind::MultipleRangeKeys(_)
            | ErrorKind::NonScalarKey { .. }
            | ErrorKind::RangeOnlyIndex
            | ErrorKind::DuplicateIndexHashKey(_)
            | ErrorKind::DuplicateIndexRangeKey(_)
            | ErrorKind::LocalIndexWithoutPrimaryRange => ErrorClass::KeySchema,
            ErrorKind::MissingAttribute(_)
            | ErrorKind::AttributeTypeMismatch { .. }
            | ErrorKind::OutOfRange { .. }
            | ErrorKind::InvalidValue { .. }
            | ErrorKind::UnknownEnumVariant(_)
            | ErrorKind::UnknownUnionCase(_) => ErrorClass::Conversion,
            ErrorKind::DuplicateDefinition(_) | ErrorKind::UnknownDefinition(_) => {
                ErrorClass::Registry
            }
        }
    }
}

/// Error raised by resolution, key-schema extraction and conversion.
///
/// Carries the structural context (type, field, index) needed to pinpoint
/// the exact declaration responsible; these are schema-authoring mistakes
/// meant to be caught at first use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamapError {
    pub type_name: Option<String>,
    pub field_name: Option<String>,
    pub index_name: Option<String>,
    pub kind: ErrorKind,
}

impl DynamapError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            type_name: None,
            field_name: None,
            index_name: None,
            kind,
        }
    }

    pub fn for_type(kind: ErrorKind, type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            field_name: None,
            index_name: None,
            kind,
        }
    }

    /// Attach the enclosing type if no type context is recorded yet.
    /// The innermost context wins, so the offending declaration is named.
    pub fn in_type(mut self, type_name: &str) -> Self {
        if self.type_name.is_none() {
            self.type_name = Some(type_name.to_string());
        }
        self
    }

    /// Attach the enclosing field if no field context is recorded yet.
    pub fn in_field(mut self, field_name: &str) -> Self {
        if self.field_name.is_none() {
            self.field_name = Some(field_name.to_string());
        }
        self
    }

    pub fn in_index(mut self, index_name: &str) -> Self {
        if self.index_name.is_none() {
            self.index_name = Some(index_name.to_string());
        }
        self
    }

    pub fn class(&self) -> ErrorClass {
        self.kind.class()
    }
}

impl fmt::Display for DynamapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.type_name {
            Some(name) => write!(f, "error in type '{name}'")?,
            None => write!(f, "error")?,
        }

        if let Some(ref field) = self.field_name {
            write!(f, " field '{field}'")?;
        }

        if let Some(ref index) = self.index_name {
            write!(f, " (index '{index}')")?;
        }

        write!(f, ": {}", self.kind)
    }
}

impl std::error::Error for DynamapError {}
