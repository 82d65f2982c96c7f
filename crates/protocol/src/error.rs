//! Protocol error types
//!
//! Errors that can occur while decoding wire-format bytes, encoding dynamic
//! messages, or loading a serialized descriptor set.

use thiserror::Error;

/// Errors that can occur during codec operations
#[derive(Debug, Error)]
pub enum ProtoError {
    /// Varint ran out of bytes before a terminating byte was seen
    #[error("invalid varint value at offset {offset}")]
    BadVarint { offset: usize },

    /// Fixed-width value ran past the end of the input
    #[error("invalid {width}-bit value at offset {offset}")]
    BadFixed { width: u32, offset: usize },

    /// A length prefix declared more bytes than remain in the input
    #[error("un-finished bytes (len {len} at offset {offset})")]
    TruncatedBytes { len: u64, offset: usize },

    /// A group field never reached its matching end-group tag
    #[error("un-finished group (field {field_number} at offset {offset})")]
    UnterminatedGroup { field_number: u32, offset: usize },

    /// Known field arrived with a wire type its declared kind cannot accept
    #[error(
        "type mismatch for field '{field}' at offset {offset}, \
         {expected} expected for type {kind}, got {actual}"
    )]
    WireTypeMismatch {
        field: String,
        kind: &'static str,
        expected: &'static str,
        actual: &'static str,
        offset: usize,
    },

    /// Value supplied for a field does not match its declared kind
    #[error("{expected} expected for field '{field}', got {actual}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Enum field was given a symbolic name the enum type does not declare
    #[error("can not encode unknown enum '{value}' at field '{field}'")]
    UnknownEnum { field: String, value: String },

    /// Registry lookup named a type that was never loaded
    #[error("type '{0}' does not exist")]
    UnknownType(String),

    /// String form of an integer value could not be parsed
    #[error("integer format error: '{0}'")]
    BadInteger(String),

    /// Descriptor parsing stopped at the given offset
    #[error("invalid descriptor data at offset {offset}")]
    BadDescriptor { offset: usize },
}

impl ProtoError {
    /// Create a malformed-varint error
    #[inline]
    pub fn bad_varint(offset: usize) -> Self {
        Self::BadVarint { offset }
    }

    /// Create a truncated fixed-width value error
    #[inline]
    pub fn bad_fixed(width: u32, offset: usize) -> Self {
        Self::BadFixed { width, offset }
    }

    /// Create a truncated length-prefixed payload error
    #[inline]
    pub fn truncated_bytes(len: u64, offset: usize) -> Self {
        Self::TruncatedBytes { len, offset }
    }

    /// Create an encode type mismatch error
    #[inline]
    pub fn type_mismatch(field: impl Into<String>, expected: &'static str, actual: &'static str) -> Self {
        Self::TypeMismatch {
            field: field.into(),
            expected,
            actual,
        }
    }

    /// Create an unknown type error
    #[inline]
    pub fn unknown_type(name: impl Into<String>) -> Self {
        Self::UnknownType(name.into())
    }

    /// Byte offset at which a decode or load failure occurred, if any
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::BadVarint { offset }
            | Self::BadFixed { offset, .. }
            | Self::TruncatedBytes { offset, .. }
            | Self::UnterminatedGroup { offset, .. }
            | Self::WireTypeMismatch { offset, .. }
            | Self::BadDescriptor { offset } => Some(*offset),
            _ => None,
        }
    }
}
