/// Skein core error types
///
/// Conversion between native values and [`Data`](crate::data::Data), and
/// decoding of the wire representation.

use crate::data::{DataType, Family};
use thiserror::Error;

/// A native value or a data tag has no corresponding mapping.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// The data carries a different tag than the one requested
    #[error("type mismatch: expected {expected}, found {actual}")]
    TypeMismatch { expected: DataType, actual: DataType },

    /// Address family does not match the requested native address type
    #[error("address family mismatch: expected {expected}, found {actual}")]
    FamilyMismatch { expected: Family, actual: Family },

    /// Numeric value does not fit the target type
    #[error("value {value} out of range for {target}")]
    OutOfRange { value: String, target: &'static str },

    /// Byte buffer cannot be interpreted as an address of the given family
    #[error("invalid {family} address: {len} bytes")]
    InvalidAddress { len: usize, family: Family },

    /// Prefix length exceeds the width of the address family
    #[error("invalid prefix length {length} for {family} subnet")]
    InvalidPrefix { length: u8, family: Family },

    /// Numeric tag does not name a data type
    #[error("unsupported data type tag: {0}")]
    UnknownTag(u8),

    /// Structured value does not have the expected shape
    #[error("malformed {0}")]
    Malformed(String),
}

impl ConversionError {
    /// Create a range error for `value` converted into `target`.
    pub fn out_of_range(value: impl ToString, target: &'static str) -> Self {
        Self::OutOfRange {
            value: value.to_string(),
            target,
        }
    }

    /// Create a malformed-value error with a description.
    pub fn malformed(what: impl Into<String>) -> Self {
        Self::Malformed(what.into())
    }
}

/// Wire decoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Incomplete value")]
    Incomplete,

    #[error("Unknown data tag: {0}")]
    UnknownTag(u8),

    #[error("Invalid UTF-8 in string payload")]
    InvalidUtf8,

    #[error("Invalid address family byte: {0}")]
    InvalidFamily(u8),

    #[error("Invalid port protocol byte: {0}")]
    InvalidProtocol(u8),

    #[error("Invalid boolean byte: {0}")]
    InvalidBoolean(u8),

    #[error("Length prefix overflow")]
    LengthOverflow,

    #[error("Duplicate {0} in container")]
    Duplicate(&'static str),

    #[error("Nesting depth exceeds {0}")]
    DepthExceeded(usize),

    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),

    #[error("Invalid value: {0}")]
    Conversion(#[from] ConversionError),
}

/// Result type alias for wire decoding
pub type Result<T> = std::result::Result<T, CodecError>;

/// The other side of a mailbox is gone.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("mailbox closed")]
pub struct Closed;
