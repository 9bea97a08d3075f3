/// Skein Engine Error Types
///
/// Error handling for endpoint, subscriber, publisher and store operations.

use skein_core::error::{Closed, CodecError, ConversionError};
use skein_core::status::ErrorCode;
use std::io;
use thiserror::Error;

/// Main error type for endpoint operations
#[derive(Error, Debug)]
pub enum Error {
    /// A native value has no typed representation (or vice versa)
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// A received payload is not valid wire data
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// The endpoint has been shut down
    #[error("Endpoint closed")]
    Closed,

    /// Another listener already owns this address and port
    #[error("Address in use: {address}:{port}")]
    AddrInUse { address: String, port: u16 },

    /// Listen address cannot be parsed
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// A store operation failed
    #[error("Store error: {0}")]
    Store(ErrorCode),

    /// IO error while setting up endpoint resources
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias for endpoint operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<Closed> for Error {
    fn from(_: Closed) -> Self {
        Self::Closed
    }
}

impl Error {
    /// Create an invalid address error
    pub fn invalid_address(addr: impl Into<String>) -> Self {
        Self::InvalidAddress(addr.into())
    }

    /// Check if the error comes from using a handle the wrong way
    #[must_use]
    pub const fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::Closed | Self::AddrInUse { .. } | Self::InvalidAddress(_)
        )
    }

    /// Check if retrying the same call may succeed
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ),
            Self::AddrInUse { .. } => true,
            Self::Store(code) => {
                matches!(code, ErrorCode::RequestTimeout | ErrorCode::NoSuchMaster)
            }
            _ => false,
        }
    }
}
