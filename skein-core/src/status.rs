//! Status and error notifications.
//!
//! Endpoints report peering and store events as [`Status`] values. On the
//! wire they travel as ordinary [`Data`] on the reserved topics
//! [`topics::STATUSES`](crate::topic::topics::STATUSES) and
//! [`topics::ERRORS`](crate::topic::topics::ERRORS), encoded as
//!
//! ```text
//! [ "status" | "error", code, context, message ]
//! ```
//!
//! where `context` is either `nil` or `[node, [address, port, retry] | nil]`.

use crate::convert::{FromData, IntoData};
use crate::data::{Data, EnumValue, Timespan};
use crate::error::ConversionError;

use std::fmt;
use std::time::Duration;

/// Non-error status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StatusCode {
    Unspecified = 0,
    PeerAdded = 1,
    PeerRemoved = 2,
    PeerLost = 3,
    EndpointDiscovered = 4,
    EndpointUnreachable = 5,
}

impl StatusCode {
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Unspecified,
            1 => Self::PeerAdded,
            2 => Self::PeerRemoved,
            3 => Self::PeerLost,
            4 => Self::EndpointDiscovered,
            5 => Self::EndpointUnreachable,
            _ => return None,
        })
    }
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCode {
    Unspecified = 1,
    PeerIncompatible = 2,
    PeerInvalid = 3,
    PeerUnavailable = 4,
    PeerDisconnectDuringHandshake = 5,
    PeerTimeout = 6,
    MasterExists = 7,
    NoSuchMaster = 8,
    NoSuchKey = 9,
    RequestTimeout = 10,
    TypeClash = 11,
    InvalidData = 12,
    BackendFailure = 13,
    StaleData = 14,
    ShuttingDown = 15,
}

impl ErrorCode {
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            1 => Self::Unspecified,
            2 => Self::PeerIncompatible,
            3 => Self::PeerInvalid,
            4 => Self::PeerUnavailable,
            5 => Self::PeerDisconnectDuringHandshake,
            6 => Self::PeerTimeout,
            7 => Self::MasterExists,
            8 => Self::NoSuchMaster,
            9 => Self::NoSuchKey,
            10 => Self::RequestTimeout,
            11 => Self::TypeClash,
            12 => Self::InvalidData,
            13 => Self::BackendFailure,
            14 => Self::StaleData,
            15 => Self::ShuttingDown,
            _ => return None,
        })
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A status or error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    Status(StatusCode),
    Error(ErrorCode),
}

impl From<StatusCode> for Code {
    fn from(c: StatusCode) -> Self {
        Self::Status(c)
    }
}

impl From<ErrorCode> for Code {
    fn from(c: ErrorCode) -> Self {
        Self::Error(c)
    }
}

impl PartialEq<StatusCode> for Code {
    fn eq(&self, other: &StatusCode) -> bool {
        matches!(self, Self::Status(c) if c == other)
    }
}

impl PartialEq<ErrorCode> for Code {
    fn eq(&self, other: &ErrorCode) -> bool {
        matches!(self, Self::Error(c) if c == other)
    }
}

/// Opaque identity of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EndpointId(pub u64);

impl EndpointId {
    /// Placeholder for peers whose identity is not known yet.
    pub const UNKNOWN: Self = Self(0);

    #[must_use]
    pub const fn is_unknown(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Where a peer can be reached.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NetworkInfo {
    pub address: String,
    pub port: u16,
    pub retry: Duration,
}

impl NetworkInfo {
    pub fn new(address: impl Into<String>, port: u16, retry: Duration) -> Self {
        Self {
            address: address.into(),
            port,
            retry,
        }
    }
}

impl fmt::Display for NetworkInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// The endpoint a status refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointInfo {
    pub node: EndpointId,
    pub network: Option<NetworkInfo>,
}

/// A status or error notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    code: Code,
    context: Option<EndpointInfo>,
    message: String,
}

impl Status {
    pub fn new(
        code: impl Into<Code>,
        context: Option<EndpointInfo>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            context,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn code(&self) -> Code {
        self.code
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.code, Code::Error(_))
    }

    #[must_use]
    pub const fn context(&self) -> Option<&EndpointInfo> {
        self.context.as_ref()
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Code::Status(c) => write!(f, "{c:?}")?,
            Code::Error(c) => write!(f, "error({c:?})")?,
        }
        if let Some(ctx) = &self.context {
            write!(f, " [{}", ctx.node)?;
            if let Some(net) = &ctx.network {
                write!(f, " @ {net}")?;
            }
            f.write_str("]")?;
        }
        write!(f, ": {}", self.message)
    }
}

fn retry_to_data(retry: Duration) -> Data {
    Data::Timespan(Timespan::from_nanos(
        i64::try_from(retry.as_nanos()).unwrap_or(i64::MAX),
    ))
}

impl IntoData for &EndpointInfo {
    fn into_data(self) -> Result<Data, ConversionError> {
        let network = match &self.network {
            Some(n) => Data::Vector(vec![
                Data::String(n.address.clone()),
                Data::Count(u64::from(n.port)),
                retry_to_data(n.retry),
            ]),
            None => Data::None,
        };
        Ok(Data::Vector(vec![Data::Count(self.node.0), network]))
    }
}

impl FromData for EndpointInfo {
    fn from_data(data: &Data) -> Result<Self, ConversionError> {
        let (node, network): (u64, Option<(String, u16, Duration)>) = FromData::from_data(data)?;
        Ok(Self {
            node: EndpointId(node),
            network: network.map(|(address, port, retry)| NetworkInfo {
                address,
                port,
                retry,
            }),
        })
    }
}

impl IntoData for &Status {
    fn into_data(self) -> Result<Data, ConversionError> {
        let (kind, code) = match self.code {
            Code::Status(c) => ("status", c as u8),
            Code::Error(c) => ("error", c as u8),
        };
        let context = match &self.context {
            Some(ctx) => ctx.into_data()?,
            None => Data::None,
        };
        Ok(Data::Vector(vec![
            Data::EnumValue(EnumValue::new(kind)),
            Data::Count(u64::from(code)),
            context,
            Data::String(self.message.clone()),
        ]))
    }
}

impl IntoData for Status {
    fn into_data(self) -> Result<Data, ConversionError> {
        (&self).into_data()
    }
}

impl FromData for Status {
    fn from_data(data: &Data) -> Result<Self, ConversionError> {
        let (kind, code, context, message): (EnumValue, u8, Option<EndpointInfo>, String) =
            FromData::from_data(data)?;
        let code = match kind.name() {
            "status" => StatusCode::from_u8(code).map(Code::Status),
            "error" => ErrorCode::from_u8(code).map(Code::Error),
            _ => None,
        }
        .ok_or_else(|| ConversionError::malformed(format!("status code {kind}/{code}")))?;
        Ok(Self {
            code,
            context,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_survives_data_round_trip() {
        let status = Status::new(
            StatusCode::PeerAdded,
            Some(EndpointInfo {
                node: EndpointId(0xdead_beef),
                network: Some(NetworkInfo::new("127.0.0.1", 9999, Duration::from_secs(1))),
            }),
            "handshake successful",
        );
        let data = status.clone().into_data().unwrap();
        assert_eq!(Status::from_data(&data).unwrap(), status);
    }

    #[test]
    fn error_without_context() {
        let status = Status::new(ErrorCode::PeerUnavailable, None, "unable to connect");
        let data = (&status).into_data().unwrap();
        let back = Status::from_data(&data).unwrap();
        assert!(back.is_error());
        assert_eq!(back.code(), ErrorCode::PeerUnavailable);
        assert!(back.context().is_none());
    }

    #[test]
    fn unknown_code_is_rejected() {
        let data = crate::vector![EnumValue::new("error"), 99u64, Data::None, "x"];
        assert!(Status::from_data(&data).is_err());
    }

    #[test]
    fn endpoint_id_display_is_fixed_width_hex() {
        assert_eq!(EndpointId(0xab).to_string(), "00000000000000ab");
    }
}
