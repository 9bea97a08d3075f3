//! Typed data model.
//!
//! [`Data`] is the closed set of values a skein endpoint can transmit. Every
//! variant is an owned, immutable record; containers nest arbitrarily.
//!
//! Equality, ordering and hashing are structural: the tag is compared first,
//! then the payload. Values with different tags are never equal, so
//! `Integer(1)`, `Count(1)`, `Real(1.0)` and `Boolean(true)` are four
//! distinct set members or table keys.

use crate::error::ConversionError;

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// A container of sequential data.
pub type Vector = Vec<Data>;

/// An ordered container of unique values.
pub type Set = BTreeSet<Data>;

/// An ordered container that maps unique keys to values.
pub type Table = BTreeMap<Data, Data>;

/// Variant tags of [`Data`], in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum DataType {
    None = 0,
    Boolean = 1,
    Count = 2,
    Integer = 3,
    Real = 4,
    String = 5,
    Address = 6,
    Subnet = 7,
    Port = 8,
    Timestamp = 9,
    Timespan = 10,
    EnumValue = 11,
    Set = 12,
    Table = 13,
    Vector = 14,
}

impl DataType {
    /// Lowercase name of the tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Boolean => "boolean",
            Self::Count => "count",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::String => "string",
            Self::Address => "address",
            Self::Subnet => "subnet",
            Self::Port => "port",
            Self::Timestamp => "timestamp",
            Self::Timespan => "timespan",
            Self::EnumValue => "enum_value",
            Self::Set => "set",
            Self::Table => "table",
            Self::Vector => "vector",
        }
    }

    /// Wire value of the tag.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for DataType {
    type Error = ConversionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::None,
            1 => Self::Boolean,
            2 => Self::Count,
            3 => Self::Integer,
            4 => Self::Real,
            5 => Self::String,
            6 => Self::Address,
            7 => Self::Subnet,
            8 => Self::Port,
            9 => Self::Timestamp,
            10 => Self::Timespan,
            11 => Self::EnumValue,
            12 => Self::Set,
            13 => Self::Table,
            14 => Self::Vector,
            other => return Err(ConversionError::UnknownTag(other)),
        })
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- addresses ---------------------------------------------------------------

/// IP address family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Family {
    Ipv4,
    Ipv6,
}

impl Family {
    /// Widest valid prefix length for this family.
    #[must_use]
    pub const fn max_prefix(self) -> u8 {
        match self {
            Self::Ipv4 => 32,
            Self::Ipv6 => 128,
        }
    }

    /// Wire value of the family (4 or 6).
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Ipv4 => 4,
            Self::Ipv6 => 6,
        }
    }

    /// Parse a wire family value.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            4 => Some(Self::Ipv4),
            6 => Some(Self::Ipv6),
            _ => None,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ipv4 => f.write_str("IPv4"),
            Self::Ipv6 => f.write_str("IPv6"),
        }
    }
}

const V4_MAPPED_PREFIX: [u8; 12] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xff, 0xff];

/// An IPv4 or IPv6 address.
///
/// Stored as 16 bytes (IPv4 in IPv4-mapped form) plus an explicit family tag.
/// The tag, never the byte pattern, decides how the address is interpreted:
/// `::ffff:1.2.3.4` tagged IPv6 stays an IPv6 address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address {
    family: Family,
    bytes: [u8; 16],
}

impl Address {
    /// Build an address from raw bytes in network order.
    ///
    /// IPv4 accepts 4 bytes or 16 bytes in IPv4-mapped form; IPv6 needs 16.
    pub fn from_bytes(bytes: &[u8], family: Family) -> Result<Self, ConversionError> {
        match (family, bytes.len()) {
            (Family::Ipv4, 4) => Ok(Self::from(Ipv4Addr::new(
                bytes[0], bytes[1], bytes[2], bytes[3],
            ))),
            (Family::Ipv4, 16) if bytes[..12] == V4_MAPPED_PREFIX => {
                let mut raw = [0u8; 16];
                raw.copy_from_slice(bytes);
                Ok(Self { family, bytes: raw })
            }
            (Family::Ipv6, 16) => {
                let mut raw = [0u8; 16];
                raw.copy_from_slice(bytes);
                Ok(Self { family, bytes: raw })
            }
            (family, len) => Err(ConversionError::InvalidAddress { len, family }),
        }
    }

    #[inline]
    #[must_use]
    pub const fn family(&self) -> Family {
        self.family
    }

    #[inline]
    #[must_use]
    pub const fn is_v4(&self) -> bool {
        matches!(self.family, Family::Ipv4)
    }

    #[inline]
    #[must_use]
    pub const fn is_v6(&self) -> bool {
        matches!(self.family, Family::Ipv6)
    }

    /// The 16-byte buffer (IPv4 addresses in mapped form).
    #[inline]
    #[must_use]
    pub const fn bytes(&self) -> &[u8; 16] {
        &self.bytes
    }

    /// Reconstruct the native address using the family tag.
    #[must_use]
    pub fn to_ip(&self) -> IpAddr {
        match self.family {
            Family::Ipv4 => {
                let b = &self.bytes;
                IpAddr::V4(Ipv4Addr::new(b[12], b[13], b[14], b[15]))
            }
            Family::Ipv6 => IpAddr::V6(Ipv6Addr::from(self.bytes)),
        }
    }

    /// Clear every bit after the first `prefix` bits of the address.
    pub fn mask(&self, prefix: u8) -> Result<Self, ConversionError> {
        if prefix > self.family.max_prefix() {
            return Err(ConversionError::InvalidPrefix {
                length: prefix,
                family: self.family,
            });
        }
        let keep_bits = match self.family {
            Family::Ipv4 => 96 + u32::from(prefix),
            Family::Ipv6 => u32::from(prefix),
        };
        let mut bytes = self.bytes;
        for (i, byte) in bytes.iter_mut().enumerate() {
            let start = i as u32 * 8;
            if start >= keep_bits {
                *byte = 0;
            } else if start + 8 > keep_bits {
                *byte &= 0xffu8 << (8 - (keep_bits - start));
            }
        }
        Ok(Self {
            family: self.family,
            bytes,
        })
    }
}

impl From<Ipv4Addr> for Address {
    fn from(ip: Ipv4Addr) -> Self {
        let mut bytes = [0u8; 16];
        bytes[..12].copy_from_slice(&V4_MAPPED_PREFIX);
        bytes[12..].copy_from_slice(&ip.octets());
        Self {
            family: Family::Ipv4,
            bytes,
        }
    }
}

impl From<Ipv6Addr> for Address {
    fn from(ip: Ipv6Addr) -> Self {
        Self {
            family: Family::Ipv6,
            bytes: ip.octets(),
        }
    }
}

impl From<IpAddr> for Address {
    fn from(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => v4.into(),
            IpAddr::V6(v6) => v6.into(),
        }
    }
}

impl FromStr for Address {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<IpAddr>()
            .map(Self::from)
            .map_err(|_| ConversionError::malformed(format!("address '{s}'")))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_ip(), f)
    }
}

/// An IP network: base address plus prefix length.
///
/// The stored address is always the network's base address; host bits of the
/// address passed to [`Subnet::new`] are cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Subnet {
    network: Address,
    length: u8,
}

impl Subnet {
    /// Create a subnet, validating the prefix against the address family.
    pub fn new(address: impl Into<Address>, length: u8) -> Result<Self, ConversionError> {
        let network = address.into().mask(length)?;
        Ok(Self { network, length })
    }

    #[inline]
    #[must_use]
    pub const fn network(&self) -> &Address {
        &self.network
    }

    #[inline]
    #[must_use]
    pub const fn length(&self) -> u8 {
        self.length
    }

    /// Check whether `address` lies inside this network.
    #[must_use]
    pub fn contains(&self, address: &Address) -> bool {
        address.family() == self.network.family()
            && address
                .mask(self.length)
                .is_ok_and(|masked| masked == self.network)
    }
}

impl FromStr for Subnet {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = s
            .split_once('/')
            .ok_or_else(|| ConversionError::malformed(format!("subnet '{s}'")))?;
        let length = len
            .parse::<u8>()
            .map_err(|_| ConversionError::malformed(format!("subnet '{s}'")))?;
        Self::new(addr.parse::<Address>()?, length)
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.length)
    }
}

// --- ports -------------------------------------------------------------------

/// Transport protocol of a [`Port`], numbered like IANA protocol numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum Protocol {
    #[default]
    Unknown = 0,
    Icmp = 1,
    Tcp = 6,
    Udp = 17,
}

impl Protocol {
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Unknown),
            1 => Some(Self::Icmp),
            6 => Some(Self::Tcp),
            17 => Some(Self::Udp),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "?",
            Self::Icmp => "icmp",
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

/// A transport-layer port number with its protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Port {
    number: u16,
    protocol: Protocol,
}

impl Port {
    #[must_use]
    pub const fn new(number: u16, protocol: Protocol) -> Self {
        Self { number, protocol }
    }

    #[inline]
    #[must_use]
    pub const fn number(&self) -> u16 {
        self.number
    }

    #[inline]
    #[must_use]
    pub const fn protocol(&self) -> Protocol {
        self.protocol
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.number, self.protocol.as_str())
    }
}

// --- time --------------------------------------------------------------------

/// Convert float seconds to integral nanoseconds, rounding half to even.
fn nanos_from_secs_f64(secs: f64, target: &'static str) -> Result<i64, ConversionError> {
    if !secs.is_finite() {
        return Err(ConversionError::out_of_range(secs, target));
    }
    let nanos = (secs * 1e9).round_ties_even();
    // i64::MAX is not representable; its f64 neighbour is 2^63.
    if nanos < i64::MIN as f64 || nanos >= i64::MAX as f64 {
        return Err(ConversionError::out_of_range(secs, target));
    }
    Ok(nanos as i64)
}

/// A signed duration with nanosecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timespan(i64);

impl Timespan {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    #[inline]
    #[must_use]
    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    /// Build a timespan from float seconds.
    ///
    /// The double-to-nanosecond step rounds half to even; sub-nanosecond
    /// precision is lost.
    pub fn from_secs_f64(secs: f64) -> Result<Self, ConversionError> {
        nanos_from_secs_f64(secs, "timespan").map(Self)
    }

    #[must_use]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1e9
    }

    /// `(days * 86400 + seconds) * 10^9 + micros * 10^3` nanoseconds, exact.
    pub fn from_parts(days: i64, seconds: i64, micros: i64) -> Result<Self, ConversionError> {
        days.checked_mul(86_400)
            .and_then(|s| s.checked_add(seconds))
            .and_then(|s| s.checked_mul(1_000_000))
            .and_then(|us| us.checked_add(micros))
            .and_then(|us| us.checked_mul(1_000))
            .map(Self)
            .ok_or_else(|| {
                ConversionError::out_of_range(format!("{days}d {seconds}s {micros}us"), "timespan")
            })
    }
}

impl fmt::Display for Timespan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

/// A point in time: signed nanoseconds since 1970-01-01T00:00:00 UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const UNIX_EPOCH: Self = Self(0);

    #[must_use]
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    #[inline]
    #[must_use]
    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    /// Build a timestamp from float seconds since the epoch.
    ///
    /// Rounds half to even at the nanosecond step.
    pub fn from_secs_f64(secs: f64) -> Result<Self, ConversionError> {
        nanos_from_secs_f64(secs, "timestamp").map(Self)
    }

    #[must_use]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1e9
    }

    /// The current wall-clock time, saturating outside the `i64` range.
    #[must_use]
    pub fn now() -> Self {
        let nanos = match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => i64::try_from(d.as_nanos()).unwrap_or(i64::MAX),
            Err(e) => i64::try_from(e.duration().as_nanos()).map_or(i64::MIN, |n| -n),
        };
        Self(nanos)
    }

    /// Elapsed time between two timestamps.
    #[must_use]
    pub const fn since(self, earlier: Self) -> Timespan {
        Timespan(self.0.saturating_sub(earlier.0))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.0))
            .ok()
            .and_then(|dt| dt.format(&Rfc3339).ok())
        {
            Some(text) => f.write_str(&text),
            None => write!(f, "{}ns", self.0),
        }
    }
}

/// A symbolic enumeration value, compared by name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EnumValue(String);

impl EnumValue {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// --- data --------------------------------------------------------------------

/// A value of any type the messaging layer can transmit.
///
/// Values of different tags never compare equal. `Real` values compare by
/// `f64::total_cmp`, which keeps `Eq`, `Ord` and `Hash` consistent for set
/// elements and table keys: `NaN` equals itself, and `0.0` and `-0.0` are
/// distinct values.
#[derive(Debug, Clone, Default)]
pub enum Data {
    #[default]
    None,
    Boolean(bool),
    Count(u64),
    Integer(i64),
    Real(f64),
    String(String),
    Address(Address),
    Subnet(Subnet),
    Port(Port),
    Timestamp(Timestamp),
    Timespan(Timespan),
    EnumValue(EnumValue),
    Set(Set),
    Table(Table),
    Vector(Vector),
}

/// Exhaustive per-tag visitor over [`Data`].
///
/// Adding a variant to [`Data`] breaks every visitor at compile time.
pub trait DataVisitor {
    type Output;

    fn visit_none(&mut self) -> Self::Output;
    fn visit_boolean(&mut self, value: bool) -> Self::Output;
    fn visit_count(&mut self, value: u64) -> Self::Output;
    fn visit_integer(&mut self, value: i64) -> Self::Output;
    fn visit_real(&mut self, value: f64) -> Self::Output;
    fn visit_string(&mut self, value: &str) -> Self::Output;
    fn visit_address(&mut self, value: &Address) -> Self::Output;
    fn visit_subnet(&mut self, value: &Subnet) -> Self::Output;
    fn visit_port(&mut self, value: Port) -> Self::Output;
    fn visit_timestamp(&mut self, value: Timestamp) -> Self::Output;
    fn visit_timespan(&mut self, value: Timespan) -> Self::Output;
    fn visit_enum_value(&mut self, value: &EnumValue) -> Self::Output;
    fn visit_set(&mut self, value: &Set) -> Self::Output;
    fn visit_table(&mut self, value: &Table) -> Self::Output;
    fn visit_vector(&mut self, value: &[Data]) -> Self::Output;
}

impl Data {
    /// Tag of the stored value.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        match self {
            Self::None => DataType::None,
            Self::Boolean(_) => DataType::Boolean,
            Self::Count(_) => DataType::Count,
            Self::Integer(_) => DataType::Integer,
            Self::Real(_) => DataType::Real,
            Self::String(_) => DataType::String,
            Self::Address(_) => DataType::Address,
            Self::Subnet(_) => DataType::Subnet,
            Self::Port(_) => DataType::Port,
            Self::Timestamp(_) => DataType::Timestamp,
            Self::Timespan(_) => DataType::Timespan,
            Self::EnumValue(_) => DataType::EnumValue,
            Self::Set(_) => DataType::Set,
            Self::Table(_) => DataType::Table,
            Self::Vector(_) => DataType::Vector,
        }
    }

    /// Dispatch on the tag.
    pub fn accept<V: DataVisitor>(&self, visitor: &mut V) -> V::Output {
        match self {
            Self::None => visitor.visit_none(),
            Self::Boolean(x) => visitor.visit_boolean(*x),
            Self::Count(x) => visitor.visit_count(*x),
            Self::Integer(x) => visitor.visit_integer(*x),
            Self::Real(x) => visitor.visit_real(*x),
            Self::String(x) => visitor.visit_string(x),
            Self::Address(x) => visitor.visit_address(x),
            Self::Subnet(x) => visitor.visit_subnet(x),
            Self::Port(x) => visitor.visit_port(*x),
            Self::Timestamp(x) => visitor.visit_timestamp(*x),
            Self::Timespan(x) => visitor.visit_timespan(*x),
            Self::EnumValue(x) => visitor.visit_enum_value(x),
            Self::Set(x) => visitor.visit_set(x),
            Self::Table(x) => visitor.visit_table(x),
            Self::Vector(x) => visitor.visit_vector(x),
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(x) => Some(*x),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_count(&self) -> Option<u64> {
        match self {
            Self::Count(x) => Some(*x),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(x) => Some(*x),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(x) => Some(*x),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(x) => Some(x),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_address(&self) -> Option<&Address> {
        match self {
            Self::Address(x) => Some(x),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_subnet(&self) -> Option<&Subnet> {
        match self {
            Self::Subnet(x) => Some(x),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_port(&self) -> Option<Port> {
        match self {
            Self::Port(x) => Some(*x),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Self::Timestamp(x) => Some(*x),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_timespan(&self) -> Option<Timespan> {
        match self {
            Self::Timespan(x) => Some(*x),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_enum_value(&self) -> Option<&EnumValue> {
        match self {
            Self::EnumValue(x) => Some(x),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_set(&self) -> Option<&Set> {
        match self {
            Self::Set(x) => Some(x),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_table(&self) -> Option<&Table> {
        match self {
            Self::Table(x) => Some(x),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_vector(&self) -> Option<&[Data]> {
        match self {
            Self::Vector(x) => Some(x),
            _ => None,
        }
    }
}

impl Ord for Data {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::None, Self::None) => Ordering::Equal,
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::Count(a), Self::Count(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Real(a), Self::Real(b)) => a.total_cmp(b),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Address(a), Self::Address(b)) => a.cmp(b),
            (Self::Subnet(a), Self::Subnet(b)) => a.cmp(b),
            (Self::Port(a), Self::Port(b)) => a.cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            (Self::Timespan(a), Self::Timespan(b)) => a.cmp(b),
            (Self::EnumValue(a), Self::EnumValue(b)) => a.cmp(b),
            (Self::Set(a), Self::Set(b)) => a.cmp(b),
            (Self::Table(a), Self::Table(b)) => a.cmp(b),
            (Self::Vector(a), Self::Vector(b)) => a.cmp(b),
            _ => self.data_type().cmp(&other.data_type()),
        }
    }
}

impl PartialOrd for Data {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Data {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Data {}

impl Hash for Data {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u8(self.data_type().as_u8());
        match self {
            Self::None => {}
            Self::Boolean(x) => x.hash(state),
            Self::Count(x) => x.hash(state),
            Self::Integer(x) => x.hash(state),
            // total_cmp equality is bit equality
            Self::Real(x) => x.to_bits().hash(state),
            Self::String(x) => x.hash(state),
            Self::Address(x) => x.hash(state),
            Self::Subnet(x) => x.hash(state),
            Self::Port(x) => x.hash(state),
            Self::Timestamp(x) => x.hash(state),
            Self::Timespan(x) => x.hash(state),
            Self::EnumValue(x) => x.hash(state),
            Self::Set(x) => x.hash(state),
            Self::Table(x) => x.hash(state),
            Self::Vector(x) => x.hash(state),
        }
    }
}

/// Renders data in the `T`/`F`, `[..]`, `{..}`, `{k -> v}` notation.
struct Printer<'a, 'b> {
    f: &'a mut fmt::Formatter<'b>,
}

impl Printer<'_, '_> {
    fn list<'i, I>(&mut self, open: &str, close: &str, items: I) -> fmt::Result
    where
        I: IntoIterator<Item = &'i Data>,
    {
        self.f.write_str(open)?;
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                self.f.write_str(", ")?;
            }
            write!(self.f, "{item}")?;
        }
        self.f.write_str(close)
    }
}

impl DataVisitor for Printer<'_, '_> {
    type Output = fmt::Result;

    fn visit_none(&mut self) -> fmt::Result {
        self.f.write_str("nil")
    }

    fn visit_boolean(&mut self, value: bool) -> fmt::Result {
        self.f.write_str(if value { "T" } else { "F" })
    }

    fn visit_count(&mut self, value: u64) -> fmt::Result {
        write!(self.f, "{value}")
    }

    fn visit_integer(&mut self, value: i64) -> fmt::Result {
        write!(self.f, "{value}")
    }

    fn visit_real(&mut self, value: f64) -> fmt::Result {
        write!(self.f, "{value}")
    }

    fn visit_string(&mut self, value: &str) -> fmt::Result {
        self.f.write_str(value)
    }

    fn visit_address(&mut self, value: &Address) -> fmt::Result {
        write!(self.f, "{value}")
    }

    fn visit_subnet(&mut self, value: &Subnet) -> fmt::Result {
        write!(self.f, "{value}")
    }

    fn visit_port(&mut self, value: Port) -> fmt::Result {
        write!(self.f, "{value}")
    }

    fn visit_timestamp(&mut self, value: Timestamp) -> fmt::Result {
        write!(self.f, "{value}")
    }

    fn visit_timespan(&mut self, value: Timespan) -> fmt::Result {
        write!(self.f, "{value}")
    }

    fn visit_enum_value(&mut self, value: &EnumValue) -> fmt::Result {
        write!(self.f, "{value}")
    }

    fn visit_set(&mut self, value: &Set) -> fmt::Result {
        self.list("{", "}", value)
    }

    fn visit_table(&mut self, value: &Table) -> fmt::Result {
        self.f.write_str("{")?;
        for (i, (k, v)) in value.iter().enumerate() {
            if i > 0 {
                self.f.write_str(", ")?;
            }
            write!(self.f, "{k} -> {v}")?;
        }
        self.f.write_str("}")
    }

    fn visit_vector(&mut self, value: &[Data]) -> fmt::Result {
        self.list("[", "]", value)
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.accept(&mut Printer { f })
    }
}

/// Build a [`Data::Vector`] from values that convert infallibly.
///
/// ```
/// use skein_core::{vector, data::Data};
///
/// let v = vector![42, "foo", true];
/// assert_eq!(v.to_string(), "[42, foo, T]");
/// ```
#[macro_export]
macro_rules! vector {
    ($($x:expr),* $(,)?) => {
        $crate::data::Data::Vector(vec![$($crate::data::Data::from($x)),*])
    };
}
