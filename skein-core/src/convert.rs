//! Conversion between native Rust values and [`Data`].
//!
//! Forward conversion goes through [`IntoData`], reverse conversion through
//! [`FromData`]. Both are fallible. Types whose forward mapping can never fail
//! also implement `From<T> for Data`.
//!
//! Reverse conversion follows exactly one rule per tag and never infers: an
//! `Integer` does not become a `u32`, and an IPv6 address never becomes an
//! `Ipv4Addr` even when its bytes are IPv4-mapped.

use crate::data::{
    Address, Data, DataType, EnumValue, Family, Port, Set, Subnet, Table, Timespan, Timestamp,
    Vector,
};
use crate::error::ConversionError;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::{BuildHasher, Hash};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::{Duration as StdDuration, SystemTime, UNIX_EPOCH};

use time::{Duration, OffsetDateTime, PrimitiveDateTime};

/// Native value that can be turned into [`Data`].
pub trait IntoData {
    fn into_data(self) -> Result<Data, ConversionError>;
}

/// Native value that can be extracted from [`Data`].
pub trait FromData: Sized {
    fn from_data(data: &Data) -> Result<Self, ConversionError>;
}

/// Convert a native value into [`Data`].
pub fn to_data<T: IntoData>(value: T) -> Result<Data, ConversionError> {
    value.into_data()
}

/// Convert [`Data`] into a native value.
pub fn from_data<T: FromData>(data: &Data) -> Result<T, ConversionError> {
    T::from_data(data)
}

fn mismatch(expected: DataType, data: &Data) -> ConversionError {
    ConversionError::TypeMismatch {
        expected,
        actual: data.data_type(),
    }
}

impl Data {
    /// Extract a native value.
    pub fn get<T: FromData>(&self) -> Result<T, ConversionError> {
        T::from_data(self)
    }

    /// Build a value from any convertible native.
    pub fn from_native<T: IntoData>(value: T) -> Result<Self, ConversionError> {
        value.into_data()
    }

    /// Consume the value and extract a native.
    pub fn into_native<T: FromData>(self) -> Result<T, ConversionError> {
        T::from_data(&self)
    }

    /// Build a table from native key/value pairs.
    ///
    /// When two native keys convert to equal `Data` keys the last pair wins.
    pub fn table_from_pairs<K, V, I>(pairs: I) -> Result<Self, ConversionError>
    where
        K: IntoData,
        V: IntoData,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut table = Table::new();
        for (k, v) in pairs {
            table.insert(k.into_data()?, v.into_data()?);
        }
        Ok(Self::Table(table))
    }
}

// --- infallible forward mappings ---------------------------------------------

macro_rules! infallible {
    ($($t:ty => |$v:ident| $e:expr;)*) => {
        $(
            impl From<$t> for Data {
                #[inline]
                fn from($v: $t) -> Self {
                    $e
                }
            }

            impl IntoData for $t {
                #[inline]
                fn into_data(self) -> Result<Data, ConversionError> {
                    Ok(Data::from(self))
                }
            }
        )*
    };
}

infallible! {
    bool => |v| Data::Boolean(v);
    u8 => |v| Data::Count(u64::from(v));
    u16 => |v| Data::Count(u64::from(v));
    u32 => |v| Data::Count(u64::from(v));
    u64 => |v| Data::Count(v);
    usize => |v| Data::Count(v as u64);
    i8 => |v| Data::Integer(i64::from(v));
    i16 => |v| Data::Integer(i64::from(v));
    i32 => |v| Data::Integer(i64::from(v));
    i64 => |v| Data::Integer(v);
    isize => |v| Data::Integer(v as i64);
    f32 => |v| Data::Real(f64::from(v));
    f64 => |v| Data::Real(v);
    String => |v| Data::String(v);
    &str => |v| Data::String(v.to_owned());
    Address => |v| Data::Address(v);
    Subnet => |v| Data::Subnet(v);
    Port => |v| Data::Port(v);
    Timestamp => |v| Data::Timestamp(v);
    Timespan => |v| Data::Timespan(v);
    EnumValue => |v| Data::EnumValue(v);
    Ipv4Addr => |v| Data::Address(v.into());
    Ipv6Addr => |v| Data::Address(v.into());
    IpAddr => |v| Data::Address(v.into());
}

impl From<Vector> for Data {
    fn from(v: Vector) -> Self {
        Self::Vector(v)
    }
}

impl From<Set> for Data {
    fn from(v: Set) -> Self {
        Self::Set(v)
    }
}

impl From<Table> for Data {
    fn from(v: Table) -> Self {
        Self::Table(v)
    }
}

impl IntoData for Data {
    fn into_data(self) -> Result<Data, ConversionError> {
        Ok(self)
    }
}

impl IntoData for &Data {
    fn into_data(self) -> Result<Data, ConversionError> {
        Ok(self.clone())
    }
}

impl IntoData for () {
    fn into_data(self) -> Result<Data, ConversionError> {
        Ok(Data::None)
    }
}

// --- time --------------------------------------------------------------------

impl IntoData for Duration {
    fn into_data(self) -> Result<Data, ConversionError> {
        i64::try_from(self.whole_nanoseconds())
            .map(|ns| Data::Timespan(Timespan::from_nanos(ns)))
            .map_err(|_| ConversionError::out_of_range(format!("{self:?}"), "timespan"))
    }
}

impl IntoData for StdDuration {
    fn into_data(self) -> Result<Data, ConversionError> {
        i64::try_from(self.as_nanos())
            .map(|ns| Data::Timespan(Timespan::from_nanos(ns)))
            .map_err(|_| ConversionError::out_of_range(format!("{self:?}"), "timespan"))
    }
}

impl IntoData for OffsetDateTime {
    fn into_data(self) -> Result<Data, ConversionError> {
        i64::try_from(self.unix_timestamp_nanos())
            .map(|ns| Data::Timestamp(Timestamp::from_nanos(ns)))
            .map_err(|_| ConversionError::out_of_range(format!("{self:?}"), "timestamp"))
    }
}

/// Naive datetimes are taken to be UTC.
impl IntoData for PrimitiveDateTime {
    fn into_data(self) -> Result<Data, ConversionError> {
        self.assume_utc().into_data()
    }
}

impl IntoData for SystemTime {
    fn into_data(self) -> Result<Data, ConversionError> {
        let nanos = match self.duration_since(UNIX_EPOCH) {
            Ok(after) => i64::try_from(after.as_nanos()).ok(),
            Err(before) => i64::try_from(before.duration().as_nanos())
                .ok()
                .map(|n| -n),
        };
        nanos
            .map(|ns| Data::Timestamp(Timestamp::from_nanos(ns)))
            .ok_or_else(|| ConversionError::out_of_range(format!("{self:?}"), "timestamp"))
    }
}

// --- containers --------------------------------------------------------------

impl<T: IntoData> IntoData for Vec<T> {
    fn into_data(self) -> Result<Data, ConversionError> {
        self.into_iter()
            .map(IntoData::into_data)
            .collect::<Result<Vector, _>>()
            .map(Data::Vector)
    }
}

impl<T: IntoData + Clone> IntoData for &[T] {
    fn into_data(self) -> Result<Data, ConversionError> {
        self.iter()
            .cloned()
            .map(IntoData::into_data)
            .collect::<Result<Vector, _>>()
            .map(Data::Vector)
    }
}

impl<T: IntoData, const N: usize> IntoData for [T; N] {
    fn into_data(self) -> Result<Data, ConversionError> {
        self.into_iter()
            .map(IntoData::into_data)
            .collect::<Result<Vector, _>>()
            .map(Data::Vector)
    }
}

impl<T: IntoData> IntoData for BTreeSet<T> {
    fn into_data(self) -> Result<Data, ConversionError> {
        self.into_iter()
            .map(IntoData::into_data)
            .collect::<Result<Set, _>>()
            .map(Data::Set)
    }
}

impl<T: IntoData, S> IntoData for HashSet<T, S> {
    fn into_data(self) -> Result<Data, ConversionError> {
        self.into_iter()
            .map(IntoData::into_data)
            .collect::<Result<Set, _>>()
            .map(Data::Set)
    }
}

impl<K: IntoData, V: IntoData> IntoData for BTreeMap<K, V> {
    fn into_data(self) -> Result<Data, ConversionError> {
        Data::table_from_pairs(self)
    }
}

impl<K: IntoData, V: IntoData, S> IntoData for HashMap<K, V, S> {
    fn into_data(self) -> Result<Data, ConversionError> {
        Data::table_from_pairs(self)
    }
}

impl<T: IntoData> IntoData for Option<T> {
    fn into_data(self) -> Result<Data, ConversionError> {
        self.map_or(Ok(Data::None), IntoData::into_data)
    }
}

macro_rules! tuple_into_data {
    ($($name:ident),+) => {
        impl<$($name: IntoData),+> IntoData for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_data(self) -> Result<Data, ConversionError> {
                let ($($name,)+) = self;
                Ok(Data::Vector(vec![$($name.into_data()?),+]))
            }
        }
    };
}

tuple_into_data!(A, B);
tuple_into_data!(A, B, C);
tuple_into_data!(A, B, C, D);

// --- reverse -----------------------------------------------------------------

impl FromData for Data {
    fn from_data(data: &Data) -> Result<Self, ConversionError> {
        Ok(data.clone())
    }
}

impl FromData for () {
    fn from_data(data: &Data) -> Result<Self, ConversionError> {
        match data {
            Data::None => Ok(()),
            other => Err(mismatch(DataType::None, other)),
        }
    }
}

impl FromData for bool {
    fn from_data(data: &Data) -> Result<Self, ConversionError> {
        data.as_bool()
            .ok_or_else(|| mismatch(DataType::Boolean, data))
    }
}

macro_rules! from_count {
    ($($t:ty),*) => {
        $(
            impl FromData for $t {
                fn from_data(data: &Data) -> Result<Self, ConversionError> {
                    let n = data.as_count().ok_or_else(|| mismatch(DataType::Count, data))?;
                    <$t>::try_from(n).map_err(|_| ConversionError::out_of_range(n, stringify!($t)))
                }
            }
        )*
    };
}

macro_rules! from_integer {
    ($($t:ty),*) => {
        $(
            impl FromData for $t {
                fn from_data(data: &Data) -> Result<Self, ConversionError> {
                    let n = data.as_integer().ok_or_else(|| mismatch(DataType::Integer, data))?;
                    <$t>::try_from(n).map_err(|_| ConversionError::out_of_range(n, stringify!($t)))
                }
            }
        )*
    };
}

from_count!(u8, u16, u32, u64, usize);
from_integer!(i8, i16, i32, i64, isize);

impl FromData for f64 {
    fn from_data(data: &Data) -> Result<Self, ConversionError> {
        data.as_real().ok_or_else(|| mismatch(DataType::Real, data))
    }
}

impl FromData for f32 {
    fn from_data(data: &Data) -> Result<Self, ConversionError> {
        let x = f64::from_data(data)?;
        if x.is_finite() && x.abs() > f64::from(f32::MAX) {
            return Err(ConversionError::out_of_range(x, "f32"));
        }
        Ok(x as f32)
    }
}

impl FromData for String {
    fn from_data(data: &Data) -> Result<Self, ConversionError> {
        data.as_str()
            .map(str::to_owned)
            .ok_or_else(|| mismatch(DataType::String, data))
    }
}

impl FromData for Address {
    fn from_data(data: &Data) -> Result<Self, ConversionError> {
        data.as_address()
            .copied()
            .ok_or_else(|| mismatch(DataType::Address, data))
    }
}

impl FromData for IpAddr {
    fn from_data(data: &Data) -> Result<Self, ConversionError> {
        Address::from_data(data).map(|a| a.to_ip())
    }
}

impl FromData for Ipv4Addr {
    fn from_data(data: &Data) -> Result<Self, ConversionError> {
        match IpAddr::from_data(data)? {
            IpAddr::V4(ip) => Ok(ip),
            IpAddr::V6(_) => Err(ConversionError::FamilyMismatch {
                expected: Family::Ipv4,
                actual: Family::Ipv6,
            }),
        }
    }
}

impl FromData for Ipv6Addr {
    fn from_data(data: &Data) -> Result<Self, ConversionError> {
        match IpAddr::from_data(data)? {
            IpAddr::V6(ip) => Ok(ip),
            IpAddr::V4(_) => Err(ConversionError::FamilyMismatch {
                expected: Family::Ipv6,
                actual: Family::Ipv4,
            }),
        }
    }
}

impl FromData for Subnet {
    fn from_data(data: &Data) -> Result<Self, ConversionError> {
        data.as_subnet()
            .copied()
            .ok_or_else(|| mismatch(DataType::Subnet, data))
    }
}

impl FromData for Port {
    fn from_data(data: &Data) -> Result<Self, ConversionError> {
        data.as_port().ok_or_else(|| mismatch(DataType::Port, data))
    }
}

impl FromData for Timestamp {
    fn from_data(data: &Data) -> Result<Self, ConversionError> {
        data.as_timestamp()
            .ok_or_else(|| mismatch(DataType::Timestamp, data))
    }
}

impl FromData for Timespan {
    fn from_data(data: &Data) -> Result<Self, ConversionError> {
        data.as_timespan()
            .ok_or_else(|| mismatch(DataType::Timespan, data))
    }
}

impl FromData for EnumValue {
    fn from_data(data: &Data) -> Result<Self, ConversionError> {
        data.as_enum_value()
            .cloned()
            .ok_or_else(|| mismatch(DataType::EnumValue, data))
    }
}

impl FromData for Duration {
    fn from_data(data: &Data) -> Result<Self, ConversionError> {
        Timespan::from_data(data).map(|t| Self::nanoseconds(t.as_nanos()))
    }
}

impl FromData for StdDuration {
    fn from_data(data: &Data) -> Result<Self, ConversionError> {
        let t = Timespan::from_data(data)?;
        u64::try_from(t.as_nanos())
            .map(Self::from_nanos)
            .map_err(|_| ConversionError::out_of_range(t, "std::time::Duration"))
    }
}

impl FromData for OffsetDateTime {
    fn from_data(data: &Data) -> Result<Self, ConversionError> {
        let t = Timestamp::from_data(data)?;
        Self::from_unix_timestamp_nanos(i128::from(t.as_nanos()))
            .map_err(|_| ConversionError::out_of_range(t.as_nanos(), "OffsetDateTime"))
    }
}

impl FromData for PrimitiveDateTime {
    fn from_data(data: &Data) -> Result<Self, ConversionError> {
        OffsetDateTime::from_data(data).map(|dt| Self::new(dt.date(), dt.time()))
    }
}

impl FromData for SystemTime {
    fn from_data(data: &Data) -> Result<Self, ConversionError> {
        let ns = Timestamp::from_data(data)?.as_nanos();
        let offset = StdDuration::from_nanos(ns.unsigned_abs());
        let t = if ns >= 0 {
            UNIX_EPOCH.checked_add(offset)
        } else {
            UNIX_EPOCH.checked_sub(offset)
        };
        t.ok_or_else(|| ConversionError::out_of_range(ns, "SystemTime"))
    }
}

impl<T: FromData> FromData for Vec<T> {
    fn from_data(data: &Data) -> Result<Self, ConversionError> {
        data.as_vector()
            .ok_or_else(|| mismatch(DataType::Vector, data))?
            .iter()
            .map(T::from_data)
            .collect()
    }
}

impl<T: FromData + Ord> FromData for BTreeSet<T> {
    fn from_data(data: &Data) -> Result<Self, ConversionError> {
        data.as_set()
            .ok_or_else(|| mismatch(DataType::Set, data))?
            .iter()
            .map(T::from_data)
            .collect()
    }
}

impl<T, S> FromData for HashSet<T, S>
where
    T: FromData + Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_data(data: &Data) -> Result<Self, ConversionError> {
        data.as_set()
            .ok_or_else(|| mismatch(DataType::Set, data))?
            .iter()
            .map(T::from_data)
            .collect()
    }
}

impl<K: FromData + Ord, V: FromData> FromData for BTreeMap<K, V> {
    fn from_data(data: &Data) -> Result<Self, ConversionError> {
        data.as_table()
            .ok_or_else(|| mismatch(DataType::Table, data))?
            .iter()
            .map(|(k, v)| Ok((K::from_data(k)?, V::from_data(v)?)))
            .collect()
    }
}

impl<K, V, S> FromData for HashMap<K, V, S>
where
    K: FromData + Eq + Hash,
    V: FromData,
    S: BuildHasher + Default,
{
    fn from_data(data: &Data) -> Result<Self, ConversionError> {
        data.as_table()
            .ok_or_else(|| mismatch(DataType::Table, data))?
            .iter()
            .map(|(k, v)| Ok((K::from_data(k)?, V::from_data(v)?)))
            .collect()
    }
}

impl<T: FromData> FromData for Option<T> {
    fn from_data(data: &Data) -> Result<Self, ConversionError> {
        match data {
            Data::None => Ok(None),
            other => T::from_data(other).map(Some),
        }
    }
}

macro_rules! tuple_from_data {
    ($len:literal; $($name:ident $idx:tt),+) => {
        impl<$($name: FromData),+> FromData for ($($name,)+) {
            fn from_data(data: &Data) -> Result<Self, ConversionError> {
                let items = data.as_vector().ok_or_else(|| mismatch(DataType::Vector, data))?;
                if items.len() != $len {
                    return Err(ConversionError::malformed(format!(
                        "{}-tuple from vector of {} elements",
                        $len,
                        items.len()
                    )));
                }
                Ok(($($name::from_data(&items[$idx])?,)+))
            }
        }
    };
}

tuple_from_data!(2; A 0, B 1);
tuple_from_data!(3; A 0, B 1, C 2);
tuple_from_data!(4; A 0, B 1, C 2, D 3);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Protocol;
    use std::fmt::Debug;

    fn round_trip<T>(value: T)
    where
        T: IntoData + FromData + Clone + PartialEq + Debug,
    {
        let data = to_data(value.clone()).unwrap();
        let back: T = from_data(&data).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn scalars_round_trip() {
        round_trip(true);
        round_trip(42u64);
        round_trip(-42i64);
        round_trip(7u8);
        round_trip(-7i16);
        round_trip(4.2f64);
        round_trip(String::from("foo"));
        round_trip(Port::new(1947, Protocol::Tcp));
        round_trip(Timespan::from_nanos(-1));
        round_trip(EnumValue::new("foo"));
    }

    #[test]
    fn signedness_picks_the_tag() {
        assert_eq!(to_data(5u32).unwrap(), Data::Count(5));
        assert_eq!(to_data(5i32).unwrap(), Data::Integer(5));
        assert!(u32::from_data(&Data::Integer(5)).is_err());
    }

    #[test]
    fn narrow_integers_are_range_checked() {
        let err = u8::from_data(&Data::Count(256)).unwrap_err();
        assert_eq!(err, ConversionError::out_of_range(256u64, "u8"));
        assert_eq!(i8::from_data(&Data::Integer(-128)).unwrap(), -128);
        assert!(i8::from_data(&Data::Integer(-129)).is_err());
    }

    #[test]
    fn mismatch_reports_both_tags() {
        let err = String::from_data(&Data::Integer(1)).unwrap_err();
        assert_eq!(
            err,
            ConversionError::TypeMismatch {
                expected: DataType::String,
                actual: DataType::Integer
            }
        );
    }

    #[test]
    fn duration_is_exact() {
        let d = Duration::days(1) + Duration::seconds(2) + Duration::microseconds(3);
        let data = to_data(d).unwrap();
        assert_eq!(data, Data::Timespan(Timespan::from_parts(1, 2, 3).unwrap()));
        round_trip(d);
        round_trip(StdDuration::from_millis(1500));
        assert!(StdDuration::from_data(&Data::Timespan(Timespan::from_nanos(-1))).is_err());
    }

    #[test]
    fn datetimes_map_to_unix_nanos() {
        let dt = OffsetDateTime::from_unix_timestamp_nanos(1_500_000_000_123_456_789).unwrap();
        assert_eq!(
            to_data(dt).unwrap(),
            Data::Timestamp(Timestamp::from_nanos(1_500_000_000_123_456_789))
        );
        round_trip(dt);

        let naive = PrimitiveDateTime::new(dt.date(), dt.time());
        assert_eq!(to_data(naive).unwrap(), to_data(dt).unwrap());
        round_trip(naive);

        let before_epoch = UNIX_EPOCH - StdDuration::from_secs(10);
        assert_eq!(
            to_data(before_epoch).unwrap(),
            Data::Timestamp(Timestamp::from_nanos(-10_000_000_000))
        );
        round_trip(before_epoch);
    }

    #[test]
    fn address_family_is_authoritative() {
        round_trip(Ipv4Addr::new(1, 2, 3, 4));
        round_trip(Ipv6Addr::LOCALHOST);

        let mapped: Ipv6Addr = "::ffff:1.2.3.4".parse().unwrap();
        let data = to_data(mapped).unwrap();
        assert_eq!(data.as_address().unwrap().family(), Family::Ipv6);
        assert_eq!(Ipv6Addr::from_data(&data).unwrap(), mapped);
        assert_eq!(
            Ipv4Addr::from_data(&data).unwrap_err(),
            ConversionError::FamilyMismatch {
                expected: Family::Ipv4,
                actual: Family::Ipv6
            }
        );
    }

    #[test]
    fn containers_convert_element_wise() {
        round_trip(vec![1i64, 2, 3]);
        round_trip(BTreeSet::from([String::from("a"), String::from("b")]));
        round_trip(BTreeMap::from([(1u64, String::from("x")), (2, String::from("y"))]));
        round_trip(HashMap::<String, i64>::from([(String::from("k"), -1)]));
        round_trip(Some(3i64));
        round_trip(Option::<i64>::None);
        round_trip((1i64, String::from("two"), true));
        assert_eq!(
            to_data(&[1u8, 2][..]).unwrap(),
            Data::Vector(vec![Data::Count(1), Data::Count(2)])
        );
    }

    #[test]
    fn container_failure_is_fail_fast() {
        let data = Data::Vector(vec![Data::Integer(1), Data::String("x".into())]);
        assert!(Vec::<i64>::from_data(&data).is_err());
    }

    #[test]
    fn table_key_collision_last_write_wins() {
        let t = Data::table_from_pairs([(1u8, "first"), (2, "other"), (1, "second")]).unwrap();
        let table = t.as_table().unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(&Data::Count(1)), Some(&Data::from("second")));
    }

    #[test]
    fn nested_structure() {
        let v = crate::vector![
            42u64,
            "foo",
            Data::Set(Set::from([Data::from(1i64)])),
        ];
        let back: (u64, String, BTreeSet<i64>) = from_data(&v).unwrap();
        assert_eq!(back, (42, "foo".into(), BTreeSet::from([1])));
    }
}
