//! Binary wire encoding of [`Data`].
//!
//! Every value starts with its tag byte (see [`DataType`]) followed by a
//! tag-specific body:
//!
//! | Tag | Body |
//! |---|---|
//! | None | empty |
//! | Boolean | 1 byte, 0 or 1 |
//! | Count, Integer, Timestamp, Timespan | 8 bytes big-endian |
//! | Real | IEEE-754 bits, 8 bytes big-endian |
//! | String, EnumValue | varint length + UTF-8 |
//! | Address | family byte (4/6) + 16 bytes |
//! | Subnet | address body + prefix byte |
//! | Port | u16 big-endian + protocol byte |
//! | Set, Vector | varint count + elements |
//! | Table | varint count + key/value pairs |
//!
//! Varints are unsigned LEB128. Set elements and table keys are written in
//! ascending order; the decoder rejects duplicates.

use crate::data::{
    Address, Data, DataType, DataVisitor, EnumValue, Family, Port, Protocol, Set, Subnet, Table,
    Timespan, Timestamp,
};
use crate::error::{CodecError, ConversionError, Result};

use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Default recursion limit for nested containers.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Longest valid LEB128 encoding of a u64.
const MAX_VARINT_LEN: usize = 10;

/// Encode a value into a fresh buffer.
#[must_use]
pub fn encode(data: &Data) -> Bytes {
    let mut buf = BytesMut::with_capacity(64);
    encode_into(data, &mut buf);
    buf.freeze()
}

/// Append the encoding of `data` to `buf`.
pub fn encode_into(data: &Data, buf: &mut BytesMut) {
    data.accept(&mut Encoder { buf });
}

/// Decode exactly one value, rejecting trailing bytes.
pub fn decode(bytes: &[u8]) -> Result<Data> {
    Decoder::new(DEFAULT_MAX_DEPTH).decode(bytes)
}

fn put_varint(buf: &mut BytesMut, mut n: u64) {
    while n >= 0x80 {
        buf.put_u8((n as u8) | 0x80);
        n >>= 7;
    }
    buf.put_u8(n as u8);
}

struct Encoder<'a> {
    buf: &'a mut BytesMut,
}

impl Encoder<'_> {
    fn tag(&mut self, t: DataType) {
        self.buf.put_u8(t.as_u8());
    }

    fn address_body(&mut self, a: &Address) {
        self.buf.put_u8(a.family().as_u8());
        self.buf.put_slice(a.bytes());
    }

    fn text(&mut self, s: &str) {
        put_varint(self.buf, s.len() as u64);
        self.buf.put_slice(s.as_bytes());
    }
}

impl DataVisitor for Encoder<'_> {
    type Output = ();

    fn visit_none(&mut self) {
        self.tag(DataType::None);
    }

    fn visit_boolean(&mut self, value: bool) {
        self.tag(DataType::Boolean);
        self.buf.put_u8(u8::from(value));
    }

    fn visit_count(&mut self, value: u64) {
        self.tag(DataType::Count);
        self.buf.put_u64(value);
    }

    fn visit_integer(&mut self, value: i64) {
        self.tag(DataType::Integer);
        self.buf.put_i64(value);
    }

    fn visit_real(&mut self, value: f64) {
        self.tag(DataType::Real);
        self.buf.put_u64(value.to_bits());
    }

    fn visit_string(&mut self, value: &str) {
        self.tag(DataType::String);
        self.text(value);
    }

    fn visit_address(&mut self, value: &Address) {
        self.tag(DataType::Address);
        self.address_body(value);
    }

    fn visit_subnet(&mut self, value: &Subnet) {
        self.tag(DataType::Subnet);
        self.address_body(value.network());
        self.buf.put_u8(value.length());
    }

    fn visit_port(&mut self, value: Port) {
        self.tag(DataType::Port);
        self.buf.put_u16(value.number());
        self.buf.put_u8(value.protocol() as u8);
    }

    fn visit_timestamp(&mut self, value: Timestamp) {
        self.tag(DataType::Timestamp);
        self.buf.put_i64(value.as_nanos());
    }

    fn visit_timespan(&mut self, value: Timespan) {
        self.tag(DataType::Timespan);
        self.buf.put_i64(value.as_nanos());
    }

    fn visit_enum_value(&mut self, value: &EnumValue) {
        self.tag(DataType::EnumValue);
        self.text(value.name());
    }

    fn visit_set(&mut self, value: &Set) {
        self.tag(DataType::Set);
        put_varint(self.buf, value.len() as u64);
        for item in value {
            item.accept(self);
        }
    }

    fn visit_table(&mut self, value: &Table) {
        self.tag(DataType::Table);
        put_varint(self.buf, value.len() as u64);
        for (k, v) in value {
            k.accept(self);
            v.accept(self);
        }
    }

    fn visit_vector(&mut self, value: &[Data]) {
        self.tag(DataType::Vector);
        put_varint(self.buf, value.len() as u64);
        for item in value {
            item.accept(self);
        }
    }
}

/// Wire decoder with a configurable nesting limit.
#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    max_depth: usize,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl Decoder {
    #[must_use]
    pub const fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Decode exactly one value from `bytes`.
    pub fn decode(&self, mut bytes: &[u8]) -> Result<Data> {
        let value = self.value(&mut bytes, 0)?;
        if bytes.has_remaining() {
            return Err(CodecError::TrailingBytes(bytes.remaining()));
        }
        Ok(value)
    }

    /// Decode one value from the front of `buf`, advancing past it.
    ///
    /// On error the buffer position is unspecified.
    pub fn decode_prefix(&self, buf: &mut &[u8]) -> Result<Data> {
        self.value(buf, 0)
    }

    fn value(&self, buf: &mut &[u8], depth: usize) -> Result<Data> {
        let raw = take_u8(buf)?;
        let tag = DataType::try_from(raw).map_err(|_| CodecError::UnknownTag(raw))?;
        Ok(match tag {
            DataType::None => Data::None,
            DataType::Boolean => match take_u8(buf)? {
                0 => Data::Boolean(false),
                1 => Data::Boolean(true),
                other => return Err(CodecError::InvalidBoolean(other)),
            },
            DataType::Count => Data::Count(take_u64(buf)?),
            DataType::Integer => Data::Integer(take_u64(buf)? as i64),
            DataType::Real => Data::Real(f64::from_bits(take_u64(buf)?)),
            DataType::String => Data::String(take_text(buf)?),
            DataType::Address => Data::Address(take_address(buf)?),
            DataType::Subnet => {
                let network = take_address(buf)?;
                let length = take_u8(buf)?;
                let subnet = Subnet::new(network, length)?;
                if subnet.network() != &network {
                    return Err(ConversionError::malformed("subnet with host bits set").into());
                }
                Data::Subnet(subnet)
            }
            DataType::Port => {
                let number = take_u16(buf)?;
                let raw = take_u8(buf)?;
                let protocol = Protocol::from_u8(raw).ok_or(CodecError::InvalidProtocol(raw))?;
                Data::Port(Port::new(number, protocol))
            }
            DataType::Timestamp => Data::Timestamp(Timestamp::from_nanos(take_u64(buf)? as i64)),
            DataType::Timespan => Data::Timespan(Timespan::from_nanos(take_u64(buf)? as i64)),
            DataType::EnumValue => Data::EnumValue(EnumValue::new(take_text(buf)?)),
            DataType::Set => {
                let n = self.container_len(buf, depth)?;
                let mut set = Set::new();
                for _ in 0..n {
                    if !set.insert(self.value(buf, depth + 1)?) {
                        return Err(CodecError::Duplicate("set element"));
                    }
                }
                Data::Set(set)
            }
            DataType::Table => {
                let n = self.container_len(buf, depth)?;
                let mut table = Table::new();
                for _ in 0..n {
                    let key = self.value(buf, depth + 1)?;
                    let val = self.value(buf, depth + 1)?;
                    if table.insert(key, val).is_some() {
                        return Err(CodecError::Duplicate("table key"));
                    }
                }
                Data::Table(table)
            }
            DataType::Vector => {
                let n = self.container_len(buf, depth)?;
                // every element needs at least its tag byte
                let mut items = Vec::with_capacity(n.min(buf.remaining()));
                for _ in 0..n {
                    items.push(self.value(buf, depth + 1)?);
                }
                Data::Vector(items)
            }
        })
    }

    fn container_len(&self, buf: &mut &[u8], depth: usize) -> Result<usize> {
        if depth >= self.max_depth {
            return Err(CodecError::DepthExceeded(self.max_depth));
        }
        take_len(buf)
    }
}

fn take_u8(buf: &mut &[u8]) -> Result<u8> {
    if buf.remaining() < 1 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u8())
}

fn take_u16(buf: &mut &[u8]) -> Result<u16> {
    if buf.remaining() < 2 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u16())
}

fn take_u64(buf: &mut &[u8]) -> Result<u64> {
    if buf.remaining() < 8 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u64())
}

fn take_varint(buf: &mut &[u8]) -> Result<u64> {
    let mut n = 0u64;
    for i in 0..MAX_VARINT_LEN {
        let byte = take_u8(buf)?;
        let bits = u64::from(byte & 0x7f);
        if i == MAX_VARINT_LEN - 1 && bits > 1 {
            return Err(CodecError::LengthOverflow);
        }
        n |= bits << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(n);
        }
    }
    Err(CodecError::LengthOverflow)
}

fn take_len(buf: &mut &[u8]) -> Result<usize> {
    usize::try_from(take_varint(buf)?).map_err(|_| CodecError::LengthOverflow)
}

fn take_text(buf: &mut &[u8]) -> Result<String> {
    let len = take_len(buf)?;
    if buf.remaining() < len {
        return Err(CodecError::Incomplete);
    }
    let (head, tail) = buf.split_at(len);
    let text = std::str::from_utf8(head)
        .map_err(|_| CodecError::InvalidUtf8)?
        .to_owned();
    *buf = tail;
    Ok(text)
}

fn take_address(buf: &mut &[u8]) -> Result<Address> {
    let raw = take_u8(buf)?;
    let family = Family::from_u8(raw).ok_or(CodecError::InvalidFamily(raw))?;
    if buf.remaining() < 16 {
        return Err(CodecError::Incomplete);
    }
    let (head, tail) = buf.split_at(16);
    let address = Address::from_bytes(head, family)?;
    *buf = tail;
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn scalar_layout() {
        assert_eq!(hex::encode(encode(&Data::None)), "00");
        assert_eq!(hex::encode(encode(&Data::Boolean(true))), "0101");
        assert_eq!(hex::encode(encode(&Data::Count(1))), "020000000000000001");
        assert_eq!(hex::encode(encode(&Data::Integer(-1))), "03ffffffffffffffff");
        assert_eq!(hex::encode(encode(&Data::from("hi"))), "05026869");
        assert_eq!(
            hex::encode(encode(&Data::Port(Port::new(80, Protocol::Tcp)))),
            "08005006"
        );
    }

    #[test]
    fn address_layout_is_family_plus_mapped_bytes() {
        let a = Data::from(Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(
            hex::encode(encode(&a)),
            "060400000000000000000000ffff0a000001"
        );
    }

    #[test]
    fn nested_values_decode() {
        let mut table = Table::new();
        table.insert(Data::from("k"), crate::vector![1i64, 2.5f64, "x"]);
        table.insert(Data::Count(9), Data::Set(Set::from([Data::None, Data::Boolean(false)])));
        let value = Data::Vector(vec![
            Data::Table(table),
            Data::Subnet(Subnet::new(Ipv4Addr::new(192, 168, 0, 0), 16).unwrap()),
            Data::Timestamp(Timestamp::from_nanos(-5)),
            Data::EnumValue(EnumValue::new("foo")),
        ]);
        assert_eq!(decode(&encode(&value)).unwrap(), value);
    }

    #[test]
    fn varint_crosses_byte_boundary() {
        let long = "x".repeat(300);
        let bytes = encode(&Data::String(long.clone()));
        assert_eq!(&bytes[..3], &[5, 0xac, 0x02]);
        assert_eq!(decode(&bytes).unwrap(), Data::String(long));
    }

    #[test]
    fn rejects_truncation_at_every_position() {
        let bytes = encode(&crate::vector!["abc", 7u64, Ipv4Addr::LOCALHOST]);
        for cut in 0..bytes.len() {
            assert_eq!(decode(&bytes[..cut]), Err(CodecError::Incomplete), "cut at {cut}");
        }
    }

    #[test]
    fn rejects_bad_bytes() {
        assert_eq!(decode(&[15]), Err(CodecError::UnknownTag(15)));
        assert_eq!(decode(&[1, 2]), Err(CodecError::InvalidBoolean(2)));
        assert_eq!(decode(&[5, 1, 0xff]), Err(CodecError::InvalidUtf8));
        assert_eq!(decode(&[0, 0]), Err(CodecError::TrailingBytes(1)));

        let mut bad_family = encode(&Data::from(Ipv4Addr::LOCALHOST)).to_vec();
        bad_family[1] = 5;
        assert_eq!(decode(&bad_family), Err(CodecError::InvalidFamily(5)));

        let mut bad_proto = encode(&Data::Port(Port::new(1, Protocol::Udp))).to_vec();
        bad_proto[3] = 2;
        assert_eq!(decode(&bad_proto), Err(CodecError::InvalidProtocol(2)));

        let mut wide_prefix =
            encode(&Data::Subnet(Subnet::new(Ipv4Addr::LOCALHOST, 8).unwrap())).to_vec();
        let last = wide_prefix.len() - 1;
        wide_prefix[last] = 33;
        assert!(matches!(decode(&wide_prefix), Err(CodecError::Conversion(_))));
    }

    #[test]
    fn rejects_duplicates() {
        // set of two Count(1)
        let mut set = vec![12, 2];
        set.extend_from_slice(&encode(&Data::Count(1)));
        set.extend_from_slice(&encode(&Data::Count(1)));
        assert_eq!(decode(&set), Err(CodecError::Duplicate("set element")));

        let mut table = vec![13, 2];
        for _ in 0..2 {
            table.extend_from_slice(&encode(&Data::from("k")));
            table.extend_from_slice(&encode(&Data::None));
        }
        assert_eq!(decode(&table), Err(CodecError::Duplicate("table key")));
    }

    #[test]
    fn depth_limit() {
        let mut value = Data::None;
        for _ in 0..10 {
            value = Data::Vector(vec![value]);
        }
        let bytes = encode(&value);
        assert!(Decoder::new(10).decode(&bytes).is_ok());
        assert_eq!(
            Decoder::new(9).decode(&bytes),
            Err(CodecError::DepthExceeded(9))
        );
    }

    #[test]
    fn huge_length_prefix_does_not_allocate() {
        let mut bytes = vec![14];
        bytes.extend_from_slice(&[0xff, 0xff, 0xff, 0xff, 0x0f]);
        assert_eq!(decode(&bytes), Err(CodecError::Incomplete));
        let overlong = [14, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x7f];
        assert_eq!(decode(&overlong), Err(CodecError::LengthOverflow));
    }
}
