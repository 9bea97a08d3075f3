//! Native values through conversion and the wire codec.

use skein_core::codec::{decode, encode};
use skein_core::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Native -> Data -> wire -> Data -> native
fn through_the_wire<T>(value: T) -> T
where
    T: IntoData + FromData + Clone,
{
    let data = to_data(value).unwrap();
    let back = decode(&encode(&data)).unwrap();
    assert_eq!(back, data);
    from_data(&back).unwrap()
}

#[test]
fn scalars_survive_the_wire() {
    assert!(through_the_wire(true));
    assert_eq!(through_the_wire(u64::MAX), u64::MAX);
    assert_eq!(through_the_wire(i64::MIN), i64::MIN);
    assert_eq!(through_the_wire(-7i8), -7);
    assert_eq!(through_the_wire(0.1f64), 0.1);
    assert_eq!(through_the_wire(String::from("héllo")), "héllo");
    assert_eq!(
        through_the_wire(Duration::from_nanos(1_500)),
        Duration::from_nanos(1_500)
    );
    let now = SystemTime::now();
    let back = through_the_wire(now);
    assert_eq!(
        back.duration_since(UNIX_EPOCH).unwrap().as_nanos(),
        now.duration_since(UNIX_EPOCH).unwrap().as_nanos()
    );
}

#[test]
fn network_values_keep_their_family() {
    let v4 = Ipv4Addr::new(10, 0, 0, 1);
    let mapped = v4.to_ipv6_mapped();
    assert_eq!(through_the_wire(v4), v4);
    assert_eq!(through_the_wire(mapped), mapped);
    assert_eq!(through_the_wire(IpAddr::V6(mapped)), IpAddr::V6(mapped));

    let data = to_data(mapped).unwrap();
    assert_eq!(data.as_address().unwrap().family(), Family::Ipv6);
    assert!(matches!(
        Ipv4Addr::from_data(&data),
        Err(ConversionError::FamilyMismatch { .. })
    ));

    let net = Subnet::new(Ipv6Addr::LOCALHOST, 64).unwrap();
    assert_eq!(through_the_wire(net), net);
    assert_eq!(
        through_the_wire(Port::new(53, Protocol::Udp)),
        Port::new(53, Protocol::Udp)
    );
}

#[test]
fn containers_survive_the_wire() {
    let v = vec![vec![1u32, 2], vec![], vec![3]];
    assert_eq!(through_the_wire(v.clone()), v);

    let s: BTreeSet<String> = ["a", "b"].into_iter().map(String::from).collect();
    assert_eq!(through_the_wire(s.clone()), s);

    let mut m = BTreeMap::new();
    m.insert(1u16, Some(String::from("one")));
    m.insert(2u16, None);
    assert_eq!(through_the_wire(m.clone()), m);

    let hm: HashMap<String, i32> = [("x".to_owned(), -1)].into_iter().collect();
    assert_eq!(through_the_wire(hm.clone()), hm);

    assert_eq!(through_the_wire((1u8, "two".to_owned())), (1u8, "two".to_owned()));
}

#[test]
fn distinct_tags_never_compare_equal() {
    let values = [
        Data::None,
        Data::Boolean(false),
        Data::Count(0),
        Data::Integer(0),
        Data::Real(0.0),
        Data::String(String::new()),
        Data::Timespan(Timespan::ZERO),
        Data::Timestamp(Timestamp::UNIX_EPOCH),
        Data::EnumValue(EnumValue::new("")),
        Data::Vector(Vec::new()),
        Data::Set(Set::new()),
        Data::Table(Table::new()),
    ];
    for (i, a) in values.iter().enumerate() {
        for (j, b) in values.iter().enumerate() {
            assert_eq!(i == j, a == b, "{a:?} vs {b:?}");
        }
    }
}

#[test]
fn colliding_table_keys_keep_the_last_value() {
    let table = Data::table_from_pairs([(1u8, "first"), (2, "other"), (1, "second")]).unwrap();
    let table = table.as_table().unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table[&Data::Count(1)], Data::from("second"));
}

#[test]
fn failed_conversion_builds_nothing() {
    let too_long = Duration::from_secs(u64::MAX);
    let err = to_data(vec![Duration::from_secs(1), too_long]).unwrap_err();
    assert!(matches!(err, ConversionError::OutOfRange { .. }));

    let err = u8::from_data(&Data::Count(256)).unwrap_err();
    assert!(matches!(err, ConversionError::OutOfRange { .. }));

    let err = String::from_data(&Data::Count(1)).unwrap_err();
    assert!(matches!(
        err,
        ConversionError::TypeMismatch {
            expected: DataType::String,
            actual: DataType::Count
        }
    ));
}

#[test]
fn message_payload_is_decoded_once() {
    let original = vector![42i64, "foo"];
    let msg = Message::from_wire(Topic::from("/t"), encode(&original));
    assert!(!msg.is_decoded());
    assert_eq!(msg.data().unwrap(), &original);
    assert!(msg.is_decoded());
    let (topic, data) = msg.into_parts().unwrap();
    assert_eq!(topic, "/t");
    assert_eq!(data, original);
}
