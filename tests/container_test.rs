use std::collections::HashMap;

use tagwire::registry;
use tagwire::{decode_any, encode_any, CodecError, Registry, Value};

fn list_of(n: usize) -> Value {
    Value::List(vec![Value::Null; n])
}

#[test]
fn test_list_size_inline_window_boundaries() {
    let registry = Registry::new();
    // Sizes 0..=15 ride in the tag byte: 1 tag byte + 1 byte per Null element.
    for n in [0usize, 1, 15] {
        let buf = encode_any(&registry, &list_of(n)).unwrap();
        assert_eq!(buf.len(), 1 + n, "size {}", n);
        assert_eq!(buf[0], registry::TAG_LIST_BASE + n as u8);
    }
    // 16 escapes: sentinel byte + one varint byte + elements.
    let buf = encode_any(&registry, &list_of(16)).unwrap();
    assert_eq!(buf.len(), 2 + 16);
    assert_eq!(buf[0], registry::TAG_LIST_MAX);
    assert_eq!(buf[1], 16);

    let buf = encode_any(&registry, &list_of(17)).unwrap();
    assert_eq!(buf.len(), 2 + 17);
    assert_eq!(buf[0], registry::TAG_LIST_MAX);
    assert_eq!(buf[1], 17);
}

#[test]
fn test_list_roundtrip_across_the_window_boundary() {
    let registry = Registry::new();
    for n in [0usize, 1, 14, 15, 16, 17, 200] {
        let value = Value::List((0..n as i32).map(Value::I32).collect());
        let mut buf = encode_any(&registry, &value).unwrap();
        let decoded = decode_any(&registry, &mut buf).unwrap();
        assert_eq!(decoded, value, "size {}", n);
        assert!(buf.is_empty());
    }
}

#[test]
fn test_map_size_inline_window_boundaries() {
    let registry = Registry::new();
    let empty = Value::Map(HashMap::new());
    let buf = encode_any(&registry, &empty).unwrap();
    assert_eq!(&buf[..], &[registry::TAG_MAP_BASE]);

    // 15 entries exceeds the window of 0..=14.
    let mut m = HashMap::new();
    for i in 0..15 {
        m.insert(Value::I32(i), Value::Null);
    }
    let buf = encode_any(&registry, &Value::Map(m)).unwrap();
    assert_eq!(buf[0], registry::TAG_MAP_MAX);
    assert_eq!(buf[1], 15);
}

#[test]
fn test_map_roundtrip_with_mixed_keys() {
    let registry = Registry::new();
    let mut m = HashMap::new();
    m.insert(Value::Str("name".into()), Value::Str("ada".into()));
    m.insert(Value::I32(1), Value::List(vec![Value::Bool(true)]));
    m.insert(Value::F64(2.5), Value::Null);
    m.insert(Value::Null, Value::I64(-9));
    let value = Value::Map(m);
    let mut buf = encode_any(&registry, &value).unwrap();
    assert_eq!(decode_any(&registry, &mut buf).unwrap(), value);
}

#[test]
fn test_deeply_nested_lists() {
    let registry = Registry::new();
    let mut value = Value::I32(7);
    for _ in 0..64 {
        value = Value::List(vec![value]);
    }
    let mut buf = encode_any(&registry, &value).unwrap();
    assert_eq!(decode_any(&registry, &mut buf).unwrap(), value);
}

#[test]
fn test_null_element_inside_list_stays_null() {
    // A null reference in an element slot is the Null value, never an empty
    // collection.
    let registry = Registry::new();
    let value = Value::List(vec![Value::Null, Value::List(vec![]), Value::Str(String::new())]);
    let mut buf = encode_any(&registry, &value).unwrap();
    let decoded = decode_any(&registry, &mut buf).unwrap();
    let Value::List(items) = decoded else {
        panic!("expected a list");
    };
    assert!(items[0].is_null());
    assert_eq!(items[1], Value::List(vec![]));
    assert_eq!(items[2], Value::Str(String::new()));
}

#[test]
fn test_corrupt_count_larger_than_input_is_rejected() {
    let registry = Registry::new();
    // List sentinel tag claiming 200 elements with 1 byte behind it.
    let mut buf = bytes::Bytes::copy_from_slice(&[registry::TAG_LIST_MAX, 200, 1, 0x51]);
    assert!(matches!(
        decode_any(&registry, &mut buf),
        Err(CodecError::InsufficientData)
    ));
}

#[test]
fn test_truncated_list_is_rejected() {
    let registry = Registry::new();
    // Inline size 3, but only two elements present.
    let mut buf =
        bytes::Bytes::copy_from_slice(&[registry::TAG_LIST_BASE + 3, registry::TAG_NULL, registry::TAG_NULL]);
    assert!(matches!(
        decode_any(&registry, &mut buf),
        Err(CodecError::InsufficientData)
    ));
}
