use tagwire::{unzigzag32, unzigzag64, zigzag32, zigzag64, CodecError, Reader, Registry, Writer};

fn encode_varint64(registry: &Registry, v: u64) -> bytes::Bytes {
    let mut w = Writer::new(registry);
    w.write_varint64(v).unwrap();
    w.take_bytes()
}

#[test]
fn test_varint64_encoded_length_is_minimal() {
    let registry = Registry::new();
    // One byte per 7 bits of magnitude, never more.
    let cases: &[(u64, usize)] = &[
        (0, 1),
        (1, 1),
        (127, 1),
        (128, 2),
        (16_383, 2),
        (16_384, 3),
        (u32::MAX as u64, 5),
        (u64::MAX, 10),
    ];
    for &(v, expected_len) in cases {
        let bytes = encode_varint64(&registry, v);
        assert_eq!(bytes.len(), expected_len, "value {}", v);
        let mut r = Reader::new(&registry, bytes);
        assert_eq!(r.read_varint64().unwrap(), v);
        assert_eq!(r.remaining(), 0);
    }
}

#[test]
fn test_varint64_wire_bytes() {
    let registry = Registry::new();
    assert_eq!(&encode_varint64(&registry, 0)[..], &[0x00]);
    assert_eq!(&encode_varint64(&registry, 1)[..], &[0x01]);
    assert_eq!(&encode_varint64(&registry, 128)[..], &[0x80, 0x01]);
    assert_eq!(&encode_varint64(&registry, 300)[..], &[0xAC, 0x02]);
}

#[test]
fn test_zigzag_maps_small_magnitudes_to_small_codes() {
    assert_eq!(zigzag32(0), 0);
    assert_eq!(zigzag32(-1), 1);
    assert_eq!(zigzag32(1), 2);
    assert_eq!(zigzag32(-2), 3);
    assert_eq!(zigzag32(i32::MIN), u32::MAX);
    assert_eq!(zigzag64(0), 0);
    assert_eq!(zigzag64(-1), 1);
    assert_eq!(zigzag64(1), 2);
    assert_eq!(zigzag64(i64::MIN), u64::MAX);
}

#[test]
fn test_zigzag_is_a_bijection() {
    for v in [
        0i64,
        1,
        -1,
        42,
        -42,
        i64::MAX,
        i64::MIN,
        i32::MAX as i64,
        i32::MIN as i64,
    ] {
        assert_eq!(unzigzag64(zigzag64(v)), v);
    }
    for v in [0i32, 1, -1, 1000, -1000, i32::MAX, i32::MIN] {
        assert_eq!(unzigzag32(zigzag32(v)), v);
    }
}

#[test]
fn test_sint_roundtrip_and_size() {
    let registry = Registry::new();
    let mut w = Writer::new(&registry);
    // -1 zigzags to 1, so it must take a single byte.
    w.write_sint64(-1).unwrap();
    let bytes = w.take_bytes();
    assert_eq!(&bytes[..], &[0x01]);

    let mut w = Writer::new(&registry);
    // 64 zigzags to 128, crossing into two bytes.
    w.write_sint64(64).unwrap();
    let bytes = w.take_bytes();
    assert_eq!(&bytes[..], &[0x80, 0x01]);

    for v in [i64::MIN, i64::MAX, -1, 0, 1, 123_456_789] {
        let mut w = Writer::new(&registry);
        w.write_sint64(v).unwrap();
        let mut r = Reader::new(&registry, w.take_bytes());
        assert_eq!(r.read_sint64().unwrap(), v);
    }
}

#[test]
fn test_varint_truncated_input_is_insufficient_data() {
    let registry = Registry::new();
    // A continuation bit with nothing after it.
    let mut r = Reader::new(&registry, bytes::Bytes::from_static(&[0x80]));
    assert!(matches!(
        r.read_varint64(),
        Err(CodecError::InsufficientData)
    ));
}

#[test]
fn test_varint64_rejects_overlong_run() {
    let registry = Registry::new();
    // Ten continuation-looking bytes: the tenth may carry only bit 63.
    let bad = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F];
    let mut r = Reader::new(&registry, bytes::Bytes::copy_from_slice(&bad));
    assert!(matches!(
        r.read_varint64(),
        Err(CodecError::MalformedVarint { max_bytes: 10 })
    ));
}

#[test]
fn test_varint32_rejects_overlong_run() {
    let registry = Registry::new();
    // The fifth byte may carry only four bits.
    let bad = [0xFF, 0xFF, 0xFF, 0xFF, 0x10];
    let mut r = Reader::new(&registry, bytes::Bytes::copy_from_slice(&bad));
    assert!(matches!(
        r.read_varint32(),
        Err(CodecError::MalformedVarint { max_bytes: 5 })
    ));
}

#[test]
fn test_varint64_max_boundary_accepted() {
    let registry = Registry::new();
    let max = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
    let mut r = Reader::new(&registry, bytes::Bytes::copy_from_slice(&max));
    assert_eq!(r.read_varint64().unwrap(), u64::MAX);
}

#[test]
fn test_fixed_width_little_endian() {
    let registry = Registry::new();
    let mut w = Writer::new(&registry);
    w.write_fixed32(0x0102_0304).unwrap();
    w.write_fixed64(0x0102_0304_0506_0708).unwrap();
    let bytes = w.take_bytes();
    assert_eq!(&bytes[..4], &[0x04, 0x03, 0x02, 0x01]);
    let mut r = Reader::new(&registry, bytes);
    assert_eq!(r.read_fixed32().unwrap(), 0x0102_0304);
    assert_eq!(r.read_fixed64().unwrap(), 0x0102_0304_0506_0708);
}

#[test]
fn test_string_null_empty_and_populated_are_distinct() {
    let registry = Registry::new();
    let mut w = Writer::new(&registry);
    w.write_string(None).unwrap();
    w.write_string(Some("")).unwrap();
    w.write_string(Some("abc")).unwrap();
    let bytes = w.take_bytes();
    // null = zigzag(-1) = 0x01, empty = zigzag(0) = 0x00.
    assert_eq!(bytes[0], 0x01);
    assert_eq!(bytes[1], 0x00);

    let mut r = Reader::new(&registry, bytes);
    assert_eq!(r.read_string().unwrap(), None);
    assert_eq!(r.read_string().unwrap(), Some(String::new()));
    assert_eq!(r.read_string().unwrap(), Some("abc".to_string()));
}

#[test]
fn test_string_rejects_invalid_utf8() {
    let registry = Registry::new();
    // zigzag(2) = 4, then two bytes that are not valid UTF-8.
    let mut r = Reader::new(&registry, bytes::Bytes::copy_from_slice(&[0x04, 0xC0, 0x80]));
    assert!(matches!(r.read_string(), Err(CodecError::Decode(_))));
}

#[test]
fn test_bytes_null_empty_and_populated_are_distinct() {
    let registry = Registry::new();
    let mut w = Writer::new(&registry);
    w.write_bytes(None).unwrap();
    w.write_bytes(Some(&[])).unwrap();
    w.write_bytes(Some(&[9, 8, 7])).unwrap();
    let mut r = Reader::new(&registry, w.take_bytes());
    assert_eq!(r.read_bytes().unwrap(), None);
    assert_eq!(r.read_bytes().unwrap().as_deref(), Some(&[][..]));
    assert_eq!(r.read_bytes().unwrap().as_deref(), Some(&[9u8, 8, 7][..]));
}
