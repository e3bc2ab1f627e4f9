use tagwire::registry::{self, TagRange};
use tagwire::{
    AnyCodec, AnyFieldsRecordCodec, CodecError, Kind, Reader, Registry, Result, Value, Writer,
};

use std::sync::Arc;

struct FakeBoolCodec;

impl AnyCodec for FakeBoolCodec {
    fn kind(&self) -> Kind {
        Kind::Bool
    }

    fn range(&self) -> TagRange {
        TagRange::span(200, 201)
    }

    fn encode(&self, writer: &mut Writer, _value: &Value) -> Result<()> {
        writer.write_u8(200)
    }

    fn decode(&self, _reader: &mut Reader, tag: u8) -> Result<Value> {
        Ok(Value::Bool(tag == 201))
    }
}

struct FakeNullCodec;

impl AnyCodec for FakeNullCodec {
    fn kind(&self) -> Kind {
        Kind::Null
    }

    fn range(&self) -> TagRange {
        TagRange::span(201, 210)
    }

    fn encode(&self, writer: &mut Writer, _value: &Value) -> Result<()> {
        writer.write_u8(201)
    }

    fn decode(&self, _reader: &mut Reader, _tag: u8) -> Result<Value> {
        Ok(Value::Null)
    }
}

#[test]
fn test_default_table_covers_every_kind() {
    let registry = Registry::new();
    let kinds = [
        Kind::Null,
        Kind::Bool,
        Kind::I32,
        Kind::I64,
        Kind::U64,
        Kind::F32,
        Kind::F64,
        Kind::Str,
        Kind::Bytes,
        Kind::List,
        Kind::Map,
        Kind::OrderedMap,
        Kind::BigInt,
        Kind::BigDecimal,
        Kind::ClassRef,
        Kind::Record,
        Kind::ArrayI32,
        Kind::ArrayBoxedI32,
        Kind::ArrayI64,
        Kind::ArrayBoxedI64,
        Kind::ArrayU64,
        Kind::ArrayF32,
        Kind::ArrayBoxedF32,
        Kind::ArrayF64,
        Kind::ArrayBoxedF64,
        Kind::ArrayBool,
        Kind::ArrayBoxedBool,
        Kind::ArrayString,
    ];
    for kind in kinds {
        assert!(registry.codec_for_kind(kind).is_ok(), "kind {:?}", kind);
        assert!(registry.range_for_kind(kind).is_some(), "kind {:?}", kind);
    }
}

#[test]
fn test_default_ranges_are_disjoint() {
    let registry = Registry::new();
    // Every tag byte resolves to at most one codec, and a tag inside a range
    // resolves to the codec owning that range.
    let list = registry.range_for_kind(Kind::List).unwrap();
    for tag in list.start()..=list.end() {
        let codec = registry.codec_for_tag(tag).unwrap();
        assert_eq!(codec.kind(), Kind::List);
    }
    let null = registry.range_for_kind(Kind::Null).unwrap();
    assert!(null.is_singleton());
    assert_eq!(null.start(), registry::TAG_NULL);
}

#[test]
fn test_unknown_tag_is_rejected() {
    let registry = Registry::new();
    assert!(matches!(
        registry.codec_for_tag(0xEE),
        Err(CodecError::UnknownTag(0xEE))
    ));
}

#[test]
fn test_overlapping_registration_is_rejected() {
    let mut registry = Registry::new();
    // 200..=201 is free, so a fresh kindless slot would work, but Bool is
    // already claimed by the default table.
    let err = registry
        .register(TagRange::span(200, 201), Box::new(FakeBoolCodec))
        .unwrap_err();
    assert!(matches!(err, CodecError::DuplicateKind("Bool")));

    // On an empty registry the same codec lands fine.
    let mut registry = Registry::empty();
    registry
        .register(TagRange::span(200, 201), Box::new(FakeBoolCodec))
        .unwrap();
    // A second range touching byte 201 must be refused.
    let err = registry
        .register(TagRange::span(201, 210), Box::new(FakeNullCodec))
        .unwrap_err();
    assert!(matches!(
        err,
        CodecError::TagRangeOverlap {
            new_start: 201,
            new_end: 210,
            old_start: 200,
            old_end: 201,
        }
    ));
}

#[test]
fn test_unregistered_kind_fails_encode() {
    let registry = Registry::empty();
    let mut w = Writer::new(&registry);
    let err = w.encode_any(&Value::Bool(true)).unwrap_err();
    assert!(matches!(err, CodecError::UnregisteredKind("Bool")));
}

#[test]
fn test_duplicate_record_codec_is_rejected() {
    let mut registry = Registry::new();
    registry
        .register_record("point", Arc::new(AnyFieldsRecordCodec))
        .unwrap();
    let err = registry
        .register_record("point", Arc::new(AnyFieldsRecordCodec))
        .unwrap_err();
    assert!(matches!(err, CodecError::DuplicateRecord(name) if name == "point"));
}

#[test]
fn test_unknown_record_name_fails() {
    let registry = Registry::new();
    assert!(matches!(
        registry.record_codec("nope"),
        Err(CodecError::UnknownRecord(_))
    ));
}

#[test]
fn test_counted_range_geometry() {
    let r = TagRange::counted(64, 16);
    assert_eq!(r.start(), 64);
    assert_eq!(r.end(), 80);
    assert_eq!(r.window(), 16);
    assert!(r.contains(64));
    assert!(r.contains(80));
    assert!(!r.contains(81));
    assert!(!r.is_singleton());
    assert!(TagRange::singleton(81).is_singleton());
}
