use std::collections::HashMap;

use bigdecimal::{BigDecimal, Zero};
use indexmap::IndexMap;
use num_bigint::BigInt;

use crate::reader::Reader;
use crate::registry::{self, Registry, TagRange};
use crate::value::{Kind, Record, Value};
use crate::writer::Writer;
use crate::{CodecError, Result};

/// Out-of-domain null markers for boxed integer array elements. Each sets
/// one bit past the legal signed range for its width, so no real value can
/// produce it; the corresponding in-domain minimum ends in 0x0F / 0x01.
const NULL_SINT32: [u8; 5] = [0xFF, 0xFF, 0xFF, 0xFF, 0x1F];
const NULL_SINT64: [u8; 10] = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x03];

/// A registered `(encode, decode)` pair for one [`Kind`].
///
/// `encode` writes the codec's leading tag itself (singleton or computed
/// ranged byte); `decode` receives the tag byte already consumed by
/// [`Reader::decode_any`].
pub trait AnyCodec: Send + Sync {
    fn kind(&self) -> Kind;
    fn range(&self) -> TagRange;
    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<()>;
    fn decode(&self, reader: &mut Reader, tag: u8) -> Result<Value>;
}

/// Per-type codec for record bodies. The engine frames the body with a
/// 4-byte length; everything inside the frame belongs to the codec.
pub trait RecordCodec: Send + Sync {
    fn encode_body(&self, writer: &mut Writer, fields: &[Value]) -> Result<()>;
    fn decode_body(&self, reader: &mut Reader) -> Result<Vec<Value>>;
}

fn kind_mismatch(expected: Kind, got: &Value) -> CodecError {
    CodecError::Encode(format!(
        "codec for {} asked to encode a {} value",
        expected.name(),
        got.kind().name()
    ))
}

/// Writes a collection size through a counted range: inline when it fits
/// the window, else the sentinel byte plus an explicit plain varint.
fn write_counted_len(writer: &mut Writer, range: TagRange, len: usize) -> Result<()> {
    if len < range.window() as usize {
        writer.write_u8(range.start() + len as u8)
    } else {
        writer.write_u8(range.end())?;
        writer.write_varint64(len as u64)
    }
}

fn read_counted_len(reader: &mut Reader, range: TagRange, tag: u8) -> Result<usize> {
    if tag == range.end() {
        reader.read_len()
    } else {
        Ok((tag - range.start()) as usize)
    }
}

// --- scalars ---

struct NullCodec;

impl AnyCodec for NullCodec {
    fn kind(&self) -> Kind {
        Kind::Null
    }

    fn range(&self) -> TagRange {
        TagRange::singleton(registry::TAG_NULL)
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<()> {
        if !value.is_null() {
            return Err(kind_mismatch(Kind::Null, value));
        }
        writer.write_u8(registry::TAG_NULL)
    }

    fn decode(&self, _reader: &mut Reader, _tag: u8) -> Result<Value> {
        Ok(Value::Null)
    }
}

/// One tag byte per truth value; never a numeric payload.
struct BoolCodec;

impl AnyCodec for BoolCodec {
    fn kind(&self) -> Kind {
        Kind::Bool
    }

    fn range(&self) -> TagRange {
        TagRange::span(registry::TAG_BOOL_FALSE, registry::TAG_BOOL_TRUE)
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<()> {
        let Value::Bool(v) = value else {
            return Err(kind_mismatch(Kind::Bool, value));
        };
        writer.write_u8(if *v {
            registry::TAG_BOOL_TRUE
        } else {
            registry::TAG_BOOL_FALSE
        })
    }

    fn decode(&self, _reader: &mut Reader, tag: u8) -> Result<Value> {
        Ok(Value::Bool(tag == registry::TAG_BOOL_TRUE))
    }
}

/// Values 0..=14 ride in the tag byte; everything else escapes through the
/// sentinel to a zigzag varint.
struct I32Codec;

impl AnyCodec for I32Codec {
    fn kind(&self) -> Kind {
        Kind::I32
    }

    fn range(&self) -> TagRange {
        TagRange::counted(
            registry::TAG_I32_BASE,
            registry::TAG_I32_MAX - registry::TAG_I32_BASE,
        )
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<()> {
        let Value::I32(v) = value else {
            return Err(kind_mismatch(Kind::I32, value));
        };
        let range = self.range();
        if (0..range.window() as i32).contains(v) {
            writer.write_u8(range.start() + *v as u8)
        } else {
            writer.write_u8(range.end())?;
            writer.write_sint32(*v)
        }
    }

    fn decode(&self, reader: &mut Reader, tag: u8) -> Result<Value> {
        let range = self.range();
        if tag == range.end() {
            Ok(Value::I32(reader.read_sint32()?))
        } else {
            Ok(Value::I32((tag - range.start()) as i32))
        }
    }
}

struct I64Codec;

impl AnyCodec for I64Codec {
    fn kind(&self) -> Kind {
        Kind::I64
    }

    fn range(&self) -> TagRange {
        TagRange::singleton(registry::TAG_I64)
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<()> {
        let Value::I64(v) = value else {
            return Err(kind_mismatch(Kind::I64, value));
        };
        writer.write_u8(registry::TAG_I64)?;
        writer.write_sint64(*v)
    }

    fn decode(&self, reader: &mut Reader, _tag: u8) -> Result<Value> {
        Ok(Value::I64(reader.read_sint64()?))
    }
}

struct U64Codec;

impl AnyCodec for U64Codec {
    fn kind(&self) -> Kind {
        Kind::U64
    }

    fn range(&self) -> TagRange {
        TagRange::singleton(registry::TAG_U64)
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<()> {
        let Value::U64(v) = value else {
            return Err(kind_mismatch(Kind::U64, value));
        };
        writer.write_u8(registry::TAG_U64)?;
        writer.write_varint64(*v)
    }

    fn decode(&self, reader: &mut Reader, _tag: u8) -> Result<Value> {
        Ok(Value::U64(reader.read_varint64()?))
    }
}

struct F32Codec;

impl AnyCodec for F32Codec {
    fn kind(&self) -> Kind {
        Kind::F32
    }

    fn range(&self) -> TagRange {
        TagRange::singleton(registry::TAG_F32)
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<()> {
        let Value::F32(v) = value else {
            return Err(kind_mismatch(Kind::F32, value));
        };
        writer.write_u8(registry::TAG_F32)?;
        writer.write_f32(*v)
    }

    fn decode(&self, reader: &mut Reader, _tag: u8) -> Result<Value> {
        Ok(Value::F32(reader.read_f32()?))
    }
}

struct F64Codec;

impl AnyCodec for F64Codec {
    fn kind(&self) -> Kind {
        Kind::F64
    }

    fn range(&self) -> TagRange {
        TagRange::singleton(registry::TAG_F64)
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<()> {
        let Value::F64(v) = value else {
            return Err(kind_mismatch(Kind::F64, value));
        };
        writer.write_u8(registry::TAG_F64)?;
        writer.write_f64(*v)
    }

    fn decode(&self, reader: &mut Reader, _tag: u8) -> Result<Value> {
        Ok(Value::F64(reader.read_f64()?))
    }
}

// --- string / bytes ---

/// Byte lengths 0..=30 ride in the tag, immediately followed by the UTF-8
/// bytes; longer strings escape to a zigzag varint length.
struct StrCodec;

impl AnyCodec for StrCodec {
    fn kind(&self) -> Kind {
        Kind::Str
    }

    fn range(&self) -> TagRange {
        TagRange::counted(registry::TAG_STR_BASE, registry::TAG_STR_MAX - registry::TAG_STR_BASE)
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<()> {
        let Value::Str(s) = value else {
            return Err(kind_mismatch(Kind::Str, value));
        };
        let range = self.range();
        if s.len() < range.window() as usize {
            writer.write_u8(range.start() + s.len() as u8)?;
        } else {
            writer.write_u8(range.end())?;
            writer.write_sint64(s.len() as i64)?;
        }
        writer.write_raw(s.as_bytes())
    }

    fn decode(&self, reader: &mut Reader, tag: u8) -> Result<Value> {
        let range = self.range();
        let len = if tag == range.end() {
            let n = reader.read_sint64()?;
            if n < 0 || n as u64 > reader.remaining() as u64 {
                return Err(CodecError::InsufficientData);
            }
            n as usize
        } else {
            (tag - range.start()) as usize
        };
        let bytes = reader.read_raw(len)?;
        let s = String::from_utf8(bytes.to_vec()).map_err(|e| CodecError::Decode(e.to_string()))?;
        Ok(Value::Str(s))
    }
}

struct BytesCodec;

impl AnyCodec for BytesCodec {
    fn kind(&self) -> Kind {
        Kind::Bytes
    }

    fn range(&self) -> TagRange {
        TagRange::singleton(registry::TAG_BYTES)
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<()> {
        let Value::Bytes(b) = value else {
            return Err(kind_mismatch(Kind::Bytes, value));
        };
        writer.write_u8(registry::TAG_BYTES)?;
        writer.write_bytes(Some(b))
    }

    fn decode(&self, reader: &mut Reader, _tag: u8) -> Result<Value> {
        match reader.read_bytes()? {
            Some(b) => Ok(Value::Bytes(b)),
            // A null reference in an "any" slot is carried by the Null tag.
            None => Err(CodecError::Decode(
                "null byte string under the Bytes tag".to_owned(),
            )),
        }
    }
}

// --- containers ---

struct ListCodec;

impl AnyCodec for ListCodec {
    fn kind(&self) -> Kind {
        Kind::List
    }

    fn range(&self) -> TagRange {
        TagRange::counted(registry::TAG_LIST_BASE, registry::TAG_LIST_MAX - registry::TAG_LIST_BASE)
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<()> {
        let Value::List(items) = value else {
            return Err(kind_mismatch(Kind::List, value));
        };
        write_counted_len(writer, self.range(), items.len())?;
        for item in items {
            writer.encode_any(item)?;
        }
        Ok(())
    }

    fn decode(&self, reader: &mut Reader, tag: u8) -> Result<Value> {
        let len = read_counted_len(reader, self.range(), tag)?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(reader.decode_any()?);
        }
        Ok(Value::List(items))
    }
}

/// Unordered map; entries as alternating key/value pairs, key first.
struct MapCodec;

impl AnyCodec for MapCodec {
    fn kind(&self) -> Kind {
        Kind::Map
    }

    fn range(&self) -> TagRange {
        TagRange::counted(registry::TAG_MAP_BASE, registry::TAG_MAP_MAX - registry::TAG_MAP_BASE)
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<()> {
        let Value::Map(map) = value else {
            return Err(kind_mismatch(Kind::Map, value));
        };
        write_counted_len(writer, self.range(), map.len())?;
        for (k, v) in map {
            writer.encode_any(k)?;
            writer.encode_any(v)?;
        }
        Ok(())
    }

    fn decode(&self, reader: &mut Reader, tag: u8) -> Result<Value> {
        let len = read_counted_len(reader, self.range(), tag)?;
        let mut map = HashMap::with_capacity(len);
        for _ in 0..len {
            let k = reader.decode_any()?;
            let v = reader.decode_any()?;
            map.insert(k, v);
        }
        Ok(Value::Map(map))
    }
}

/// Insertion-ordered map: a distinct entity kind with its own tag and no
/// inline small-size window.
struct OrderedMapCodec;

impl AnyCodec for OrderedMapCodec {
    fn kind(&self) -> Kind {
        Kind::OrderedMap
    }

    fn range(&self) -> TagRange {
        TagRange::singleton(registry::TAG_ORDERED_MAP)
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<()> {
        let Value::OrderedMap(map) = value else {
            return Err(kind_mismatch(Kind::OrderedMap, value));
        };
        writer.write_u8(registry::TAG_ORDERED_MAP)?;
        writer.write_varint64(map.len() as u64)?;
        for (k, v) in map {
            writer.encode_any(k)?;
            writer.encode_any(v)?;
        }
        Ok(())
    }

    fn decode(&self, reader: &mut Reader, _tag: u8) -> Result<Value> {
        let len = reader.read_len()?;
        let mut map = IndexMap::with_capacity(len);
        for _ in 0..len {
            let k = reader.decode_any()?;
            let v = reader.decode_any()?;
            map.insert(k, v);
        }
        Ok(Value::OrderedMap(map))
    }
}

// --- big numbers ---

/// Minimal two's-complement big-endian bytes, length-prefixed like `Bytes`.
struct BigIntCodec;

impl AnyCodec for BigIntCodec {
    fn kind(&self) -> Kind {
        Kind::BigInt
    }

    fn range(&self) -> TagRange {
        TagRange::singleton(registry::TAG_BIGINT)
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<()> {
        let Value::BigInt(v) = value else {
            return Err(kind_mismatch(Kind::BigInt, value));
        };
        writer.write_u8(registry::TAG_BIGINT)?;
        writer.write_bytes(Some(&v.to_signed_bytes_be()))
    }

    fn decode(&self, reader: &mut Reader, _tag: u8) -> Result<Value> {
        match reader.read_bytes()? {
            Some(b) => Ok(Value::BigInt(BigInt::from_signed_bytes_be(&b))),
            None => Err(CodecError::Decode(
                "null magnitude under the BigInt tag".to_owned(),
            )),
        }
    }
}

/// `(unscaled BigInt bytes, zigzag varint scale)`, with the byte-string null
/// sentinel doubling as a single-byte fast path for exact zero.
struct BigDecimalCodec;

impl AnyCodec for BigDecimalCodec {
    fn kind(&self) -> Kind {
        Kind::BigDecimal
    }

    fn range(&self) -> TagRange {
        TagRange::singleton(registry::TAG_BIGDECIMAL)
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<()> {
        let Value::BigDecimal(v) = value else {
            return Err(kind_mismatch(Kind::BigDecimal, value));
        };
        writer.write_u8(registry::TAG_BIGDECIMAL)?;
        if v.is_zero() {
            return writer.write_bytes(None);
        }
        let (unscaled, scale) = v.as_bigint_and_exponent();
        writer.write_bytes(Some(&unscaled.to_signed_bytes_be()))?;
        writer.write_sint64(scale)
    }

    fn decode(&self, reader: &mut Reader, _tag: u8) -> Result<Value> {
        match reader.read_bytes()? {
            None => Ok(Value::BigDecimal(BigDecimal::zero())),
            Some(b) => {
                let unscaled = BigInt::from_signed_bytes_be(&b);
                let scale = reader.read_sint64()?;
                Ok(Value::BigDecimal(BigDecimal::new(unscaled, scale)))
            }
        }
    }
}

// --- class reference ---

struct ClassRefCodec;

impl AnyCodec for ClassRefCodec {
    fn kind(&self) -> Kind {
        Kind::ClassRef
    }

    fn range(&self) -> TagRange {
        TagRange::singleton(registry::TAG_CLASS_REF)
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<()> {
        let Value::ClassRef(name) = value else {
            return Err(kind_mismatch(Kind::ClassRef, value));
        };
        writer.write_u8(registry::TAG_CLASS_REF)?;
        writer.write_string(name.as_deref())
    }

    fn decode(&self, reader: &mut Reader, _tag: u8) -> Result<Value> {
        Ok(Value::ClassRef(reader.read_string()?))
    }
}

// --- record ---

/// Tag, registered type name, then the 4-byte-framed body owned by the
/// per-type codec. A relay can skip the frame without the schema.
struct RecordAnyCodec;

impl AnyCodec for RecordAnyCodec {
    fn kind(&self) -> Kind {
        Kind::Record
    }

    fn range(&self) -> TagRange {
        TagRange::singleton(registry::TAG_RECORD)
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<()> {
        let Value::Record(rec) = value else {
            return Err(kind_mismatch(Kind::Record, value));
        };
        writer.write_u8(registry::TAG_RECORD)?;
        writer.write_string(Some(&rec.name))?;
        writer.write_record(&rec.name, Some(&rec.fields))
    }

    fn decode(&self, reader: &mut Reader, _tag: u8) -> Result<Value> {
        let name = reader
            .read_string()?
            .ok_or_else(|| CodecError::Decode("record frame without a type name".to_owned()))?;
        match reader.read_record(&name)? {
            Some(fields) => Ok(Value::Record(Record { name, fields })),
            None => Ok(Value::Null),
        }
    }
}

// --- typed arrays ---
// Always an explicit varint length (no inline window), then elements in the
// encoding appropriate to the element type. Boxed variants add a per-element
// null marker that no legal value can produce.

struct ArrayI32Codec;

impl AnyCodec for ArrayI32Codec {
    fn kind(&self) -> Kind {
        Kind::ArrayI32
    }

    fn range(&self) -> TagRange {
        TagRange::singleton(registry::TAG_ARRAY_I32)
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<()> {
        let Value::ArrayI32(items) = value else {
            return Err(kind_mismatch(Kind::ArrayI32, value));
        };
        writer.write_u8(registry::TAG_ARRAY_I32)?;
        writer.write_varint64(items.len() as u64)?;
        for v in items {
            writer.write_sint32(*v)?;
        }
        Ok(())
    }

    fn decode(&self, reader: &mut Reader, _tag: u8) -> Result<Value> {
        let len = reader.read_len()?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(reader.read_sint32()?);
        }
        Ok(Value::ArrayI32(items))
    }
}

struct ArrayBoxedI32Codec;

impl AnyCodec for ArrayBoxedI32Codec {
    fn kind(&self) -> Kind {
        Kind::ArrayBoxedI32
    }

    fn range(&self) -> TagRange {
        TagRange::singleton(registry::TAG_ARRAY_BOXED_I32)
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<()> {
        let Value::ArrayBoxedI32(items) = value else {
            return Err(kind_mismatch(Kind::ArrayBoxedI32, value));
        };
        writer.write_u8(registry::TAG_ARRAY_BOXED_I32)?;
        writer.write_varint64(items.len() as u64)?;
        for v in items {
            match v {
                Some(v) => writer.write_sint32(*v)?,
                None => writer.write_raw(&NULL_SINT32)?,
            }
        }
        Ok(())
    }

    fn decode(&self, reader: &mut Reader, _tag: u8) -> Result<Value> {
        let len = reader.read_len()?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(reader.read_boxed_sint32()?);
        }
        Ok(Value::ArrayBoxedI32(items))
    }
}

struct ArrayI64Codec;

impl AnyCodec for ArrayI64Codec {
    fn kind(&self) -> Kind {
        Kind::ArrayI64
    }

    fn range(&self) -> TagRange {
        TagRange::singleton(registry::TAG_ARRAY_I64)
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<()> {
        let Value::ArrayI64(items) = value else {
            return Err(kind_mismatch(Kind::ArrayI64, value));
        };
        writer.write_u8(registry::TAG_ARRAY_I64)?;
        writer.write_varint64(items.len() as u64)?;
        for v in items {
            writer.write_sint64(*v)?;
        }
        Ok(())
    }

    fn decode(&self, reader: &mut Reader, _tag: u8) -> Result<Value> {
        let len = reader.read_len()?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(reader.read_sint64()?);
        }
        Ok(Value::ArrayI64(items))
    }
}

struct ArrayBoxedI64Codec;

impl AnyCodec for ArrayBoxedI64Codec {
    fn kind(&self) -> Kind {
        Kind::ArrayBoxedI64
    }

    fn range(&self) -> TagRange {
        TagRange::singleton(registry::TAG_ARRAY_BOXED_I64)
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<()> {
        let Value::ArrayBoxedI64(items) = value else {
            return Err(kind_mismatch(Kind::ArrayBoxedI64, value));
        };
        writer.write_u8(registry::TAG_ARRAY_BOXED_I64)?;
        writer.write_varint64(items.len() as u64)?;
        for v in items {
            match v {
                Some(v) => writer.write_sint64(*v)?,
                None => writer.write_raw(&NULL_SINT64)?,
            }
        }
        Ok(())
    }

    fn decode(&self, reader: &mut Reader, _tag: u8) -> Result<Value> {
        let len = reader.read_len()?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(reader.read_boxed_sint64()?);
        }
        Ok(Value::ArrayBoxedI64(items))
    }
}

struct ArrayU64Codec;

impl AnyCodec for ArrayU64Codec {
    fn kind(&self) -> Kind {
        Kind::ArrayU64
    }

    fn range(&self) -> TagRange {
        TagRange::singleton(registry::TAG_ARRAY_U64)
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<()> {
        let Value::ArrayU64(items) = value else {
            return Err(kind_mismatch(Kind::ArrayU64, value));
        };
        writer.write_u8(registry::TAG_ARRAY_U64)?;
        writer.write_varint64(items.len() as u64)?;
        for v in items {
            writer.write_varint64(*v)?;
        }
        Ok(())
    }

    fn decode(&self, reader: &mut Reader, _tag: u8) -> Result<Value> {
        let len = reader.read_len()?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(reader.read_varint64()?);
        }
        Ok(Value::ArrayU64(items))
    }
}

struct ArrayF32Codec;

impl AnyCodec for ArrayF32Codec {
    fn kind(&self) -> Kind {
        Kind::ArrayF32
    }

    fn range(&self) -> TagRange {
        TagRange::singleton(registry::TAG_ARRAY_F32)
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<()> {
        let Value::ArrayF32(items) = value else {
            return Err(kind_mismatch(Kind::ArrayF32, value));
        };
        writer.write_u8(registry::TAG_ARRAY_F32)?;
        writer.write_varint64(items.len() as u64)?;
        for v in items {
            writer.write_f32(*v)?;
        }
        Ok(())
    }

    fn decode(&self, reader: &mut Reader, _tag: u8) -> Result<Value> {
        let len = reader.read_len()?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(reader.read_f32()?);
        }
        Ok(Value::ArrayF32(items))
    }
}

/// Fixed-width elements have no out-of-domain bit pattern to spare, so boxed
/// float arrays carry one presence byte per element instead.
struct ArrayBoxedF32Codec;

impl AnyCodec for ArrayBoxedF32Codec {
    fn kind(&self) -> Kind {
        Kind::ArrayBoxedF32
    }

    fn range(&self) -> TagRange {
        TagRange::singleton(registry::TAG_ARRAY_BOXED_F32)
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<()> {
        let Value::ArrayBoxedF32(items) = value else {
            return Err(kind_mismatch(Kind::ArrayBoxedF32, value));
        };
        writer.write_u8(registry::TAG_ARRAY_BOXED_F32)?;
        writer.write_varint64(items.len() as u64)?;
        for v in items {
            match v {
                Some(v) => {
                    writer.write_u8(1)?;
                    writer.write_f32(*v)?;
                }
                None => writer.write_u8(0)?,
            }
        }
        Ok(())
    }

    fn decode(&self, reader: &mut Reader, _tag: u8) -> Result<Value> {
        let len = reader.read_len()?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(match reader.read_u8()? {
                0 => None,
                1 => Some(reader.read_f32()?),
                m => {
                    return Err(CodecError::Decode(format!(
                        "invalid presence marker {} in boxed f32 array",
                        m
                    )))
                }
            });
        }
        Ok(Value::ArrayBoxedF32(items))
    }
}

struct ArrayF64Codec;

impl AnyCodec for ArrayF64Codec {
    fn kind(&self) -> Kind {
        Kind::ArrayF64
    }

    fn range(&self) -> TagRange {
        TagRange::singleton(registry::TAG_ARRAY_F64)
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<()> {
        let Value::ArrayF64(items) = value else {
            return Err(kind_mismatch(Kind::ArrayF64, value));
        };
        writer.write_u8(registry::TAG_ARRAY_F64)?;
        writer.write_varint64(items.len() as u64)?;
        for v in items {
            writer.write_f64(*v)?;
        }
        Ok(())
    }

    fn decode(&self, reader: &mut Reader, _tag: u8) -> Result<Value> {
        let len = reader.read_len()?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(reader.read_f64()?);
        }
        Ok(Value::ArrayF64(items))
    }
}

struct ArrayBoxedF64Codec;

impl AnyCodec for ArrayBoxedF64Codec {
    fn kind(&self) -> Kind {
        Kind::ArrayBoxedF64
    }

    fn range(&self) -> TagRange {
        TagRange::singleton(registry::TAG_ARRAY_BOXED_F64)
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<()> {
        let Value::ArrayBoxedF64(items) = value else {
            return Err(kind_mismatch(Kind::ArrayBoxedF64, value));
        };
        writer.write_u8(registry::TAG_ARRAY_BOXED_F64)?;
        writer.write_varint64(items.len() as u64)?;
        for v in items {
            match v {
                Some(v) => {
                    writer.write_u8(1)?;
                    writer.write_f64(*v)?;
                }
                None => writer.write_u8(0)?,
            }
        }
        Ok(())
    }

    fn decode(&self, reader: &mut Reader, _tag: u8) -> Result<Value> {
        let len = reader.read_len()?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(match reader.read_u8()? {
                0 => None,
                1 => Some(reader.read_f64()?),
                m => {
                    return Err(CodecError::Decode(format!(
                        "invalid presence marker {} in boxed f64 array",
                        m
                    )))
                }
            });
        }
        Ok(Value::ArrayBoxedF64(items))
    }
}

struct ArrayBoolCodec;

impl AnyCodec for ArrayBoolCodec {
    fn kind(&self) -> Kind {
        Kind::ArrayBool
    }

    fn range(&self) -> TagRange {
        TagRange::singleton(registry::TAG_ARRAY_BOOL)
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<()> {
        let Value::ArrayBool(items) = value else {
            return Err(kind_mismatch(Kind::ArrayBool, value));
        };
        writer.write_u8(registry::TAG_ARRAY_BOOL)?;
        writer.write_varint64(items.len() as u64)?;
        for v in items {
            writer.write_u8(u8::from(*v))?;
        }
        Ok(())
    }

    fn decode(&self, reader: &mut Reader, _tag: u8) -> Result<Value> {
        let len = reader.read_len()?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(match reader.read_u8()? {
                0 => false,
                1 => true,
                b => {
                    return Err(CodecError::Decode(format!(
                        "invalid bool element {} in bool array",
                        b
                    )))
                }
            });
        }
        Ok(Value::ArrayBool(items))
    }
}

/// Bool elements span {0, 1}; 2 is one past the legal range and marks null.
struct ArrayBoxedBoolCodec;

impl AnyCodec for ArrayBoxedBoolCodec {
    fn kind(&self) -> Kind {
        Kind::ArrayBoxedBool
    }

    fn range(&self) -> TagRange {
        TagRange::singleton(registry::TAG_ARRAY_BOXED_BOOL)
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<()> {
        let Value::ArrayBoxedBool(items) = value else {
            return Err(kind_mismatch(Kind::ArrayBoxedBool, value));
        };
        writer.write_u8(registry::TAG_ARRAY_BOXED_BOOL)?;
        writer.write_varint64(items.len() as u64)?;
        for v in items {
            writer.write_u8(match v {
                Some(b) => u8::from(*b),
                None => 2,
            })?;
        }
        Ok(())
    }

    fn decode(&self, reader: &mut Reader, _tag: u8) -> Result<Value> {
        let len = reader.read_len()?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(match reader.read_u8()? {
                0 => Some(false),
                1 => Some(true),
                2 => None,
                b => {
                    return Err(CodecError::Decode(format!(
                        "invalid bool element {} in boxed bool array",
                        b
                    )))
                }
            });
        }
        Ok(Value::ArrayBoxedBool(items))
    }
}

/// String elements reuse the nullable string primitive, so the boxed and
/// plain flavors collapse into one codec.
struct ArrayStringCodec;

impl AnyCodec for ArrayStringCodec {
    fn kind(&self) -> Kind {
        Kind::ArrayString
    }

    fn range(&self) -> TagRange {
        TagRange::singleton(registry::TAG_ARRAY_STRING)
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<()> {
        let Value::ArrayString(items) = value else {
            return Err(kind_mismatch(Kind::ArrayString, value));
        };
        writer.write_u8(registry::TAG_ARRAY_STRING)?;
        writer.write_varint64(items.len() as u64)?;
        for v in items {
            writer.write_string(v.as_deref())?;
        }
        Ok(())
    }

    fn decode(&self, reader: &mut Reader, _tag: u8) -> Result<Value> {
        let len = reader.read_len()?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(reader.read_string()?);
        }
        Ok(Value::ArrayString(items))
    }
}

/// A record codec whose body is a varint field count followed by each field
/// through the "any" path. Useful when no hand-written per-type layout
/// exists; schema-aware codecs will usually write tighter bodies.
pub struct AnyFieldsRecordCodec;

impl RecordCodec for AnyFieldsRecordCodec {
    fn encode_body(&self, writer: &mut Writer, fields: &[Value]) -> Result<()> {
        writer.write_varint64(fields.len() as u64)?;
        for field in fields {
            writer.encode_any(field)?;
        }
        Ok(())
    }

    fn decode_body(&self, reader: &mut Reader) -> Result<Vec<Value>> {
        let len = reader.read_len()?;
        let mut fields = Vec::with_capacity(len);
        for _ in 0..len {
            fields.push(reader.decode_any()?);
        }
        Ok(fields)
    }
}

/// Installs the default tag table. Called once by [`Registry::new`].
pub(crate) fn install_defaults(reg: &mut Registry) -> Result<()> {
    let codecs: Vec<Box<dyn AnyCodec>> = vec![
        Box::new(NullCodec),
        Box::new(BoolCodec),
        Box::new(I32Codec),
        Box::new(I64Codec),
        Box::new(U64Codec),
        Box::new(F32Codec),
        Box::new(F64Codec),
        Box::new(StrCodec),
        Box::new(BytesCodec),
        Box::new(ListCodec),
        Box::new(MapCodec),
        Box::new(OrderedMapCodec),
        Box::new(BigIntCodec),
        Box::new(BigDecimalCodec),
        Box::new(ClassRefCodec),
        Box::new(RecordAnyCodec),
        Box::new(ArrayI32Codec),
        Box::new(ArrayBoxedI32Codec),
        Box::new(ArrayI64Codec),
        Box::new(ArrayBoxedI64Codec),
        Box::new(ArrayU64Codec),
        Box::new(ArrayF32Codec),
        Box::new(ArrayBoxedF32Codec),
        Box::new(ArrayF64Codec),
        Box::new(ArrayBoxedF64Codec),
        Box::new(ArrayBoolCodec),
        Box::new(ArrayBoxedBoolCodec),
        Box::new(ArrayStringCodec),
    ];
    for codec in codecs {
        let range = codec.range();
        reg.register(range, codec)?;
    }
    Ok(())
}
