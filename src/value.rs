use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use bigdecimal::BigDecimal;
use bytes::Bytes;
use indexmap::IndexMap;
use num_bigint::BigInt;

/// A nested, independently-framed sub-message.
///
/// The body layout inside the frame is owned by the [`RecordCodec`]
/// registered under `name`; the engine only owns the 4-byte length frame
/// around it.
///
/// [`RecordCodec`]: crate::RecordCodec
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    pub name: String,
    pub fields: Vec<Value>,
}

impl Record {
    pub fn new(name: impl Into<String>, fields: Vec<Value>) -> Self {
        Record {
            name: name.into(),
            fields,
        }
    }
}

/// A runtime value that can occupy a schema-less "any" slot.
///
/// Null references are always `Value::Null`; an empty collection is a
/// populated variant with no elements. The two are never conflated on the
/// wire.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    /// Signed 32-bit, zigzag varint on the wire.
    I32(i32),
    /// Signed 64-bit, zigzag varint on the wire.
    I64(i64),
    /// Unsigned 64-bit, plain varint on the wire.
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Bytes(Bytes),
    List(Vec<Value>),
    /// Unordered map. Keys hash by structure; float keys hash by bit pattern.
    Map(HashMap<Value, Value>),
    /// Insertion-ordered map; a distinct entity kind with its own tag.
    OrderedMap(IndexMap<Value, Value>),
    BigInt(BigInt),
    BigDecimal(BigDecimal),
    /// A type name, or null.
    ClassRef(Option<String>),
    Record(Record),
    ArrayI32(Vec<i32>),
    ArrayBoxedI32(Vec<Option<i32>>),
    ArrayI64(Vec<i64>),
    ArrayBoxedI64(Vec<Option<i64>>),
    ArrayU64(Vec<u64>),
    ArrayF32(Vec<f32>),
    ArrayBoxedF32(Vec<Option<f32>>),
    ArrayF64(Vec<f64>),
    ArrayBoxedF64(Vec<Option<f64>>),
    ArrayBool(Vec<bool>),
    ArrayBoxedBool(Vec<Option<bool>>),
    ArrayString(Vec<Option<String>>),
}

/// Field-less discriminant of [`Value`], computed once per value and used to
/// index the encode dispatch table. Keeps the hot path free of any runtime
/// type-identity lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Kind {
    Null,
    Bool,
    I32,
    I64,
    U64,
    F32,
    F64,
    Str,
    Bytes,
    List,
    Map,
    OrderedMap,
    BigInt,
    BigDecimal,
    ClassRef,
    Record,
    ArrayI32,
    ArrayBoxedI32,
    ArrayI64,
    ArrayBoxedI64,
    ArrayU64,
    ArrayF32,
    ArrayBoxedF32,
    ArrayF64,
    ArrayBoxedF64,
    ArrayBool,
    ArrayBoxedBool,
    ArrayString,
}

impl Kind {
    pub const COUNT: usize = 28;

    pub fn name(self) -> &'static str {
        match self {
            Kind::Null => "Null",
            Kind::Bool => "Bool",
            Kind::I32 => "I32",
            Kind::I64 => "I64",
            Kind::U64 => "U64",
            Kind::F32 => "F32",
            Kind::F64 => "F64",
            Kind::Str => "Str",
            Kind::Bytes => "Bytes",
            Kind::List => "List",
            Kind::Map => "Map",
            Kind::OrderedMap => "OrderedMap",
            Kind::BigInt => "BigInt",
            Kind::BigDecimal => "BigDecimal",
            Kind::ClassRef => "ClassRef",
            Kind::Record => "Record",
            Kind::ArrayI32 => "ArrayI32",
            Kind::ArrayBoxedI32 => "ArrayBoxedI32",
            Kind::ArrayI64 => "ArrayI64",
            Kind::ArrayBoxedI64 => "ArrayBoxedI64",
            Kind::ArrayU64 => "ArrayU64",
            Kind::ArrayF32 => "ArrayF32",
            Kind::ArrayBoxedF32 => "ArrayBoxedF32",
            Kind::ArrayF64 => "ArrayF64",
            Kind::ArrayBoxedF64 => "ArrayBoxedF64",
            Kind::ArrayBool => "ArrayBool",
            Kind::ArrayBoxedBool => "ArrayBoxedBool",
            Kind::ArrayString => "ArrayString",
        }
    }
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::I32(_) => Kind::I32,
            Value::I64(_) => Kind::I64,
            Value::U64(_) => Kind::U64,
            Value::F32(_) => Kind::F32,
            Value::F64(_) => Kind::F64,
            Value::Str(_) => Kind::Str,
            Value::Bytes(_) => Kind::Bytes,
            Value::List(_) => Kind::List,
            Value::Map(_) => Kind::Map,
            Value::OrderedMap(_) => Kind::OrderedMap,
            Value::BigInt(_) => Kind::BigInt,
            Value::BigDecimal(_) => Kind::BigDecimal,
            Value::ClassRef(_) => Kind::ClassRef,
            Value::Record(_) => Kind::Record,
            Value::ArrayI32(_) => Kind::ArrayI32,
            Value::ArrayBoxedI32(_) => Kind::ArrayBoxedI32,
            Value::ArrayI64(_) => Kind::ArrayI64,
            Value::ArrayBoxedI64(_) => Kind::ArrayBoxedI64,
            Value::ArrayU64(_) => Kind::ArrayU64,
            Value::ArrayF32(_) => Kind::ArrayF32,
            Value::ArrayBoxedF32(_) => Kind::ArrayBoxedF32,
            Value::ArrayF64(_) => Kind::ArrayF64,
            Value::ArrayBoxedF64(_) => Kind::ArrayBoxedF64,
            Value::ArrayBool(_) => Kind::ArrayBool,
            Value::ArrayBoxedBool(_) => Kind::ArrayBoxedBool,
            Value::ArrayString(_) => Kind::ArrayString,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

// Floats compare by bit pattern so that a decoded value always equals the
// value that was encoded, NaN included.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a.to_bits() == b.to_bits(),
            (Value::F64(a), Value::F64(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::OrderedMap(a), Value::OrderedMap(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::BigDecimal(a), Value::BigDecimal(b)) => a == b,
            (Value::ClassRef(a), Value::ClassRef(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            (Value::ArrayI32(a), Value::ArrayI32(b)) => a == b,
            (Value::ArrayBoxedI32(a), Value::ArrayBoxedI32(b)) => a == b,
            (Value::ArrayI64(a), Value::ArrayI64(b)) => a == b,
            (Value::ArrayBoxedI64(a), Value::ArrayBoxedI64(b)) => a == b,
            (Value::ArrayU64(a), Value::ArrayU64(b)) => a == b,
            (Value::ArrayF32(a), Value::ArrayF32(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (Value::ArrayBoxedF32(a), Value::ArrayBoxedF32(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|(x, y)| x.map(f32::to_bits) == y.map(f32::to_bits))
            }
            (Value::ArrayF64(a), Value::ArrayF64(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (Value::ArrayBoxedF64(a), Value::ArrayBoxedF64(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|(x, y)| x.map(f64::to_bits) == y.map(f64::to_bits))
            }
            (Value::ArrayBool(a), Value::ArrayBool(b)) => a == b,
            (Value::ArrayBoxedBool(a), Value::ArrayBoxedBool(b)) => a == b,
            (Value::ArrayString(a), Value::ArrayString(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

fn hash_of<T: Hash>(v: &T) -> u64 {
    let mut h = DefaultHasher::new();
    v.hash(&mut h);
    h.finish()
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(v) => v.hash(state),
            Value::I32(v) => v.hash(state),
            Value::I64(v) => v.hash(state),
            Value::U64(v) => v.hash(state),
            Value::F32(v) => v.to_bits().hash(state),
            Value::F64(v) => v.to_bits().hash(state),
            Value::Str(v) => v.hash(state),
            Value::Bytes(v) => v.hash(state),
            Value::List(v) => v.hash(state),
            // Unordered: combine per-entry hashes commutatively so iteration
            // order cannot leak into the hash.
            Value::Map(m) => {
                let mut acc = 0u64;
                for (k, v) in m {
                    acc = acc.wrapping_add(hash_of(&(k, v)));
                }
                m.len().hash(state);
                acc.hash(state);
            }
            Value::OrderedMap(m) => {
                m.len().hash(state);
                for (k, v) in m {
                    k.hash(state);
                    v.hash(state);
                }
            }
            Value::BigInt(v) => v.hash(state),
            Value::BigDecimal(v) => {
                let n = v.normalized();
                let (digits, scale) = n.into_bigint_and_exponent();
                digits.hash(state);
                scale.hash(state);
            }
            Value::ClassRef(v) => v.hash(state),
            Value::Record(v) => v.hash(state),
            Value::ArrayI32(v) => v.hash(state),
            Value::ArrayBoxedI32(v) => v.hash(state),
            Value::ArrayI64(v) => v.hash(state),
            Value::ArrayBoxedI64(v) => v.hash(state),
            Value::ArrayU64(v) => v.hash(state),
            Value::ArrayF32(v) => {
                for x in v {
                    x.to_bits().hash(state);
                }
            }
            Value::ArrayBoxedF32(v) => {
                for x in v {
                    x.map(f32::to_bits).hash(state);
                }
            }
            Value::ArrayF64(v) => {
                for x in v {
                    x.to_bits().hash(state);
                }
            }
            Value::ArrayBoxedF64(v) => {
                for x in v {
                    x.map(f64::to_bits).hash(state);
                }
            }
            Value::ArrayBool(v) => v.hash(state),
            Value::ArrayBoxedBool(v) => v.hash(state),
            Value::ArrayString(v) => v.hash(state),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::U64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}
