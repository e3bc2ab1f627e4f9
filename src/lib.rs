//! # tagwire
//!
//! A compact, self-describing binary value codec with ranged type tags.
//!
//! Every polymorphic value begins with a single tag byte that selects its
//! decoder. Small cardinalities (short strings, small integers, small
//! collections) are folded directly into the tag byte; larger ones escape
//! through a sentinel byte followed by an explicit varint. Signed integers
//! are zigzag-transformed so small negative magnitudes stay short, floats
//! use their raw little-endian IEEE bits, and every collection-typed slot
//! preserves the null / empty / populated distinction on the wire.
//!
//! The building blocks:
//!
//! - [`OutBuf`] — growable output buffer with a reserve-before-write
//!   contract and an optional downstream [`Sink`].
//! - [`Writer`] / [`Reader`] — single-threaded encode/decode cursors over
//!   the primitive codecs (varint, zigzag, fixed-width, string, bytes).
//! - [`Registry`] — the process-wide tag table, built once at startup and
//!   shared read-only by every writer and reader.
//! - [`Value`] — the tagged union an "any" slot can carry.
//!
//! ## Example
//!
//! ```rust
//! use tagwire::{Registry, Value, encode_any, decode_any};
//!
//! let registry = Registry::new();
//! let value = Value::List(vec![Value::I32(-1), Value::Str("hi".into())]);
//! let mut buf = encode_any(&registry, &value).unwrap();
//! let decoded = decode_any(&registry, &mut buf).unwrap();
//! assert_eq!(value, decoded);
//! ```

mod buf;
mod codec;
mod reader;
pub mod registry;
mod value;
mod writer;

pub use buf::{OutBuf, Sink};
pub use codec::{AnyCodec, AnyFieldsRecordCodec, RecordCodec};
pub use reader::{unzigzag32, unzigzag64, Reader};
pub use registry::{Registry, TagRange};
pub use value::{Kind, Record, Value};
pub use writer::{zigzag32, zigzag64, Writer};

use bytes::Bytes;

/// Errors that can occur while encoding or decoding.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The value could not be encoded (e.g., a record codec rejected its fields).
    #[error("encode error: {0}")]
    Encode(String),
    /// The input is structurally invalid for the expected encoding.
    #[error("decode error: {0}")]
    Decode(String),
    /// The input ended before a promised length was satisfied.
    #[error("insufficient data in buffer")]
    InsufficientData,
    /// A varint ran past the byte limit for its target width.
    #[error("malformed varint: continuation past {max_bytes} bytes")]
    MalformedVarint { max_bytes: usize },
    /// A tag byte with no owning range was read.
    #[error("unknown tag byte {0}")]
    UnknownTag(u8),
    /// An "any" slot held a value whose kind has no registered codec.
    #[error("no codec registered for kind {0}")]
    UnregisteredKind(&'static str),
    /// Two codecs claimed overlapping tag ranges at registration time.
    #[error("tag range {new_start}..={new_end} overlaps existing range {old_start}..={old_end}")]
    TagRangeOverlap {
        new_start: u8,
        new_end: u8,
        old_start: u8,
        old_end: u8,
    },
    /// A kind was registered twice.
    #[error("kind {0} already has a registered codec")]
    DuplicateKind(&'static str),
    /// A record codec name was registered twice.
    #[error("record codec '{0}' already registered")]
    DuplicateRecord(String),
    /// A record frame named a type with no registered codec.
    #[error("record codec '{0}' not found")]
    UnknownRecord(String),
    /// Buffer growth was rejected by the configured capacity cap.
    #[error("buffer capacity exceeded: need {requested} bytes, cap is {max}")]
    CapacityExceeded { requested: usize, max: usize },
    /// The downstream sink failed while draining.
    #[error("sink write failed: {0}")]
    SinkFailed(String),
}

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Encodes one value through the "any" path and returns the produced bytes.
///
/// A fresh [`Writer`] is created per call; reuse a `Writer` directly when
/// encoding many values in a row.
pub fn encode_any(registry: &Registry, value: &Value) -> Result<Bytes> {
    let mut writer = Writer::new(registry);
    writer.encode_any(value)?;
    Ok(writer.take_bytes())
}

/// Decodes one value through the "any" path, consuming bytes from `input`.
pub fn decode_any(registry: &Registry, input: &mut Bytes) -> Result<Value> {
    let mut reader = Reader::new(registry, input.clone());
    let value = reader.decode_any()?;
    *input = reader.into_inner();
    Ok(value)
}
