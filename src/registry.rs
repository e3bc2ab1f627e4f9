use std::collections::HashMap;
use std::sync::Arc;

use crate::codec::{self, AnyCodec, RecordCodec};
use crate::value::Kind;
use crate::{CodecError, Result};

/// Tag bytes of the default table.
///
/// These are stable and part of the wire format; renumbering any of them is
/// a wire-compatibility break. Counted ranges inline a count `c = tag - BASE`
/// for `c` below the window, with the `MAX` byte reserved as the sentinel
/// that escapes to an explicit varint.

/// i32 values 0..=14 inline in the tag.
pub const TAG_I32_BASE: u8 = 0;
pub const TAG_I32_MAX: u8 = 15;
/// String byte lengths 0..=30 inline in the tag.
pub const TAG_STR_BASE: u8 = 16;
pub const TAG_STR_MAX: u8 = 47;
/// Unordered map sizes 0..=14 inline in the tag.
pub const TAG_MAP_BASE: u8 = 48;
pub const TAG_MAP_MAX: u8 = 63;
/// List sizes 0..=15 inline in the tag.
pub const TAG_LIST_BASE: u8 = 64;
pub const TAG_LIST_MAX: u8 = 80;
pub const TAG_NULL: u8 = 81;
pub const TAG_BOOL_FALSE: u8 = 82;
pub const TAG_BOOL_TRUE: u8 = 83;
///< zigzag varint
pub const TAG_I64: u8 = 84;
///< plain varint
pub const TAG_U64: u8 = 85;
pub const TAG_F32: u8 = 86;
pub const TAG_F64: u8 = 87;
///< length-prefixed two's-complement big-endian bytes
pub const TAG_BIGINT: u8 = 88;
///< unscaled BigInt bytes + zigzag varint scale
pub const TAG_BIGDECIMAL: u8 = 89;
///< nullable type-name string
pub const TAG_CLASS_REF: u8 = 90;
///< type-name string + 4-byte LE framed body
pub const TAG_RECORD: u8 = 91;
///< insertion-ordered map, always an explicit count
pub const TAG_ORDERED_MAP: u8 = 92;
pub const TAG_BYTES: u8 = 93;
pub const TAG_ARRAY_I32: u8 = 94;
pub const TAG_ARRAY_BOXED_I32: u8 = 95;
pub const TAG_ARRAY_I64: u8 = 96;
pub const TAG_ARRAY_BOXED_I64: u8 = 97;
pub const TAG_ARRAY_U64: u8 = 98;
pub const TAG_ARRAY_F32: u8 = 99;
pub const TAG_ARRAY_BOXED_F32: u8 = 100;
pub const TAG_ARRAY_F64: u8 = 101;
pub const TAG_ARRAY_BOXED_F64: u8 = 102;
pub const TAG_ARRAY_BOOL: u8 = 103;
pub const TAG_ARRAY_BOXED_BOOL: u8 = 104;
pub const TAG_ARRAY_STRING: u8 = 105;

/// A reserved, non-overlapping interval of tag bytes bound to one codec.
///
/// Two flavors: a *singleton* (`start == end`, no payload beyond the tag)
/// and a *counted* range, where tags `start..end` inline-encode a small
/// count and the `end` byte is the explicit-length sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagRange {
    start: u8,
    end: u8,
}

impl TagRange {
    pub const fn singleton(tag: u8) -> Self {
        TagRange {
            start: tag,
            end: tag,
        }
    }

    /// A counted range with `window` inline slots; `start + window` is the
    /// sentinel byte.
    pub const fn counted(start: u8, window: u8) -> Self {
        TagRange {
            start,
            end: start + window,
        }
    }

    /// An arbitrary reserved interval, interpreted by its codec.
    pub const fn span(start: u8, end: u8) -> Self {
        TagRange { start, end }
    }

    pub const fn start(&self) -> u8 {
        self.start
    }

    /// The last reserved byte; for counted ranges, the sentinel.
    pub const fn end(&self) -> u8 {
        self.end
    }

    /// Number of inline slots in a counted range.
    pub const fn window(&self) -> u8 {
        self.end - self.start
    }

    pub const fn contains(&self, tag: u8) -> bool {
        self.start <= tag && tag <= self.end
    }

    pub const fn is_singleton(&self) -> bool {
        self.start == self.end
    }
}

/// The process-wide codec table.
///
/// Built once at startup and shared read-only (`&Registry`) by every
/// [`Writer`](crate::Writer) and [`Reader`](crate::Reader). Encode dispatch
/// is an array indexed by [`Kind`]; decode dispatch is a 256-slot array
/// indexed by the tag byte. Registration conflicts are rejected here, never
/// at first use.
pub struct Registry {
    by_kind: [Option<u16>; Kind::COUNT],
    by_tag: [Option<u16>; 256],
    ranges: Vec<TagRange>,
    codecs: Vec<Box<dyn AnyCodec>>,
    records: HashMap<String, Arc<dyn RecordCodec>>,
}

impl Registry {
    /// A registry with the full default tag table installed.
    pub fn new() -> Self {
        let mut reg = Self::empty();
        codec::install_defaults(&mut reg)
            .expect("default tag table is disjoint and covers each kind once");
        reg
    }

    /// A registry with no codecs; every range is free.
    pub fn empty() -> Self {
        Registry {
            by_kind: [None; Kind::COUNT],
            by_tag: [None; 256],
            ranges: Vec::new(),
            codecs: Vec::new(),
            records: HashMap::new(),
        }
    }

    /// Binds a codec to a tag range and to its [`Kind`].
    ///
    /// Fails if any byte of the range is already reserved or if the kind
    /// already has a codec. Exact-kind dispatch only: a value kind must be
    /// registered explicitly to be encodable.
    pub fn register(&mut self, range: TagRange, codec: Box<dyn AnyCodec>) -> Result<()> {
        let kind = codec.kind();
        if self.by_kind[kind as usize].is_some() {
            return Err(CodecError::DuplicateKind(kind.name()));
        }
        for tag in range.start()..=range.end() {
            if let Some(id) = self.by_tag[tag as usize] {
                let old = self.ranges[id as usize];
                return Err(CodecError::TagRangeOverlap {
                    new_start: range.start(),
                    new_end: range.end(),
                    old_start: old.start(),
                    old_end: old.end(),
                });
            }
        }
        let id = self.codecs.len() as u16;
        for tag in range.start()..=range.end() {
            self.by_tag[tag as usize] = Some(id);
        }
        self.by_kind[kind as usize] = Some(id);
        self.ranges.push(range);
        self.codecs.push(codec);
        tracing::debug!(
            kind = kind.name(),
            start = range.start(),
            end = range.end(),
            "registered codec"
        );
        Ok(())
    }

    /// Binds a per-type record codec to its type name.
    pub fn register_record(&mut self, name: &str, codec: Arc<dyn RecordCodec>) -> Result<()> {
        if self.records.contains_key(name) {
            return Err(CodecError::DuplicateRecord(name.to_owned()));
        }
        self.records.insert(name.to_owned(), codec);
        tracing::debug!(name, "registered record codec");
        Ok(())
    }

    pub fn codec_for_kind(&self, kind: Kind) -> Result<&dyn AnyCodec> {
        match self.by_kind[kind as usize] {
            Some(id) => Ok(self.codecs[id as usize].as_ref()),
            None => Err(CodecError::UnregisteredKind(kind.name())),
        }
    }

    pub fn codec_for_tag(&self, tag: u8) -> Result<&dyn AnyCodec> {
        match self.by_tag[tag as usize] {
            Some(id) => Ok(self.codecs[id as usize].as_ref()),
            None => Err(CodecError::UnknownTag(tag)),
        }
    }

    pub fn record_codec(&self, name: &str) -> Result<&dyn RecordCodec> {
        self.records
            .get(name)
            .map(Arc::as_ref)
            .ok_or_else(|| CodecError::UnknownRecord(name.to_owned()))
    }

    /// The range a kind's codec was registered under, if any.
    pub fn range_for_kind(&self, kind: Kind) -> Option<TagRange> {
        self.by_kind[kind as usize].map(|id| self.ranges[id as usize])
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
