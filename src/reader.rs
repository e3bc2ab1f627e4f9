use bytes::{Buf, Bytes};

use crate::registry::Registry;
use crate::value::Value;
use crate::writer::{MAX_VARINT32_SIZE, MAX_VARINT64_SIZE};
use crate::{CodecError, Result};

/// Inverse of [`zigzag32`](crate::zigzag32).
#[inline]
pub fn unzigzag32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

/// Inverse of [`zigzag64`](crate::zigzag64).
#[inline]
pub fn unzigzag64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// Single-threaded decode cursor over an input buffer.
///
/// Every read validates the remaining length first; a promised length that
/// exceeds the input is a format error, never an out-of-bounds read.
pub struct Reader<'a> {
    registry: &'a Registry,
    buf: Bytes,
}

impl<'a> Reader<'a> {
    pub fn new(registry: &'a Registry, buf: Bytes) -> Self {
        Reader { registry, buf }
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Returns the unconsumed tail of the input.
    pub fn into_inner(self) -> Bytes {
        self.buf
    }

    // --- raw ---

    pub fn read_u8(&mut self) -> Result<u8> {
        if self.buf.remaining() == 0 {
            return Err(CodecError::InsufficientData);
        }
        Ok(self.buf.get_u8())
    }

    pub fn read_raw(&mut self, len: usize) -> Result<Bytes> {
        if self.buf.remaining() < len {
            return Err(CodecError::InsufficientData);
        }
        Ok(self.buf.split_to(len))
    }

    pub fn advance(&mut self, len: usize) -> Result<()> {
        if self.buf.remaining() < len {
            return Err(CodecError::InsufficientData);
        }
        self.buf.advance(len);
        Ok(())
    }

    // --- varint / zigzag ---

    pub fn read_varint64(&mut self) -> Result<u64> {
        Ok(self.read_varint64_raw(false)?.0)
    }

    pub fn read_varint32(&mut self) -> Result<u32> {
        Ok(self.read_varint32_raw(false)?.0)
    }

    pub fn read_sint32(&mut self) -> Result<i32> {
        Ok(unzigzag32(self.read_varint32()?))
    }

    pub fn read_sint64(&mut self) -> Result<i64> {
        Ok(unzigzag64(self.read_varint64()?))
    }

    /// Reads a varint used as a length/count and bounds it by the remaining
    /// input. Every counted element occupies at least one byte, so a count
    /// larger than the remaining byte count can only come from corruption.
    pub fn read_len(&mut self) -> Result<usize> {
        let v = self.read_varint64()?;
        if v > self.buf.remaining() as u64 {
            return Err(CodecError::InsufficientData);
        }
        Ok(v as usize)
    }

    /// Boxed-array element: a zigzag varint32, or the out-of-domain null
    /// marker `FF FF FF FF 1F` (one bit past the 32-bit domain).
    pub(crate) fn read_boxed_sint32(&mut self) -> Result<Option<i32>> {
        let (raw, last) = self.read_varint32_raw(true)?;
        if raw == u32::MAX && last == 0x1F {
            Ok(None)
        } else {
            Ok(Some(unzigzag32(raw)))
        }
    }

    /// Boxed-array element: a zigzag varint64, or the out-of-domain null
    /// marker `FF ×9 03` (one bit past the 64-bit domain).
    pub(crate) fn read_boxed_sint64(&mut self) -> Result<Option<i64>> {
        let (raw, last) = self.read_varint64_raw(true)?;
        if raw == u64::MAX && last == 0x03 {
            Ok(None)
        } else {
            Ok(Some(unzigzag64(raw)))
        }
    }

    fn read_varint64_raw(&mut self, boxed_null: bool) -> Result<(u64, u8)> {
        let mut result: u64 = 0;
        for i in 0..MAX_VARINT64_SIZE {
            let b = self.read_u8()?;
            if i == MAX_VARINT64_SIZE - 1 {
                // Final byte carries bit 63 only. The lone exception is the
                // exact boxed-null marker: an all-ones run ending in 0x03.
                let marker = boxed_null && b == 0x03 && result == u64::MAX >> 1;
                if b > 0x01 && !marker {
                    return Err(CodecError::MalformedVarint {
                        max_bytes: MAX_VARINT64_SIZE,
                    });
                }
                result |= ((b & 0x01) as u64) << 63;
                return Ok((result, b));
            }
            result |= ((b & 0x7F) as u64) << (7 * i);
            if b & 0x80 == 0 {
                return Ok((result, b));
            }
        }
        unreachable!("varint loop bounded by MAX_VARINT64_SIZE")
    }

    fn read_varint32_raw(&mut self, boxed_null: bool) -> Result<(u32, u8)> {
        let mut result: u32 = 0;
        for i in 0..MAX_VARINT32_SIZE {
            let b = self.read_u8()?;
            if i == MAX_VARINT32_SIZE - 1 {
                let marker = boxed_null && b == 0x1F && result == u32::MAX >> 4;
                if b > 0x0F && !marker {
                    return Err(CodecError::MalformedVarint {
                        max_bytes: MAX_VARINT32_SIZE,
                    });
                }
                result |= ((b & 0x0F) as u32) << 28;
                return Ok((result, b));
            }
            result |= ((b & 0x7F) as u32) << (7 * i);
            if b & 0x80 == 0 {
                return Ok((result, b));
            }
        }
        unreachable!("varint loop bounded by MAX_VARINT32_SIZE")
    }

    // --- fixed width, little-endian ---

    pub fn read_fixed32(&mut self) -> Result<u32> {
        if self.buf.remaining() < 4 {
            return Err(CodecError::InsufficientData);
        }
        Ok(self.buf.get_u32_le())
    }

    pub fn read_fixed64(&mut self) -> Result<u64> {
        if self.buf.remaining() < 8 {
            return Err(CodecError::InsufficientData);
        }
        Ok(self.buf.get_u64_le())
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_fixed32()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_fixed64()?))
    }

    // --- string / bytes ---

    /// Mirrors [`Writer::write_string`](crate::Writer::write_string):
    /// zigzag length `-1` is null, 0 is the empty string.
    pub fn read_string(&mut self) -> Result<Option<String>> {
        let len = self.read_sint64()?;
        match len {
            -1 => Ok(None),
            0 => Ok(Some(String::new())),
            n if n > 0 => {
                let len = usize::try_from(n).map_err(|_| CodecError::InsufficientData)?;
                let bytes = self.read_raw(len)?;
                String::from_utf8(bytes.to_vec())
                    .map(Some)
                    .map_err(|e| CodecError::Decode(e.to_string()))
            }
            n => Err(CodecError::Decode(format!("invalid string length {}", n))),
        }
    }

    /// Mirrors [`Writer::write_bytes`](crate::Writer::write_bytes): a plain
    /// varint of `len + 1`, 0 meaning null.
    pub fn read_bytes(&mut self) -> Result<Option<Bytes>> {
        let v = self.read_varint64()?;
        if v == 0 {
            return Ok(None);
        }
        let len = usize::try_from(v - 1).map_err(|_| CodecError::InsufficientData)?;
        Ok(Some(self.read_raw(len)?))
    }

    // --- records ---

    /// Decodes one record frame through the codec registered under `name`.
    /// The sentinel length `0xFFFF_FFFF` decodes to `None` (null record).
    /// The codec must consume exactly as many bytes as the frame promised.
    pub fn read_record(&mut self, name: &str) -> Result<Option<Vec<Value>>> {
        let len = self.read_fixed32()?;
        if len == u32::MAX {
            return Ok(None);
        }
        let len = len as usize;
        if self.buf.remaining() < len {
            return Err(CodecError::InsufficientData);
        }
        let codec = self.registry.record_codec(name)?;
        let before = self.buf.remaining();
        let fields = codec.decode_body(self)?;
        let consumed = before - self.buf.remaining();
        if consumed != len {
            return Err(CodecError::Decode(format!(
                "record '{}' body consumed {} bytes but the frame promised {}",
                name, consumed, len
            )));
        }
        Ok(Some(fields))
    }

    /// Skips one record frame without decoding it, the way a relay that does
    /// not understand the schema would.
    pub fn skip_record(&mut self) -> Result<()> {
        let len = self.read_fixed32()?;
        if len == u32::MAX {
            return Ok(());
        }
        self.advance(len as usize)
    }

    // --- any ---

    /// Reads one self-describing value: the leading tag byte selects the
    /// owning codec by interval containment; the codec decodes the payload.
    pub fn decode_any(&mut self) -> Result<Value> {
        let tag = self.read_u8()?;
        let codec = self.registry.codec_for_tag(tag)?;
        codec.decode(self, tag)
    }
}
