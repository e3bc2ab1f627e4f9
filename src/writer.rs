use bytes::Bytes;

use crate::buf::{OutBuf, Sink};
use crate::registry::Registry;
use crate::value::Value;
use crate::Result;

/// Worst-case encoded sizes, reserved before unchecked varint writes.
pub(crate) const MAX_VARINT32_SIZE: usize = 5;
pub(crate) const MAX_VARINT64_SIZE: usize = 10;

/// Zigzag transform for 32-bit signed values: small magnitudes of either
/// sign become small unsigned values.
#[inline]
pub fn zigzag32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

/// Zigzag transform for 64-bit signed values.
#[inline]
pub fn zigzag64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

/// Single-threaded encode cursor.
///
/// Owns its [`OutBuf`] for its lifetime and borrows the process-wide
/// [`Registry`] read-only. Not safe for concurrent use; recycle one instance
/// per unit of work with [`Writer::reset`].
pub struct Writer<'a> {
    registry: &'a Registry,
    buf: OutBuf,
}

impl<'a> Writer<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Writer {
            registry,
            buf: OutBuf::new(),
        }
    }

    /// Builds a writer over a preconfigured buffer (capacity cap, sink).
    pub fn with_buf(registry: &'a Registry, buf: OutBuf) -> Self {
        Writer { registry, buf }
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    pub fn position(&self) -> usize {
        self.buf.position()
    }

    /// Discards everything written since the last flush. Callers needing
    /// atomicity after an encode error reset and start over.
    pub fn reset(&mut self) {
        self.buf.reset();
    }

    pub fn flush(&mut self) -> Result<()> {
        self.buf.flush()
    }

    pub fn drain_to(&mut self, sink: &mut dyn Sink) -> Result<()> {
        self.buf.drain_to(sink)
    }

    pub fn take_bytes(&mut self) -> Bytes {
        self.buf.take_bytes()
    }

    // --- raw ---

    pub fn write_u8(&mut self, b: u8) -> Result<()> {
        self.buf.reserve(1)?;
        self.buf.put_u8(b);
        Ok(())
    }

    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.write(bytes)
    }

    // --- varint / zigzag ---

    /// Unsigned LEB128 varint, 7 bits per byte low-to-high, continuation bit
    /// on all but the final byte. Always the minimal-length form.
    pub fn write_varint64(&mut self, mut value: u64) -> Result<()> {
        self.buf.reserve(MAX_VARINT64_SIZE)?;
        while value >= 0x80 {
            self.buf.put_u8((value as u8 & 0x7F) | 0x80);
            value >>= 7;
        }
        self.buf.put_u8(value as u8);
        Ok(())
    }

    pub fn write_varint32(&mut self, mut value: u32) -> Result<()> {
        self.buf.reserve(MAX_VARINT32_SIZE)?;
        while value >= 0x80 {
            self.buf.put_u8((value as u8 & 0x7F) | 0x80);
            value >>= 7;
        }
        self.buf.put_u8(value as u8);
        Ok(())
    }

    pub fn write_sint32(&mut self, value: i32) -> Result<()> {
        self.write_varint32(zigzag32(value))
    }

    pub fn write_sint64(&mut self, value: i64) -> Result<()> {
        self.write_varint64(zigzag64(value))
    }

    // --- fixed width, little-endian ---

    pub fn write_fixed32(&mut self, value: u32) -> Result<()> {
        self.buf.write(&value.to_le_bytes())
    }

    pub fn write_fixed64(&mut self, value: u64) -> Result<()> {
        self.buf.write(&value.to_le_bytes())
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write_fixed32(value.to_bits())
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.write_fixed64(value.to_bits())
    }

    // --- string / bytes ---

    /// Nullable UTF-8 string: null is the zigzag length `-1`, empty the
    /// single byte 0, otherwise the byte length then the raw UTF-8 bytes.
    pub fn write_string(&mut self, value: Option<&str>) -> Result<()> {
        match value {
            None => self.write_sint64(-1),
            Some(s) if s.is_empty() => self.write_sint64(0),
            Some(s) => {
                self.write_sint64(s.len() as i64)?;
                self.write_raw(s.as_bytes())
            }
        }
    }

    /// Nullable byte string: a plain varint of `len + 1`, with 0 reserved
    /// for null, then the raw bytes.
    pub fn write_bytes(&mut self, value: Option<&[u8]>) -> Result<()> {
        match value {
            None => self.write_varint64(0),
            Some(b) => {
                self.write_varint64(b.len() as u64 + 1)?;
                self.write_raw(b)
            }
        }
    }

    // --- records ---

    /// Encodes one record frame: `[4-byte LE length][body]`, with the body
    /// produced by the codec registered under `name`. A `None` record writes
    /// the single `0xFFFF_FFFF` sentinel length instead.
    pub fn write_record(&mut self, name: &str, fields: Option<&[Value]>) -> Result<()> {
        match fields {
            None => self.buf.write_null_frame(),
            Some(fields) => {
                let codec = self.registry.record_codec(name)?;
                let at = self.buf.open_frame()?;
                codec.encode_body(self, fields)?;
                self.buf.close_frame(at)
            }
        }
    }

    // --- any ---

    /// Writes one self-describing value: the owning codec's tag byte, then
    /// its payload. Dispatch is by [`Kind`](crate::Kind), resolved through
    /// the registry's encode table.
    pub fn encode_any(&mut self, value: &Value) -> Result<()> {
        let codec = self.registry.codec_for_kind(value.kind())?;
        codec.encode(self, value)
    }
}
