use bytes::{Bytes, BytesMut};

use crate::{CodecError, Result};

/// Default cap on buffer growth. A corrupt or hostile length field must not
/// be able to balloon memory without bound.
pub const DEFAULT_MAX_CAPACITY: usize = 1 << 30;

const INITIAL_CAPACITY: usize = 4096;

/// Downstream consumer of finished byte ranges.
///
/// The sink's `write` call may take arbitrary time; the buffer is not reused
/// until it returns. Each byte range is delivered at most once.
pub trait Sink {
    fn write(&mut self, chunk: Bytes) -> Result<()>;
}

impl Sink for Vec<Bytes> {
    fn write(&mut self, chunk: Bytes) -> Result<()> {
        self.push(chunk);
        Ok(())
    }
}

/// Growable output buffer with a reserve-before-write contract.
///
/// Primitive writers call [`OutBuf::reserve`] with a conservative worst-case
/// byte count before a burst of unchecked writes, so no writer ever trims a
/// partially written multi-byte value on overflow. When a sink is configured,
/// `reserve` prefers draining the filled prefix over growing; without one it
/// reallocates at `max(capacity * 2, len + n)`, capped at the configured
/// maximum.
pub struct OutBuf {
    buf: BytesMut,
    sink: Option<Box<dyn Sink>>,
    max_capacity: usize,
    delivered: u64,
    // Open record frames hold a length placeholder that still needs patching,
    // so the prefix must stay in the buffer until they close.
    open_frames: usize,
}

impl OutBuf {
    pub fn new() -> Self {
        Self::with_max_capacity(DEFAULT_MAX_CAPACITY)
    }

    pub fn with_max_capacity(max_capacity: usize) -> Self {
        OutBuf {
            buf: BytesMut::with_capacity(INITIAL_CAPACITY.min(max_capacity)),
            sink: None,
            max_capacity,
            delivered: 0,
            open_frames: 0,
        }
    }

    /// Attaches a downstream sink. Once set, `reserve` drains filled bytes
    /// instead of growing whenever no record frame is open.
    pub fn with_sink(mut self, sink: Box<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Logical write cursor within the current buffer.
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    /// Total bytes written through this buffer, including bytes already
    /// delivered to the sink.
    pub fn total_written(&self) -> u64 {
        self.delivered + self.buf.len() as u64
    }

    /// Ensures at least `n` more bytes fit before an unchecked burst of
    /// writes. Preserves every byte written so far and the cursor position.
    pub fn reserve(&mut self, n: usize) -> Result<()> {
        if self.buf.capacity() - self.buf.len() >= n {
            return Ok(());
        }
        if self.sink.is_some() && self.open_frames == 0 && !self.buf.is_empty() {
            self.flush()?;
            if self.buf.capacity() - self.buf.len() >= n {
                return Ok(());
            }
        }
        let needed = self
            .buf
            .len()
            .checked_add(n)
            .ok_or(CodecError::CapacityExceeded {
                requested: usize::MAX,
                max: self.max_capacity,
            })?;
        if needed > self.max_capacity {
            return Err(CodecError::CapacityExceeded {
                requested: needed,
                max: self.max_capacity,
            });
        }
        let target = (self.buf.capacity() * 2).max(needed).min(self.max_capacity);
        self.buf.reserve(target - self.buf.len());
        Ok(())
    }

    /// Appends raw bytes, reserving as needed.
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.reserve(bytes.len())?;
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Appends one byte. Callers inside a burst must have reserved already.
    #[inline]
    pub fn put_u8(&mut self, b: u8) {
        debug_assert!(self.buf.capacity() > self.buf.len());
        self.buf.extend_from_slice(&[b]);
    }

    #[inline]
    pub fn put_slice(&mut self, bytes: &[u8]) {
        debug_assert!(self.buf.capacity() - self.buf.len() >= bytes.len());
        self.buf.extend_from_slice(bytes);
    }

    /// Delivers every filled byte to the sink. Bytes already delivered by a
    /// prior flush are not delivered again. Fails while a record frame is
    /// open: the prefix still holds an unpatched length placeholder.
    pub fn flush(&mut self) -> Result<()> {
        if self.open_frames > 0 {
            return Err(CodecError::Encode(
                "cannot flush while a record frame is open".to_owned(),
            ));
        }
        let sink = match self.sink.as_mut() {
            Some(s) => s,
            None => return Ok(()),
        };
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = self.buf.split().freeze();
        self.delivered += chunk.len() as u64;
        sink.write(chunk)
    }

    /// Final drain into an externally supplied sink, bypassing any configured
    /// one. Used to hand a completed encode to its consumer. Fails while a
    /// record frame is open.
    pub fn drain_to(&mut self, sink: &mut dyn Sink) -> Result<()> {
        if self.open_frames > 0 {
            return Err(CodecError::Encode(
                "cannot drain while a record frame is open".to_owned(),
            ));
        }
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = self.buf.split().freeze();
        self.delivered += chunk.len() as u64;
        sink.write(chunk)
    }

    /// Discards unflushed bytes and rewinds the cursor.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.delivered = 0;
        self.open_frames = 0;
    }

    /// Takes the filled bytes out of the buffer.
    pub fn take_bytes(&mut self) -> Bytes {
        let chunk = self.buf.split().freeze();
        self.delivered += chunk.len() as u64;
        chunk
    }

    /// Opens a record frame: writes a 4-byte placeholder and returns its
    /// offset for [`OutBuf::close_frame`].
    pub fn open_frame(&mut self) -> Result<usize> {
        self.reserve(4)?;
        let at = self.buf.len();
        self.put_slice(&[0, 0, 0, 0]);
        self.open_frames += 1;
        Ok(at)
    }

    /// Closes the most recently opened frame, patching the placeholder with
    /// the byte count written since.
    pub fn close_frame(&mut self, at: usize) -> Result<()> {
        if self.open_frames == 0 || at + 4 > self.buf.len() {
            return Err(CodecError::Encode(format!(
                "no open record frame at offset {}",
                at
            )));
        }
        let len = self.buf.len() - at - 4;
        let len = u32::try_from(len)
            .map_err(|_| CodecError::Encode(format!("record body of {} bytes exceeds u32", len)))?;
        self.buf[at..at + 4].copy_from_slice(&len.to_le_bytes());
        self.open_frames -= 1;
        Ok(())
    }

    /// Writes the 4-byte null-record sentinel in place of a frame.
    pub fn write_null_frame(&mut self) -> Result<()> {
        self.write(&u32::MAX.to_le_bytes())
    }
}

impl Default for OutBuf {
    fn default() -> Self {
        Self::new()
    }
}
