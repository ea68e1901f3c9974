#![forbid(unsafe_code)]

//! In-memory stream backend.
//!
//! Pure cursor arithmetic over an owned buffer. Three positions matter:
//! the cursor, the high-water mark (end of valid data) and the physical end.
//! `0 <= cursor <= high_water <= physical end` holds after every operation.

use glkrt_core::charset::{GlkChar, MAX_UNICHAR, UNKNOWN_CHAR};
use glkrt_core::{CharBuffer, FileMode, SeekMode};

/// Cursor state over a buffer of `C` elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryStream<C: GlkChar> {
    buf: Vec<C>,
    pos: usize,
    eof: usize,
}

fn clean(code: u32) -> u32 {
    if code > MAX_UNICHAR {
        u32::from(UNKNOWN_CHAR)
    } else {
        code
    }
}

impl<C: GlkChar> MemoryStream<C> {
    /// Write mode starts with no valid data; every other mode exposes the
    /// whole buffer.
    #[must_use]
    pub fn new(buf: Vec<C>, mode: FileMode) -> Self {
        let eof = if mode == FileMode::Write { 0 } else { buf.len() };
        Self { buf, pos: 0, eof }
    }

    /// Physical length of the buffer.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub fn high_water(&self) -> usize {
        self.eof
    }

    #[must_use]
    pub fn contents(&self) -> &[C] {
        &self.buf
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<C> {
        self.buf
    }

    /// Move the cursor, clamping into `[0, high_water]`.
    pub fn seek(&mut self, offset: i32, mode: SeekMode) {
        let base = match mode {
            SeekMode::Start => 0,
            SeekMode::Current => self.pos as i64,
            SeekMode::End => self.eof as i64,
        };
        let target = (base + i64::from(offset)).clamp(0, self.eof as i64);
        self.pos = usize::try_from(target).unwrap_or(0);
    }

    fn advance(&mut self, count: usize) {
        self.pos += count;
        if self.pos > self.eof {
            self.eof = self.pos;
        }
    }

    /// Store one code point. Returns the number of elements written (0 at the
    /// physical end).
    pub fn put_char(&mut self, code: u32) -> usize {
        self.put_codes(&[code])
    }

    /// Store code points, stopping at the physical end.
    pub fn put_codes(&mut self, codes: &[u32]) -> usize {
        let room = self.buf.len() - self.pos;
        let count = codes.len().min(room);
        for (slot, code) in self.buf[self.pos..self.pos + count].iter_mut().zip(codes) {
            *slot = C::from_code(clean(*code));
        }
        self.advance(count);
        count
    }

    fn readable_len(&self, wanted: usize) -> usize {
        wanted.min(self.eof - self.pos)
    }

    /// Next code point, or `None` at the end of valid data.
    pub fn get_char(&mut self) -> Option<u32> {
        if self.pos >= self.eof {
            return None;
        }
        let code = clean(self.buf[self.pos].code());
        self.advance(1);
        Some(code)
    }

    /// Fill `out` from the cursor. Returns the number of elements read.
    pub fn get_buffer<D: GlkChar>(&mut self, out: &mut [D]) -> usize {
        let count = self.readable_len(out.len());
        for (slot, src) in out.iter_mut().zip(&self.buf[self.pos..self.pos + count]) {
            *slot = D::from_code(clean(src.code()));
        }
        self.advance(count);
        count
    }

    /// Read up to `out.len() - 1` elements, stopping after a newline, and
    /// terminate with a zero element. Returns the count without terminator.
    pub fn get_line<D: GlkChar>(&mut self, out: &mut [D]) -> usize {
        let Some(limit) = out.len().checked_sub(1) else {
            return 0;
        };
        let available = self.readable_len(limit);
        let mut count = 0;
        while count < available {
            let code = clean(self.buf[self.pos + count].code());
            out[count] = D::from_code(code);
            count += 1;
            if code == u32::from(b'\n') {
                break;
            }
        }
        out[count] = D::default();
        self.advance(count);
        count
    }
}

/// Memory backend in either element width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryBackend {
    Latin1(MemoryStream<u8>),
    Unicode(MemoryStream<u32>),
}

macro_rules! each {
    ($self:expr, $inner:ident => $body:expr) => {
        match $self {
            MemoryBackend::Latin1($inner) => $body,
            MemoryBackend::Unicode($inner) => $body,
        }
    };
}

impl MemoryBackend {
    /// Wrap a caller buffer; its variant decides the element width.
    #[must_use]
    pub fn new(buffer: CharBuffer, mode: FileMode) -> Self {
        match buffer {
            CharBuffer::Latin1(buf) => Self::Latin1(MemoryStream::new(buf, mode)),
            CharBuffer::Unicode(buf) => Self::Unicode(MemoryStream::new(buf, mode)),
        }
    }

    #[must_use]
    pub const fn is_unicode(&self) -> bool {
        matches!(self, Self::Unicode(_))
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        each!(self, s => s.capacity())
    }

    #[must_use]
    pub fn position(&self) -> usize {
        each!(self, s => s.position())
    }

    pub fn seek(&mut self, offset: i32, mode: SeekMode) {
        each!(self, s => s.seek(offset, mode));
    }

    pub fn put_codes(&mut self, codes: &[u32]) -> usize {
        each!(self, s => s.put_codes(codes))
    }

    pub fn get_char(&mut self) -> Option<u32> {
        each!(self, s => s.get_char())
    }

    pub fn get_buffer<D: GlkChar>(&mut self, out: &mut [D]) -> usize {
        each!(self, s => s.get_buffer(out))
    }

    pub fn get_line<D: GlkChar>(&mut self, out: &mut [D]) -> usize {
        each!(self, s => s.get_line(out))
    }

    /// Copy of the buffer as it stands.
    #[must_use]
    pub fn snapshot(&self) -> CharBuffer {
        match self {
            Self::Latin1(s) => CharBuffer::Latin1(s.contents().to_vec()),
            Self::Unicode(s) => CharBuffer::Unicode(s.contents().to_vec()),
        }
    }

    #[must_use]
    pub fn into_buffer(self) -> CharBuffer {
        match self {
            Self::Latin1(s) => CharBuffer::Latin1(s.into_inner()),
            Self::Unicode(s) => CharBuffer::Unicode(s.into_inner()),
        }
    }
}
