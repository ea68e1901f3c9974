#![forbid(unsafe_code)]

//! File stream backend.
//!
//! A unicode file stream stores every code point as four big-endian bytes,
//! whether or not the file was opened in text mode; positions are reported
//! and accepted in elements, so the byte offset is divided or multiplied by
//! four. A Latin-1 file stream stores raw bytes.

use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use glkrt_core::charset::{GlkChar, MAX_UNICHAR, UNKNOWN_CHAR, narrow_latin1};
use glkrt_core::{FileMode, SeekMode};

/// An open file plus its element encoding.
#[derive(Debug)]
pub struct FileStream {
    file: File,
    path: PathBuf,
    unicode: bool,
    text: bool,
}

/// Open options for each file mode.
#[must_use]
pub fn open_options(mode: FileMode) -> OpenOptions {
    let mut options = OpenOptions::new();
    match mode {
        FileMode::Write => options.write(true).create(true).truncate(true),
        FileMode::Read => options.read(true),
        FileMode::ReadWrite => options.read(true).write(true).create(true).truncate(true),
        FileMode::WriteAppend => options.append(true).create(true),
    };
    options
}

/// Decode one stored element. Unicode words beyond the code point range
/// read as `?`.
fn decode_unit(raw: &[u8]) -> u32 {
    match *raw {
        [a, b, c, d] => {
            let code = u32::from_be_bytes([a, b, c, d]);
            if code > MAX_UNICHAR {
                u32::from(UNKNOWN_CHAR)
            } else {
                code
            }
        }
        [byte] => u32::from(byte),
        _ => u32::from(UNKNOWN_CHAR),
    }
}

impl FileStream {
    pub fn open(path: &Path, mode: FileMode, text: bool, unicode: bool) -> io::Result<Self> {
        let file = open_options(mode).open(path)?;
        tracing::debug!(
            target: "glkrt.stream",
            path = %path.display(),
            ?mode,
            unicode,
            text,
            "file stream opened"
        );
        Ok(Self {
            file,
            path: path.to_path_buf(),
            unicode,
            text,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn is_unicode(&self) -> bool {
        self.unicode
    }

    #[must_use]
    pub const fn is_text(&self) -> bool {
        self.text
    }

    fn width(&self) -> u64 {
        if self.unicode { 4 } else { 1 }
    }

    fn encode(&self, code: u32, out: &mut Vec<u8>) {
        if self.unicode {
            let code = if code > MAX_UNICHAR {
                u32::from(UNKNOWN_CHAR)
            } else {
                code
            };
            out.extend_from_slice(&code.to_be_bytes());
        } else {
            out.push(narrow_latin1(code));
        }
    }

    /// Write code points. Returns the number of elements written.
    pub fn put_codes(&mut self, codes: &[u32]) -> io::Result<usize> {
        let mut bytes = Vec::with_capacity(codes.len() * self.width() as usize);
        for code in codes {
            self.encode(*code, &mut bytes);
        }
        self.file.write_all(&bytes)?;
        Ok(codes.len())
    }

    /// Next element, or `None` at end of file. A truncated trailing unicode
    /// element reads as end of file.
    pub fn get_char(&mut self) -> io::Result<Option<u32>> {
        let raw = self.read_span(1)?;
        Ok(raw.chunks_exact(self.width() as usize).next().map(decode_unit))
    }

    /// Fill `out` from the file. Returns the number of elements read.
    pub fn get_buffer<D: GlkChar>(&mut self, out: &mut [D]) -> io::Result<usize> {
        let raw = self.read_span(out.len())?;
        let mut count = 0;
        for (slot, unit) in out.iter_mut().zip(raw.chunks_exact(self.width() as usize)) {
            *slot = D::from_code(decode_unit(unit));
            count += 1;
        }
        Ok(count)
    }

    /// Read up to `out.len() - 1` elements, stopping after a newline, and
    /// terminate with a zero element. Returns the count without terminator.
    ///
    /// The span is read in one go; whatever follows the newline is given
    /// back by seeking.
    pub fn get_line<D: GlkChar>(&mut self, out: &mut [D]) -> io::Result<usize> {
        let Some(limit) = out.len().checked_sub(1) else {
            return Ok(0);
        };
        let width = self.width() as usize;
        let raw = self.read_span(limit)?;
        let mut count = 0;
        for unit in raw.chunks_exact(width) {
            let code = decode_unit(unit);
            out[count] = D::from_code(code);
            count += 1;
            if code == u32::from(b'\n') {
                break;
            }
        }
        out[count] = D::default();
        let unread = raw.len() - count * width;
        if unread > 0 {
            self.file.seek(SeekFrom::Current(-(unread as i64)))?;
        }
        Ok(count)
    }

    /// Up to `elements` elements' worth of raw bytes; shorter only at end of
    /// file.
    fn read_span(&mut self, elements: usize) -> io::Result<Vec<u8>> {
        let len = elements * self.width() as usize;
        let mut raw = Vec::with_capacity(len);
        Read::by_ref(&mut self.file)
            .take(len as u64)
            .read_to_end(&mut raw)?;
        Ok(raw)
    }

    /// Cursor position in elements.
    pub fn position(&mut self) -> io::Result<u32> {
        let bytes = self.file.stream_position()?;
        Ok(u32::try_from(bytes / self.width()).unwrap_or(u32::MAX))
    }

    /// Move the cursor by `offset` elements relative to `mode`.
    pub fn seek(&mut self, offset: i32, mode: SeekMode) -> io::Result<()> {
        let width = self.width() as i64;
        let bytes = i64::from(offset) * width;
        let target = match mode {
            SeekMode::Start => SeekFrom::Start(u64::try_from(bytes).map_err(|_| {
                io::Error::new(ErrorKind::InvalidInput, "negative seek from start")
            })?),
            SeekMode::Current => SeekFrom::Current(bytes),
            SeekMode::End => SeekFrom::End(bytes),
        };
        self.file.seek(target)?;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}
