#![forbid(unsafe_code)]

//! Character widths and conversions.
//!
//! Streams and input buffers exist in two flavours: 8-bit Latin-1 and 32-bit
//! Unicode code points. [`GlkChar`] lets the same algorithms run over both
//! element types.

/// Largest code point representable in an 8-bit buffer.
pub const MAX_LATIN1: u32 = 0xFF;

/// Largest Unicode scalar value accepted anywhere in the runtime.
pub const MAX_UNICHAR: u32 = 0x0010_FFFF;

/// Replacement written when a wide character is narrowed to Latin-1.
pub const UNKNOWN_CHAR: u8 = b'?';

/// Element type of a character buffer.
pub trait GlkChar: Copy + Default + Eq + std::fmt::Debug + Send + 'static {
    /// Whether this element holds full code points.
    const UNICODE: bool;

    /// Narrow or copy a code point into this element type.
    fn from_code(code: u32) -> Self;

    /// Widen this element to a code point.
    fn code(self) -> u32;
}

impl GlkChar for u8 {
    const UNICODE: bool = false;

    fn from_code(code: u32) -> Self {
        narrow_latin1(code)
    }

    fn code(self) -> u32 {
        u32::from(self)
    }
}

impl GlkChar for u32 {
    const UNICODE: bool = true;

    fn from_code(code: u32) -> Self {
        code
    }

    fn code(self) -> u32 {
        self
    }
}

/// Narrow a code point to Latin-1, replacing anything wider with `?`.
#[must_use]
pub fn narrow_latin1(code: u32) -> u8 {
    u8::try_from(code).unwrap_or(UNKNOWN_CHAR)
}

/// Whether `code` is a scalar value the runtime accepts.
#[must_use]
pub const fn is_valid_unichar(code: u32) -> bool {
    code <= MAX_UNICHAR
}

/// Lower-case a Latin-1 character.
#[must_use]
pub const fn latin1_to_lower(ch: u8) -> u8 {
    match ch {
        b'A'..=b'Z' | 0xC0..=0xDE if ch != 0xD7 => ch + 0x20,
        _ => ch,
    }
}

/// Upper-case a Latin-1 character.
#[must_use]
pub const fn latin1_to_upper(ch: u8) -> u8 {
    match ch {
        b'a'..=b'z' | 0xE0..=0xFE if ch != 0xF7 => ch - 0x20,
        _ => ch,
    }
}

/// Encode one code point as UTF-16, appending to `out`.
///
/// Values outside the scalar range are skipped.
pub fn push_utf16(out: &mut Vec<u16>, code: u32) {
    if let Some(ch) = char::from_u32(code) {
        let mut units = [0u16; 2];
        out.extend_from_slice(ch.encode_utf16(&mut units));
    } else if code <= 0xFFFF {
        // Lone surrogate halves still travel as a single unit.
        out.push(code as u16);
    }
}

/// Number of UTF-16 units `code` occupies.
#[must_use]
pub const fn utf16_len(code: u32) -> usize {
    if code > 0xFFFF { 2 } else { 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin1_case_mapping() {
        assert_eq!(latin1_to_lower(b'Q'), b'q');
        assert_eq!(latin1_to_lower(0xC9), 0xE9);
        assert_eq!(latin1_to_lower(0xD7), 0xD7);
        assert_eq!(latin1_to_lower(0xDF), 0xDF);
        assert_eq!(latin1_to_upper(0xE9), 0xC9);
        assert_eq!(latin1_to_upper(0xF7), 0xF7);
        assert_eq!(latin1_to_upper(0xFF), 0xFF);
        assert_eq!(latin1_to_upper(b'1'), b'1');
    }

    #[test]
    fn narrowing_replaces_wide_chars() {
        assert_eq!(narrow_latin1(0xE9), 0xE9);
        assert_eq!(narrow_latin1(0x100), b'?');
        assert_eq!(<u8 as GlkChar>::from_code(0x263A), b'?');
        assert_eq!(<u32 as GlkChar>::from_code(0x263A), 0x263A);
    }

    #[test]
    fn utf16_encoding_splits_astral_code_points() {
        let mut out = Vec::new();
        push_utf16(&mut out, u32::from('a'));
        push_utf16(&mut out, 0x1F600);
        assert_eq!(out, vec![0x61, 0xD83D, 0xDE00]);
        assert_eq!(utf16_len(0x1F600), 2);
        assert_eq!(utf16_len(0x61), 1);
    }

    #[test]
    fn utf16_skips_out_of_range() {
        let mut out = Vec::new();
        push_utf16(&mut out, 0x0011_0000);
        assert!(out.is_empty());
    }
}
