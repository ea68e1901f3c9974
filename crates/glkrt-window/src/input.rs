#![forbid(unsafe_code)]

//! Input request state of a text window.
//!
//! A text window has at most one keyboard request (character or line) plus
//! an independent hyperlink request. Mouse requests live on the window itself
//! because graphics windows take them too.

use bitflags::bitflags;
use glkrt_core::{ArrayOwner, ArrayRef, CharBuffer, DispatchRock, WindowId, keycode};

bitflags! {
    /// Outstanding keyboard request of a text window.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct KeyboardRequest: u8 {
        const CHAR    = 0b001;
        const LINE    = 0b010;
        /// Deliver full code points rather than Latin-1.
        const UNICODE = 0b100;
    }
}

impl KeyboardRequest {
    /// Whether a character or line request is outstanding.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        self.intersects(Self::CHAR.union(Self::LINE))
    }
}

/// Buffer bound to an outstanding line request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRequest {
    buffer: CharBuffer,
    /// Rock returned when the buffer was registered as an array.
    array_rock: Option<DispatchRock>,
}

impl LineRequest {
    #[must_use]
    pub const fn new(buffer: CharBuffer) -> Self {
        Self {
            buffer,
            array_rock: None,
        }
    }

    #[must_use]
    pub const fn buffer(&self) -> &CharBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut CharBuffer {
        &mut self.buffer
    }

    #[must_use]
    pub const fn array_rock(&self) -> Option<DispatchRock> {
        self.array_rock
    }

    pub fn set_array_rock(&mut self, rock: Option<DispatchRock>) {
        self.array_rock = rock;
    }

    /// Dispatch description of the bound buffer.
    #[must_use]
    pub fn array(&self, window: WindowId) -> ArrayRef {
        ArrayRef {
            owner: ArrayOwner::LineInput(window),
            len: self.buffer.len(),
            unicode: self.buffer.is_unicode(),
        }
    }

    #[must_use]
    pub fn into_buffer(self) -> CharBuffer {
        self.buffer
    }
}

/// Key value delivered for a character request.
///
/// Latin-1 requests only see keys up to 0xFF and the special keycodes;
/// anything else arrives as [`keycode::UNKNOWN`].
#[must_use]
pub const fn deliverable_key(key: u32, unicode: bool) -> u32 {
    if unicode || key <= 0xFF || keycode::is_special(key) {
        key
    } else {
        keycode::UNKNOWN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_ignores_the_unicode_bit() {
        assert!(!KeyboardRequest::empty().is_pending());
        assert!(!KeyboardRequest::UNICODE.is_pending());
        assert!(KeyboardRequest::CHAR.is_pending());
        assert!((KeyboardRequest::LINE | KeyboardRequest::UNICODE).is_pending());
    }

    #[test]
    fn latin1_requests_narrow_wide_keys() {
        assert_eq!(deliverable_key(0x41, false), 0x41);
        assert_eq!(deliverable_key(0x263A, false), keycode::UNKNOWN);
        assert_eq!(deliverable_key(keycode::RETURN, false), keycode::RETURN);
        assert_eq!(deliverable_key(0x263A, true), 0x263A);
    }

    #[test]
    fn line_request_describes_its_array() {
        let win = WindowId::new(2).expect("id");
        let request = LineRequest::new(CharBuffer::Unicode(vec![0; 16]));
        let array = request.array(win);
        assert_eq!(array.len, 16);
        assert!(array.unicode);
        assert_eq!(array.owner, ArrayOwner::LineInput(win));
    }
}
