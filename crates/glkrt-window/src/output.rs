#![forbid(unsafe_code)]

//! Per-window output buffer.
//!
//! Text written to a text window is held as UTF-16 units until the buffer is
//! nearly full, the window's presentation state changes, or the runtime
//! flushes every window before waiting for input.

use glkrt_core::charset::push_utf16;

/// Default capacity, in UTF-16 units.
pub const DEFAULT_BUFFER_UNITS: usize = 2048;

/// Smallest capacity that can always take one more code point.
const MIN_BUFFER_UNITS: usize = 2;

/// Bounded UTF-16 accumulation buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputBuffer {
    units: Vec<u16>,
    capacity: usize,
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_UNITS)
    }
}

impl OutputBuffer {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(MIN_BUFFER_UNITS);
        Self {
            units: Vec::with_capacity(capacity),
            capacity,
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Whether the next code point might not fit. A surrogate pair needs two
    /// free units.
    #[must_use]
    pub fn needs_flush(&self) -> bool {
        self.units.len() > self.capacity - MIN_BUFFER_UNITS
    }

    /// Append one code point. The caller flushes first when
    /// [`needs_flush`](Self::needs_flush) says so.
    pub fn push(&mut self, code: u32) {
        push_utf16(&mut self.units, code);
    }

    #[must_use]
    pub fn as_units(&self) -> &[u16] {
        &self.units
    }

    /// Hand out the buffered units and start over.
    pub fn take(&mut self) -> Vec<u16> {
        std::mem::replace(&mut self.units, Vec::with_capacity(self.capacity))
    }

    /// Drop buffered text without printing it.
    pub fn clear(&mut self) {
        self.units.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn astral_chars_become_surrogate_pairs() {
        let mut buf = OutputBuffer::default();
        buf.push(u32::from('a'));
        buf.push(0x1F600);
        assert_eq!(buf.as_units(), &[0x61, 0xD83D, 0xDE00]);
    }

    #[test]
    fn needs_flush_leaves_room_for_a_pair() {
        let mut buf = OutputBuffer::with_capacity(4);
        buf.push(0x41);
        buf.push(0x42);
        assert!(!buf.needs_flush());
        buf.push(0x43);
        assert!(buf.needs_flush());
        assert_eq!(buf.take(), vec![0x41, 0x42, 0x43]);
        assert!(buf.is_empty());
        assert!(!buf.needs_flush());
    }

    #[test]
    fn tiny_capacities_are_raised() {
        let buf = OutputBuffer::with_capacity(0);
        assert_eq!(buf.capacity(), 2);
        assert!(!buf.needs_flush());
    }

    #[test]
    fn clear_discards_text() {
        let mut buf = OutputBuffer::default();
        buf.push(0x7a);
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), DEFAULT_BUFFER_UNITS);
    }
}
