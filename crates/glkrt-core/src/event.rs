#![forbid(unsafe_code)]

//! Raw peer signals and the events handed to callers.
//!
//! A [`RawSignal`] is what the presentation peer reports: a type, a window id
//! (or none), two values, and for line input the entered text. The runtime
//! validates it against outstanding requests and turns it into an [`Event`].

use crate::charset::GlkChar;
use crate::id::WindowId;
use crate::types::EventType;

/// Unvalidated signal fetched from the presentation peer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawSignal {
    pub kind: EventType,
    /// `None` stands for the raw window id 0.
    pub window: Option<WindowId>,
    pub val1: u32,
    pub val2: u32,
    /// Entered text for line input, as code points.
    pub line: Option<Vec<u32>>,
}

impl RawSignal {
    #[must_use]
    pub fn new(kind: EventType, window: Option<WindowId>, val1: u32, val2: u32) -> Self {
        Self {
            kind,
            window,
            val1,
            val2,
            line: None,
        }
    }

    #[must_use]
    pub fn timer() -> Self {
        Self::new(EventType::Timer, None, 0, 0)
    }

    #[must_use]
    pub fn char_input(window: WindowId, key: u32) -> Self {
        Self::new(EventType::CharInput, Some(window), key, 0)
    }

    /// Line input carrying `text`; `val1` is its length in code points.
    #[must_use]
    pub fn line_input(window: WindowId, text: &str) -> Self {
        let codes: Vec<u32> = text.chars().map(u32::from).collect();
        Self {
            val1: u32::try_from(codes.len()).unwrap_or(u32::MAX),
            line: Some(codes),
            ..Self::new(EventType::LineInput, Some(window), 0, 0)
        }
    }

    #[must_use]
    pub fn mouse_input(window: WindowId, x: u32, y: u32) -> Self {
        Self::new(EventType::MouseInput, Some(window), x, y)
    }

    #[must_use]
    pub fn hyperlink(window: WindowId, link: u32) -> Self {
        Self::new(EventType::Hyperlink, Some(window), link, 0)
    }

    #[must_use]
    pub fn arrange(window: WindowId) -> Self {
        Self::new(EventType::Arrange, Some(window), 0, 0)
    }

    #[must_use]
    pub fn redraw(window: WindowId) -> Self {
        Self::new(EventType::Redraw, Some(window), 0, 0)
    }
}

/// Caller-supplied character array: a line-input buffer or the backing
/// store of a memory stream.
///
/// For line input the buffer's length is the maximum line length. While a
/// request or stream is outstanding the runtime owns the buffer; the
/// completing [`Event`] or the stream's close hands it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharBuffer {
    Latin1(Vec<u8>),
    Unicode(Vec<u32>),
}

impl CharBuffer {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Latin1(buf) => buf.len(),
            Self::Unicode(buf) => buf.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn is_unicode(&self) -> bool {
        matches!(self, Self::Unicode(_))
    }

    /// Copy `text` into the start of the buffer, truncating to its length
    /// and narrowing for Latin-1 buffers. Returns the number of elements
    /// copied.
    pub fn fill(&mut self, text: &[u32]) -> usize {
        match self {
            Self::Latin1(buf) => fill_slice(buf, text),
            Self::Unicode(buf) => fill_slice(buf, text),
        }
    }

    /// First `len` elements as code points.
    #[must_use]
    pub fn codes(&self, len: usize) -> Vec<u32> {
        match self {
            Self::Latin1(buf) => buf.iter().take(len).map(|b| u32::from(*b)).collect(),
            Self::Unicode(buf) => buf.iter().take(len).copied().collect(),
        }
    }

    /// First `len` elements as a string; invalid code points become U+FFFD.
    #[must_use]
    pub fn to_string_lossy(&self, len: usize) -> String {
        self.codes(len)
            .into_iter()
            .map(|code| char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    }
}

fn fill_slice<C: GlkChar>(buf: &mut [C], text: &[u32]) -> usize {
    let count = text.len().min(buf.len());
    for (slot, code) in buf.iter_mut().zip(text) {
        *slot = C::from_code(*code);
    }
    count
}

/// Validated event returned by `select`/`poll`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Event {
    pub kind: EventType,
    pub window: Option<WindowId>,
    pub val1: u32,
    pub val2: u32,
    /// Buffer released by a completed or cancelled line request.
    pub line: Option<CharBuffer>,
}

impl Event {
    /// The "no event" value.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn new(kind: EventType, window: Option<WindowId>, val1: u32, val2: u32) -> Self {
        Self {
            kind,
            window,
            val1,
            val2,
            line: None,
        }
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        self.kind == EventType::None
    }

    /// Entered text of a line event, if it carries a buffer.
    #[must_use]
    pub fn line_text(&self) -> Option<String> {
        let len = usize::try_from(self.val1).ok()?;
        self.line.as_ref().map(|buf| buf.to_string_lossy(len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn win(raw: u32) -> WindowId {
        WindowId::new(raw).expect("non-zero")
    }

    #[test]
    fn line_signal_carries_length_and_text() {
        let signal = RawSignal::line_input(win(3), "look");
        assert_eq!(signal.kind, EventType::LineInput);
        assert_eq!(signal.val1, 4);
        assert_eq!(signal.line.as_deref(), Some(&[108, 111, 111, 107][..]));
    }

    #[test]
    fn fill_truncates_to_capacity() {
        let mut buf = CharBuffer::Unicode(vec![0; 3]);
        let copied = buf.fill(&[0x61, 0x62, 0x63, 0x64]);
        assert_eq!(copied, 3);
        assert_eq!(buf.to_string_lossy(copied), "abc");
    }

    #[test]
    fn latin1_fill_narrows_wide_chars() {
        let mut buf = CharBuffer::Latin1(vec![0; 8]);
        let copied = buf.fill(&[0x68, 0x263A, 0xE9]);
        assert_eq!(copied, 3);
        assert_eq!(buf, CharBuffer::Latin1(vec![0x68, b'?', 0xE9, 0, 0, 0, 0, 0]));
    }

    #[test]
    fn event_line_text_uses_val1() {
        let mut buf = CharBuffer::Latin1(vec![0; 8]);
        let n = buf.fill(&[0x6e, 0x6f, 0x72, 0x74, 0x68]);
        let event = Event {
            line: Some(buf),
            ..Event::new(EventType::LineInput, Some(win(1)), n as u32, 0)
        };
        assert_eq!(event.line_text().as_deref(), Some("north"));
        assert!(Event::none().is_none());
        assert!(Event::none().line_text().is_none());
    }
}
