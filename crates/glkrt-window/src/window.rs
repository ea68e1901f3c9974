#![forbid(unsafe_code)]

//! One window record and its type-specific state.

use glkrt_backend::PeerHandle;
use glkrt_core::{StreamId, Style, WinMethod, WinType, WindowId};

use crate::input::{KeyboardRequest, LineRequest};
use crate::output::OutputBuffer;

/// Split description held by a pair window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairData {
    pub(crate) method: WinMethod,
    pub(crate) size: u32,
    /// Child whose size the constraint refers to. Cleared if that child closes.
    pub(crate) key: Option<WindowId>,
    /// The split target at creation time.
    pub(crate) first: WindowId,
    /// The window whose opening created this pair.
    pub(crate) second: WindowId,
}

impl PairData {
    #[must_use]
    pub const fn method(&self) -> WinMethod {
        self.method
    }

    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    #[must_use]
    pub const fn key(&self) -> Option<WindowId> {
        self.key
    }

    #[must_use]
    pub const fn children(&self) -> [WindowId; 2] {
        [self.first, self.second]
    }

    /// The child that is not `child`, if `child` belongs to this pair.
    #[must_use]
    pub fn other_child(&self, child: WindowId) -> Option<WindowId> {
        if self.first == child {
            Some(self.second)
        } else if self.second == child {
            Some(self.first)
        } else {
            None
        }
    }
}

/// Presentation and input state of a text window.
#[derive(Debug, Clone)]
pub struct TextState {
    pub(crate) style: Style,
    pub(crate) link: u32,
    pub(crate) keyboard: KeyboardRequest,
    pub(crate) line: Option<LineRequest>,
    pub(crate) link_request: bool,
    pub(crate) output: OutputBuffer,
}

impl TextState {
    #[must_use]
    pub fn new(buffer_units: usize) -> Self {
        Self {
            style: Style::Normal,
            link: 0,
            keyboard: KeyboardRequest::empty(),
            line: None,
            link_request: false,
            output: OutputBuffer::with_capacity(buffer_units),
        }
    }

    #[must_use]
    pub const fn style(&self) -> Style {
        self.style
    }

    #[must_use]
    pub const fn link(&self) -> u32 {
        self.link
    }

    #[must_use]
    pub const fn keyboard(&self) -> KeyboardRequest {
        self.keyboard
    }

    #[must_use]
    pub const fn line_request(&self) -> Option<&LineRequest> {
        self.line.as_ref()
    }

    #[must_use]
    pub const fn link_requested(&self) -> bool {
        self.link_request
    }

    #[must_use]
    pub const fn output(&self) -> &OutputBuffer {
        &self.output
    }
}

/// Type-specific window state.
#[derive(Debug, Clone)]
pub enum WindowKind {
    Pair(PairData),
    Text(TextState),
    /// Graphics and blank windows carry no state of their own.
    Plain,
}

/// A live window.
#[derive(Debug, Clone)]
pub struct Window {
    pub(crate) wintype: WinType,
    pub(crate) parent: Option<WindowId>,
    pub(crate) stream: StreamId,
    pub(crate) echo: Option<StreamId>,
    pub(crate) handle: PeerHandle,
    pub(crate) kind: WindowKind,
    pub(crate) mouse_request: bool,
}

impl Window {
    pub(crate) fn leaf(
        wintype: WinType,
        handle: PeerHandle,
        stream: StreamId,
        buffer_units: usize,
    ) -> Self {
        let kind = if wintype.is_text() {
            WindowKind::Text(TextState::new(buffer_units))
        } else {
            WindowKind::Plain
        };
        Self {
            wintype,
            parent: None,
            stream,
            echo: None,
            handle,
            kind,
            mouse_request: false,
        }
    }

    pub(crate) fn pair(
        data: PairData,
        handle: PeerHandle,
        stream: StreamId,
        parent: Option<WindowId>,
    ) -> Self {
        Self {
            wintype: WinType::Pair,
            parent,
            stream,
            echo: None,
            handle,
            kind: WindowKind::Pair(data),
            mouse_request: false,
        }
    }

    #[must_use]
    pub const fn wintype(&self) -> WinType {
        self.wintype
    }

    #[must_use]
    pub const fn parent(&self) -> Option<WindowId> {
        self.parent
    }

    #[must_use]
    pub const fn stream(&self) -> StreamId {
        self.stream
    }

    #[must_use]
    pub const fn echo_stream(&self) -> Option<StreamId> {
        self.echo
    }

    #[must_use]
    pub const fn handle(&self) -> PeerHandle {
        self.handle
    }

    #[must_use]
    pub const fn kind(&self) -> &WindowKind {
        &self.kind
    }

    #[must_use]
    pub const fn mouse_requested(&self) -> bool {
        self.mouse_request
    }

    #[must_use]
    pub const fn pair_data(&self) -> Option<&PairData> {
        match &self.kind {
            WindowKind::Pair(data) => Some(data),
            _ => None,
        }
    }

    #[must_use]
    pub const fn text(&self) -> Option<&TextState> {
        match &self.kind {
            WindowKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub(crate) fn text_mut(&mut self) -> Option<&mut TextState> {
        match &mut self.kind {
            WindowKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub(crate) fn pair_mut(&mut self) -> Option<&mut PairData> {
        match &mut self.kind {
            WindowKind::Pair(data) => Some(data),
            _ => None,
        }
    }

    /// Keyboard request state; always empty for non-text windows.
    #[must_use]
    pub fn keyboard_request(&self) -> KeyboardRequest {
        self.text().map_or(KeyboardRequest::empty(), TextState::keyboard)
    }
}
