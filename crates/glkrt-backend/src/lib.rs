#![forbid(unsafe_code)]
#![doc = "Presentation-peer boundary for glkrt."]
#![doc = ""]
#![doc = "The runtime never draws anything or reads a keyboard itself. Every visible"]
#![doc = "effect and every raw input signal crosses the [`PresentationPeer`] trait."]
#![doc = "Concrete peers (a GUI toolkit, a terminal, a test double) implement it;"]
#![doc = "[`HeadlessPeer`] is the in-process implementation used by tests and batch runs."]

use std::fmt;
use std::path::PathBuf;

use glkrt_core::{
    FileMode, FileUsage, GlkError, RawSignal, Style, StyleHint, WinMethod, WinType, WindowId,
};

mod headless;
mod timer;

pub use headless::{HeadlessMonitor, HeadlessPeer, PeerCall, SignalSender};
pub use timer::TimerThread;

/// Peer-side handle of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerHandle(pub u64);

/// Handles returned when the peer opens a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenedWindow {
    pub window: PeerHandle,
    /// The synthesized pair, present whenever a split target was given.
    pub pair: Option<PeerHandle>,
}

/// Severity of a peer failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerErrorKind {
    /// The call failed but the session can continue with a fallback value.
    Failed,
    /// The peer is unusable; the session must end.
    Fatal,
    /// The peer asked the session to stop.
    Interrupted,
}

/// Failure reported by a peer call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerError {
    pub kind: PeerErrorKind,
    pub message: String,
}

impl PeerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            kind: PeerErrorKind::Failed,
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            kind: PeerErrorKind::Fatal,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn interrupted() -> Self {
        Self {
            kind: PeerErrorKind::Interrupted,
            message: "interrupted".to_owned(),
        }
    }

    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self.kind, PeerErrorKind::Failed)
    }

    /// Lift into the runtime error type, tagging the failing operation.
    #[must_use]
    pub fn into_glk(self, op: &'static str) -> GlkError {
        match self.kind {
            PeerErrorKind::Failed => GlkError::Peer {
                op,
                message: self.message,
            },
            PeerErrorKind::Fatal => GlkError::Fatal(format!("{op}: {}", self.message)),
            PeerErrorKind::Interrupted => GlkError::Interrupted,
        }
    }
}

impl fmt::Display for PeerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PeerErrorKind::Failed => write!(f, "peer call failed: {}", self.message),
            PeerErrorKind::Fatal => write!(f, "peer fatal error: {}", self.message),
            PeerErrorKind::Interrupted => write!(f, "peer interrupted"),
        }
    }
}

impl std::error::Error for PeerError {}

/// Result of a peer call.
pub type PeerResult<T> = Result<T, PeerError>;

/// Sort a peer result into the two error tiers.
///
/// A recoverable failure is logged and becomes `Ok(None)` so the caller can
/// carry on with its fallback value. Fatal failures and interrupts become
/// `Err` and must be propagated.
pub fn recover<T>(op: &'static str, result: PeerResult<T>) -> Result<Option<T>, GlkError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_recoverable() => {
            tracing::warn!(target: "glkrt.peer", op, message = %err.message, "peer call failed");
            Ok(None)
        }
        Err(err) => Err(err.into_glk(op).report()),
    }
}

/// Everything the runtime asks of the presentation layer.
///
/// All calls come from the single interpreter thread. A peer that collects
/// input on another thread must hand signals over through its own queue and
/// surface them from [`select`](PresentationPeer::select) and
/// [`poll`](PresentationPeer::poll).
///
/// Methods with default bodies cover optional capabilities; a peer without
/// them behaves as if the capability is absent.
pub trait PresentationPeer: Send {
    /// Create a window. `split` is the peer handle of the split target, absent
    /// for the root window.
    fn open_window(
        &mut self,
        split: Option<PeerHandle>,
        method: WinMethod,
        size: u32,
        wintype: WinType,
        id: WindowId,
    ) -> PeerResult<OpenedWindow>;

    fn close_window(&mut self, window: PeerHandle) -> PeerResult<()>;

    /// Print UTF-16 text in the window's current style.
    fn print(&mut self, window: PeerHandle, text: &[u16]) -> PeerResult<()>;

    fn set_style(&mut self, window: PeerHandle, style: Style) -> PeerResult<()>;

    fn set_link(&mut self, window: PeerHandle, link: u32) -> PeerResult<()>;

    fn clear(&mut self, window: PeerHandle) -> PeerResult<()>;

    fn move_cursor(&mut self, window: PeerHandle, x: u32, y: u32) -> PeerResult<()>;

    /// Size in the window's natural units.
    fn get_size(&mut self, window: PeerHandle) -> PeerResult<(u32, u32)>;

    fn set_arrangement(
        &mut self,
        pair: PeerHandle,
        method: WinMethod,
        size: u32,
        key: Option<PeerHandle>,
    ) -> PeerResult<()>;

    fn flow_break(&mut self, _window: PeerHandle) -> PeerResult<()> {
        Ok(())
    }

    fn erase_rect(
        &mut self,
        _window: PeerHandle,
        _x: i32,
        _y: i32,
        _width: u32,
        _height: u32,
    ) -> PeerResult<()> {
        Ok(())
    }

    fn fill_rect(
        &mut self,
        _window: PeerHandle,
        _color: u32,
        _x: i32,
        _y: i32,
        _width: u32,
        _height: u32,
    ) -> PeerResult<()> {
        Ok(())
    }

    fn set_background_color(&mut self, _window: PeerHandle, _color: u32) -> PeerResult<()> {
        Ok(())
    }

    fn request_char(&mut self, window: PeerHandle, unicode: bool) -> PeerResult<()>;

    fn cancel_char(&mut self, window: PeerHandle) -> PeerResult<()>;

    /// Start line input with `initial` already entered.
    fn request_line(
        &mut self,
        window: PeerHandle,
        initial: &[u32],
        maxlen: usize,
        unicode: bool,
    ) -> PeerResult<()>;

    /// Abandon line input, returning what had been entered so far.
    fn cancel_line(&mut self, window: PeerHandle) -> PeerResult<Vec<u32>>;

    fn request_mouse(&mut self, window: PeerHandle) -> PeerResult<()>;

    fn cancel_mouse(&mut self, window: PeerHandle) -> PeerResult<()>;

    fn request_link(&mut self, window: PeerHandle) -> PeerResult<()>;

    fn cancel_link(&mut self, window: PeerHandle) -> PeerResult<()>;

    /// Block until the next raw signal.
    fn select(&mut self) -> PeerResult<RawSignal>;

    /// Next raw signal, if one is already queued.
    fn poll(&mut self) -> PeerResult<Option<RawSignal>>;

    fn request_timer(&mut self, millis: u32) -> PeerResult<()>;

    fn cancel_timer(&mut self) -> PeerResult<()>;

    /// Answer a capability query the runtime cannot decide locally.
    fn gestalt(&mut self, _selector: u32, _value: u32) -> PeerResult<u32> {
        Ok(0)
    }

    /// `wintype` is a raw window type; 0 addresses every type.
    fn stylehint_set(
        &mut self,
        _wintype: u32,
        _style: Style,
        _hint: StyleHint,
        _value: i32,
    ) -> PeerResult<()> {
        Ok(())
    }

    fn stylehint_clear(&mut self, _wintype: u32, _style: Style, _hint: StyleHint) -> PeerResult<()> {
        Ok(())
    }

    fn style_distinguish(&mut self, _window: PeerHandle, _a: Style, _b: Style) -> PeerResult<bool> {
        Ok(false)
    }

    fn style_measure(
        &mut self,
        _window: PeerHandle,
        _style: Style,
        _hint: StyleHint,
    ) -> PeerResult<Option<u32>> {
        Ok(None)
    }

    /// Resolve a file name chosen by the program.
    fn named_file(&mut self, name: &str, usage: FileUsage) -> PeerResult<Option<PathBuf>>;

    /// Ask the user for a file; `None` means the prompt was cancelled.
    fn prompt_file(&mut self, usage: FileUsage, mode: FileMode) -> PeerResult<Option<PathBuf>>;

    /// The session is ending.
    fn exit(&mut self) -> PeerResult<()> {
        Ok(())
    }
}
