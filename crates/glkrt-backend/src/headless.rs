#![forbid(unsafe_code)]

//! In-process presentation peer with no display.
//!
//! [`HeadlessPeer`] records every call it receives, hands out sequential
//! handles, and reads raw signals from a channel. Signals can be posted from
//! any thread through a [`SignalSender`], which is how tests stand in for a
//! UI thread. A [`HeadlessMonitor`] shares the peer's state so the call log and
//! scripted answers stay reachable after the peer is boxed into a runtime.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use glkrt_core::{
    FileMode, FileUsage, RawSignal, Style, StyleHint, WinMethod, WinType, WindowId, gestalt,
};

use crate::timer::TimerThread;
use crate::{OpenedWindow, PeerError, PeerHandle, PeerResult, PresentationPeer};

/// One recorded peer call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerCall {
    OpenWindow {
        id: WindowId,
        split: Option<PeerHandle>,
        method: WinMethod,
        size: u32,
        wintype: WinType,
        handle: PeerHandle,
    },
    CloseWindow(PeerHandle),
    Print(PeerHandle, String),
    SetStyle(PeerHandle, Style),
    SetLink(PeerHandle, u32),
    Clear(PeerHandle),
    MoveCursor(PeerHandle, u32, u32),
    SetArrangement {
        pair: PeerHandle,
        method: WinMethod,
        size: u32,
        key: Option<PeerHandle>,
    },
    FlowBreak(PeerHandle),
    EraseRect(PeerHandle, i32, i32, u32, u32),
    FillRect(PeerHandle, u32, i32, i32, u32, u32),
    SetBackgroundColor(PeerHandle, u32),
    RequestChar(PeerHandle, bool),
    CancelChar(PeerHandle),
    RequestLine {
        window: PeerHandle,
        initial: String,
        maxlen: usize,
        unicode: bool,
    },
    CancelLine(PeerHandle),
    RequestMouse(PeerHandle),
    CancelMouse(PeerHandle),
    RequestLink(PeerHandle),
    CancelLink(PeerHandle),
    RequestTimer(u32),
    CancelTimer,
    StyleHintSet(u32, Style, StyleHint, i32),
    StyleHintClear(u32, Style, StyleHint),
    Exit,
}

#[derive(Debug)]
struct HeadlessState {
    calls: Vec<PeerCall>,
    next_handle: u64,
    size: (u32, u32),
    pending_line: Vec<u32>,
    file_root: Option<PathBuf>,
    prompt_answers: VecDeque<Option<PathBuf>>,
    failures: VecDeque<PeerError>,
}

impl Default for HeadlessState {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            next_handle: 1,
            size: (80, 24),
            pending_line: Vec::new(),
            file_root: None,
            prompt_answers: VecDeque::new(),
            failures: VecDeque::new(),
        }
    }
}

type SharedState = Arc<Mutex<HeadlessState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, HeadlessState> {
    // A panicking test thread must not hide the log from the others.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Cloneable, thread-safe handle for posting raw signals.
#[derive(Debug, Clone)]
pub struct SignalSender(mpsc::Sender<RawSignal>);

impl SignalSender {
    /// Queue a signal. Returns `false` once the peer is gone.
    pub fn send(&self, signal: RawSignal) -> bool {
        self.0.send(signal).is_ok()
    }
}

/// Shared view into a [`HeadlessPeer`]'s state.
#[derive(Debug, Clone)]
pub struct HeadlessMonitor {
    state: SharedState,
    sender: mpsc::Sender<RawSignal>,
}

impl HeadlessMonitor {
    /// Snapshot of the call log.
    #[must_use]
    pub fn calls(&self) -> Vec<PeerCall> {
        lock(&self.state).calls.clone()
    }

    /// Drain the call log.
    pub fn take_calls(&self) -> Vec<PeerCall> {
        std::mem::take(&mut lock(&self.state).calls)
    }

    /// Concatenated text printed to `window`.
    #[must_use]
    pub fn printed(&self, window: PeerHandle) -> String {
        lock(&self.state)
            .calls
            .iter()
            .filter_map(|call| match call {
                PeerCall::Print(handle, text) if *handle == window => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Handle assigned to window `id`, if the peer opened it.
    #[must_use]
    pub fn handle_of(&self, id: WindowId) -> Option<PeerHandle> {
        lock(&self.state).calls.iter().find_map(|call| match call {
            PeerCall::OpenWindow {
                id: opened, handle, ..
            } if *opened == id => Some(*handle),
            _ => None,
        })
    }

    #[must_use]
    pub fn sender(&self) -> SignalSender {
        SignalSender(self.sender.clone())
    }

    /// Size reported by `get_size` for every window.
    pub fn set_size(&self, width: u32, height: u32) {
        lock(&self.state).size = (width, height);
    }

    /// Text reported by the next `cancel_line`.
    pub fn set_pending_line(&self, text: &str) {
        lock(&self.state).pending_line = text.chars().map(u32::from).collect();
    }

    /// Directory that named files resolve into.
    pub fn set_file_root(&self, root: impl Into<PathBuf>) {
        lock(&self.state).file_root = Some(root.into());
    }

    /// Queue the answer of the next `prompt_file`; `None` is a cancelled prompt.
    pub fn push_prompt_answer(&self, answer: Option<PathBuf>) {
        lock(&self.state).prompt_answers.push_back(answer);
    }

    /// Make the next fallible peer call fail with `error`.
    pub fn fail_next(&self, error: PeerError) {
        lock(&self.state).failures.push_back(error);
    }
}

/// Presentation peer that renders nothing.
pub struct HeadlessPeer {
    state: SharedState,
    sender: mpsc::Sender<RawSignal>,
    receiver: mpsc::Receiver<RawSignal>,
    timer: Option<TimerThread>,
}

impl Default for HeadlessPeer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HeadlessPeer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessPeer")
            .field("timer", &self.timer.as_ref().map(TimerThread::interval))
            .finish_non_exhaustive()
    }
}

impl HeadlessPeer {
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            state: SharedState::default(),
            sender,
            receiver,
            timer: None,
        }
    }

    #[must_use]
    pub fn monitor(&self) -> HeadlessMonitor {
        HeadlessMonitor {
            state: Arc::clone(&self.state),
            sender: self.sender.clone(),
        }
    }

    fn record(&self, call: PeerCall) -> PeerResult<()> {
        let mut state = lock(&self.state);
        if let Some(error) = state.failures.pop_front() {
            return Err(error);
        }
        state.calls.push(call);
        Ok(())
    }

    fn next_handle(&self) -> PeerHandle {
        let mut state = lock(&self.state);
        let handle = PeerHandle(state.next_handle);
        state.next_handle += 1;
        handle
    }

    fn stop_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop();
        }
    }
}

impl Drop for HeadlessPeer {
    fn drop(&mut self) {
        self.stop_timer();
    }
}

impl PresentationPeer for HeadlessPeer {
    fn open_window(
        &mut self,
        split: Option<PeerHandle>,
        method: WinMethod,
        size: u32,
        wintype: WinType,
        id: WindowId,
    ) -> PeerResult<OpenedWindow> {
        let handle = self.next_handle();
        self.record(PeerCall::OpenWindow {
            id,
            split,
            method,
            size,
            wintype,
            handle,
        })?;
        let pair = split.map(|_| self.next_handle());
        Ok(OpenedWindow {
            window: handle,
            pair,
        })
    }

    fn close_window(&mut self, window: PeerHandle) -> PeerResult<()> {
        self.record(PeerCall::CloseWindow(window))
    }

    fn print(&mut self, window: PeerHandle, text: &[u16]) -> PeerResult<()> {
        self.record(PeerCall::Print(window, String::from_utf16_lossy(text)))
    }

    fn set_style(&mut self, window: PeerHandle, style: Style) -> PeerResult<()> {
        self.record(PeerCall::SetStyle(window, style))
    }

    fn set_link(&mut self, window: PeerHandle, link: u32) -> PeerResult<()> {
        self.record(PeerCall::SetLink(window, link))
    }

    fn clear(&mut self, window: PeerHandle) -> PeerResult<()> {
        self.record(PeerCall::Clear(window))
    }

    fn move_cursor(&mut self, window: PeerHandle, x: u32, y: u32) -> PeerResult<()> {
        self.record(PeerCall::MoveCursor(window, x, y))
    }

    fn get_size(&mut self, _window: PeerHandle) -> PeerResult<(u32, u32)> {
        let mut state = lock(&self.state);
        if let Some(error) = state.failures.pop_front() {
            return Err(error);
        }
        Ok(state.size)
    }

    fn set_arrangement(
        &mut self,
        pair: PeerHandle,
        method: WinMethod,
        size: u32,
        key: Option<PeerHandle>,
    ) -> PeerResult<()> {
        self.record(PeerCall::SetArrangement {
            pair,
            method,
            size,
            key,
        })
    }

    fn flow_break(&mut self, window: PeerHandle) -> PeerResult<()> {
        self.record(PeerCall::FlowBreak(window))
    }

    fn erase_rect(
        &mut self,
        window: PeerHandle,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    ) -> PeerResult<()> {
        self.record(PeerCall::EraseRect(window, x, y, width, height))
    }

    fn fill_rect(
        &mut self,
        window: PeerHandle,
        color: u32,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    ) -> PeerResult<()> {
        self.record(PeerCall::FillRect(window, color, x, y, width, height))
    }

    fn set_background_color(&mut self, window: PeerHandle, color: u32) -> PeerResult<()> {
        self.record(PeerCall::SetBackgroundColor(window, color))
    }

    fn request_char(&mut self, window: PeerHandle, unicode: bool) -> PeerResult<()> {
        self.record(PeerCall::RequestChar(window, unicode))
    }

    fn cancel_char(&mut self, window: PeerHandle) -> PeerResult<()> {
        self.record(PeerCall::CancelChar(window))
    }

    fn request_line(
        &mut self,
        window: PeerHandle,
        initial: &[u32],
        maxlen: usize,
        unicode: bool,
    ) -> PeerResult<()> {
        let initial = initial
            .iter()
            .map(|code| char::from_u32(*code).unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
        self.record(PeerCall::RequestLine {
            window,
            initial,
            maxlen,
            unicode,
        })
    }

    fn cancel_line(&mut self, window: PeerHandle) -> PeerResult<Vec<u32>> {
        self.record(PeerCall::CancelLine(window))?;
        Ok(std::mem::take(&mut lock(&self.state).pending_line))
    }

    fn request_mouse(&mut self, window: PeerHandle) -> PeerResult<()> {
        self.record(PeerCall::RequestMouse(window))
    }

    fn cancel_mouse(&mut self, window: PeerHandle) -> PeerResult<()> {
        self.record(PeerCall::CancelMouse(window))
    }

    fn request_link(&mut self, window: PeerHandle) -> PeerResult<()> {
        self.record(PeerCall::RequestLink(window))
    }

    fn cancel_link(&mut self, window: PeerHandle) -> PeerResult<()> {
        self.record(PeerCall::CancelLink(window))
    }

    fn select(&mut self) -> PeerResult<RawSignal> {
        if let Some(error) = lock(&self.state).failures.pop_front() {
            return Err(error);
        }
        // The peer keeps its own sender alive, so this only fails if the
        // channel is torn down underneath us.
        self.receiver
            .recv()
            .map_err(|_| PeerError::fatal("signal queue disconnected"))
    }

    fn poll(&mut self) -> PeerResult<Option<RawSignal>> {
        if let Some(error) = lock(&self.state).failures.pop_front() {
            return Err(error);
        }
        match self.receiver.try_recv() {
            Ok(signal) => Ok(Some(signal)),
            Err(mpsc::TryRecvError::Empty) => Ok(None),
            Err(mpsc::TryRecvError::Disconnected) => {
                Err(PeerError::fatal("signal queue disconnected"))
            }
        }
    }

    fn request_timer(&mut self, millis: u32) -> PeerResult<()> {
        self.record(PeerCall::RequestTimer(millis))?;
        self.stop_timer();
        self.timer = Some(TimerThread::spawn(
            Duration::from_millis(u64::from(millis)),
            self.sender.clone(),
        ));
        Ok(())
    }

    fn cancel_timer(&mut self) -> PeerResult<()> {
        self.record(PeerCall::CancelTimer)?;
        self.stop_timer();
        Ok(())
    }

    fn gestalt(&mut self, selector: u32, _value: u32) -> PeerResult<u32> {
        Ok(match selector {
            gestalt::CHAR_INPUT
            | gestalt::TIMER
            | gestalt::GRAPHICS
            | gestalt::HYPERLINKS
            | gestalt::HYPERLINK_INPUT
            | gestalt::UNICODE => 1,
            _ => 0,
        })
    }

    fn stylehint_set(
        &mut self,
        wintype: u32,
        style: Style,
        hint: StyleHint,
        value: i32,
    ) -> PeerResult<()> {
        self.record(PeerCall::StyleHintSet(wintype, style, hint, value))
    }

    fn stylehint_clear(&mut self, wintype: u32, style: Style, hint: StyleHint) -> PeerResult<()> {
        self.record(PeerCall::StyleHintClear(wintype, style, hint))
    }

    fn named_file(&mut self, name: &str, _usage: FileUsage) -> PeerResult<Option<PathBuf>> {
        Ok(lock(&self.state)
            .file_root
            .as_ref()
            .map(|root| root.join(name)))
    }

    fn prompt_file(&mut self, _usage: FileUsage, _mode: FileMode) -> PeerResult<Option<PathBuf>> {
        Ok(lock(&self.state).prompt_answers.pop_front().flatten())
    }

    fn exit(&mut self) -> PeerResult<()> {
        self.stop_timer();
        self.record(PeerCall::Exit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glkrt_core::{Direction, Division, EventType};

    fn wid(raw: u32) -> WindowId {
        WindowId::new(raw).expect("non-zero")
    }

    #[test]
    fn handles_are_sequential_and_pairs_follow_splits() {
        let mut peer = HeadlessPeer::new();
        let method = WinMethod::new(Direction::Above, Division::Fixed);
        let root = peer
            .open_window(None, method, 0, WinType::TextBuffer, wid(1))
            .expect("open root");
        assert_eq!(root.window, PeerHandle(1));
        assert!(root.pair.is_none());

        let split = peer
            .open_window(Some(root.window), method, 3, WinType::TextGrid, wid(2))
            .expect("open split");
        assert_eq!(split.window, PeerHandle(2));
        assert_eq!(split.pair, Some(PeerHandle(3)));
        assert_eq!(peer.monitor().handle_of(wid(2)), Some(PeerHandle(2)));
    }

    #[test]
    fn print_decodes_surrogate_pairs() {
        let mut peer = HeadlessPeer::new();
        let monitor = peer.monitor();
        peer.print(PeerHandle(1), &[0x68, 0x69, 0xD83D, 0xDE00])
            .expect("print");
        assert_eq!(monitor.printed(PeerHandle(1)), "hi\u{1F600}");
    }

    #[test]
    fn signals_posted_from_other_threads_are_polled() {
        let mut peer = HeadlessPeer::new();
        let sender = peer.monitor().sender();
        assert_eq!(peer.poll().expect("poll"), None);
        std::thread::spawn(move || {
            sender.send(RawSignal::char_input(wid(4), u32::from('x')));
        })
        .join()
        .expect("join");
        let signal = peer.select().expect("select");
        assert_eq!(signal.kind, EventType::CharInput);
        assert_eq!(signal.window, Some(wid(4)));
    }

    #[test]
    fn scripted_failure_applies_once() {
        let mut peer = HeadlessPeer::new();
        let monitor = peer.monitor();
        monitor.fail_next(PeerError::failed("boom"));
        assert!(peer.clear(PeerHandle(1)).is_err());
        assert!(peer.clear(PeerHandle(1)).is_ok());
        assert_eq!(monitor.calls(), vec![PeerCall::Clear(PeerHandle(1))]);
    }

    #[test]
    fn cancel_line_reports_pending_text_once() {
        let mut peer = HeadlessPeer::new();
        let monitor = peer.monitor();
        monitor.set_pending_line("ex");
        assert_eq!(
            peer.cancel_line(PeerHandle(1)).expect("cancel"),
            vec![0x65, 0x78]
        );
        assert!(peer.cancel_line(PeerHandle(1)).expect("cancel").is_empty());
    }

    #[test]
    fn timer_signals_arrive_through_select() {
        let mut peer = HeadlessPeer::new();
        peer.request_timer(5).expect("timer");
        let signal = peer.select().expect("select");
        assert_eq!(signal.kind, EventType::Timer);
        peer.cancel_timer().expect("cancel");
    }

    #[test]
    fn named_files_resolve_under_root() {
        let mut peer = HeadlessPeer::new();
        let usage = FileUsage::default();
        assert_eq!(peer.named_file("save", usage).expect("named"), None);
        peer.monitor().set_file_root("/tmp/glk");
        assert_eq!(
            peer.named_file("save", usage).expect("named"),
            Some(PathBuf::from("/tmp/glk/save"))
        );
    }
}
