#![forbid(unsafe_code)]

//! Event state machine.
//!
//! # Role in glkrt
//! The peer queues raw signals from its own thread; this module pulls them
//! on the interpreter thread and keeps only the ones something is still
//! waiting for. A signal can be queued after the request it answers was
//! cancelled here, so discarding is routine rather than an error.
//!
//! `select` blocks until a signal survives validation. It has no timeout:
//! a program that requests nothing and calls `select` waits forever.
//! `select_poll` drains what is already queued and reports `None` once the
//! queue is empty.

use glkrt_backend::recover;
use glkrt_core::{CharBuffer, Event, EventType, GlkError, GlkResult, RawSignal, WindowId};

use crate::glk::Glk;

impl Glk {
    /// Wait for the next event.
    pub fn select(&mut self) -> GlkResult<Event> {
        const OP: &str = "select";
        self.windows.flush_all(self.peer.as_mut())?;
        loop {
            let signal = self
                .peer
                .select()
                .map_err(|err| err.into_glk(OP).report())?;
            if let Some(event) = self.process_signal(signal)? {
                return Ok(event);
            }
        }
    }

    /// Next event if one is already available, else an event of kind `None`.
    pub fn select_poll(&mut self) -> GlkResult<Event> {
        const OP: &str = "select_poll";
        self.windows.flush_all(self.peer.as_mut())?;
        while let Some(signal) = self
            .peer
            .poll()
            .map_err(|err| err.into_glk(OP).report())?
        {
            if let Some(event) = self.process_signal(signal)? {
                return Ok(event);
            }
        }
        Ok(Event::none())
    }

    /// Turn a raw signal into an event, or `None` if it must be discarded.
    fn process_signal(&mut self, signal: RawSignal) -> GlkResult<Option<Event>> {
        tracing::trace!(
            target: "glkrt.event",
            kind = ?signal.kind,
            window = ?signal.window,
            val1 = signal.val1,
            val2 = signal.val2,
            "raw signal"
        );
        if signal.window.is_some() {
            let (tree, mut cx) = self.window_cx();
            return tree.accept_signal(&mut cx, signal);
        }
        if signal.kind == EventType::Timer && self.timer_interval != 0 {
            return Ok(Some(Event::new(EventType::Timer, None, signal.val1, signal.val2)));
        }
        tracing::trace!(target: "glkrt.event", kind = ?signal.kind, "discarding windowless signal");
        Ok(None)
    }

    /// Start timer events every `millis` milliseconds; 0 stops them.
    pub fn request_timer_events(&mut self, millis: u32) -> GlkResult<()> {
        const OP: &str = "request_timer_events";
        if i32::try_from(millis).is_err() {
            return Err(GlkError::invalid_argument(OP, "millisecs too large").report());
        }
        self.timer_interval = millis;
        let result = if millis == 0 {
            self.peer.cancel_timer()
        } else {
            self.peer.request_timer(millis)
        };
        recover(OP, result)?;
        tracing::debug!(target: "glkrt.event", millis, "timer interval set");
        Ok(())
    }

    pub fn request_char_event(&mut self, win: WindowId) -> GlkResult<()> {
        let (tree, mut cx) = self.window_cx();
        tree.request_char(&mut cx, win, false)
    }

    pub fn request_char_event_uni(&mut self, win: WindowId) -> GlkResult<()> {
        let (tree, mut cx) = self.window_cx();
        tree.request_char(&mut cx, win, true)
    }

    pub fn cancel_char_event(&mut self, win: WindowId) -> GlkResult<()> {
        let (tree, mut cx) = self.window_cx();
        tree.cancel_char(&mut cx, win)
    }

    /// Request a line into `buffer`; a Unicode buffer makes a Unicode
    /// request. The buffer comes back in the completing event.
    pub fn request_line_event(&mut self, win: WindowId, buffer: CharBuffer, initlen: usize) -> GlkResult<()> {
        let (tree, mut cx) = self.window_cx();
        tree.request_line(&mut cx, win, buffer, initlen)
    }

    /// Abandon a line request, keeping what was typed so far.
    pub fn cancel_line_event(&mut self, win: WindowId) -> GlkResult<Event> {
        let (tree, mut cx) = self.window_cx();
        tree.cancel_line(&mut cx, win)
    }

    pub fn request_mouse_event(&mut self, win: WindowId) -> GlkResult<()> {
        let (tree, mut cx) = self.window_cx();
        tree.request_mouse(&mut cx, win)
    }

    pub fn cancel_mouse_event(&mut self, win: WindowId) -> GlkResult<()> {
        let (tree, mut cx) = self.window_cx();
        tree.cancel_mouse(&mut cx, win)
    }

    pub fn request_hyperlink_event(&mut self, win: WindowId) -> GlkResult<()> {
        let (tree, mut cx) = self.window_cx();
        tree.request_link(&mut cx, win)
    }

    pub fn cancel_hyperlink_event(&mut self, win: WindowId) -> GlkResult<()> {
        let (tree, mut cx) = self.window_cx();
        tree.cancel_link(&mut cx, win)
    }
}

#[cfg(test)]
mod tests {
    use glkrt_backend::{HeadlessMonitor, HeadlessPeer, PeerCall, PeerError};
    use glkrt_core::{WinMethod, WinType};

    use super::*;

    fn session() -> (Glk, HeadlessMonitor, WindowId) {
        let peer = HeadlessPeer::new();
        let monitor = peer.monitor();
        let mut glk = Glk::new(peer);
        let win = glk
            .window_open(None, WinMethod::default(), 0, WinType::TextBuffer, 0)
            .unwrap();
        (glk, monitor, win)
    }

    #[test]
    fn poll_discards_cancelled_char_input() {
        let (mut glk, monitor, win) = session();
        glk.request_char_event(win).unwrap();
        glk.cancel_char_event(win).unwrap();
        monitor.sender().send(RawSignal::char_input(win, u32::from('a')));
        assert!(glk.select_poll().unwrap().is_none());
    }

    #[test]
    fn poll_skips_stale_signals_to_reach_valid_ones() {
        let (mut glk, monitor, win) = session();
        glk.request_mouse_event(win).unwrap();
        let sender = monitor.sender();
        sender.send(RawSignal::char_input(win, u32::from('a')));
        sender.send(RawSignal::mouse_input(win, 4, 5));
        let event = glk.select_poll().unwrap();
        assert_eq!(event.kind, EventType::MouseInput);
        assert_eq!((event.val1, event.val2), (4, 5));
    }

    #[test]
    fn select_returns_line_input_with_buffer() {
        let (mut glk, monitor, win) = session();
        glk.request_line_event(win, CharBuffer::Latin1(vec![0; 32]), 0)
            .unwrap();
        monitor.sender().send(RawSignal::line_input(win, "open mailbox"));
        let event = glk.select().unwrap();
        assert_eq!(event.kind, EventType::LineInput);
        assert_eq!(event.window, Some(win));
        assert_eq!(event.val1, 12);
        assert_eq!(event.line_text().as_deref(), Some("open mailbox"));
    }

    #[test]
    fn timer_signals_need_an_active_interval() {
        let (mut glk, monitor, _) = session();
        monitor.sender().send(RawSignal::timer());
        assert!(glk.select_poll().unwrap().is_none());

        glk.request_timer_events(50).unwrap();
        assert_eq!(glk.timer_interval(), 50);
        monitor.sender().send(RawSignal::timer());
        assert_eq!(glk.select().unwrap().kind, EventType::Timer);

        glk.request_timer_events(0).unwrap();
        assert_eq!(glk.timer_interval(), 0);
        assert!(monitor.calls().contains(&PeerCall::CancelTimer));
        assert!(glk.request_timer_events(u32::MAX).is_err());
    }

    #[test]
    fn window_events_pass_through() {
        let (mut glk, monitor, win) = session();
        monitor.sender().send(RawSignal::arrange(win));
        let event = glk.select_poll().unwrap();
        assert_eq!(event.kind, EventType::Arrange);
        assert_eq!(event.window, Some(win));
    }

    #[test]
    fn select_flushes_output_first() {
        let (mut glk, monitor, win) = session();
        glk.set_window(Some(win)).unwrap();
        glk.put_string("You are in a maze.").unwrap();
        let handle = monitor.handle_of(win).unwrap();
        assert_eq!(monitor.printed(handle), "");
        glk.select_poll().unwrap();
        assert_eq!(monitor.printed(handle), "You are in a maze.");
    }

    #[test]
    fn fatal_peer_failure_ends_select() {
        let (mut glk, monitor, _) = session();
        monitor.fail_next(PeerError::fatal("ui thread died"));
        let err = glk.select().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn cancel_line_event_returns_typed_prefix() {
        let (mut glk, monitor, win) = session();
        glk.request_line_event(win, CharBuffer::Unicode(vec![0; 8]), 0)
            .unwrap();
        monitor.set_pending_line("inv");
        let event = glk.cancel_line_event(win).unwrap();
        assert_eq!(event.kind, EventType::LineInput);
        assert_eq!(event.val1, 3);
        assert_eq!(event.line_text().as_deref(), Some("inv"));
        monitor.sender().send(RawSignal::line_input(win, "inventory"));
        assert!(glk.select_poll().unwrap().is_none());
    }
}
