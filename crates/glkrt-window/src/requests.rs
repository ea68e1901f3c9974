#![forbid(unsafe_code)]

//! Input requests and their completion.
//!
//! # Role in glkrt
//! Requests are recorded here when the caller asks for input and cleared
//! when a matching signal arrives or the caller cancels. The runtime's event
//! loop hands every window-bound raw signal to [`WindowTree::accept_signal`],
//! which either turns it into an [`Event`] or discards it because nothing is
//! waiting for it any more. The peer may queue a signal on its own thread
//! just before the request is cancelled here, so stale signals are normal.
//!
//! # Line input
//! The caller's buffer moves into the window for the lifetime of the
//! request and is registered as an array with the dispatch hook. Completion,
//! cancellation and window close all release it; completion and
//! cancellation hand it back inside the event.

use glkrt_backend::recover;
use glkrt_core::{CharBuffer, Event, EventType, GlkError, GlkResult, RawSignal, WindowId};

use crate::input::{KeyboardRequest, LineRequest, deliverable_key};
use crate::tree::{WindowCx, WindowTree};

const NEWLINE: u32 = 0x0a;

fn no_keyboard(op: &'static str) -> GlkError {
    GlkError::invalid_argument(op, "window does not support keyboard input").report()
}

fn already_requested(op: &'static str) -> GlkError {
    GlkError::invalid_state(op, "window already has keyboard request").report()
}

fn len_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

impl WindowTree {
    /// Ask for one keystroke.
    pub fn request_char(&mut self, cx: &mut WindowCx<'_>, id: WindowId, unicode: bool) -> GlkResult<()> {
        const OP: &str = "request_char_event";
        let window = self.window_mut(OP, id)?;
        let handle = window.handle;
        let text = window.text_mut().ok_or_else(|| no_keyboard(OP))?;
        if text.keyboard.is_pending() {
            return Err(already_requested(OP));
        }
        if recover(OP, cx.peer.request_char(handle, unicode))?.is_some() {
            text.keyboard = KeyboardRequest::CHAR;
            text.keyboard.set(KeyboardRequest::UNICODE, unicode);
        }
        Ok(())
    }

    pub fn cancel_char(&mut self, cx: &mut WindowCx<'_>, id: WindowId) -> GlkResult<()> {
        const OP: &str = "cancel_char_event";
        let window = self.window_mut(OP, id)?;
        let handle = window.handle;
        let Some(text) = window.text_mut() else {
            return Ok(());
        };
        if text.keyboard.contains(KeyboardRequest::CHAR) {
            text.keyboard = KeyboardRequest::empty();
            recover(OP, cx.peer.cancel_char(handle))?;
        }
        Ok(())
    }

    /// Ask for a line of input into `buffer`, whose first `initlen`
    /// elements are shown as already typed. The buffer's length is the
    /// maximum line length.
    ///
    /// A rejected request drops the buffer.
    pub fn request_line(
        &mut self,
        cx: &mut WindowCx<'_>,
        id: WindowId,
        buffer: CharBuffer,
        initlen: usize,
    ) -> GlkResult<()> {
        const OP: &str = "request_line_event";
        let window = self.window(OP, id)?;
        let text = window.text().ok_or_else(|| no_keyboard(OP))?;
        if text.keyboard.is_pending() {
            return Err(already_requested(OP));
        }
        let maxlen = buffer.len();
        if maxlen == 0 || i32::try_from(maxlen).is_err() {
            return Err(GlkError::invalid_argument(OP, "maxlen out of range").report());
        }
        if initlen > maxlen {
            return Err(GlkError::invalid_argument(OP, "initlen out of range").report());
        }
        let handle = window.handle;
        let unicode = buffer.is_unicode();
        self.flush(cx.peer, id)?;

        let mut request = LineRequest::new(buffer);
        request.set_array_rock(cx.dispatch.register_array(request.array(id)));
        let initial = request.buffer().codes(initlen);
        if let Err(err) = cx.peer.request_line(handle, &initial, maxlen, unicode) {
            cx.dispatch
                .unregister_array(request.array(id), request.array_rock());
            return Err(err.into_glk(OP).report());
        }
        if let Some(text) = self.window_mut(OP, id)?.text_mut() {
            text.keyboard = KeyboardRequest::LINE;
            text.keyboard.set(KeyboardRequest::UNICODE, unicode);
            text.line = Some(request);
        }
        tracing::debug!(target: "glkrt.window", window = %id, maxlen, initlen, unicode, "line requested");
        Ok(())
    }

    /// Abandon a pending line request.
    ///
    /// The event carries whatever had been typed and hands the buffer back.
    /// Without a pending request the event is empty. If the peer cannot say
    /// what was typed the buffer still comes back, in an event of kind
    /// `None` with length zero.
    pub fn cancel_line(&mut self, cx: &mut WindowCx<'_>, id: WindowId) -> GlkResult<Event> {
        const OP: &str = "cancel_line_event";
        let window = self.window_mut(OP, id)?;
        let handle = window.handle;
        let Some(text) = window.text_mut() else {
            return Ok(Event::none());
        };
        if !text.keyboard.contains(KeyboardRequest::LINE) {
            return Ok(Event::none());
        }
        text.keyboard = KeyboardRequest::empty();
        let Some(request) = text.line.take() else {
            return Ok(Event::none());
        };
        cx.dispatch
            .unregister_array(request.array(id), request.array_rock());
        let mut buffer = request.into_buffer();

        let entered = match cx.peer.cancel_line(handle) {
            Ok(entered) => entered,
            Err(err) if err.is_recoverable() => {
                tracing::warn!(target: "glkrt.peer", op = OP, message = %err.message, "peer call failed");
                return Ok(Event {
                    line: Some(buffer),
                    ..Event::new(EventType::None, Some(id), 0, 0)
                });
            }
            Err(err) => return Err(err.into_glk(OP).report()),
        };
        let len = buffer.fill(&entered);
        self.echo_line(cx, id, &buffer, len)?;
        Ok(Event {
            line: Some(buffer),
            ..Event::new(EventType::LineInput, Some(id), len_u32(len), 0)
        })
    }

    /// Copy the first `len` elements of a completed line, plus a newline,
    /// to the window's echo stream.
    ///
    /// Best effort: a failed echo never stops the line event. Caller-tier
    /// errors were already reported where they arose; only fatal ones
    /// come back.
    fn echo_line(
        &mut self,
        cx: &mut WindowCx<'_>,
        id: WindowId,
        buffer: &CharBuffer,
        len: usize,
    ) -> GlkResult<()> {
        let Some(echo) = self.windows.get(id).and_then(|window| window.echo) else {
            return Ok(());
        };
        if len == 0 {
            return Ok(());
        }
        let mut codes = buffer.codes(len);
        codes.push(NEWLINE);
        match self.put_codes(cx, "line_input_echo", echo, &codes) {
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                tracing::debug!(target: "glkrt.window", window = %id, stream = %echo, error = %err, "line echo dropped");
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    /// Ask for a mouse event. Text and graphics windows only.
    pub fn request_mouse(&mut self, cx: &mut WindowCx<'_>, id: WindowId) -> GlkResult<()> {
        const OP: &str = "request_mouse_event";
        let window = self.window_mut(OP, id)?;
        if !window.wintype.is_output() {
            return Err(GlkError::invalid_argument(OP, "window does not support mouse input").report());
        }
        if window.mouse_request {
            return Ok(());
        }
        if recover(OP, cx.peer.request_mouse(window.handle))?.is_some() {
            window.mouse_request = true;
        }
        Ok(())
    }

    pub fn cancel_mouse(&mut self, cx: &mut WindowCx<'_>, id: WindowId) -> GlkResult<()> {
        const OP: &str = "cancel_mouse_event";
        let window = self.window_mut(OP, id)?;
        if window.mouse_request {
            window.mouse_request = false;
            recover(OP, cx.peer.cancel_mouse(window.handle))?;
        }
        Ok(())
    }

    /// Ask for a hyperlink selection. Text windows only.
    pub fn request_link(&mut self, cx: &mut WindowCx<'_>, id: WindowId) -> GlkResult<()> {
        const OP: &str = "request_hyperlink_event";
        let window = self.window_mut(OP, id)?;
        let handle = window.handle;
        let text = window
            .text_mut()
            .ok_or_else(|| GlkError::invalid_argument(OP, "window does not support hyperlinks").report())?;
        if !text.link_request && recover(OP, cx.peer.request_link(handle))?.is_some() {
            text.link_request = true;
        }
        Ok(())
    }

    pub fn cancel_link(&mut self, cx: &mut WindowCx<'_>, id: WindowId) -> GlkResult<()> {
        const OP: &str = "cancel_hyperlink_event";
        let window = self.window_mut(OP, id)?;
        let handle = window.handle;
        let Some(text) = window.text_mut() else {
            return Ok(());
        };
        if text.link_request {
            text.link_request = false;
            recover(OP, cx.peer.cancel_link(handle))?;
        }
        Ok(())
    }

    /// Validate a raw signal addressed to a window against the requests
    /// outstanding on it.
    ///
    /// Returns `None` when the signal must be discarded: the window is gone,
    /// or nothing is waiting for this kind of input.
    pub fn accept_signal(&mut self, cx: &mut WindowCx<'_>, signal: RawSignal) -> GlkResult<Option<Event>> {
        let Some(id) = signal.window else {
            return Ok(None);
        };
        let Some(window) = self.windows.get_mut(id) else {
            tracing::trace!(target: "glkrt.event", window = %id, kind = ?signal.kind, "signal for unknown window");
            return Ok(None);
        };
        let plain = Event::new(signal.kind, Some(id), signal.val1, signal.val2);

        match signal.kind {
            EventType::MouseInput => {
                if !window.mouse_request {
                    return Ok(discard(id, signal.kind));
                }
                window.mouse_request = false;
                Ok(Some(plain))
            }
            EventType::CharInput => {
                let Some(text) = window.text_mut() else {
                    return Ok(discard(id, signal.kind));
                };
                if !text.keyboard.contains(KeyboardRequest::CHAR) {
                    return Ok(discard(id, signal.kind));
                }
                let unicode = text.keyboard.contains(KeyboardRequest::UNICODE);
                text.keyboard = KeyboardRequest::empty();
                Ok(Some(Event {
                    val1: deliverable_key(signal.val1, unicode),
                    ..plain
                }))
            }
            EventType::LineInput => {
                let Some(text) = window.text_mut() else {
                    return Ok(discard(id, signal.kind));
                };
                if !text.keyboard.contains(KeyboardRequest::LINE) {
                    return Ok(discard(id, signal.kind));
                }
                text.keyboard = KeyboardRequest::empty();
                let Some(request) = text.line.take() else {
                    return Ok(discard(id, signal.kind));
                };
                cx.dispatch
                    .unregister_array(request.array(id), request.array_rock());
                let mut buffer = request.into_buffer();
                let len = match &signal.line {
                    Some(entered) => buffer.fill(entered),
                    None => usize::try_from(signal.val1)
                        .unwrap_or(usize::MAX)
                        .min(buffer.len()),
                };
                self.echo_line(cx, id, &buffer, len)?;
                Ok(Some(Event {
                    val1: len_u32(len),
                    line: Some(buffer),
                    ..plain
                }))
            }
            EventType::Hyperlink => {
                let Some(text) = window.text_mut() else {
                    return Ok(discard(id, signal.kind));
                };
                if !text.link_request {
                    return Ok(discard(id, signal.kind));
                }
                text.link_request = false;
                Ok(Some(plain))
            }
            _ => Ok(Some(plain)),
        }
    }
}

fn discard(id: WindowId, kind: EventType) -> Option<Event> {
    tracing::trace!(target: "glkrt.event", window = %id, ?kind, "discarding unrequested signal");
    None
}
