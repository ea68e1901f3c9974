#![forbid(unsafe_code)]

//! Output side of the window tree: buffered text, styles, hyperlinks, and
//! the drawing calls that go straight to the peer.
//!
//! Text reaches a window through its stream. [`WindowTree::put_codes`] takes
//! a stream id, lets the stream registry decide where the text goes, and
//! follows window echo streams from there. An echo chain that comes back to
//! a stream it already wrote to is cut off with a warning.

use glkrt_backend::{PeerHandle, PresentationPeer, recover};
use glkrt_core::{GlkError, GlkResult, StreamId, Style, StyleHint, WinType, WindowId};
use glkrt_stream::Route;

use crate::input::KeyboardRequest;
use crate::output::OutputBuffer;
use crate::tree::{WindowCx, WindowTree};
use crate::window::Window;

/// Largest color value: 24-bit RGB.
const MAX_COLOR: u32 = 0x00FF_FFFF;

fn flush_output(
    peer: &mut dyn PresentationPeer,
    handle: PeerHandle,
    output: &mut OutputBuffer,
) -> GlkResult<()> {
    if output.is_empty() {
        return Ok(());
    }
    let units = output.take();
    recover("window_print", peer.print(handle, &units))?;
    Ok(())
}

fn echo_loop(op: &'static str, stream: StreamId) -> GlkError {
    tracing::debug!(target: "glkrt.window", %stream, "echo chain revisits stream");
    GlkError::invalid_state(op, "echo stream loop").report()
}

impl WindowTree {
    /// Buffer code points for a text window.
    ///
    /// Returns how many were accepted: zero for windows that show no text.
    /// A pending line request rejects the output.
    pub fn write(
        &mut self,
        peer: &mut dyn PresentationPeer,
        op: &'static str,
        id: WindowId,
        codes: &[u32],
    ) -> GlkResult<usize> {
        let window = self.window_mut(op, id)?;
        let handle = window.handle;
        let Some(text) = window.text_mut() else {
            return Ok(0);
        };
        if text.keyboard.contains(KeyboardRequest::LINE) {
            return Err(GlkError::invalid_state(op, "window has pending line request").report());
        }
        for code in codes {
            if text.output.needs_flush() {
                flush_output(peer, handle, &mut text.output)?;
            }
            text.output.push(*code);
        }
        Ok(codes.len())
    }

    /// Write `codes` to `stream` and on through window echo streams.
    pub fn put_codes(
        &mut self,
        cx: &mut WindowCx<'_>,
        op: &'static str,
        stream: StreamId,
        codes: &[u32],
    ) -> GlkResult<()> {
        let mut visited = Vec::new();
        let mut next = Some(stream);
        while let Some(current) = next.take() {
            if visited.contains(&current) {
                return Err(echo_loop(op, current));
            }
            visited.push(current);
            let Route::Window(win) = cx.streams.write(current, codes)? else {
                break;
            };
            let accepted = self.write(cx.peer, op, win, codes)?;
            cx.streams.note_written(current, accepted);
            next = self.text_echo(win);
        }
        Ok(())
    }

    /// Echo stream of a text window.
    fn text_echo(&self, id: WindowId) -> Option<StreamId> {
        self.windows
            .get(id)
            .filter(|window| window.wintype.is_text())
            .and_then(Window::echo_stream)
    }

    /// Set the style of the window behind `stream`, if any, and of the
    /// windows it echoes to. Unchanged styles stop the chain.
    pub fn set_style(&mut self, cx: &mut WindowCx<'_>, stream: StreamId, style: Style) -> GlkResult<()> {
        const OP: &str = "set_style";
        let mut visited = Vec::new();
        let mut next = Some(stream);
        while let Some(current) = next.take() {
            if visited.contains(&current) {
                return Err(echo_loop(OP, current));
            }
            visited.push(current);
            let Some(win) = cx.streams.window_target(current)? else {
                break;
            };
            if !self.apply_style(cx.peer, win, style)? {
                break;
            }
            next = self.text_echo(win);
        }
        Ok(())
    }

    /// Returns whether the style changed.
    fn apply_style(
        &mut self,
        peer: &mut dyn PresentationPeer,
        id: WindowId,
        style: Style,
    ) -> GlkResult<bool> {
        const OP: &str = "set_style";
        let window = self.window_mut(OP, id)?;
        let handle = window.handle;
        let Some(text) = window.text_mut() else {
            return Ok(false);
        };
        if text.style == style {
            return Ok(false);
        }
        flush_output(peer, handle, &mut text.output)?;
        recover(OP, peer.set_style(handle, style))?;
        text.style = style;
        Ok(true)
    }

    /// Set the hyperlink value of the window behind `stream`. Hyperlinks
    /// are not echoed.
    pub fn set_hyperlink(&mut self, cx: &mut WindowCx<'_>, stream: StreamId, link: u32) -> GlkResult<()> {
        const OP: &str = "set_hyperlink";
        let Some(win) = cx.streams.window_target(stream)? else {
            return Ok(());
        };
        let window = self.window_mut(OP, win)?;
        let handle = window.handle;
        let Some(text) = window.text_mut() else {
            return Ok(());
        };
        if text.link == link {
            return Ok(());
        }
        flush_output(cx.peer, handle, &mut text.output)?;
        recover(OP, cx.peer.set_link(handle, link))?;
        text.link = link;
        Ok(())
    }

    /// Print whatever `id` has buffered.
    pub fn flush(&mut self, peer: &mut dyn PresentationPeer, id: WindowId) -> GlkResult<()> {
        let window = self.window_mut("window_flush", id)?;
        let handle = window.handle;
        match window.text_mut() {
            Some(text) => flush_output(peer, handle, &mut text.output),
            None => Ok(()),
        }
    }

    /// Print buffered text of every window.
    pub fn flush_all(&mut self, peer: &mut dyn PresentationPeer) -> GlkResult<()> {
        for (_, window) in self.windows.iter_mut() {
            let handle = window.handle;
            if let Some(text) = window.text_mut() {
                flush_output(peer, handle, &mut text.output)?;
            }
        }
        Ok(())
    }

    /// Clear a window. Buffered text is discarded, not printed.
    pub fn clear(&mut self, peer: &mut dyn PresentationPeer, id: WindowId) -> GlkResult<()> {
        const OP: &str = "window_clear";
        let window = self.window_mut(OP, id)?;
        if !window.wintype.is_output() {
            return Ok(());
        }
        let handle = window.handle;
        if let Some(text) = window.text_mut() {
            if text.keyboard.contains(KeyboardRequest::LINE) {
                return Err(GlkError::invalid_state(OP, "window has pending line request").report());
            }
            text.output.clear();
        }
        recover(OP, peer.clear(handle))?;
        Ok(())
    }

    /// Move the cursor of a text grid.
    pub fn move_cursor(
        &mut self,
        peer: &mut dyn PresentationPeer,
        id: WindowId,
        x: u32,
        y: u32,
    ) -> GlkResult<()> {
        const OP: &str = "window_move_cursor";
        let window = self.window(OP, id)?;
        if window.wintype != WinType::TextGrid {
            return Err(GlkError::invalid_argument(OP, "not a TextGrid window").report());
        }
        if i32::try_from(x).is_err() || i32::try_from(y).is_err() {
            return Err(GlkError::invalid_argument(OP, "invalid position").report());
        }
        let handle = window.handle;
        self.flush(peer, id)?;
        recover(OP, peer.move_cursor(handle, x, y))?;
        Ok(())
    }

    /// Paragraph break hint for text buffers; ignored elsewhere.
    pub fn flow_break(&mut self, peer: &mut dyn PresentationPeer, id: WindowId) -> GlkResult<()> {
        const OP: &str = "window_flow_break";
        let window = self.window(OP, id)?;
        if window.wintype != WinType::TextBuffer {
            return Ok(());
        }
        let handle = window.handle;
        self.flush(peer, id)?;
        recover(OP, peer.flow_break(handle))?;
        Ok(())
    }

    /// Handle of a graphics window, or `None` for any other type.
    fn graphics_handle(&self, op: &'static str, id: WindowId) -> GlkResult<Option<PeerHandle>> {
        let window = self.window(op, id)?;
        Ok((window.wintype == WinType::Graphics).then_some(window.handle))
    }

    pub fn erase_rect(
        &mut self,
        peer: &mut dyn PresentationPeer,
        id: WindowId,
        left: i32,
        top: i32,
        width: u32,
        height: u32,
    ) -> GlkResult<()> {
        const OP: &str = "window_erase_rect";
        let Some(handle) = self.graphics_handle(OP, id)? else {
            return Ok(());
        };
        if width == 0 || height == 0 {
            return Ok(());
        }
        recover(OP, peer.erase_rect(handle, left, top, width, height))?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn fill_rect(
        &mut self,
        peer: &mut dyn PresentationPeer,
        id: WindowId,
        color: u32,
        left: i32,
        top: i32,
        width: u32,
        height: u32,
    ) -> GlkResult<()> {
        const OP: &str = "window_fill_rect";
        let Some(handle) = self.graphics_handle(OP, id)? else {
            return Ok(());
        };
        if width == 0 || height == 0 {
            return Ok(());
        }
        if color > MAX_COLOR {
            return Err(GlkError::invalid_argument(OP, "invalid color").report());
        }
        recover(OP, peer.fill_rect(handle, color, left, top, width, height))?;
        Ok(())
    }

    pub fn set_background_color(
        &mut self,
        peer: &mut dyn PresentationPeer,
        id: WindowId,
        color: u32,
    ) -> GlkResult<()> {
        const OP: &str = "window_set_background_color";
        let Some(handle) = self.graphics_handle(OP, id)? else {
            return Ok(());
        };
        if color > MAX_COLOR {
            return Err(GlkError::invalid_argument(OP, "invalid color").report());
        }
        recover(OP, peer.set_background_color(handle, color))?;
        Ok(())
    }

    /// Whether two styles look different in a text window. Unknown styles
    /// and non-text windows answer `false`.
    pub fn style_distinguish(
        &self,
        peer: &mut dyn PresentationPeer,
        id: WindowId,
        a: u32,
        b: u32,
    ) -> GlkResult<bool> {
        const OP: &str = "style_distinguish";
        let window = self.window(OP, id)?;
        let (Some(a), Some(b)) = (Style::from_raw(a), Style::from_raw(b)) else {
            return Ok(false);
        };
        if !window.wintype.is_text() {
            return Ok(false);
        }
        Ok(recover(OP, peer.style_distinguish(window.handle, a, b))?.unwrap_or(false))
    }

    /// Measured value of a style hint in a text window, if the peer knows it.
    pub fn style_measure(
        &self,
        peer: &mut dyn PresentationPeer,
        id: WindowId,
        style: u32,
        hint: u32,
    ) -> GlkResult<Option<u32>> {
        const OP: &str = "style_measure";
        let window = self.window(OP, id)?;
        let (Some(style), Some(hint)) = (Style::from_raw(style), StyleHint::from_raw(hint)) else {
            return Ok(None);
        };
        if !window.wintype.is_text() {
            return Ok(None);
        }
        Ok(recover(OP, peer.style_measure(window.handle, style, hint))?.flatten())
    }
}
