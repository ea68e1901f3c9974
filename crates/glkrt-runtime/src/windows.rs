#![forbid(unsafe_code)]

//! Window operations of [`Glk`].

use glkrt_core::{GlkResult, Rock, StreamId, WinMethod, WinType, WindowId};
use glkrt_stream::StreamResult;

use crate::glk::Glk;

impl Glk {
    /// Open a window. See [`WindowTree::open`](glkrt_window::WindowTree::open).
    pub fn window_open(
        &mut self,
        split: Option<WindowId>,
        method: WinMethod,
        size: u32,
        wintype: WinType,
        rock: Rock,
    ) -> GlkResult<WindowId> {
        let (tree, mut cx) = self.window_cx();
        tree.open(&mut cx, split, method, size, wintype, rock)
    }

    /// Close a window and its subtree, returning the totals of its stream.
    pub fn window_close(&mut self, id: WindowId) -> GlkResult<StreamResult> {
        let (tree, mut cx) = self.window_cx();
        tree.close(&mut cx, id)
    }

    #[must_use]
    pub const fn window_get_root(&self) -> Option<WindowId> {
        self.windows.root()
    }

    #[must_use]
    pub fn window_iterate(&self, after: Option<WindowId>) -> Option<(WindowId, Rock)> {
        self.windows.iterate(after)
    }

    pub fn window_get_rock(&self, id: WindowId) -> GlkResult<Rock> {
        self.windows.get_rock(id)
    }

    pub fn window_get_type(&self, id: WindowId) -> GlkResult<WinType> {
        self.windows.get_type(id)
    }

    pub fn window_get_parent(&self, id: WindowId) -> GlkResult<Option<WindowId>> {
        self.windows.get_parent(id)
    }

    pub fn window_get_sibling(&self, id: WindowId) -> GlkResult<Option<WindowId>> {
        self.windows.get_sibling(id)
    }

    pub fn window_get_stream(&self, id: WindowId) -> GlkResult<StreamId> {
        self.windows.get_stream(id)
    }

    pub fn window_get_echo_stream(&self, id: WindowId) -> GlkResult<Option<StreamId>> {
        self.windows.get_echo_stream(id)
    }

    pub fn window_set_echo_stream(&mut self, id: WindowId, echo: Option<StreamId>) -> GlkResult<()> {
        self.windows.set_echo_stream(id, echo, &self.streams)
    }

    /// Width and height in the window's own units.
    pub fn window_get_size(&mut self, id: WindowId) -> GlkResult<(u32, u32)> {
        self.windows.get_size(self.peer.as_mut(), id)
    }

    pub fn window_get_arrangement(&self, id: WindowId) -> GlkResult<(WinMethod, u32, Option<WindowId>)> {
        self.windows.get_arrangement(id)
    }

    pub fn window_set_arrangement(
        &mut self,
        id: WindowId,
        method: WinMethod,
        size: u32,
        key: Option<WindowId>,
    ) -> GlkResult<()> {
        let (tree, mut cx) = self.window_cx();
        tree.set_arrangement(&mut cx, id, method, size, key)
    }

    pub fn window_clear(&mut self, id: WindowId) -> GlkResult<()> {
        self.windows.clear(self.peer.as_mut(), id)
    }

    pub fn window_move_cursor(&mut self, id: WindowId, x: u32, y: u32) -> GlkResult<()> {
        self.windows.move_cursor(self.peer.as_mut(), id, x, y)
    }

    pub fn window_flow_break(&mut self, id: WindowId) -> GlkResult<()> {
        self.windows.flow_break(self.peer.as_mut(), id)
    }

    pub fn window_erase_rect(
        &mut self,
        id: WindowId,
        left: i32,
        top: i32,
        width: u32,
        height: u32,
    ) -> GlkResult<()> {
        self.windows
            .erase_rect(self.peer.as_mut(), id, left, top, width, height)
    }

    pub fn window_fill_rect(
        &mut self,
        id: WindowId,
        color: u32,
        left: i32,
        top: i32,
        width: u32,
        height: u32,
    ) -> GlkResult<()> {
        self.windows
            .fill_rect(self.peer.as_mut(), id, color, left, top, width, height)
    }

    pub fn window_set_background_color(&mut self, id: WindowId, color: u32) -> GlkResult<()> {
        self.windows
            .set_background_color(self.peer.as_mut(), id, color)
    }

    /// Make `id`'s stream the current stream, or clear it.
    pub fn set_window(&mut self, id: Option<WindowId>) -> GlkResult<()> {
        let stream = id.map(|id| self.windows.get_stream(id)).transpose()?;
        self.streams.set_current(stream)
    }

    pub fn style_distinguish(&mut self, id: WindowId, a: u32, b: u32) -> GlkResult<bool> {
        self.windows.style_distinguish(self.peer.as_mut(), id, a, b)
    }

    pub fn style_measure(&mut self, id: WindowId, style: u32, hint: u32) -> GlkResult<Option<u32>> {
        self.windows
            .style_measure(self.peer.as_mut(), id, style, hint)
    }
}
