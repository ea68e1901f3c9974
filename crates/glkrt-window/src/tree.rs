#![forbid(unsafe_code)]

//! Window tree structure: open, close, arrangement and navigation.
//!
//! # Role in glkrt
//! The tree is a binary split tree. Leaves are the windows callers open;
//! every internal node is a pair window synthesized by a split. Windows are
//! stored in a [`Registry`] keyed by [`WindowId`], and every structural link
//! (parent, pair children, pair key) is an id, so a link to a closed window is
//! detectable rather than dangling.
//!
//! # Invariants
//! - The tree is empty or has exactly one root, and the root has no parent.
//! - Every non-root window's parent is a pair whose children include it.
//! - A pair has exactly two children; its key, when set, is a strict
//!   descendant of the pair and never a pair itself.
//!
//! [`WindowTree::validate`] checks all of these.

use std::collections::BTreeSet;
use std::fmt;

use glkrt_backend::{PresentationPeer, recover};
use glkrt_core::{
    Dispatch, Division, GlkError, GlkResult, ObjectRef, Registry, Rock, StreamId, WinMethod,
    WinType, WindowId,
};
use glkrt_stream::{StreamRegistry, StreamResult};

use crate::output::DEFAULT_BUFFER_UNITS;
use crate::window::{PairData, Window, WindowKind};

/// Largest proportional split, in percent.
const MAX_PROPORTION: u32 = 100;

/// Collaborators a window operation may reach.
pub struct WindowCx<'a> {
    pub peer: &'a mut dyn PresentationPeer,
    pub streams: &'a mut StreamRegistry,
    pub dispatch: &'a mut Dispatch,
}

/// Structural invariant violation found by [`WindowTree::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Windows exist but no root is set.
    MissingRoot,
    RootHasParent { root: WindowId },
    MissingWindow { id: WindowId },
    ParentNotPair { child: WindowId, parent: WindowId },
    ParentChildMismatch { parent: WindowId, child: WindowId },
    OrphanWindow { id: WindowId },
    InvalidKey { pair: WindowId, key: WindowId },
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRoot => write!(f, "windows exist but the tree has no root"),
            Self::RootHasParent { root } => write!(f, "root {root} has a parent"),
            Self::MissingWindow { id } => write!(f, "{id} is referenced but not registered"),
            Self::ParentNotPair { child, parent } => {
                write!(f, "parent {parent} of {child} is not a pair window")
            }
            Self::ParentChildMismatch { parent, child } => {
                write!(f, "{child} names {parent} as parent but is not its child")
            }
            Self::OrphanWindow { id } => write!(f, "{id} is not reachable from the root"),
            Self::InvalidKey { pair, key } => {
                write!(f, "key {key} of {pair} is not a leaf below it")
            }
        }
    }
}

impl std::error::Error for TreeError {}

fn invalid(op: &'static str, id: WindowId) -> GlkError {
    GlkError::InvalidWindow { op, id: Some(id) }.report()
}

fn corrupt(op: &'static str) -> GlkError {
    GlkError::invalid_state(op, "window tree is inconsistent").report()
}

/// Every live window plus the root.
#[derive(Debug)]
pub struct WindowTree {
    pub(crate) windows: Registry<WindowId, Window>,
    pub(crate) root: Option<WindowId>,
    buffer_units: usize,
}

impl Default for WindowTree {
    fn default() -> Self {
        Self::with_buffer_units(DEFAULT_BUFFER_UNITS)
    }
}

impl WindowTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tree whose text windows buffer up to `buffer_units` UTF-16 units.
    #[must_use]
    pub fn with_buffer_units(buffer_units: usize) -> Self {
        Self {
            windows: Registry::new(),
            root: None,
            buffer_units,
        }
    }

    #[must_use]
    pub const fn root(&self) -> Option<WindowId> {
        self.root
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: WindowId) -> bool {
        self.windows.contains(id)
    }

    #[must_use]
    pub fn get(&self, id: WindowId) -> Option<&Window> {
        self.windows.get(id)
    }

    /// Live window ids, newest first.
    #[must_use]
    pub fn ids(&self) -> Vec<WindowId> {
        self.windows.ids()
    }

    #[must_use]
    pub fn iterate(&self, after: Option<WindowId>) -> Option<(WindowId, Rock)> {
        self.windows.iterate(after)
    }

    pub(crate) fn window(&self, op: &'static str, id: WindowId) -> GlkResult<&Window> {
        self.windows.get(id).ok_or_else(|| invalid(op, id))
    }

    pub(crate) fn window_mut(&mut self, op: &'static str, id: WindowId) -> GlkResult<&mut Window> {
        self.windows.get_mut(id).ok_or_else(|| invalid(op, id))
    }

    pub fn get_rock(&self, id: WindowId) -> GlkResult<Rock> {
        self.windows
            .rock(id)
            .ok_or_else(|| invalid("window_get_rock", id))
    }

    pub fn get_type(&self, id: WindowId) -> GlkResult<WinType> {
        Ok(self.window("window_get_type", id)?.wintype)
    }

    pub fn get_parent(&self, id: WindowId) -> GlkResult<Option<WindowId>> {
        Ok(self.window("window_get_parent", id)?.parent)
    }

    /// The other child of this window's parent; `None` for the root.
    pub fn get_sibling(&self, id: WindowId) -> GlkResult<Option<WindowId>> {
        const OP: &str = "window_get_sibling";
        let Some(parent) = self.window(OP, id)?.parent else {
            return Ok(None);
        };
        let sibling = self
            .windows
            .get(parent)
            .and_then(Window::pair_data)
            .and_then(|pair| pair.other_child(id));
        if sibling.is_none() {
            tracing::warn!(target: "glkrt.strict", op = OP, window = %id, "window has no sibling");
        }
        Ok(sibling)
    }

    pub fn get_stream(&self, id: WindowId) -> GlkResult<StreamId> {
        Ok(self.window("window_get_stream", id)?.stream)
    }

    pub fn get_echo_stream(&self, id: WindowId) -> GlkResult<Option<StreamId>> {
        Ok(self.window("window_get_echo_stream", id)?.echo)
    }

    /// Mirror this window's output to `stream`, or stop mirroring.
    pub fn set_echo_stream(
        &mut self,
        id: WindowId,
        stream: Option<StreamId>,
        streams: &StreamRegistry,
    ) -> GlkResult<()> {
        const OP: &str = "window_set_echo_stream";
        if let Some(stream) = stream {
            if !streams.contains(stream) {
                return Err(GlkError::InvalidStream {
                    op: OP,
                    id: Some(stream),
                }
                .report());
            }
        }
        self.window_mut(OP, id)?.echo = stream;
        Ok(())
    }

    /// Forget `stream` as an echo target on every window.
    pub fn unecho(&mut self, stream: StreamId) {
        for (_, window) in self.windows.iter_mut() {
            if window.echo == Some(stream) {
                window.echo = None;
            }
        }
    }

    /// Open a window, splitting `split` or creating the root.
    ///
    /// When the tree is empty `split` must be absent and the new window
    /// becomes the root. Otherwise a new pair window takes `split`'s place,
    /// with `split` and the new window as its children and the new window as
    /// its key.
    pub fn open(
        &mut self,
        cx: &mut WindowCx<'_>,
        split: Option<WindowId>,
        method: WinMethod,
        size: u32,
        wintype: WinType,
        rock: Rock,
    ) -> GlkResult<WindowId> {
        const OP: &str = "window_open";
        if !wintype.is_openable() {
            return Err(GlkError::invalid_argument(OP, "cannot open pair window directly").report());
        }
        let (split_handle, size) = match (self.root, split) {
            (None, Some(_)) => {
                return Err(
                    GlkError::invalid_argument(OP, "ref must be absent for the first window")
                        .report(),
                );
            }
            (Some(_), None) => {
                return Err(GlkError::invalid_argument(OP, "ref must be present").report());
            }
            (None, None) => (None, size),
            (Some(_), Some(target)) => {
                let target_window = self.window(OP, target)?;
                let Some(division) = method.division() else {
                    return Err(GlkError::invalid_argument(OP, "invalid method (not fixed or proportional)").report());
                };
                if method.direction().is_none() {
                    return Err(GlkError::invalid_argument(OP, "invalid method (bad direction)").report());
                }
                if let Some(parent) = target_window.parent {
                    if self.windows.get(parent).map(Window::wintype) != Some(WinType::Pair) {
                        return Err(GlkError::invalid_state(OP, "parent window is not a pair").report());
                    }
                }
                if i32::try_from(size).is_err() {
                    return Err(GlkError::invalid_argument(OP, "size too large").report());
                }
                let size = match division {
                    Division::Proportional => size.min(MAX_PROPORTION),
                    Division::Fixed => size,
                };
                (Some(target_window.handle), size)
            }
        };

        let id = self
            .windows
            .peek_next()
            .ok_or_else(|| GlkError::invalid_state(OP, "window ids exhausted").report())?;
        let opened = cx
            .peer
            .open_window(split_handle, method, size, wintype, id)
            .map_err(|err| err.into_glk(OP).report())?;
        let pair_handle = match (split, opened.pair) {
            (Some(_), None) => {
                return Err(GlkError::Peer {
                    op: OP,
                    message: "peer did not create a pair window".to_owned(),
                }
                .report());
            }
            (Some(_), handle) => handle,
            (None, _) => None,
        };

        let buffer_units = self.buffer_units;
        let id = self.insert_window(cx, OP, rock, |stream| {
            Window::leaf(wintype, opened.window, stream, buffer_units)
        })?;
        match (split, pair_handle) {
            (Some(target), Some(pair_handle)) => {
                self.apply_split(cx, target, id, method, size, pair_handle)?;
            }
            _ => self.root = Some(id),
        }
        tracing::debug!(
            target: "glkrt.window",
            window = %id,
            ?wintype,
            split = ?split,
            method = method.as_raw(),
            size,
            rock,
            "window opened"
        );
        Ok(id)
    }

    /// Register a window built around its freshly opened stream.
    fn insert_window(
        &mut self,
        cx: &mut WindowCx<'_>,
        op: &'static str,
        rock: Rock,
        build: impl FnOnce(StreamId) -> Window,
    ) -> GlkResult<WindowId> {
        let exhausted = || GlkError::invalid_state(op, "window ids exhausted").report();
        let id = self.windows.peek_next().ok_or_else(exhausted)?;
        let stream = cx.streams.open_window_stream(id, cx.dispatch)?;
        let id = self.windows.insert(rock, build(stream)).ok_or_else(exhausted)?;
        let disprock = cx.dispatch.register(ObjectRef::Window(id));
        if let Some(entry) = self.windows.entry_mut(id) {
            entry.disprock = disprock;
        }
        Ok(id)
    }

    /// Put a new pair in `target`'s slot with `target` and `new_leaf` below it.
    fn apply_split(
        &mut self,
        cx: &mut WindowCx<'_>,
        target: WindowId,
        new_leaf: WindowId,
        method: WinMethod,
        size: u32,
        pair_handle: glkrt_backend::PeerHandle,
    ) -> GlkResult<()> {
        const OP: &str = "window_open";
        let target_parent = self.window(OP, target)?.parent;
        let data = PairData {
            method,
            size,
            key: Some(new_leaf),
            first: target,
            second: new_leaf,
        };
        let pair = self.insert_window(cx, OP, 0, |stream| {
            Window::pair(data, pair_handle, stream, target_parent)
        })?;

        for child in [target, new_leaf] {
            self.window_mut(OP, child)?.parent = Some(pair);
        }
        if let Some(parent) = target_parent {
            self.replace_child(parent, target, pair)?;
        } else {
            self.root = Some(pair);
        }
        Ok(())
    }

    fn replace_child(
        &mut self,
        parent: WindowId,
        old_child: WindowId,
        new_child: WindowId,
    ) -> GlkResult<()> {
        const OP: &str = "window_tree";
        let data = self
            .windows
            .get_mut(parent)
            .and_then(Window::pair_mut)
            .ok_or_else(|| corrupt(OP))?;
        if data.first == old_child {
            data.first = new_child;
        } else if data.second == old_child {
            data.second = new_child;
        } else {
            return Err(corrupt(OP));
        }
        Ok(())
    }

    /// Close a window and everything below it.
    ///
    /// Returns the read and write totals of the window's own stream. When
    /// the window is not the root its parent pair disappears as well and
    /// the sibling takes the pair's place.
    pub fn close(&mut self, cx: &mut WindowCx<'_>, id: WindowId) -> GlkResult<StreamResult> {
        const OP: &str = "window_close";
        let window = self.window(OP, id)?;
        let (handle, stream, parent) = (window.handle, window.stream, window.parent);
        recover(OP, cx.peer.close_window(handle))?;
        let result = cx
            .streams
            .get(stream)
            .map(glkrt_stream::Stream::result)
            .unwrap_or_default();

        let subtree = self.collect_subtree(id);
        if parent.is_some() {
            let pair = self.promote_sibling_after_detach(id)?;
            self.unregister(cx, pair);
        } else {
            self.root = None;
        }
        for closed in &subtree {
            self.unregister(cx, *closed);
        }
        for (_, window) in self.windows.iter_mut() {
            if let Some(data) = window.pair_mut() {
                if data.key.is_some_and(|key| subtree.contains(&key)) {
                    data.key = None;
                }
            }
        }
        tracing::debug!(
            target: "glkrt.window",
            window = %id,
            closed = subtree.len(),
            remaining = self.windows.len(),
            "window closed"
        );
        Ok(result)
    }

    /// Detach `detached` from its parent pair, splice the pair out and put
    /// the sibling in the pair's slot. Returns the pair, which the caller
    /// unregisters.
    fn promote_sibling_after_detach(&mut self, detached: WindowId) -> GlkResult<WindowId> {
        const OP: &str = "window_close";
        let parent = self
            .window(OP, detached)?
            .parent
            .ok_or_else(|| corrupt(OP))?;
        let parent_window = self.window(OP, parent)?;
        let sibling = parent_window
            .pair_data()
            .and_then(|pair| pair.other_child(detached))
            .ok_or_else(|| corrupt(OP))?;
        let grandparent = parent_window.parent;

        if let Some(grandparent) = grandparent {
            self.replace_child(grandparent, parent, sibling)?;
        } else {
            self.root = Some(sibling);
        }
        self.window_mut(OP, sibling)?.parent = grandparent;
        Ok(parent)
    }

    /// `root` and every window below it.
    fn collect_subtree(&self, root: WindowId) -> BTreeSet<WindowId> {
        let mut out = BTreeSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !out.insert(id) {
                continue;
            }
            if let Some(pair) = self.windows.get(id).and_then(Window::pair_data) {
                stack.extend(pair.children());
            }
        }
        out
    }

    /// Drop a window from the registry along with its stream and any bound
    /// line buffer.
    fn unregister(&mut self, cx: &mut WindowCx<'_>, id: WindowId) {
        let Some(entry) = self.windows.remove(id) else {
            return;
        };
        let mut window = entry.value;
        if let Some(request) = window.text_mut().and_then(|text| text.line.take()) {
            cx.dispatch
                .unregister_array(request.array(id), request.array_rock());
        }
        if cx
            .streams
            .close_window_stream(window.stream, cx.dispatch)
            .is_ok()
        {
            self.unecho(window.stream);
        }
        cx.dispatch.unregister(ObjectRef::Window(id), entry.disprock);
    }

    /// Whether `ancestor` lies strictly above `node`.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: WindowId, node: WindowId) -> bool {
        let mut current = self.windows.get(node).and_then(Window::parent);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.windows.get(id).and_then(Window::parent);
        }
        false
    }

    /// Method, size and key of a pair window.
    pub fn get_arrangement(&self, id: WindowId) -> GlkResult<(WinMethod, u32, Option<WindowId>)> {
        const OP: &str = "window_get_arrangement";
        let data = self
            .window(OP, id)?
            .pair_data()
            .ok_or_else(|| GlkError::invalid_argument(OP, "not a pair window").report())?;
        Ok((data.method, data.size, data.key))
    }

    /// Change how a pair window divides its space.
    ///
    /// The split axis is fixed at creation; only the division, size and key
    /// may change. `key` of `None` keeps the current key.
    pub fn set_arrangement(
        &mut self,
        cx: &mut WindowCx<'_>,
        id: WindowId,
        method: WinMethod,
        size: u32,
        key: Option<WindowId>,
    ) -> GlkResult<()> {
        const OP: &str = "window_set_arrangement";
        let window = self.window(OP, id)?;
        let handle = window.handle;
        let current = *window
            .pair_data()
            .ok_or_else(|| GlkError::invalid_argument(OP, "not a pair window").report())?;
        if i32::try_from(size).is_err() {
            return Err(GlkError::invalid_argument(OP, "size too large").report());
        }
        if method.division().is_none() || method.direction().is_none() {
            return Err(GlkError::invalid_argument(OP, "invalid method").report());
        }
        let key = match key {
            Some(key) => {
                if self.window(OP, key)?.wintype == WinType::Pair {
                    return Err(GlkError::invalid_argument(OP, "keywin cannot be a pair").report());
                }
                if !self.is_ancestor(id, key) {
                    return Err(GlkError::invalid_argument(OP, "keywin must be a descendant").report());
                }
                Some(key)
            }
            None => current.key,
        };
        if method.is_vertical() != current.method.is_vertical() {
            let reason = if current.method.is_vertical() {
                "split must stay vertical"
            } else {
                "split must stay horizontal"
            };
            return Err(GlkError::invalid_argument(OP, reason).report());
        }
        let key_window = key.and_then(|key| self.windows.get(key));
        if key_window.is_some_and(|win| win.wintype == WinType::Blank)
            && method.division() == Some(Division::Fixed)
        {
            return Err(GlkError::invalid_argument(OP, "a blank window cannot have a fixed size").report());
        }
        if current.method == method && current.size == size && current.key == key {
            return Ok(());
        }
        let key_handle = key_window.map(Window::handle);

        self.flush_all(cx.peer)?;
        if let Some(data) = self.windows.get_mut(id).and_then(Window::pair_mut) {
            data.method = method;
            data.size = size;
            data.key = key;
        }
        recover(OP, cx.peer.set_arrangement(handle, method, size, key_handle))?;
        tracing::debug!(
            target: "glkrt.window",
            window = %id,
            method = method.as_raw(),
            size,
            key = ?key,
            "arrangement changed"
        );
        Ok(())
    }

    /// Size in the window's own units; 0x0 for pair and blank windows.
    pub fn get_size(&self, peer: &mut dyn PresentationPeer, id: WindowId) -> GlkResult<(u32, u32)> {
        const OP: &str = "window_get_size";
        let window = self.window(OP, id)?;
        if !window.wintype.is_output() {
            return Ok((0, 0));
        }
        Ok(recover(OP, peer.get_size(window.handle))?.unwrap_or((0, 0)))
    }

    /// Register every window and bound line buffer with a newly installed
    /// hook.
    pub fn register_all(&mut self, dispatch: &mut Dispatch) {
        for id in self.windows.ids().into_iter().rev() {
            let disprock = dispatch.register(ObjectRef::Window(id));
            let Some(entry) = self.windows.entry_mut(id) else {
                continue;
            };
            entry.disprock = disprock;
            if let Some(request) = entry.value.text_mut().and_then(|text| text.line.as_mut()) {
                let rock = dispatch.register_array(request.array(id));
                request.set_array_rock(rock);
            }
        }
    }

    /// Forget every window. Window streams are closed by the stream
    /// registry's own reset.
    pub fn reset(&mut self, dispatch: &mut Dispatch) {
        for (id, mut entry) in self.windows.drain() {
            if let Some(request) = entry.value.text_mut().and_then(|text| text.line.take()) {
                dispatch.unregister_array(request.array(id), request.array_rock());
            }
            dispatch.unregister(ObjectRef::Window(id), entry.disprock);
        }
        self.root = None;
    }

    /// Check the structural invariants.
    pub fn validate(&self) -> Result<(), TreeError> {
        let Some(root) = self.root else {
            return if self.windows.is_empty() {
                Ok(())
            } else {
                Err(TreeError::MissingRoot)
            };
        };
        let root_window = self
            .windows
            .get(root)
            .ok_or(TreeError::MissingWindow { id: root })?;
        if root_window.parent.is_some() {
            return Err(TreeError::RootHasParent { root });
        }

        let mut reached = BTreeSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let window = self.windows.get(id).ok_or(TreeError::MissingWindow { id })?;
            if !reached.insert(id) {
                return Err(TreeError::ParentChildMismatch {
                    parent: window.parent.unwrap_or(id),
                    child: id,
                });
            }
            let WindowKind::Pair(data) = &window.kind else {
                continue;
            };
            for child in data.children() {
                let child_window = self
                    .windows
                    .get(child)
                    .ok_or(TreeError::MissingWindow { id: child })?;
                if child_window.parent != Some(id) {
                    return Err(TreeError::ParentChildMismatch { parent: id, child });
                }
                stack.push(child);
            }
            if let Some(key) = data.key {
                let key_is_leaf = self
                    .windows
                    .get(key)
                    .is_some_and(|win| win.wintype != WinType::Pair);
                if !key_is_leaf || !self.is_ancestor(id, key) {
                    return Err(TreeError::InvalidKey { pair: id, key });
                }
            }
        }

        for (id, window) in self.windows.iter() {
            if !reached.contains(&id) {
                return Err(TreeError::OrphanWindow { id });
            }
            if let Some(parent) = window.parent {
                let parent_is_pair = self
                    .windows
                    .get(parent)
                    .is_some_and(|win| win.wintype == WinType::Pair);
                if !parent_is_pair {
                    return Err(TreeError::ParentNotPair { child: id, parent });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glkrt_backend::{HeadlessPeer, PeerCall, PeerHandle};
    use glkrt_core::{Direction, DispatchHook, DispatchRock, ArrayRef};
    use std::sync::{Arc, Mutex};

    struct Fixture {
        peer: HeadlessPeer,
        streams: StreamRegistry,
        dispatch: Dispatch,
        tree: WindowTree,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                peer: HeadlessPeer::new(),
                streams: StreamRegistry::new(),
                dispatch: Dispatch::new(),
                tree: WindowTree::new(),
            }
        }

        fn open(
            &mut self,
            split: Option<WindowId>,
            method: WinMethod,
            size: u32,
            wintype: WinType,
            rock: Rock,
        ) -> GlkResult<WindowId> {
            let mut cx = WindowCx {
                peer: &mut self.peer,
                streams: &mut self.streams,
                dispatch: &mut self.dispatch,
            };
            self.tree.open(&mut cx, split, method, size, wintype, rock)
        }

        fn close(&mut self, id: WindowId) -> GlkResult<StreamResult> {
            let mut cx = WindowCx {
                peer: &mut self.peer,
                streams: &mut self.streams,
                dispatch: &mut self.dispatch,
            };
            self.tree.close(&mut cx, id)
        }

        fn arrange(
            &mut self,
            id: WindowId,
            method: WinMethod,
            size: u32,
            key: Option<WindowId>,
        ) -> GlkResult<()> {
            let mut cx = WindowCx {
                peer: &mut self.peer,
                streams: &mut self.streams,
                dispatch: &mut self.dispatch,
            };
            self.tree.set_arrangement(&mut cx, id, method, size, key)
        }
    }

    fn method(direction: Direction, division: Division) -> WinMethod {
        WinMethod::new(direction, division)
    }

    fn above_fixed() -> WinMethod {
        method(Direction::Above, Division::Fixed)
    }

    #[test]
    fn first_window_becomes_root() {
        let mut fx = Fixture::new();
        let root = fx
            .open(None, WinMethod::from_raw(0), 0, WinType::TextBuffer, 1)
            .expect("root");
        assert_eq!(fx.tree.root(), Some(root));
        assert_eq!(fx.tree.get_parent(root).expect("parent"), None);
        assert_eq!(fx.tree.get_sibling(root).expect("sibling"), None);
        assert_eq!(fx.tree.get_rock(root).expect("rock"), 1);
        assert_eq!(fx.streams.len(), 1);
        fx.tree.validate().expect("valid");
    }

    #[test]
    fn split_then_close_restores_root() {
        let mut fx = Fixture::new();
        let w1 = fx
            .open(None, WinMethod::from_raw(0), 0, WinType::TextBuffer, 1)
            .expect("w1");
        let w2 = fx
            .open(Some(w1), above_fixed(), 3, WinType::TextGrid, 2)
            .expect("w2");
        let pair = fx.tree.root().expect("root");
        assert_eq!(fx.tree.get_type(pair).expect("type"), WinType::Pair);
        assert_eq!(fx.tree.get_parent(w1).expect("parent"), Some(pair));
        assert_eq!(fx.tree.get_sibling(w1).expect("sibling"), Some(w2));
        assert_eq!(fx.tree.get_sibling(w2).expect("sibling"), Some(w1));
        assert_eq!(
            fx.tree.get_arrangement(pair).expect("arrangement"),
            (above_fixed(), 3, Some(w2))
        );
        fx.tree.validate().expect("valid");

        fx.close(w2).expect("close");
        assert_eq!(fx.tree.root(), Some(w1));
        assert_eq!(fx.tree.get_parent(w1).expect("parent"), None);
        assert!(!fx.tree.contains(pair));
        assert_eq!(fx.tree.len(), 1);
        assert_eq!(fx.streams.len(), 1);
        fx.tree.validate().expect("valid");
    }

    #[test]
    fn open_validates_arguments() {
        let mut fx = Fixture::new();
        assert!(fx.open(None, above_fixed(), 0, WinType::Pair, 0).is_err());
        let ghost = WindowId::new(42).expect("id");
        assert!(fx.open(Some(ghost), above_fixed(), 0, WinType::TextBuffer, 0).is_err());
        let root = fx
            .open(None, WinMethod::from_raw(0), 0, WinType::TextBuffer, 0)
            .expect("root");
        assert!(fx.open(None, above_fixed(), 0, WinType::TextBuffer, 0).is_err());
        let no_division = WinMethod::from_raw(WinMethod::LEFT);
        assert!(fx.open(Some(root), no_division, 0, WinType::TextBuffer, 0).is_err());
        let bad_direction = WinMethod::from_raw(0x0e | WinMethod::FIXED);
        assert!(fx.open(Some(root), bad_direction, 0, WinType::TextBuffer, 0).is_err());
        assert!(
            fx.open(Some(root), above_fixed(), u32::MAX, WinType::TextBuffer, 0)
                .is_err()
        );
        assert_eq!(fx.tree.len(), 1);
    }

    #[test]
    fn proportional_sizes_clamp_to_one_hundred() {
        let mut fx = Fixture::new();
        let root = fx
            .open(None, WinMethod::from_raw(0), 0, WinType::TextBuffer, 0)
            .expect("root");
        let prop = method(Direction::Left, Division::Proportional);
        fx.open(Some(root), prop, 250, WinType::Graphics, 0)
            .expect("split");
        let pair = fx.tree.root().expect("pair");
        assert_eq!(fx.tree.get_arrangement(pair).expect("arr").1, 100);
    }

    #[test]
    fn closing_internal_pair_removes_subtree() {
        let mut fx = Fixture::new();
        let a = fx
            .open(None, WinMethod::from_raw(0), 0, WinType::TextBuffer, 0)
            .expect("a");
        let b = fx.open(Some(a), above_fixed(), 2, WinType::TextGrid, 0).expect("b");
        let c = fx.open(Some(b), above_fixed(), 1, WinType::Blank, 0).expect("c");
        let inner = fx.tree.get_parent(c).expect("parent").expect("pair");
        assert_eq!(fx.tree.len(), 5);

        fx.close(inner).expect("close inner pair");
        assert_eq!(fx.tree.len(), 1);
        assert_eq!(fx.tree.root(), Some(a));
        assert!(!fx.tree.contains(b));
        assert!(!fx.tree.contains(c));
        assert_eq!(fx.streams.len(), 1);
        fx.tree.validate().expect("valid");
    }

    #[test]
    fn closing_key_clears_it_on_ancestor_pairs() {
        let mut fx = Fixture::new();
        let a = fx
            .open(None, WinMethod::from_raw(0), 0, WinType::TextBuffer, 0)
            .expect("a");
        let b = fx.open(Some(a), above_fixed(), 2, WinType::TextGrid, 0).expect("b");
        let outer = fx.tree.root().expect("outer");
        let c = fx.open(Some(a), above_fixed(), 1, WinType::TextBuffer, 0).expect("c");
        fx.arrange(outer, above_fixed(), 2, Some(c)).expect("rekey");
        assert_eq!(fx.tree.get_arrangement(outer).expect("arr").2, Some(c));

        fx.close(c).expect("close c");
        assert_eq!(fx.tree.get_arrangement(outer).expect("arr").2, None);
        assert_eq!(fx.tree.get_sibling(a).expect("sibling"), Some(b));
        fx.tree.validate().expect("valid");
    }

    #[test]
    fn set_arrangement_rules() {
        let mut fx = Fixture::new();
        let a = fx
            .open(None, WinMethod::from_raw(0), 0, WinType::Blank, 0)
            .expect("a");
        let b = fx.open(Some(a), above_fixed(), 2, WinType::TextGrid, 0).expect("b");
        let pair = fx.tree.root().expect("pair");

        assert!(fx.arrange(b, above_fixed(), 2, None).is_err(), "not a pair");
        assert!(fx.arrange(pair, above_fixed(), 2, Some(pair)).is_err(), "pair key");
        let left = method(Direction::Left, Division::Fixed);
        assert!(fx.arrange(pair, left, 2, None).is_err(), "axis change");
        assert!(fx.arrange(pair, above_fixed(), 2, Some(a)).is_err(), "blank fixed");

        fx.peer.monitor().take_calls();
        fx.arrange(pair, above_fixed(), 2, None).expect("unchanged");
        assert!(fx.peer.monitor().calls().is_empty());

        let below = method(Direction::Below, Division::Proportional);
        fx.arrange(pair, below, 40, Some(a)).expect("rearrange");
        assert_eq!(fx.tree.get_arrangement(pair).expect("arr"), (below, 40, Some(a)));
        assert!(fx.peer.monitor().calls().iter().any(|call| matches!(
            call,
            PeerCall::SetArrangement { size: 40, .. }
        )));
    }

    #[test]
    fn get_size_is_zero_for_pairs_and_blanks() {
        let mut fx = Fixture::new();
        let a = fx
            .open(None, WinMethod::from_raw(0), 0, WinType::Blank, 0)
            .expect("a");
        let b = fx.open(Some(a), above_fixed(), 2, WinType::TextGrid, 0).expect("b");
        let pair = fx.tree.root().expect("pair");
        assert_eq!(fx.tree.get_size(&mut fx.peer, a).expect("size"), (0, 0));
        assert_eq!(fx.tree.get_size(&mut fx.peer, pair).expect("size"), (0, 0));
        assert_eq!(fx.tree.get_size(&mut fx.peer, b).expect("size"), (80, 24));
    }

    #[test]
    fn peer_handles_are_recorded() {
        let mut fx = Fixture::new();
        let a = fx
            .open(None, WinMethod::from_raw(0), 0, WinType::TextBuffer, 0)
            .expect("a");
        assert_eq!(fx.tree.get(a).map(Window::handle), Some(PeerHandle(1)));
        let b = fx.open(Some(a), above_fixed(), 1, WinType::TextGrid, 0).expect("b");
        assert_eq!(fx.tree.get(b).map(Window::handle), Some(PeerHandle(2)));
        let pair = fx.tree.root().expect("pair");
        assert_eq!(fx.tree.get(pair).map(Window::handle), Some(PeerHandle(3)));
    }

    #[derive(Clone, Default)]
    struct Counter(Arc<Mutex<(u64, i64)>>);

    impl DispatchHook for Counter {
        fn register(&mut self, _object: ObjectRef) -> DispatchRock {
            let mut state = self.0.lock().expect("lock");
            state.0 += 1;
            state.1 += 1;
            DispatchRock(state.0)
        }

        fn unregister(&mut self, _object: ObjectRef, _rock: DispatchRock) {
            self.0.lock().expect("lock").1 -= 1;
        }

        fn register_array(&mut self, _array: ArrayRef) -> DispatchRock {
            DispatchRock(0)
        }

        fn unregister_array(&mut self, _array: ArrayRef, _rock: DispatchRock) {}
    }

    #[test]
    fn dispatch_sees_every_window_and_stream() {
        let mut fx = Fixture::new();
        let counter = Counter::default();
        fx.dispatch.install(Box::new(counter.clone()));
        let a = fx
            .open(None, WinMethod::from_raw(0), 0, WinType::TextBuffer, 0)
            .expect("a");
        let b = fx.open(Some(a), above_fixed(), 1, WinType::TextGrid, 0).expect("b");
        // Three windows, three window streams.
        assert_eq!(counter.0.lock().expect("lock").1, 6);
        fx.close(b).expect("close");
        assert_eq!(counter.0.lock().expect("lock").1, 2);
    }
}
