#![forbid(unsafe_code)]

//! Stream registry: every live stream, the current stream, and routing of
//! character operations to the right backend.
//!
//! # Role in glkrt
//! Memory and file streams are served entirely here. Window streams hold
//! only the id of their window; a write to one is answered with
//! [`Route::Window`] so the runtime can hand the text to the window tree,
//! which owns the output buffer.

use std::path::Path;

use glkrt_core::{
    ArrayOwner, ArrayRef, CharBuffer, Dispatch, DispatchRock, FileMode, GlkChar, GlkError,
    GlkResult, ObjectRef, Registry, Rock, SeekMode, StreamId, WindowId,
};

use crate::file::FileStream;
use crate::memory::MemoryBackend;

/// Backend payload of a stream.
#[derive(Debug)]
pub enum StreamBackend {
    Memory {
        data: MemoryBackend,
        /// Rock of the buffer's array registration.
        array_rock: Option<DispatchRock>,
    },
    File(FileStream),
    Window(WindowId),
}

/// Kind tag of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Memory,
    File,
    Window,
}

/// One open stream.
#[derive(Debug)]
pub struct Stream {
    backend: StreamBackend,
    readable: bool,
    writable: bool,
    read_count: u32,
    write_count: u32,
}

impl Stream {
    fn new(backend: StreamBackend, mode: FileMode) -> Self {
        Self {
            backend,
            readable: mode.is_readable(),
            writable: mode.is_writable(),
            read_count: 0,
            write_count: 0,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> StreamKind {
        match self.backend {
            StreamBackend::Memory { .. } => StreamKind::Memory,
            StreamBackend::File(_) => StreamKind::File,
            StreamBackend::Window(_) => StreamKind::Window,
        }
    }

    #[must_use]
    pub const fn is_readable(&self) -> bool {
        self.readable
    }

    #[must_use]
    pub const fn is_writable(&self) -> bool {
        self.writable
    }

    #[must_use]
    pub const fn result(&self) -> StreamResult {
        StreamResult {
            read_count: self.read_count,
            write_count: self.write_count,
        }
    }

    /// Window this stream prints to, for window streams.
    #[must_use]
    pub const fn window(&self) -> Option<WindowId> {
        match self.backend {
            StreamBackend::Window(win) => Some(win),
            _ => None,
        }
    }

    fn array(&self, id: StreamId) -> Option<(ArrayRef, Option<DispatchRock>)> {
        match &self.backend {
            StreamBackend::Memory { data, array_rock } => Some((
                ArrayRef {
                    owner: ArrayOwner::MemoryStream(id),
                    len: data.capacity(),
                    unicode: data.is_unicode(),
                },
                *array_rock,
            )),
            _ => None,
        }
    }
}

/// Read and write totals reported when a stream closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamResult {
    pub read_count: u32,
    pub write_count: u32,
}

/// What closing a stream hands back.
#[derive(Debug, PartialEq, Eq)]
pub struct ClosedStream {
    pub result: StreamResult,
    /// The caller's buffer, for memory streams.
    pub buffer: Option<CharBuffer>,
}

/// Where a write went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Handled here (or silently dropped).
    Done,
    /// Must be printed to this window.
    Window(WindowId),
}

fn invalid(op: &'static str, id: StreamId) -> GlkError {
    GlkError::InvalidStream { op, id: Some(id) }.report()
}

fn saturating_add(count: &mut u32, n: usize) {
    *count = count.saturating_add(u32::try_from(n).unwrap_or(u32::MAX));
}

/// Registry of all open streams.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    streams: Registry<StreamId, Stream>,
    current: Option<StreamId>,
}

impl StreamRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(
        &mut self,
        op: &'static str,
        stream: Stream,
        rock: Rock,
        dispatch: &mut Dispatch,
    ) -> GlkResult<StreamId> {
        let id = self
            .streams
            .insert(rock, stream)
            .ok_or_else(|| GlkError::invalid_state(op, "stream ids exhausted").report())?;
        let disprock = dispatch.register(ObjectRef::Stream(id));
        if let Some(entry) = self.streams.entry_mut(id) {
            entry.disprock = disprock;
            if let Some((array, _)) = entry.value.array(id) {
                let rock = dispatch.register_array(array);
                if let StreamBackend::Memory { array_rock, .. } = &mut entry.value.backend {
                    *array_rock = rock;
                }
            }
        }
        Ok(id)
    }

    /// Open a stream over `buffer`. Write mode starts with no valid data.
    pub fn open_memory(
        &mut self,
        buffer: CharBuffer,
        mode: FileMode,
        rock: Rock,
        dispatch: &mut Dispatch,
    ) -> GlkResult<StreamId> {
        const OP: &str = "stream_open_memory";
        if mode == FileMode::WriteAppend {
            return Err(GlkError::invalid_argument(OP, "invalid file mode").report());
        }
        let unicode = buffer.is_unicode();
        let len = buffer.len();
        let backend = StreamBackend::Memory {
            data: MemoryBackend::new(buffer, mode),
            array_rock: None,
        };
        let id = self.insert(OP, Stream::new(backend, mode), rock, dispatch)?;
        tracing::debug!(target: "glkrt.stream", stream = %id, len, unicode, ?mode, "memory stream opened");
        Ok(id)
    }

    /// Open a file stream. Failure to open the file is a caller error.
    pub fn open_file(
        &mut self,
        path: &Path,
        mode: FileMode,
        text: bool,
        unicode: bool,
        rock: Rock,
        dispatch: &mut Dispatch,
    ) -> GlkResult<StreamId> {
        const OP: &str = "stream_open_file";
        let file = FileStream::open(path, mode, text, unicode)
            .map_err(|source| GlkError::Io { op: OP, source }.report())?;
        self.insert(OP, Stream::new(StreamBackend::File(file), mode), rock, dispatch)
    }

    /// Create the write-only stream owned by `window`.
    pub fn open_window_stream(
        &mut self,
        window: WindowId,
        dispatch: &mut Dispatch,
    ) -> GlkResult<StreamId> {
        self.insert(
            "window_open",
            Stream::new(StreamBackend::Window(window), FileMode::Write),
            0,
            dispatch,
        )
    }

    fn remove(&mut self, id: StreamId, dispatch: &mut Dispatch) -> Option<Stream> {
        let entry = self.streams.remove(id)?;
        if let Some((array, rock)) = entry.value.array(id) {
            dispatch.unregister_array(array, rock);
        }
        dispatch.unregister(ObjectRef::Stream(id), entry.disprock);
        if self.current == Some(id) {
            self.current = None;
        }
        Some(entry.value)
    }

    /// Close a memory or file stream. Window streams close with their window.
    pub fn close(&mut self, id: StreamId, dispatch: &mut Dispatch) -> GlkResult<ClosedStream> {
        const OP: &str = "stream_close";
        let stream = self.streams.get(id).ok_or_else(|| invalid(OP, id))?;
        if stream.kind() == StreamKind::Window {
            return Err(GlkError::invalid_state(OP, "cannot close window stream").report());
        }
        let stream = self.remove(id, dispatch).ok_or_else(|| invalid(OP, id))?;
        let result = stream.result();
        let buffer = match stream.backend {
            StreamBackend::Memory { data, .. } => Some(data.into_buffer()),
            StreamBackend::File(mut file) => {
                if let Err(err) = file.flush() {
                    tracing::warn!(target: "glkrt.stream", stream = %id, error = %err, "flush on close failed");
                }
                None
            }
            StreamBackend::Window(_) => None,
        };
        tracing::debug!(
            target: "glkrt.stream",
            stream = %id,
            read = result.read_count,
            written = result.write_count,
            "stream closed"
        );
        Ok(ClosedStream { result, buffer })
    }

    /// Close the stream of a window that is being closed.
    pub fn close_window_stream(
        &mut self,
        id: StreamId,
        dispatch: &mut Dispatch,
    ) -> GlkResult<StreamResult> {
        self.remove(id, dispatch)
            .map(|stream| stream.result())
            .ok_or_else(|| invalid("window_close", id))
    }

    pub fn set_current(&mut self, id: Option<StreamId>) -> GlkResult<()> {
        if let Some(id) = id {
            if !self.streams.contains(id) {
                return Err(invalid("stream_set_current", id));
            }
        }
        self.current = id;
        Ok(())
    }

    #[must_use]
    pub const fn current(&self) -> Option<StreamId> {
        self.current
    }

    #[must_use]
    pub fn contains(&self, id: StreamId) -> bool {
        self.streams.contains(id)
    }

    #[must_use]
    pub fn get(&self, id: StreamId) -> Option<&Stream> {
        self.streams.get(id)
    }

    pub fn get_rock(&self, id: StreamId) -> GlkResult<Rock> {
        self.streams
            .rock(id)
            .ok_or_else(|| invalid("stream_get_rock", id))
    }

    #[must_use]
    pub fn iterate(&self, after: Option<StreamId>) -> Option<(StreamId, Rock)> {
        self.streams.iterate(after)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Position in elements. Window streams report 0.
    pub fn get_position(&mut self, id: StreamId) -> GlkResult<u32> {
        const OP: &str = "stream_get_position";
        let stream = self.streams.get_mut(id).ok_or_else(|| invalid(OP, id))?;
        match &mut stream.backend {
            StreamBackend::Memory { data, .. } => {
                Ok(u32::try_from(data.position()).unwrap_or(u32::MAX))
            }
            StreamBackend::File(file) => file
                .position()
                .map_err(|source| GlkError::Io { op: OP, source }.report()),
            StreamBackend::Window(_) => Ok(0),
        }
    }

    /// Move the cursor. Window streams ignore this.
    pub fn set_position(&mut self, id: StreamId, pos: i32, mode: SeekMode) -> GlkResult<()> {
        const OP: &str = "stream_set_position";
        let stream = self.streams.get_mut(id).ok_or_else(|| invalid(OP, id))?;
        match &mut stream.backend {
            StreamBackend::Memory { data, .. } => {
                data.seek(pos, mode);
                Ok(())
            }
            StreamBackend::File(file) => file
                .seek(pos, mode)
                .map_err(|source| GlkError::Io { op: OP, source }.report()),
            StreamBackend::Window(_) => Ok(()),
        }
    }

    /// Write code points to a stream.
    ///
    /// Writes to a non-writable stream are silently dropped. Writes to a
    /// window stream are not counted here; the caller reports the accepted
    /// length through [`note_written`](Self::note_written).
    pub fn write(&mut self, id: StreamId, codes: &[u32]) -> GlkResult<Route> {
        const OP: &str = "put_buffer_stream";
        let stream = self.streams.get_mut(id).ok_or_else(|| invalid(OP, id))?;
        if !stream.writable {
            return Ok(Route::Done);
        }
        let written = match &mut stream.backend {
            StreamBackend::Memory { data, .. } => data.put_codes(codes),
            StreamBackend::File(file) => file
                .put_codes(codes)
                .map_err(|source| GlkError::Io { op: OP, source }.report())?,
            StreamBackend::Window(win) => return Ok(Route::Window(*win)),
        };
        saturating_add(&mut stream.write_count, written);
        Ok(Route::Done)
    }

    /// Count `n` elements written through a window stream.
    pub fn note_written(&mut self, id: StreamId, n: usize) {
        if let Some(stream) = self.streams.get_mut(id) {
            saturating_add(&mut stream.write_count, n);
        }
    }

    /// Window targeted by style and hyperlink changes on this stream, if any.
    pub fn window_target(&self, id: StreamId) -> GlkResult<Option<WindowId>> {
        let stream = self
            .streams
            .get(id)
            .ok_or_else(|| invalid("set_style_stream", id))?;
        Ok(if stream.writable { stream.window() } else { None })
    }

    /// Read one code point. `None` means end of data or an unreadable stream.
    pub fn get_char(&mut self, id: StreamId) -> GlkResult<Option<u32>> {
        const OP: &str = "get_char_stream";
        let stream = self.streams.get_mut(id).ok_or_else(|| invalid(OP, id))?;
        if !stream.readable {
            return Ok(None);
        }
        let code = match &mut stream.backend {
            StreamBackend::Memory { data, .. } => data.get_char(),
            StreamBackend::File(file) => file
                .get_char()
                .map_err(|source| GlkError::Io { op: OP, source }.report())?,
            StreamBackend::Window(_) => None,
        };
        if code.is_some() {
            saturating_add(&mut stream.read_count, 1);
        }
        Ok(code)
    }

    /// Fill `out`, narrowing for 8-bit buffers. Returns the element count.
    pub fn get_buffer<D: GlkChar>(&mut self, id: StreamId, out: &mut [D]) -> GlkResult<usize> {
        const OP: &str = "get_buffer_stream";
        let stream = self.streams.get_mut(id).ok_or_else(|| invalid(OP, id))?;
        if !stream.readable {
            return Ok(0);
        }
        let count = match &mut stream.backend {
            StreamBackend::Memory { data, .. } => data.get_buffer(out),
            StreamBackend::File(file) => file
                .get_buffer(out)
                .map_err(|source| GlkError::Io { op: OP, source }.report())?,
            StreamBackend::Window(_) => 0,
        };
        saturating_add(&mut stream.read_count, count);
        Ok(count)
    }

    /// Read one line into `out` with a terminator. Returns the count read,
    /// excluding the terminator.
    pub fn get_line<D: GlkChar>(&mut self, id: StreamId, out: &mut [D]) -> GlkResult<usize> {
        const OP: &str = "get_line_stream";
        let stream = self.streams.get_mut(id).ok_or_else(|| invalid(OP, id))?;
        if !stream.readable || out.is_empty() {
            return Ok(0);
        }
        let count = match &mut stream.backend {
            StreamBackend::Memory { data, .. } => data.get_line(out),
            StreamBackend::File(file) => file
                .get_line(out)
                .map_err(|source| GlkError::Io { op: OP, source }.report())?,
            StreamBackend::Window(_) => return Ok(0),
        };
        saturating_add(&mut stream.read_count, count);
        Ok(count)
    }

    /// Copy of a memory stream's buffer.
    pub fn memory_contents(&self, id: StreamId) -> GlkResult<CharBuffer> {
        const OP: &str = "stream_memory_contents";
        match &self.streams.get(id).ok_or_else(|| invalid(OP, id))?.backend {
            StreamBackend::Memory { data, .. } => Ok(data.snapshot()),
            _ => Err(GlkError::invalid_state(OP, "not a memory stream").report()),
        }
    }

    /// Register every live stream and memory buffer with a newly installed hook.
    pub fn register_all(&mut self, dispatch: &mut Dispatch) {
        for id in self.streams.ids().into_iter().rev() {
            let disprock = dispatch.register(ObjectRef::Stream(id));
            let Some(entry) = self.streams.entry_mut(id) else {
                continue;
            };
            entry.disprock = disprock;
            if let Some((array, _)) = entry.value.array(id) {
                let rock = dispatch.register_array(array);
                if let StreamBackend::Memory { array_rock, .. } = &mut entry.value.backend {
                    *array_rock = rock;
                }
            }
        }
    }

    /// Close every stream, window streams included.
    pub fn reset(&mut self, dispatch: &mut Dispatch) {
        for id in self.streams.ids() {
            self.remove(id, dispatch);
        }
        self.current = None;
    }
}
