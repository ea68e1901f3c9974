#![forbid(unsafe_code)]

//! Stream and fileref operations of [`Glk`].
//!
//! Every output call names a stream, explicitly or through the current
//! stream. The 8-bit calls narrow their text to Latin-1 before it reaches
//! the stream; the `_uni` calls pass code points through. Output with no
//! current stream is dropped silently.

use std::path::Path;

use glkrt_backend::recover;
use glkrt_core::charset::narrow_latin1;
use glkrt_core::{
    CharBuffer, FileMode, FileUsage, FilerefId, GlkError, GlkResult, Rock, SeekMode, StreamId,
    Style,
};
use glkrt_stream::ClosedStream;

use crate::glk::Glk;

fn latin1_codes(text: &str) -> Vec<u32> {
    text.chars()
        .map(|ch| u32::from(narrow_latin1(u32::from(ch))))
        .collect()
}

impl Glk {
    /// Write code points to `stream` and on through window echo streams.
    fn put_codes(&mut self, op: &'static str, stream: StreamId, codes: &[u32]) -> GlkResult<()> {
        let (tree, mut cx) = self.window_cx();
        tree.put_codes(&mut cx, op, stream, codes)
    }

    fn put_current(&mut self, op: &'static str, codes: &[u32]) -> GlkResult<()> {
        match self.streams.current() {
            Some(stream) => self.put_codes(op, stream, codes),
            None => Ok(()),
        }
    }

    // --- opening and closing -------------------------------------------

    /// Open a stream over a caller buffer. The buffer's element type picks
    /// 8-bit or Unicode mode; `close` hands it back.
    pub fn stream_open_memory(&mut self, buffer: CharBuffer, mode: FileMode, rock: Rock) -> GlkResult<StreamId> {
        self.streams
            .open_memory(buffer, mode, rock, &mut self.dispatch)
    }

    /// Open the file a fileref names, storing bytes.
    pub fn stream_open_file(&mut self, fileref: FilerefId, mode: FileMode, rock: Rock) -> GlkResult<StreamId> {
        self.open_file("stream_open_file", fileref, mode, false, rock)
    }

    /// Open the file a fileref names, storing 32-bit code points.
    pub fn stream_open_file_uni(&mut self, fileref: FilerefId, mode: FileMode, rock: Rock) -> GlkResult<StreamId> {
        self.open_file("stream_open_file_uni", fileref, mode, true, rock)
    }

    fn open_file(
        &mut self,
        op: &'static str,
        fileref: FilerefId,
        mode: FileMode,
        unicode: bool,
        rock: Rock,
    ) -> GlkResult<StreamId> {
        let fref = self.filerefs.get(op, fileref)?;
        let (path, text) = (fref.path().to_path_buf(), fref.is_text_mode());
        self.streams
            .open_file(&path, mode, text, unicode, rock, &mut self.dispatch)
    }

    /// Open a file for reading by path, without a fileref.
    pub fn stream_open_pathname(&mut self, path: &Path, text_mode: bool, rock: Rock) -> GlkResult<StreamId> {
        self.streams
            .open_file(path, FileMode::Read, text_mode, false, rock, &mut self.dispatch)
    }

    /// Close a memory or file stream. Windows echoing into it stop echoing.
    pub fn stream_close(&mut self, id: StreamId) -> GlkResult<ClosedStream> {
        let closed = self.streams.close(id, &mut self.dispatch)?;
        self.windows.unecho(id);
        Ok(closed)
    }

    /// Read-only copy of a memory stream's buffer.
    pub fn stream_memory_contents(&self, id: StreamId) -> GlkResult<CharBuffer> {
        self.streams.memory_contents(id)
    }

    pub fn stream_set_current(&mut self, id: Option<StreamId>) -> GlkResult<()> {
        self.streams.set_current(id)
    }

    #[must_use]
    pub const fn stream_get_current(&self) -> Option<StreamId> {
        self.streams.current()
    }

    pub fn stream_get_rock(&self, id: StreamId) -> GlkResult<Rock> {
        self.streams.get_rock(id)
    }

    #[must_use]
    pub fn stream_iterate(&self, after: Option<StreamId>) -> Option<(StreamId, Rock)> {
        self.streams.iterate(after)
    }

    pub fn stream_get_position(&mut self, id: StreamId) -> GlkResult<u32> {
        self.streams.get_position(id)
    }

    pub fn stream_set_position(&mut self, id: StreamId, pos: i32, mode: SeekMode) -> GlkResult<()> {
        self.streams.set_position(id, pos, mode)
    }

    // --- output ----------------------------------------------------------

    pub fn put_char(&mut self, ch: u8) -> GlkResult<()> {
        self.put_current("put_char", &[u32::from(ch)])
    }

    pub fn put_char_stream(&mut self, id: StreamId, ch: u8) -> GlkResult<()> {
        self.put_codes("put_char_stream", id, &[u32::from(ch)])
    }

    pub fn put_char_uni(&mut self, ch: u32) -> GlkResult<()> {
        self.put_current("put_char_uni", &[ch])
    }

    pub fn put_char_stream_uni(&mut self, id: StreamId, ch: u32) -> GlkResult<()> {
        self.put_codes("put_char_stream_uni", id, &[ch])
    }

    /// Write `text` narrowed to Latin-1.
    pub fn put_string(&mut self, text: &str) -> GlkResult<()> {
        self.put_current("put_string", &latin1_codes(text))
    }

    pub fn put_string_stream(&mut self, id: StreamId, text: &str) -> GlkResult<()> {
        self.put_codes("put_string_stream", id, &latin1_codes(text))
    }

    pub fn put_string_uni(&mut self, text: &str) -> GlkResult<()> {
        let codes: Vec<u32> = text.chars().map(u32::from).collect();
        self.put_current("put_string_uni", &codes)
    }

    pub fn put_string_stream_uni(&mut self, id: StreamId, text: &str) -> GlkResult<()> {
        let codes: Vec<u32> = text.chars().map(u32::from).collect();
        self.put_codes("put_string_stream_uni", id, &codes)
    }

    pub fn put_buffer(&mut self, buf: &[u8]) -> GlkResult<()> {
        let codes: Vec<u32> = buf.iter().map(|b| u32::from(*b)).collect();
        self.put_current("put_buffer", &codes)
    }

    pub fn put_buffer_stream(&mut self, id: StreamId, buf: &[u8]) -> GlkResult<()> {
        let codes: Vec<u32> = buf.iter().map(|b| u32::from(*b)).collect();
        self.put_codes("put_buffer_stream", id, &codes)
    }

    pub fn put_buffer_uni(&mut self, buf: &[u32]) -> GlkResult<()> {
        self.put_current("put_buffer_uni", buf)
    }

    pub fn put_buffer_stream_uni(&mut self, id: StreamId, buf: &[u32]) -> GlkResult<()> {
        self.put_codes("put_buffer_stream_uni", id, buf)
    }

    /// Set the style of the current stream. Unknown styles mean Normal.
    pub fn set_style(&mut self, style: u32) -> GlkResult<()> {
        match self.streams.current() {
            Some(stream) => self.set_style_stream(stream, style),
            None => Ok(()),
        }
    }

    pub fn set_style_stream(&mut self, id: StreamId, style: u32) -> GlkResult<()> {
        let style = Style::from_raw_or_normal(style);
        let (tree, mut cx) = self.window_cx();
        tree.set_style(&mut cx, id, style)
    }

    /// Set the hyperlink value of the current stream; 0 ends the link.
    pub fn set_hyperlink(&mut self, link: u32) -> GlkResult<()> {
        match self.streams.current() {
            Some(stream) => self.set_hyperlink_stream(stream, link),
            None => Ok(()),
        }
    }

    pub fn set_hyperlink_stream(&mut self, id: StreamId, link: u32) -> GlkResult<()> {
        let (tree, mut cx) = self.window_cx();
        tree.set_hyperlink(&mut cx, id, link)
    }

    // --- input -----------------------------------------------------------

    /// Next character as Latin-1, or `None` at end of data.
    pub fn get_char_stream(&mut self, id: StreamId) -> GlkResult<Option<u8>> {
        Ok(self.streams.get_char(id)?.map(narrow_latin1))
    }

    pub fn get_char_stream_uni(&mut self, id: StreamId) -> GlkResult<Option<u32>> {
        self.streams.get_char(id)
    }

    pub fn get_buffer_stream(&mut self, id: StreamId, buf: &mut [u8]) -> GlkResult<usize> {
        self.streams.get_buffer(id, buf)
    }

    pub fn get_buffer_stream_uni(&mut self, id: StreamId, buf: &mut [u32]) -> GlkResult<usize> {
        self.streams.get_buffer(id, buf)
    }

    /// Read up to a newline, leaving a terminator after the data.
    pub fn get_line_stream(&mut self, id: StreamId, buf: &mut [u8]) -> GlkResult<usize> {
        self.streams.get_line(id, buf)
    }

    pub fn get_line_stream_uni(&mut self, id: StreamId, buf: &mut [u32]) -> GlkResult<usize> {
        self.streams.get_line(id, buf)
    }

    // --- filerefs --------------------------------------------------------

    /// Fresh temporary file, deleted when the fileref is destroyed.
    pub fn fileref_create_temp(&mut self, usage: FileUsage, rock: Rock) -> GlkResult<FilerefId> {
        let prefix = self.config.files.temp_prefix.clone();
        self.filerefs
            .create_temp(usage, &prefix, rock, &mut self.dispatch)
    }

    /// Fileref for a name chosen by the program; the peer resolves it.
    pub fn fileref_create_by_name(&mut self, usage: FileUsage, name: &str, rock: Rock) -> GlkResult<FilerefId> {
        const OP: &str = "fileref_create_by_name";
        let path = recover(OP, self.peer.named_file(name, usage))?
            .flatten()
            .ok_or_else(|| GlkError::invalid_argument(OP, "name could not be resolved").report())?;
        self.filerefs
            .create_by_path(path, usage, rock, &mut self.dispatch)
    }

    /// Ask the user for a file. `None` means the prompt was cancelled.
    pub fn fileref_create_by_prompt(
        &mut self,
        usage: FileUsage,
        mode: FileMode,
        rock: Rock,
    ) -> GlkResult<Option<FilerefId>> {
        let Some(path) = recover("fileref_create_by_prompt", self.peer.prompt_file(usage, mode))?.flatten() else {
            tracing::debug!(target: "glkrt.stream", ?mode, "file prompt cancelled");
            return Ok(None);
        };
        self.filerefs
            .create_by_path(path, usage, rock, &mut self.dispatch)
            .map(Some)
    }

    pub fn fileref_create_from_fileref(
        &mut self,
        usage: FileUsage,
        other: FilerefId,
        rock: Rock,
    ) -> GlkResult<FilerefId> {
        self.filerefs
            .create_from(usage, other, rock, &mut self.dispatch)
    }

    pub fn fileref_destroy(&mut self, id: FilerefId) -> GlkResult<()> {
        self.filerefs.destroy(id, &mut self.dispatch)
    }

    pub fn fileref_get_rock(&self, id: FilerefId) -> GlkResult<Rock> {
        self.filerefs.get_rock(id)
    }

    #[must_use]
    pub fn fileref_iterate(&self, after: Option<FilerefId>) -> Option<(FilerefId, Rock)> {
        self.filerefs.iterate(after)
    }

    pub fn fileref_does_file_exist(&self, id: FilerefId) -> GlkResult<bool> {
        self.filerefs.does_file_exist(id)
    }

    pub fn fileref_delete_file(&self, id: FilerefId) -> GlkResult<()> {
        self.filerefs.delete_file(id)
    }
}

#[cfg(test)]
mod tests {
    use glkrt_backend::HeadlessPeer;
    use glkrt_core::{FileType, WinMethod, WinType};

    use super::*;

    fn glk() -> Glk {
        Glk::new(HeadlessPeer::new())
    }

    #[test]
    fn narrow_output_replaces_wide_characters() {
        let mut glk = glk();
        let id = glk
            .stream_open_memory(CharBuffer::Unicode(vec![0; 8]), FileMode::Write, 0)
            .unwrap();
        glk.put_string_stream(id, "a\u{263A}b").unwrap();
        glk.put_string_stream_uni(id, "\u{263A}").unwrap();
        let closed = glk.stream_close(id).unwrap();
        assert_eq!(closed.result.write_count, 4);
        assert_eq!(
            closed.buffer,
            Some(CharBuffer::Unicode(vec![0x61, 0x3F, 0x62, 0x263A, 0, 0, 0, 0]))
        );
    }

    #[test]
    fn output_without_current_stream_is_dropped() {
        let mut glk = glk();
        assert_eq!(glk.stream_get_current(), None);
        glk.put_char(b'x').unwrap();
        glk.put_buffer_uni(&[0x41]).unwrap();
        glk.set_style(1).unwrap();
        glk.set_hyperlink(3).unwrap();
    }

    #[test]
    fn closing_echo_target_clears_window_reference() {
        let mut glk = glk();
        let win = glk
            .window_open(None, WinMethod::default(), 0, WinType::TextBuffer, 0)
            .unwrap();
        let log = glk
            .stream_open_memory(CharBuffer::Latin1(vec![0; 16]), FileMode::Write, 0)
            .unwrap();
        glk.window_set_echo_stream(win, Some(log)).unwrap();
        glk.set_window(Some(win)).unwrap();
        glk.put_string("hi").unwrap();
        let closed = glk.stream_close(log).unwrap();
        assert_eq!(closed.result.write_count, 2);
        assert_eq!(glk.window_get_echo_stream(win).unwrap(), None);
        glk.put_string("again").unwrap();
    }

    #[test]
    fn window_streams_cannot_be_closed_directly() {
        let mut glk = glk();
        let win = glk
            .window_open(None, WinMethod::default(), 0, WinType::TextGrid, 0)
            .unwrap();
        let stream = glk.window_get_stream(win).unwrap();
        assert!(matches!(
            glk.stream_close(stream),
            Err(GlkError::InvalidState { .. })
        ));
        assert_eq!(glk.stream_get_position(stream).unwrap(), 0);
    }

    #[test]
    fn narrow_reads_substitute_unknown() {
        let mut glk = glk();
        let id = glk
            .stream_open_memory(CharBuffer::Unicode(vec![0x263A, 0x41]), FileMode::Read, 0)
            .unwrap();
        assert_eq!(glk.get_char_stream(id).unwrap(), Some(b'?'));
        assert_eq!(glk.get_char_stream_uni(id).unwrap(), Some(0x41));
        assert_eq!(glk.get_char_stream(id).unwrap(), None);
    }

    #[test]
    fn temp_fileref_round_trip_through_file_stream() {
        let mut glk = glk();
        let usage = FileUsage::new(FileType::Data, false);
        let fref = glk.fileref_create_temp(usage, 9).unwrap();
        assert_eq!(glk.fileref_get_rock(fref).unwrap(), 9);
        assert!(glk.fileref_does_file_exist(fref).unwrap());

        let out = glk.stream_open_file_uni(fref, FileMode::Write, 0).unwrap();
        glk.put_string_stream_uni(out, "\u{263A}ok").unwrap();
        glk.stream_close(out).unwrap();

        let input = glk.stream_open_file_uni(fref, FileMode::Read, 0).unwrap();
        let mut buf = [0u32; 8];
        assert_eq!(glk.get_buffer_stream_uni(input, &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[0x263A, u32::from('o'), u32::from('k')]);
        glk.stream_close(input).unwrap();

        glk.fileref_destroy(fref).unwrap();
        assert!(glk.fileref_get_rock(fref).is_err());
    }

    #[test]
    fn named_and_prompted_filerefs_go_through_the_peer() {
        let dir = tempfile::tempdir().unwrap();
        let peer = HeadlessPeer::new();
        let monitor = peer.monitor();
        let mut glk = Glk::new(peer);
        let usage = FileUsage::new(FileType::SavedGame, false);

        assert!(glk.fileref_create_by_name(usage, "save1", 0).is_err());
        monitor.set_file_root(dir.path());
        let named = glk.fileref_create_by_name(usage, "save1", 0).unwrap();
        assert!(!glk.fileref_does_file_exist(named).unwrap());

        monitor.push_prompt_answer(None);
        assert_eq!(glk.fileref_create_by_prompt(usage, FileMode::Write, 0).unwrap(), None);
        monitor.push_prompt_answer(Some(dir.path().join("picked")));
        let picked = glk
            .fileref_create_by_prompt(usage, FileMode::Write, 0)
            .unwrap()
            .expect("answered prompt");
        let copy = glk.fileref_create_from_fileref(usage, picked, 4).unwrap();
        assert_eq!(glk.fileref_iterate(None), Some((copy, 4)));
    }

    #[test]
    fn pathname_streams_are_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("story.txt");
        std::fs::write(&path, "line one\nline two\n").unwrap();
        let mut glk = glk();
        let id = glk.stream_open_pathname(&path, true, 0).unwrap();
        let mut line = [0u8; 32];
        let n = glk.get_line_stream(id, &mut line).unwrap();
        assert_eq!(&line[..n], b"line one\n");
        glk.put_string_stream(id, "ignored").unwrap();
        assert_eq!(glk.stream_close(id).unwrap().result.write_count, 0);
    }
}
