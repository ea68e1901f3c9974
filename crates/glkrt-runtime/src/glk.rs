#![forbid(unsafe_code)]

//! The runtime context.
//!
//! # Role in glkrt
//! [`Glk`] is the one object an interpreter talks to. It owns every
//! registry (windows, streams, filerefs), the optional dispatch hook, the
//! timer interval and the presentation peer. There is no process-wide
//! state, so shutting down is just resetting (or dropping) this value.
//!
//! The API is split over several files by concern; this one holds
//! construction, the dispatch hook, capability queries and shutdown.

use std::fmt;

use glkrt_backend::{PresentationPeer, recover};
use glkrt_core::charset::{latin1_to_lower, latin1_to_upper};
use glkrt_core::{
    Dispatch, DispatchHook, GlkError, GlkResult, Style, StyleHint, WinType, gestalt,
};
use glkrt_stream::{FilerefRegistry, StreamRegistry};
use glkrt_window::{WindowCx, WindowTree};

use crate::config::RuntimeConfig;

/// Runtime context: registries, peer, and process-wide settings.
pub struct Glk {
    pub(crate) peer: Box<dyn PresentationPeer>,
    pub(crate) windows: WindowTree,
    pub(crate) streams: StreamRegistry,
    pub(crate) filerefs: FilerefRegistry,
    pub(crate) dispatch: Dispatch,
    /// Active timer interval in milliseconds; 0 when no timer runs.
    pub(crate) timer_interval: u32,
    pub(crate) config: RuntimeConfig,
}

impl fmt::Debug for Glk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Glk")
            .field("windows", &self.windows.len())
            .field("streams", &self.streams.len())
            .field("filerefs", &self.filerefs.len())
            .field("dispatch", &self.dispatch)
            .field("timer_interval", &self.timer_interval)
            .finish_non_exhaustive()
    }
}

impl Glk {
    /// Runtime with default configuration.
    pub fn new(peer: impl PresentationPeer + 'static) -> Self {
        Self::with_config(peer, RuntimeConfig::default())
    }

    pub fn with_config(peer: impl PresentationPeer + 'static, config: RuntimeConfig) -> Self {
        Self {
            peer: Box::new(peer),
            windows: WindowTree::with_buffer_units(config.output.buffer_units),
            streams: StreamRegistry::new(),
            filerefs: FilerefRegistry::new(),
            dispatch: Dispatch::new(),
            timer_interval: 0,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[must_use]
    pub const fn windows(&self) -> &WindowTree {
        &self.windows
    }

    #[must_use]
    pub const fn streams(&self) -> &StreamRegistry {
        &self.streams
    }

    #[must_use]
    pub const fn filerefs(&self) -> &FilerefRegistry {
        &self.filerefs
    }

    /// Active timer interval in milliseconds, 0 if none.
    #[must_use]
    pub const fn timer_interval(&self) -> u32 {
        self.timer_interval
    }

    /// The window tree plus borrows of everything window operations touch.
    pub(crate) fn window_cx(&mut self) -> (&mut WindowTree, WindowCx<'_>) {
        (
            &mut self.windows,
            WindowCx {
                peer: self.peer.as_mut(),
                streams: &mut self.streams,
                dispatch: &mut self.dispatch,
            },
        )
    }

    /// Install a dispatch hook, registering every object and bound array
    /// that already exists.
    pub fn set_dispatch_hook(&mut self, hook: Box<dyn DispatchHook>) {
        self.dispatch.install(hook);
        self.windows.register_all(&mut self.dispatch);
        self.streams.register_all(&mut self.dispatch);
        self.filerefs.register_all(&mut self.dispatch);
        tracing::debug!(
            target: "glkrt.dispatch",
            windows = self.windows.len(),
            streams = self.streams.len(),
            filerefs = self.filerefs.len(),
            "dispatch hook installed"
        );
    }

    /// Remove the dispatch hook. Objects keep their stored rocks.
    pub fn clear_dispatch_hook(&mut self) -> Option<Box<dyn DispatchHook>> {
        let hook = self.dispatch.clear();
        if hook.is_some() {
            tracing::debug!(target: "glkrt.dispatch", "dispatch hook removed");
        }
        hook
    }

    /// Capability query.
    ///
    /// Answers what the runtime can decide itself and asks the peer for
    /// everything else.
    pub fn gestalt(&mut self, selector: u32, value: u32) -> GlkResult<u32> {
        let local = match selector {
            gestalt::VERSION => Some(gestalt::VERSION_VALUE),
            gestalt::LINE_INPUT => match value {
                32..=126 => Some(1),
                0..=31 | 127..=159 => Some(0),
                _ => None,
            },
            gestalt::CHAR_OUTPUT => match value {
                0..=9 | 11..=31 | 127..=159 => Some(0),
                _ => None,
            },
            gestalt::MOUSE_INPUT => match WinType::from_raw(value) {
                None | Some(WinType::Blank | WinType::Pair) => Some(0),
                Some(_) => None,
            },
            gestalt::DRAW_IMAGE => match WinType::from_raw(value) {
                Some(WinType::TextBuffer | WinType::Graphics) => None,
                _ => Some(0),
            },
            _ => None,
        };
        if let Some(answer) = local {
            return Ok(answer);
        }
        Ok(recover("gestalt", self.peer.gestalt(selector, value))?.unwrap_or(0))
    }

    /// Latin-1 lower-casing.
    #[must_use]
    pub const fn char_to_lower(ch: u8) -> u8 {
        latin1_to_lower(ch)
    }

    /// Latin-1 upper-casing.
    #[must_use]
    pub const fn char_to_upper(ch: u8) -> u8 {
        latin1_to_upper(ch)
    }

    /// Set a style hint for windows of `wintype` opened from now on.
    ///
    /// `wintype` is a raw window type; 0 addresses both text types.
    pub fn stylehint_set(&mut self, wintype: u32, style: u32, hint: u32, value: i32) -> GlkResult<()> {
        const OP: &str = "stylehint_set";
        let (style, hint) = validate_stylehint(OP, wintype, style, hint)?;
        if !hint.accepts(value) {
            return Err(GlkError::invalid_argument(OP, "invalid value for style hint").report());
        }
        recover(OP, self.peer.stylehint_set(wintype, style, hint, value))?;
        Ok(())
    }

    pub fn stylehint_clear(&mut self, wintype: u32, style: u32, hint: u32) -> GlkResult<()> {
        const OP: &str = "stylehint_clear";
        let (style, hint) = validate_stylehint(OP, wintype, style, hint)?;
        recover(OP, self.peer.stylehint_clear(wintype, style, hint))?;
        Ok(())
    }

    /// Nothing to do: the runtime never needs time slices.
    pub fn tick(&mut self) {}

    /// End the session: print pending output, tell the peer, and close
    /// every object. The context stays usable and empty.
    pub fn exit(&mut self) -> GlkResult<()> {
        let flushed = self.windows.flush_all(self.peer.as_mut());
        let notified = recover("exit", self.peer.exit());
        self.shutdown();
        flushed?;
        notified?;
        Ok(())
    }

    /// Close every window, stream and fileref and stop the timer. Open
    /// files are flushed and closed; temporary files are deleted.
    pub fn shutdown(&mut self) {
        self.windows.reset(&mut self.dispatch);
        self.streams.reset(&mut self.dispatch);
        self.filerefs.reset(&mut self.dispatch);
        self.timer_interval = 0;
        tracing::debug!(target: "glkrt.window", "runtime reset");
    }
}

fn validate_stylehint(
    op: &'static str,
    wintype: u32,
    style: u32,
    hint: u32,
) -> GlkResult<(Style, StyleHint)> {
    if wintype != WinType::ALL_TYPES_RAW && !WinType::from_raw(wintype).is_some_and(WinType::is_text) {
        return Err(GlkError::invalid_argument(op, "style hints apply to text windows only").report());
    }
    let style = Style::from_raw(style)
        .ok_or_else(|| GlkError::invalid_argument(op, "invalid style").report())?;
    let hint = StyleHint::from_raw(hint)
        .ok_or_else(|| GlkError::invalid_argument(op, "invalid style hint").report())?;
    Ok((style, hint))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use glkrt_backend::{HeadlessPeer, PeerCall};
    use glkrt_core::{
        ArrayOwner, ArrayRef, CharBuffer, DispatchRock, FileMode, FileType, FileUsage, ObjectRef,
        WinMethod,
    };

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Registered {
        Object(ObjectRef),
        Array(ArrayOwner, usize),
    }

    /// Records `(registered, what, rock)`; rocks are handed out in sequence.
    #[derive(Clone, Default)]
    struct Ledger(Arc<Mutex<Vec<(bool, Registered, DispatchRock)>>>);

    impl Ledger {
        fn push(&self, registered: bool, what: Registered, rock: DispatchRock) {
            self.0.lock().unwrap().push((registered, what, rock));
        }

        fn next_rock(&self) -> DispatchRock {
            DispatchRock(self.0.lock().unwrap().len() as u64 + 100)
        }

        fn take(&self) -> Vec<(bool, Registered, DispatchRock)> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }

    impl DispatchHook for Ledger {
        fn register(&mut self, object: ObjectRef) -> DispatchRock {
            let rock = self.next_rock();
            self.push(true, Registered::Object(object), rock);
            rock
        }

        fn unregister(&mut self, object: ObjectRef, rock: DispatchRock) {
            self.push(false, Registered::Object(object), rock);
        }

        fn register_array(&mut self, array: ArrayRef) -> DispatchRock {
            let rock = self.next_rock();
            self.push(true, Registered::Array(array.owner, array.len), rock);
            rock
        }

        fn unregister_array(&mut self, array: ArrayRef, rock: DispatchRock) {
            self.push(false, Registered::Array(array.owner, array.len), rock);
        }
    }

    #[test]
    fn gestalt_answers_locally_then_forwards() {
        let mut glk = Glk::new(HeadlessPeer::new());
        assert_eq!(glk.gestalt(gestalt::VERSION, 0).unwrap(), 0x0000_0700);
        assert_eq!(glk.gestalt(gestalt::LINE_INPUT, u32::from(b'a')).unwrap(), 1);
        assert_eq!(glk.gestalt(gestalt::LINE_INPUT, 10).unwrap(), 0);
        assert_eq!(glk.gestalt(gestalt::CHAR_OUTPUT, 7).unwrap(), 0);
        assert_eq!(glk.gestalt(gestalt::MOUSE_INPUT, WinType::Blank.as_raw()).unwrap(), 0);
        assert_eq!(glk.gestalt(gestalt::DRAW_IMAGE, WinType::TextGrid.as_raw()).unwrap(), 0);
        // Forwarded to the headless peer.
        assert_eq!(glk.gestalt(gestalt::UNICODE, 0).unwrap(), 1);
        assert_eq!(glk.gestalt(gestalt::MOUSE_INPUT, WinType::Graphics.as_raw()).unwrap(), 0);
    }

    #[test]
    fn stylehints_are_validated_before_forwarding() {
        let peer = HeadlessPeer::new();
        let monitor = peer.monitor();
        let mut glk = Glk::new(peer);
        let weight = StyleHint::Weight.as_raw();
        let emphasized = Style::Emphasized.as_raw();

        glk.stylehint_set(0, emphasized, weight, 1).unwrap();
        assert!(glk.stylehint_set(0, emphasized, weight, 2).is_err());
        assert!(glk.stylehint_set(WinType::Graphics.as_raw(), emphasized, weight, 1).is_err());
        assert!(glk.stylehint_set(0, Style::COUNT, weight, 1).is_err());
        assert!(glk.stylehint_clear(0, emphasized, StyleHint::COUNT).is_err());
        glk.stylehint_clear(WinType::TextGrid.as_raw(), emphasized, weight).unwrap();

        let hints: Vec<_> = monitor
            .calls()
            .into_iter()
            .filter(|call| matches!(call, PeerCall::StyleHintSet(..) | PeerCall::StyleHintClear(..)))
            .collect();
        assert_eq!(
            hints,
            vec![
                PeerCall::StyleHintSet(0, Style::Emphasized, StyleHint::Weight, 1),
                PeerCall::StyleHintClear(WinType::TextGrid.as_raw(), Style::Emphasized, StyleHint::Weight),
            ]
        );
    }

    #[test]
    fn case_mapping_is_latin1() {
        assert_eq!(Glk::char_to_upper(b'z'), b'Z');
        assert_eq!(Glk::char_to_lower(0xC0), 0xE0);
        assert_eq!(Glk::char_to_upper(0xF7), 0xF7);
    }

    #[test]
    fn late_hook_sees_existing_objects_and_their_teardown() {
        let mut glk = Glk::new(HeadlessPeer::new());
        let win = glk
            .window_open(None, WinMethod::default(), 0, WinType::TextBuffer, 0)
            .unwrap();
        let win_stream = glk.window_get_stream(win).unwrap();
        glk.request_line_event(win, CharBuffer::Latin1(vec![0; 7]), 0)
            .unwrap();
        let mem = glk
            .stream_open_memory(CharBuffer::Unicode(vec![0; 5]), FileMode::Write, 0)
            .unwrap();
        let fref = glk
            .fileref_create_temp(FileUsage::new(FileType::Data, true), 0)
            .unwrap();

        let ledger = Ledger::default();
        glk.set_dispatch_hook(Box::new(ledger.clone()));
        let registered = ledger.take();
        let mut seen: Vec<Registered> = registered.iter().map(|(_, what, _)| *what).collect();
        assert!(registered.iter().all(|(registering, _, _)| *registering));
        let mut expected = vec![
            Registered::Object(ObjectRef::Window(win)),
            Registered::Array(ArrayOwner::LineInput(win), 7),
            Registered::Object(ObjectRef::Stream(win_stream)),
            Registered::Object(ObjectRef::Stream(mem)),
            Registered::Array(ArrayOwner::MemoryStream(mem), 5),
            Registered::Object(ObjectRef::Fileref(fref)),
        ];
        let key = |r: &Registered| format!("{r:?}");
        seen.sort_by_key(key);
        expected.sort_by_key(key);
        assert_eq!(seen, expected);

        glk.window_close(win).unwrap();
        glk.stream_close(mem).unwrap();
        glk.fileref_destroy(fref).unwrap();
        let unregistered = ledger.take();
        assert_eq!(unregistered.len(), registered.len());
        for (_, what, rock) in &registered {
            assert!(
                unregistered.contains(&(false, *what, *rock)),
                "{what:?} was not unregistered with its rock"
            );
        }
    }
}
