#![forbid(unsafe_code)]

//! glkrt public facade crate.
//!
//! Re-exports the types an interpreter needs from the layer crates and
//! offers a prelude. With the default `runtime` feature the [`Glk`]
//! context and [`run`] are available; without it only the building blocks
//! (registries, window tree, peer trait) are.

// --- Core re-exports -------------------------------------------------------

pub use glkrt_core::{
    CharBuffer, Direction, Division, DispatchHook, DispatchRock, Event, EventType, FileMode,
    FileType, FileUsage, FilerefId, GlkError, GlkResult, ObjectClass, RawSignal, Rock, SeekMode,
    StreamId, Style, StyleHint, WinMethod, WinType, WindowId, gestalt, keycode,
};

// --- Peer re-exports -------------------------------------------------------

pub use glkrt_backend::{HeadlessMonitor, HeadlessPeer, PeerError, PeerHandle, PresentationPeer};

// --- Object re-exports -----------------------------------------------------

pub use glkrt_stream::{ClosedStream, StreamResult};
pub use glkrt_window::WindowTree;

// --- Runtime re-exports ----------------------------------------------------

#[cfg(feature = "runtime")]
pub use glkrt_runtime::{ExitStatus, Glk, RuntimeConfig, run};

/// Everything a typical interpreter loop touches.
pub mod prelude {
    pub use crate::{
        CharBuffer, Event, EventType, FileMode, FileUsage, GlkError, GlkResult, SeekMode, Style,
        WinMethod, WinType, WindowId,
    };

    #[cfg(feature = "runtime")]
    pub use crate::{ExitStatus, Glk, RuntimeConfig, run};

    pub use crate::{backend, core, stream, window};

    #[cfg(feature = "runtime")]
    pub use crate::runtime;
}

pub use glkrt_backend as backend;
pub use glkrt_core as core;
#[cfg(feature = "runtime")]
pub use glkrt_runtime as runtime;
pub use glkrt_stream as stream;
pub use glkrt_window as window;
