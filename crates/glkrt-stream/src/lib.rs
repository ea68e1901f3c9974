#![forbid(unsafe_code)]

//! Character streams and file references.
//!
//! # Role in glkrt
//! A stream is an abstract character sink or source. Three backends exist:
//! an in-memory buffer ([`memory`]), a file ([`file`]), and a window. The
//! first two are complete here; window streams only carry their window id
//! and defer to the window tree for output.
//!
//! # Primary responsibilities
//! - **[`StreamRegistry`]**: open/close, the current stream, read and write
//!   routing, per-stream read and write totals.
//! - **[`MemoryBackend`]**: cursor arithmetic over an owned buffer.
//! - **[`FileStream`]**: Latin-1 bytes or big-endian 32-bit code points.
//! - **[`FilerefRegistry`]**: file references, including temporary files.

pub mod file;
pub mod fileref;
pub mod memory;
pub mod registry;

pub use file::FileStream;
pub use fileref::{Fileref, FilerefRegistry};
pub use memory::{MemoryBackend, MemoryStream};
pub use registry::{ClosedStream, Route, Stream, StreamBackend, StreamKind, StreamRegistry, StreamResult};
