#![forbid(unsafe_code)]

//! Core: identifiers, constants, registries and character policy.
//!
//! # Role in glkrt
//! `glkrt-core` is the vocabulary shared by every other crate. It owns no
//! windows or streams itself; it defines what they are called, how they are
//! registered, and how characters are narrowed when they cross between 8-bit
//! and 32-bit views.
//!
//! # Primary responsibilities
//! - **Ids**: [`WindowId`], [`StreamId`], [`FilerefId`] (non-zero, monotonic).
//! - **Registry**: an owning arena that iterates most-recently-created first.
//! - **Dispatch**: the optional foreign-dispatch hook ([`DispatchHook`]).
//! - **Charset**: Latin-1 narrowing, Unicode ceiling, UTF-16 encoding.
//! - **Events**: [`RawSignal`] from the presentation peer, [`Event`] to callers.
//! - **Errors**: [`GlkError`], split into the caller-error and fatal tiers.

pub mod charset;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod id;
pub mod registry;
pub mod types;

pub use charset::{GlkChar, MAX_LATIN1, MAX_UNICHAR, UNKNOWN_CHAR};
pub use dispatch::{
    ArrayOwner, ArrayRef, Dispatch, DispatchHook, DispatchRock, LATIN1_ARRAY_TYPECODE,
    ObjectClass, ObjectRef, UNICODE_ARRAY_TYPECODE,
};
pub use error::{GlkError, GlkResult};
pub use event::{Event, CharBuffer, RawSignal};
pub use id::{FilerefId, ObjectId, Rock, StreamId, WindowId};
pub use registry::{Entry, Registry};
pub use types::{
    Direction, Division, EventType, FileMode, FileType, FileUsage, Justification, SeekMode,
    Style, StyleHint, WinMethod, WinType, gestalt, keycode,
};
