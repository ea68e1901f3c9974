#![forbid(unsafe_code)]

//! Window tree, buffered window output and input requests.
//!
//! # Role in glkrt
//! Windows form a binary tree: leaves display content, pair windows split
//! their area between two children. [`WindowTree`] owns every window
//! record and keeps the tree consistent across open, close and
//! rearrangement. Anything visible goes through a
//! [`PresentationPeer`](glkrt_backend::PresentationPeer); the tree only
//! decides what to send and when.
//!
//! # Primary responsibilities
//! - **[`tree`]**: open/split, close with sibling promotion, arrangement,
//!   structural validation.
//! - **Output**: per-window UTF-16 buffering, flushed before anything that
//!   changes presentation state, and echo-stream forwarding.
//! - **Input**: character, line, mouse and hyperlink requests, and the
//!   validation of raw peer signals against them.
//!
//! Operations that touch streams, the peer or the dispatch hook take a
//! [`WindowCx`] holding borrows of those collaborators.

pub mod input;
pub mod output;
mod requests;
mod text;
pub mod tree;
pub mod window;

pub use input::{KeyboardRequest, LineRequest, deliverable_key};
pub use output::{DEFAULT_BUFFER_UNITS, OutputBuffer};
pub use tree::{TreeError, WindowCx, WindowTree};
pub use window::{PairData, TextState, Window, WindowKind};
