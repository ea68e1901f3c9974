#![forbid(unsafe_code)]

//! Error type shared by every runtime operation.
//!
//! # Role in glkrt
//! The display API is forgiving: most misuse is reported, then ignored, and
//! the call returns a neutral value. Operations therefore return
//! [`GlkResult`] so callers can see *what* went wrong, and the facade decides
//! whether to swallow it. Only [`GlkError::Fatal`] and
//! [`GlkError::Interrupted`] end the session.
//!
//! Strict-mode warnings are emitted through `tracing` at target
//! `glkrt.strict`; fatal conditions at `glkrt.fatal`.

use std::fmt;
use std::io;

use crate::id::{FilerefId, StreamId, WindowId};

/// Result alias for runtime operations.
pub type GlkResult<T> = Result<T, GlkError>;

/// Failure of a runtime operation.
#[derive(Debug)]
pub enum GlkError {
    /// The window id is unknown or already closed.
    InvalidWindow { op: &'static str, id: Option<WindowId> },
    /// The stream id is unknown or already closed.
    InvalidStream { op: &'static str, id: Option<StreamId> },
    /// The fileref id is unknown or already destroyed.
    InvalidFileref { op: &'static str, id: Option<FilerefId> },
    /// An argument is malformed or out of range.
    InvalidArgument { op: &'static str, reason: String },
    /// The object cannot do this right now (wrong mode, pending request...).
    InvalidState { op: &'static str, reason: String },
    /// Underlying file I/O failed.
    Io { op: &'static str, source: io::Error },
    /// The presentation peer reported a recoverable failure.
    Peer { op: &'static str, message: String },
    /// Unrecoverable condition; the session must terminate.
    Fatal(String),
    /// The peer asked the session to stop.
    Interrupted,
}

impl GlkError {
    pub fn invalid_argument(op: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            op,
            reason: reason.into(),
        }
    }

    pub fn invalid_state(op: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidState {
            op,
            reason: reason.into(),
        }
    }

    /// Whether the session cannot continue after this error.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_) | Self::Interrupted)
    }

    /// Name of the failing operation, when known.
    #[must_use]
    pub const fn op(&self) -> Option<&'static str> {
        match self {
            Self::InvalidWindow { op, .. }
            | Self::InvalidStream { op, .. }
            | Self::InvalidFileref { op, .. }
            | Self::InvalidArgument { op, .. }
            | Self::InvalidState { op, .. }
            | Self::Io { op, .. }
            | Self::Peer { op, .. } => Some(*op),
            Self::Fatal(_) | Self::Interrupted => None,
        }
    }

    /// Log this error at the matching target and hand it back.
    #[must_use]
    pub fn report(self) -> Self {
        if self.is_fatal() {
            tracing::error!(target: "glkrt.fatal", error = %self, "fatal runtime error");
        } else {
            tracing::warn!(target: "glkrt.strict", op = self.op().unwrap_or("?"), "{self}");
        }
        self
    }
}

impl fmt::Display for GlkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidWindow { op, id: Some(id) } => write!(f, "{op}: invalid {id}"),
            Self::InvalidWindow { op, id: None } => write!(f, "{op}: invalid window"),
            Self::InvalidStream { op, id: Some(id) } => write!(f, "{op}: invalid {id}"),
            Self::InvalidStream { op, id: None } => write!(f, "{op}: invalid stream"),
            Self::InvalidFileref { op, id: Some(id) } => write!(f, "{op}: invalid {id}"),
            Self::InvalidFileref { op, id: None } => write!(f, "{op}: invalid fileref"),
            Self::InvalidArgument { op, reason } => write!(f, "{op}: {reason}"),
            Self::InvalidState { op, reason } => write!(f, "{op}: {reason}"),
            Self::Io { op, source } => write!(f, "{op}: I/O error: {source}"),
            Self::Peer { op, message } => write!(f, "{op}: peer failure: {message}"),
            Self::Fatal(message) => write!(f, "fatal: {message}"),
            Self::Interrupted => write!(f, "interrupted"),
        }
    }
}

impl std::error::Error for GlkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
