#![forbid(unsafe_code)]

//! Top-level session driver.
//!
//! # Role in glkrt
//! Errors that end a session travel up as ordinary `Err` values. [`run`] is
//! the one place that catches them: it logs the cause, performs the same
//! shutdown an orderly exit would, and reports how the session ended.

use std::fmt;

use glkrt_core::{GlkError, GlkResult};

use crate::glk::Glk;

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitStatus {
    /// The interpreter returned normally.
    Finished,
    /// The peer asked the session to stop.
    Interrupted,
    /// A fatal error, or a caller error the interpreter chose not to handle.
    Failed(String),
}

impl ExitStatus {
    /// Conventional process exit code.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::Finished => 0,
            Self::Interrupted => 130,
            Self::Failed(_) => 1,
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finished => write!(f, "finished"),
            Self::Interrupted => write!(f, "interrupted"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Run `main` against `glk`, then shut the session down.
///
/// The shutdown sequence (flush, peer exit, registry reset) runs on every
/// path. When `main` fails, its error decides the status and a failure of
/// the shutdown itself is only logged.
pub fn run<F>(glk: &mut Glk, main: F) -> ExitStatus
where
    F: FnOnce(&mut Glk) -> GlkResult<()>,
{
    let outcome = main(glk);
    let closed = glk.exit();
    match (outcome, closed) {
        (Ok(()), Ok(())) => {
            tracing::debug!(target: "glkrt.window", "session finished");
            ExitStatus::Finished
        }
        (Err(err), closed) => {
            if let Err(shutdown) = closed {
                tracing::error!(target: "glkrt.fatal", error = %shutdown, "shutdown after failure also failed");
            }
            status_for(err)
        }
        (Ok(()), Err(err)) => status_for(err),
    }
}

fn status_for(err: GlkError) -> ExitStatus {
    match err {
        GlkError::Interrupted => {
            tracing::info!(target: "glkrt.fatal", "session interrupted by peer");
            ExitStatus::Interrupted
        }
        err => {
            tracing::error!(
                target: "glkrt.fatal",
                error = %err,
                fatal = err.is_fatal(),
                "session ended by error"
            );
            ExitStatus::Failed(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use glkrt_backend::{HeadlessPeer, PeerCall, PeerError};
    use glkrt_core::{WinMethod, WinType};

    use super::*;

    #[test]
    fn normal_return_flushes_and_exits() {
        let peer = HeadlessPeer::new();
        let monitor = peer.monitor();
        let mut glk = Glk::new(peer);
        let status = run(&mut glk, |glk| {
            let win = glk.window_open(None, WinMethod::default(), 0, WinType::TextBuffer, 0)?;
            glk.set_window(Some(win))?;
            glk.put_string("*** The End ***")
        });
        assert_eq!(status, ExitStatus::Finished);
        assert_eq!(status.code(), 0);
        let calls = monitor.calls();
        assert!(calls.iter().any(|call| matches!(call, PeerCall::Print(_, text) if text == "*** The End ***")));
        assert_eq!(calls.last(), Some(&PeerCall::Exit));
        assert!(glk.windows().is_empty());
        assert_eq!(glk.streams().len(), 0);
    }

    #[test]
    fn fatal_peer_error_is_caught_once() {
        let peer = HeadlessPeer::new();
        let monitor = peer.monitor();
        let mut glk = Glk::new(peer);
        let status = run(&mut glk, |glk| {
            glk.window_open(None, WinMethod::default(), 0, WinType::TextBuffer, 0)?;
            monitor.fail_next(PeerError::fatal("display lost"));
            glk.select()?;
            unreachable!("select must fail");
        });
        assert!(matches!(&status, ExitStatus::Failed(reason) if reason.contains("display lost")));
        assert!(glk.windows().is_empty());
    }

    #[test]
    fn interrupt_maps_to_its_own_status() {
        let peer = HeadlessPeer::new();
        let monitor = peer.monitor();
        let mut glk = Glk::new(peer);
        monitor.fail_next(PeerError::interrupted());
        let status = run(&mut glk, |glk| glk.select().map(drop));
        assert_eq!(status, ExitStatus::Interrupted);
        assert_eq!(status.code(), 130);
        assert!(!status.is_success());
    }
}
