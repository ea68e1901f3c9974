#![forbid(unsafe_code)]

//! The runtime context and its event loop.
//!
//! # Role in glkrt
//! [`Glk`] ties the window tree, the stream and fileref registries, the
//! dispatch hook and the presentation peer into one object. Every public
//! operation of the display API is a method on it; an interpreter holds one
//! `Glk` for the whole session and hands it to [`run`].
//!
//! # Primary responsibilities
//! - **Objects**: window, stream and fileref operations, routed to the
//!   registries with the peer and dispatch hook borrowed alongside.
//! - **Events**: `select`/`select_poll` validate raw peer signals against
//!   outstanding requests and the timer interval.
//! - **[`config`]**: `RuntimeConfig` loaded from TOML.
//! - **[`logging`]**: the default `tracing` subscriber.
//! - **[`run`]**: the top-level handler that turns session-ending errors
//!   into an [`ExitStatus`].

pub mod config;
mod event_loop;
mod glk;
pub mod logging;
pub mod run;
mod streams;
mod windows;

pub use config::{ConfigError, FilesConfig, LoggingConfig, OutputConfig, RuntimeConfig};
pub use glk::Glk;
pub use run::{ExitStatus, run};
